//! ASTN Core Parser
//!
//! Streaming, error-tolerant parser for ASTN, a JSON superset with tagged
//! unions, alternate bracket styles, comments and an optional schema header.
//! Input is fed in chunks of any size; exact source ranges, comments and
//! whitespace are preserved, and malformed input is reported without stopping
//! the parse.
//!
//! # Architecture
//!
//! ```text
//! chunks ─► PreTokenizer ─► Tokenizer ─► TreeParser ─► TreeEvents ─► StackedParser ─► handlers
//!           (pre-tokens)    (tokens)     (structure)                 (comment attachment)
//! ```
//!
//! - **location.rs** - Location/Range types and the line/column tracker
//! - **chunk.rs** - Cursor over one input chunk
//! - **pretokenizer.rs** - Character-level state machine, zero-copy snippets
//! - **tokenizer.rs** - Assembles pre-tokens into semantic tokens
//! - **tree_parser.rs** - Explicit-stack structural state machine
//! - **stacked.rs** - Flat events to nested handler callbacks
//! - **streaming.rs** - Chunk-fed drivers
//! - **tree.rs** - Arena document built from handlers
//! - **value.rs** - Scalar classification

pub mod chunk;
pub mod error;
pub mod event;
pub mod handler;
pub mod location;
pub mod options;
pub mod pretokenizer;
pub mod stacked;
pub mod streaming;
pub mod token;
pub mod tokenizer;
pub mod tree;
pub mod tree_parser;
pub mod value;

pub use error::{Diagnostic, DiagnosticKind, Severity};
pub use event::{TreeEvent, TreeEventSink};
pub use handler::{DocumentHandler, Ignore};
pub use location::{Location, Range};
pub use options::{DuplicateAction, DuplicateKeyPolicy, DuplicateSeverity, ParserOptions};
pub use stacked::StackedParser;
pub use streaming::{Lexer, StreamingParser};
pub use token::{StringForm, Token};
pub use tree::Document;
pub use value::Scalar;
