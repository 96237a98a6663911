//! Test infrastructure for the ASTN parser
//!
//! Provides fixture loading, seeded chunk splitting, and assertion helpers.

#![allow(dead_code, unused_imports)]

mod generators;
mod harness;
mod loader;

pub use generators::Gen;
pub use harness::{
    collect, format_diagnostic, format_event, run_test, run_with_variations, Collected,
};
pub use loader::{load_fixtures_by_name, ExpectedEvent, TestCase};
