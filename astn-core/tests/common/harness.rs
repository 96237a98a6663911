//! Test harness for running fixtures with stochastic variations

use crate::common::{ExpectedEvent, Gen, TestCase};
use astn_core::token::OverheadToken;
use astn_core::{Diagnostic, ParserOptions, StreamingParser, TreeEvent};

/// Marker text of the comments the variations inject.
const PAD_COMMENT: &str = "~pad~";

/// Everything one parse produced
#[derive(Debug, Clone, PartialEq)]
pub struct Collected {
    pub events: Vec<TreeEvent>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse a sequence of chunks, collecting events and diagnostics
pub fn collect<'s>(chunks: impl IntoIterator<Item = &'s str>) -> Collected {
    let mut diagnostics = Vec::new();
    let events = StreamingParser::parse_chunks(chunks, Vec::new(), ParserOptions::default(), |d| {
        diagnostics.push(d)
    });
    Collected { events, diagnostics }
}

/// Format event for comparison (no ranges). Whitespace and newlines are
/// skipped.
pub fn format_event(event: &TreeEvent) -> Option<String> {
    let formatted = match event {
        TreeEvent::OpenArray { bracket, .. } => format!("OpenArray {:?}", bracket.to_string()),
        TreeEvent::CloseArray { bracket, .. } => format!("CloseArray {:?}", bracket.to_string()),
        TreeEvent::OpenObject { bracket, .. } => format!("OpenObject {:?}", bracket.to_string()),
        TreeEvent::CloseObject { bracket, .. } => format!("CloseObject {:?}", bracket.to_string()),
        TreeEvent::Colon { .. } => "Colon".to_string(),
        TreeEvent::Comma { .. } => "Comma".to_string(),
        TreeEvent::TaggedUnion { .. } => "TaggedUnion".to_string(),
        TreeEvent::SchemaMarker { .. } => "SchemaMarker".to_string(),
        TreeEvent::CompactMarker { .. } => "CompactMarker".to_string(),
        TreeEvent::String(string) => format!("String {:?}", string.value),
        TreeEvent::Overhead(OverheadToken::Comment(comment)) => {
            format!("Comment {:?}", comment.text)
        }
        TreeEvent::Overhead(OverheadToken::NewLine { .. } | OverheadToken::Whitespace { .. }) => {
            return None
        }
    };
    Some(formatted)
}

pub fn format_diagnostic(diagnostic: &Diagnostic) -> String {
    format!("{}: {}", diagnostic.severity, diagnostic.kind)
}

/// Format expected event for comparison
fn format_expected(event: &ExpectedEvent) -> String {
    match event {
        ExpectedEvent::Bare(name) => name.clone(),
        ExpectedEvent::WithContent(name, content) => format!("{} {:?}", name, content),
    }
}

/// Result of running a test
#[derive(Debug)]
pub struct TestResult {
    pub passed: bool,
    pub input: String,
    pub chunks: Vec<String>,
    pub expected: Vec<String>,
    pub actual: Vec<String>,
    pub seed: u64,
    pub errors: Vec<String>,
}

fn compare(
    case: &TestCase,
    collected: &Collected,
    errors: &mut Vec<String>,
) -> (Vec<String>, Vec<String>) {
    let pad = format!("Comment {:?}", PAD_COMMENT);
    let actual: Vec<String> = collected
        .events
        .iter()
        .filter_map(format_event)
        .filter(|e| *e != pad)
        .collect();
    let expected: Vec<String> = case.events.iter().map(format_expected).collect();

    if actual.len() != expected.len() {
        errors.push(format!(
            "Event count mismatch: expected {}, got {}",
            expected.len(),
            actual.len()
        ));
    }
    for (i, (act, exp)) in actual.iter().zip(expected.iter()).enumerate() {
        if act != exp {
            errors.push(format!("Event {}: expected '{}', got '{}'", i, exp, act));
        }
    }

    let diagnostics: Vec<String> = collected.diagnostics.iter().map(format_diagnostic).collect();
    if diagnostics != case.diagnostics {
        errors.push(format!(
            "Diagnostics mismatch: expected {:?}, got {:?}",
            case.diagnostics, diagnostics
        ));
    }
    (expected, actual)
}

/// Run a single test case (canonical, no variations)
pub fn run_test(case: &TestCase) -> TestResult {
    let collected = collect([case.astn.as_str()]);
    let mut errors = Vec::new();
    let (expected, actual) = compare(case, &collected, &mut errors);

    TestResult {
        passed: errors.is_empty(),
        input: case.astn.clone(),
        chunks: vec![case.astn.clone()],
        expected,
        actual,
        seed: 0,
        errors,
    }
}

/// Run test with stochastic variations
///
/// Applies independent variations:
/// - Random blank lines and whitespace before the document
/// - 30% chance of a leading block comment
/// - Trailing blank lines, unless the document ends inside a token
/// - Random chunk boundaries
///
/// The chunked parse must match the whole-input parse exactly, ranges
/// included, and both must match the fixture.
pub fn run_with_variations(case: &TestCase, gen: &mut Gen) -> TestResult {
    let mut input = gen.blank_lines();
    if gen.chance(0.3) {
        input.push_str(&format!("/*{}*/", PAD_COMMENT));
    }
    input.push_str(&gen.whitespace());
    input.push_str(&case.astn);

    let open_ended = case.diagnostics.iter().any(|d| d.contains("unterminated"));
    if !open_ended {
        input.push('\n');
        input.push_str(&gen.blank_lines());
    }

    let chunks = gen.split(&input);
    let whole = collect([input.as_str()]);
    let split = collect(chunks.iter().copied());

    let mut errors = Vec::new();
    if whole != split {
        errors.push("Chunked parse differs from whole-input parse".to_string());
    }
    let (expected, actual) = compare(case, &split, &mut errors);

    TestResult {
        passed: errors.is_empty(),
        chunks: chunks.iter().map(|c| c.to_string()).collect(),
        input,
        expected,
        actual,
        seed: gen.seed,
        errors,
    }
}

impl TestResult {
    /// Print detailed failure info
    pub fn print_failure(&self, case_id: &str) {
        eprintln!("\n=== FAILED: {} ===", case_id);
        eprintln!("Seed: {} (set ASTN_TEST_SEED={} to reproduce)", self.seed, self.seed);
        eprintln!("\nInput:");
        eprintln!("{}", self.input);
        eprintln!("\nChunks: {:?}", self.chunks);
        eprintln!("\nExpected events:");
        for (i, e) in self.expected.iter().enumerate() {
            eprintln!("  {}: {}", i, e);
        }
        eprintln!("\nActual events:");
        for (i, e) in self.actual.iter().enumerate() {
            eprintln!("  {}: {}", i, e);
        }
        eprintln!("\nErrors:");
        for e in &self.errors {
            eprintln!("  - {}", e);
        }
    }
}
