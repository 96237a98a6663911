//! Print the tree events and diagnostics of a document read from stdin.
//!
//! cargo run --example stdin_parse < document.astn

use std::io::Read;

use astn_core::{ParserOptions, StreamingParser, TreeEvent};

fn main() -> std::io::Result<()> {
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;

    let mut diagnostics = Vec::new();
    let mut parser = StreamingParser::new(Vec::new(), ParserOptions::default());
    // Small chunks on purpose: the output must not depend on them.
    let mut rest = input.as_str();
    while !rest.is_empty() {
        let mut at = rest.len().min(64);
        while !rest.is_char_boundary(at) {
            at += 1;
        }
        let (chunk, tail) = rest.split_at(at);
        if parser.feed(chunk, &mut |d| diagnostics.push(d)).is_break() {
            break;
        }
        rest = tail;
    }
    let events: Vec<TreeEvent> = parser.finish(&mut |d| diagnostics.push(d));

    for event in events.iter().filter(|e| !e.is_overhead()) {
        println!("{} {:?}", event.range(), event);
    }
    for diagnostic in &diagnostics {
        eprintln!("{}", diagnostic);
    }
    Ok(())
}
