use std::fs;
use std::path::Path;

use serde::Deserialize;
use smartcontent_core::{Parser, RenderOptions};

#[derive(Debug, Deserialize)]
struct Case {
    name: String,
    input: String,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    sanitized: bool,
    expected: String,
}

#[test]
fn golden_cases() -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/cases.json");
    let cases: Vec<Case> = serde_json::from_str(&fs::read_to_string(&path)?)?;
    assert!(!cases.is_empty(), "no cases in {}", path.display());

    let parser = Parser::new();
    for case in cases {
        let options = RenderOptions {
            limit: case.limit,
            sanitized: case.sanitized,
            ..RenderOptions::default()
        };
        let html = parser.render(&case.input, &options)?;
        assert_eq!(html, case.expected, "output mismatch for case {}", case.name);
    }
    Ok(())
}
