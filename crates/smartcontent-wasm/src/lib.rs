use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use smartcontent_core::{Node, Parser, SourceMap, normalize, sanitize};
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderOptions {
    limit: Option<i64>,
    sanitized: Option<bool>,
    verbatim: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderResult {
    html: String,
    nodes: Vec<JsNode>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JsNode {
    rule: String,
    range: JsRange,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JsRange {
    start_line: usize,
    start_col: usize,
    end_line: usize,
    end_col: usize,
}

/// `process(text, limit?)`: negative or missing limits are unbounded.
#[wasm_bindgen]
pub fn process(text: &str, limit: Option<i32>) -> String {
    smartcontent_core::process(text, limit_from_js(limit.map(i64::from)))
}

#[wasm_bindgen]
pub fn render_html(source: &str) -> Result<JsValue, JsValue> {
    render_html_with_options(source, JsValue::UNDEFINED)
}

#[wasm_bindgen]
pub fn render_html_with_options(source: &str, options: JsValue) -> Result<JsValue, JsValue> {
    let options = options_from_js(options)?;
    let result = render(source, &options).map_err(|err| JsValue::from_str(&err))?;
    serde_wasm_bindgen::to_value(&result).map_err(|err| JsValue::from_str(&err.to_string()))
}

fn options_from_js(value: JsValue) -> Result<RenderOptions, JsValue> {
    if value.is_null() || value.is_undefined() {
        return Ok(RenderOptions::default());
    }
    serde_wasm_bindgen::from_value(value).map_err(|err| JsValue::from_str(&err.to_string()))
}

fn limit_from_js(limit: Option<i64>) -> Option<usize> {
    limit.and_then(|limit| usize::try_from(limit).ok())
}

fn render(source: &str, options: &RenderOptions) -> Result<RenderResult, String> {
    let text = if options.verbatim.unwrap_or(false) {
        Cow::Borrowed(source)
    } else {
        Cow::Owned(normalize(source))
    };
    let parser = Parser::global();
    let nodes = parser.lex(&text).map_err(|err| err.to_string())?;
    let html = parser.compile(&nodes, limit_from_js(options.limit));
    let html = if options.sanitized.unwrap_or(false) {
        sanitize(&html)
    } else {
        html
    };

    let source_map = SourceMap::new(&text);
    let nodes = nodes
        .iter()
        .map(|node| node_to_js(node, &source_map))
        .collect();

    Ok(RenderResult { html, nodes })
}

fn node_to_js(node: &Node, source_map: &SourceMap<'_>) -> JsNode {
    let range = source_map.range(node.span());
    JsNode {
        rule: node.rule().to_string(),
        range: JsRange {
            start_line: range.start.line,
            start_col: range.start.character,
            end_line: range.end.line,
            end_col: range.end.character,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_limits_are_unbounded() {
        assert_eq!(limit_from_js(None), None);
        assert_eq!(limit_from_js(Some(-1)), None);
        assert_eq!(limit_from_js(Some(0)), Some(0));
        assert_eq!(limit_from_js(Some(12)), Some(12));
    }

    #[test]
    fn options_deserialize_from_camel_case() {
        let options: RenderOptions =
            serde_json::from_str(r#"{"limit": 3, "sanitized": true}"#).unwrap();
        assert_eq!(options.limit, Some(3));
        assert_eq!(options.sanitized, Some(true));
        assert_eq!(options.verbatim, None);
    }

    #[test]
    fn renders_markup_and_top_level_ranges() {
        let result = render("  a\ngoogle.com", &RenderOptions::default()).unwrap();
        assert_eq!(
            result.html,
            "a<br /><a href=\"http://google.com\">google.com</a>"
        );
        let rules = result
            .nodes
            .iter()
            .map(|node| node.rule.as_str())
            .collect::<Vec<_>>();
        assert_eq!(rules, ["text", "newline", "url"]);
        let url = &result.nodes[2].range;
        assert_eq!(
            (url.start_line, url.start_col, url.end_line, url.end_col),
            (1, 0, 1, 10)
        );
    }

    #[test]
    fn matches_the_core_renderer() {
        let source = "\tsee <b>google.com/x</b> (and bob@x.de)\n";
        for (limit, sanitized, verbatim) in [
            (None, false, false),
            (Some(12), false, false),
            (Some(12), true, false),
            (None, true, true),
        ] {
            let options = RenderOptions {
                limit,
                sanitized: Some(sanitized),
                verbatim: Some(verbatim),
            };
            let expected = Parser::global()
                .render(
                    source,
                    &smartcontent_core::RenderOptions {
                        limit: limit_from_js(limit),
                        sanitized,
                        verbatim,
                    },
                )
                .unwrap();
            assert_eq!(render(source, &options).unwrap().html, expected);
        }
    }

    #[test]
    fn limits_apply() {
        let options = RenderOptions {
            limit: Some(2),
            ..RenderOptions::default()
        };
        assert_eq!(render("abc", &options).unwrap().html, "a…");
        assert_eq!(process("abc", Some(-5)), "abc");
    }
}
