//! Pulls a Verilog module out of free-form model output.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

const IMPLEMENTATION_HEADING: &str = "## Code Implementation";

fn fenced_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```verilog\s*(.*?)```").expect("static regex"))
}

fn block_comment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)/\*.*?\*/").expect("static regex"))
}

fn line_comment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"//[^\n]*").expect("static regex"))
}

/// Last ```` ```verilog ```` block after the last implementation heading,
/// or that whole tail when there is no fenced block.
pub fn extract_code(text: &str) -> String {
    let tail = text.rsplit(IMPLEMENTATION_HEADING).next().unwrap_or(text);
    fenced_block()
        .captures_iter(tail)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| tail.to_string())
}

/// Drop comments, trailing whitespace and blank lines.
pub fn strip_comments(code: &str) -> String {
    let code = block_comment().replace_all(code, "");
    let code = line_comment().replace_all(&code, "");
    code.lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split at the end of the first module port list: the header runs through
/// the first line ending in `);` at or after a line starting with `module`.
pub fn split_header(code: &str) -> (String, String) {
    let mut header = Vec::new();
    let mut body = Vec::new();
    let mut in_module = false;
    let mut header_complete = false;

    for line in code.lines() {
        if header_complete {
            body.push(line);
            continue;
        }
        header.push(line);
        let trimmed = line.trim();
        if !in_module && trimmed.starts_with("module") {
            in_module = true;
        }
        if in_module && trimmed.ends_with(");") {
            header_complete = true;
        }
    }

    (header.join("\n"), body.join("\n"))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractedCode {
    pub full_code: String,
    pub header: String,
    pub body: String,
}

#[derive(Debug, Clone, Copy)]
pub struct CodeExtractor {
    strip_comments: bool,
}

impl Default for CodeExtractor {
    fn default() -> Self {
        Self {
            strip_comments: true,
        }
    }
}

impl CodeExtractor {
    pub fn new(strip_comments: bool) -> Self {
        Self { strip_comments }
    }

    pub fn extract(&self, raw_output: &str) -> ExtractedCode {
        let code = extract_code(raw_output);
        let full_code = if self.strip_comments {
            strip_comments(&code)
        } else {
            code
        };

        let (header, body) = split_header(&full_code);
        let body = if body.trim().is_empty() {
            full_code.clone()
        } else {
            body
        };

        ExtractedCode {
            full_code,
            header,
            body,
        }
    }
}
