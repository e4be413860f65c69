//! Positional string templates
//!
//! `{}` takes the next value in order, `{N}` takes value `N`, and `{{` / `}}`
//! produce literal braces. Placeholders without a value format as empty.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{|\}\}|\{(\d*)\}").expect("placeholder pattern is valid"));

pub fn format_template<S: AsRef<str>>(template: &str, values: &[S]) -> String {
    let mut next = 0;
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match &caps[0] {
            "{{" => "{".to_string(),
            "}}" => "}".to_string(),
            _ => {
                let index = match caps.get(1).map(|m| m.as_str()) {
                    Some(digits) if !digits.is_empty() => {
                        digits.parse::<usize>().unwrap_or(usize::MAX)
                    }
                    _ => {
                        next += 1;
                        next - 1
                    }
                };
                values
                    .get(index)
                    .map(|v| v.as_ref().to_string())
                    .unwrap_or_default()
            }
        })
        .into_owned()
}

/// Number of values a template consumes
pub fn placeholder_arity(template: &str) -> usize {
    let mut sequential = 0;
    let mut indexed = 0;
    for caps in PLACEHOLDER.captures_iter(template) {
        match caps.get(1).map(|m| m.as_str()) {
            Some("") => sequential += 1,
            Some(digits) => {
                let index = digits.parse::<usize>().unwrap_or(usize::MAX - 1);
                indexed = indexed.max(index + 1);
            }
            None => {}
        }
    }
    sequential.max(indexed)
}
