//! Include/exclude filter over tag names
//!
//! Patterns are shell-style globs:
//!
//! - `*` matches any run of characters, `?` a single character
//! - `[abc]` / `[!abc]` match a character class
//! - `{a,b}` matches one of the alternatives
//! - `\x` matches `x` literally
//!
//! The filter is compiled once when the connector is built and is read-only
//! afterwards, so it can be shared between poll cycles.

use std::collections::BTreeMap;

use regex::{Regex, RegexSet};
use tracing::trace;

use crate::error::FilterError;

#[derive(Debug, Clone, Default)]
pub struct TagFilter {
    include: Option<RegexSet>,
    exclude: Option<RegexSet>,
}

impl TagFilter {
    /// Compile include and exclude glob lists. Empty lists disable that side.
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, FilterError> {
        let filter = Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        };
        trace!("compiled tag filter (include: {include:?}, exclude: {exclude:?})");
        Ok(filter)
    }

    /// A filter that lets every tag through.
    pub fn pass_all() -> Self {
        Self::default()
    }

    pub fn is_pass_all(&self) -> bool {
        self.include.is_none() && self.exclude.is_none()
    }

    /// Check whether a tag name passes the filter
    pub fn matches(&self, name: &str) -> bool {
        let included = self
            .include
            .as_ref()
            .is_none_or(|include| include.is_match(name));
        let excluded = self
            .exclude
            .as_ref()
            .is_some_and(|exclude| exclude.is_match(name));

        included && !excluded
    }

    /// Drop every tag whose name does not pass the filter
    pub fn apply(&self, tags: &mut BTreeMap<String, String>) {
        if self.is_pass_all() {
            return;
        }
        tags.retain(|name, _| self.matches(name));
    }
}

fn compile(patterns: &[String]) -> Result<Option<RegexSet>, FilterError> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut translated = Vec::with_capacity(patterns.len());
    for pattern in patterns {
        let regex = glob_to_regex(pattern);
        // validate one by one so the error names the offending pattern
        Regex::new(&regex).map_err(|source| FilterError {
            pattern: pattern.clone(),
            source,
        })?;
        translated.push(regex);
    }

    RegexSet::new(&translated)
        .map(Some)
        .map_err(|source| FilterError {
            pattern: patterns.join(","),
            source,
        })
}

/// Translate a glob into an anchored regular expression
fn glob_to_regex(glob: &str) -> String {
    let mut regex = String::from("^(?:");
    let mut chars = glob.chars().peekable();
    let mut alternation_depth = 0usize;

    while let Some(c) = chars.next() {
        match c {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            '\\' => match chars.next() {
                Some(escaped) => regex.push_str(&regex::escape(&escaped.to_string())),
                None => regex.push_str(r"\\"),
            },
            '[' => {
                regex.push('[');
                if chars.peek() == Some(&'!') {
                    chars.next();
                    regex.push('^');
                }
                // copied verbatim; an unterminated class is a compile error
                while let Some(class_char) = chars.next() {
                    if class_char == '\\' {
                        regex.push('\\');
                        if let Some(escaped) = chars.next() {
                            regex.push(escaped);
                        }
                        continue;
                    }
                    regex.push(class_char);
                    if class_char == ']' {
                        break;
                    }
                }
            }
            '{' => {
                alternation_depth += 1;
                regex.push_str("(?:");
            }
            ',' if alternation_depth > 0 => regex.push('|'),
            '}' if alternation_depth > 0 => {
                alternation_depth -= 1;
                regex.push(')');
            }
            other => regex.push_str(&regex::escape(&other.to_string())),
        }
    }

    regex.push_str(")$");
    regex
}
