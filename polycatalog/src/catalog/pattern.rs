// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! SQL `LIKE` patterns used by snapshot lookups

use regex::{Regex, RegexBuilder};

/// A `LIKE` pattern: `%` matches any run of characters, `_` exactly one,
/// `\` escapes the next character.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Option<Regex>,
    literal: bool,
}

impl Pattern {
    /// Case-insensitive pattern, the default for identifiers
    pub fn new(pattern: &str) -> Self {
        Self::build(pattern, false)
    }

    pub fn case_sensitive(pattern: &str) -> Self {
        Self::build(pattern, true)
    }

    fn build(pattern: &str, case_sensitive: bool) -> Self {
        let mut expr = String::with_capacity(pattern.len() + 8);
        let mut literal = true;
        let mut escaped = false;
        expr.push('^');
        for c in pattern.chars() {
            if escaped {
                expr.push_str(&regex::escape(&c.to_string()));
                escaped = false;
                continue;
            }
            match c {
                '\\' => escaped = true,
                '%' => {
                    literal = false;
                    expr.push_str(".*");
                }
                '_' => {
                    literal = false;
                    expr.push('.');
                }
                other => expr.push_str(&regex::escape(&other.to_string())),
            }
        }
        if escaped {
            expr.push_str(&regex::escape("\\"));
        }
        expr.push('$');

        // Only fails past the regex size limit; such patterns fall back to equality
        let regex = RegexBuilder::new(&expr)
            .case_insensitive(!case_sensitive)
            .dot_matches_new_line(true)
            .build()
            .ok();

        Self {
            source: pattern.to_string(),
            regex,
            literal,
        }
    }

    pub fn matches(&self, candidate: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(candidate),
            None => self.source == candidate,
        }
    }

    /// True when the pattern contains no wildcard
    pub fn is_literal(&self) -> bool {
        self.literal
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// Apply an optional pattern; `None` matches everything
pub fn matches(pattern: Option<&Pattern>, candidate: &str) -> bool {
    pattern.map_or(true, |p| p.matches(candidate))
}
