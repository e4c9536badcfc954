// Copyright (c) The suite-monitor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! General support code for suite-monitor-runner.

use std::fmt;

/// Utilities for pluralizing various words based on count.
pub mod plural {
    /// Returns "test" if `count` is 1, otherwise "tests".
    pub fn tests_str(count: usize) -> &'static str {
        if count == 1 { "test" } else { "tests" }
    }

    /// Returns "attempt" if `count` is 1, otherwise "attempts".
    pub fn attempts_str(count: usize) -> &'static str {
        if count == 1 { "attempt" } else { "attempts" }
    }
}

/// A table cell holding `content`, exactly `width` characters wide.
///
/// Content longer than `width` is cut to `width - 3` characters and ends with `...`. Shorter
/// content is padded with spaces on the right. Widths are counted in characters.
pub(crate) struct Cell<'a> {
    content: &'a str,
    width: usize,
}

impl<'a> Cell<'a> {
    pub(crate) fn new(content: &'a str, width: usize) -> Self {
        Self { content, width }
    }
}

impl fmt::Display for Cell<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let char_count = self.content.chars().count();
        if char_count > self.width {
            let keep = self.width.saturating_sub(3);
            let truncated: String = self.content.chars().take(keep).collect();
            write!(f, "{truncated}...")
        } else {
            write!(f, "{}{:pad$}", self.content, "", pad = self.width - char_count)
        }
    }
}
