//! Math protection around the markdown pass.
//!
//! Display spans (`\[...\]`) are lifted out first, then inline spans
//! (`$...$`). Each lifted span leaves behind a sentinel holding its index
//! into the side table, so the markdown converter never sees math source.

use std::fmt::Write as _;
use std::sync::LazyLock;

use pulldown_cmark::escape::escape_html;
use regex::{Captures, Regex};

/// Opens a display-math sentinel.
pub const DISPLAY_OPEN: char = '\u{E000}';
/// Closes a display-math sentinel.
pub const DISPLAY_CLOSE: char = '\u{E001}';
/// Opens an inline-math sentinel.
pub const INLINE_OPEN: char = '\u{E002}';
/// Closes an inline-math sentinel.
pub const INLINE_CLOSE: char = '\u{E003}';

#[expect(clippy::expect_used, reason = "pattern is a literal")]
static DISPLAY_MATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\\\[(.*?)\\\]").expect("display math pattern"));

#[expect(clippy::expect_used, reason = "pattern is a literal")]
static INLINE_MATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$([^\n\x{E000}-\x{E003}]+?)\$").expect("inline math pattern")
});

#[expect(clippy::expect_used, reason = "pattern is a literal")]
static DISPLAY_SENTINEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x{E000}([0-9]+)\x{E001}").expect("display sentinel pattern")
});

#[expect(clippy::expect_used, reason = "pattern is a literal")]
static INLINE_SENTINEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x{E002}([0-9]+)\x{E003}").expect("inline sentinel pattern")
});

const fn is_sentinel(c: char) -> bool {
    matches!(c, DISPLAY_OPEN | DISPLAY_CLOSE | INLINE_OPEN | INLINE_CLOSE)
}

/// Text with math lifted out, plus the lifted spans.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Protected {
    /// Input with every math span replaced by a sentinel.
    pub text: String,
    /// Inner content of display spans, by sentinel index.
    pub display: Vec<String>,
    /// Inner content of inline spans, by sentinel index.
    pub inline: Vec<String>,
}

/// Lift display math, then inline math, out of `raw`.
#[must_use]
pub fn protect(raw: &str) -> Protected {
    let cleaned: String = raw.chars().filter(|&c| !is_sentinel(c)).collect();

    let mut display = Vec::new();
    let text = DISPLAY_MATH
        .replace_all(&cleaned, |caps: &Captures<'_>| {
            display.push(caps[1].to_string());
            format!("{DISPLAY_OPEN}{}{DISPLAY_CLOSE}", display.len() - 1)
        })
        .into_owned();

    let mut inline = Vec::new();
    let text = protect_inline(&text, &mut inline);

    Protected {
        text,
        display,
        inline,
    }
}

fn protect_inline(text: &str, inline: &mut Vec<String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in INLINE_MATH.captures_iter(text) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let before = text[..whole.start()].chars().next_back();
        let after = text[whole.end()..].chars().next();
        if before.is_some_and(is_sentinel) || after.is_some_and(is_sentinel) {
            continue;
        }

        out.push_str(&text[last..whole.start()]);
        inline.push(inner.as_str().to_string());
        let _ = write!(out, "{INLINE_OPEN}{}{INLINE_CLOSE}", inline.len() - 1);
        last = whole.end();
    }

    out.push_str(&text[last..]);
    out
}

/// Put math back into converted markup as `\[...\]` and `\(...\)`.
///
/// Inner content is HTML-escaped on the way back in.
#[must_use]
pub fn restore(markup: &str, protected: &Protected) -> String {
    let markup = DISPLAY_SENTINEL.replace_all(markup, |caps: &Captures<'_>| {
        delimited(r"\[", lookup(&protected.display, &caps[1]), r"\]")
    });
    INLINE_SENTINEL
        .replace_all(&markup, |caps: &Captures<'_>| {
            delimited(r"\(", lookup(&protected.inline, &caps[1]), r"\)")
        })
        .into_owned()
}

fn lookup<'a>(table: &'a [String], index: &str) -> &'a str {
    index
        .parse::<usize>()
        .ok()
        .and_then(|i| table.get(i))
        .map_or("", String::as_str)
}

fn delimited(open: &str, inner: &str, close: &str) -> String {
    let mut out = String::with_capacity(inner.len() + open.len() + close.len());
    out.push_str(open);
    // Writing into a String cannot fail.
    let _ = escape_html(&mut out, inner);
    out.push_str(close);
    out
}
