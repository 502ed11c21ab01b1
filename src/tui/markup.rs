//! Rendered markup to terminal text.

use std::sync::LazyLock;

use regex::Regex;

#[expect(clippy::expect_used, reason = "pattern is a literal")]
static TAG_NEWLINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">\n").expect("valid regex"));

#[expect(clippy::expect_used, reason = "pattern is a literal")]
static DISPLAY_MATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)\s*<span class="math-display">(.*?)</span>\s*"#).expect("valid regex")
});

#[expect(clippy::expect_used, reason = "pattern is a literal")]
static BLOCK_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</(p|div|h[1-6]|pre|blockquote|ul|ol|table)>").expect("valid regex")
});

#[expect(clippy::expect_used, reason = "pattern is a literal")]
static LINE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>|</(li|tr)>").expect("valid regex"));

#[expect(clippy::expect_used, reason = "pattern is a literal")]
static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<li[^>]*>").expect("valid regex"));

#[expect(clippy::expect_used, reason = "pattern is a literal")]
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

/// Strip tags and decode entities, keeping one line per block element.
#[must_use]
pub fn to_plain(markup: &str) -> String {
    let text = TAG_NEWLINE.replace_all(markup, ">");
    let text = DISPLAY_MATH.replace_all(&text, "\n$1\n");
    let text = BLOCK_END.replace_all(&text, "\n\n");
    let text = LINE_END.replace_all(&text, "\n");
    let text = LIST_ITEM.replace_all(&text, "\u{2022} ");
    let text = TAG.replace_all(&text, "");
    let decoded = decode_entities(&text);

    let mut lines: Vec<&str> = Vec::new();
    for line in decoded.lines() {
        let blank = line.trim().is_empty();
        if blank && lines.last().is_none_or(|prev| prev.trim().is_empty()) {
            continue;
        }
        lines.push(line.trim_end());
    }
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

fn decode_entities(text: &str) -> String {
    // &amp; last, so "&amp;lt;" stays "&lt;".
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("<p>4</p>\n", "4")]
    #[case("<p>a</p>\n<p>b</p>\n", "a\n\nb")]
    #[case("<p>&lt;script&gt; &amp;amp;</p>", "<script> &amp;")]
    #[case("<ul>\n<li>one</li>\n<li>two</li>\n</ul>\n", "\u{2022} one\n\u{2022} two")]
    #[case("<h2>Title</h2>\n<p><strong>bold</strong></p>\n", "Title\n\nbold")]
    #[case(
        "<p>x <span class=\"math\">x\u{b2}</span></p>",
        "x x\u{b2}"
    )]
    #[case(
        "<p>so <span class=\"math-display\">a \u{d7} b</span> holds</p>\n",
        "so\na \u{d7} b\nholds"
    )]
    fn test_to_plain(#[case] markup: &str, #[case] expected: &str) {
        assert_eq!(to_plain(markup), expected);
    }

    #[test]
    fn test_empty_markup() {
        assert_eq!(to_plain(""), "");
    }
}
