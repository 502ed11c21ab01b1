//! Markdown + math rendering.
//!
//! [`ContentRenderer::render`] is a pure protect -> convert -> restore
//! pipeline. Typesetting of the restored delimiters is a separate,
//! asynchronous pass driven by the controller (see [`Typesetter`]).

pub mod math;
mod typeset;

pub use typeset::{Typesetter, UnicodeTypesetter};

use std::fmt;

use pulldown_cmark::escape::escape_html;
use pulldown_cmark::{Event, Options, Parser, html};

/// Markup whose untrusted text has been HTML-escaped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SafeMarkup(String);

impl SafeMarkup {
    /// Escape plain text into a single paragraph.
    #[must_use]
    pub fn paragraph(text: &str) -> Self {
        let mut out = String::with_capacity(text.len() + 7);
        out.push_str("<p>");
        let _ = escape_html(&mut out, text);
        out.push_str("</p>");
        Self(out)
    }

    /// Wrap markup produced by this crate's own renderers.
    pub(crate) const fn from_trusted(markup: String) -> Self {
        Self(markup)
    }

    /// Borrow the markup.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take the markup.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SafeMarkup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Converts untrusted markdown with embedded math into [`SafeMarkup`].
#[derive(Debug, Clone, Copy)]
pub struct ContentRenderer {
    options: Options,
}

impl Default for ContentRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentRenderer {
    /// Renderer with GitHub-flavoured extensions (tables, strikethrough,
    /// task lists).
    #[must_use]
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        Self { options }
    }

    /// Render `raw` to markup with `\[...\]` and `\(...\)` math delimiters.
    #[must_use]
    pub fn render(&self, raw: &str) -> SafeMarkup {
        let protected = math::protect(raw);

        // Raw HTML from the model is shown, not interpreted.
        let events = Parser::new_ext(&protected.text, self.options).map(|event| match event {
            Event::Html(html) => Event::Text(html),
            other => other,
        });
        let mut converted = String::with_capacity(protected.text.len() * 3 / 2);
        html::push_html(&mut converted, events);

        SafeMarkup::from_trusted(math::restore(&converted, &protected))
    }
}
