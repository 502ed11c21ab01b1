//! Math typesetting for rendered markup.

use super::SafeMarkup;
use crate::error::TypesetError;

/// Deepest group nesting the TeX parser follows before giving up.
const MAX_NESTING: usize = 128;

/// Typesets the `\(...\)` and `\[...\]` spans of rendered markup.
///
/// Runs off the event thread; a failure leaves the markup untypeset.
pub trait Typesetter: Send + Sync {
    /// Return `markup` with its math spans typeset.
    fn typeset(&self, markup: &SafeMarkup) -> Result<SafeMarkup, TypesetError>;
}

/// Renders common TeX as Unicode text for terminal display.
///
/// Inline spans become `<span class="math">`, display spans become
/// `<span class="math-display">`. Text inside `<code>` and `<pre>` is
/// left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeTypesetter;

impl Typesetter for UnicodeTypesetter {
    fn typeset(&self, markup: &SafeMarkup) -> Result<SafeMarkup, TypesetError> {
        let src = markup.as_str();
        let mut out = String::with_capacity(src.len());
        let mut pos = 0;

        while pos < src.len() {
            let rest = &src[pos..];
            let (text_len, verbatim_end) = next_verbatim(rest).unwrap_or((rest.len(), rest.len()));
            typeset_text(&rest[..text_len], pos, &mut out)?;
            out.push_str(&rest[text_len..verbatim_end]);
            pos += verbatim_end;
        }

        Ok(SafeMarkup::from_trusted(out))
    }
}

/// Start and end of the first `<code>` or `<pre>` element in `s`.
///
/// An element that is never closed runs to the end of `s`.
fn next_verbatim(s: &str) -> Option<(usize, usize)> {
    let code = s.find("<code").map(|at| (at, "</code>"));
    let pre = s.find("<pre").map(|at| (at, "</pre>"));
    let (start, close) = match (code, pre) {
        (Some(c), Some(p)) => {
            if p.0 < c.0 {
                p
            } else {
                c
            }
        }
        (Some(found), None) | (None, Some(found)) => found,
        (None, None) => return None,
    };
    let end = s[start..]
        .find(close)
        .map_or(s.len(), |len| start + len + close.len());
    Some((start, end))
}

/// Typeset the math in `text`, which starts at byte `base` of the markup.
fn typeset_text(text: &str, base: usize, out: &mut String) -> Result<(), TypesetError> {
    let mut pos = 0;
    while let Some((start, display)) = next_opener(&text[pos..]) {
        let open_at = pos + start;
        out.push_str(&text[pos..open_at]);

        let body_start = open_at + 2;
        let close = if display { r"\]" } else { r"\)" };
        let Some(len) = text[body_start..].find(close) else {
            return Err(TypesetError::UnclosedDelimiter {
                offset: base + open_at,
            });
        };
        let rendered = tex_to_unicode(&text[body_start..body_start + len])?;

        if display {
            out.push_str("<span class=\"math-display\">");
            out.push_str(rendered.trim());
        } else {
            out.push_str("<span class=\"math\">");
            out.push_str(&rendered);
        }
        out.push_str("</span>");
        pos = body_start + len + 2;
    }
    out.push_str(&text[pos..]);
    Ok(())
}

fn next_opener(s: &str) -> Option<(usize, bool)> {
    match (s.find(r"\("), s.find(r"\[")) {
        (Some(a), Some(b)) if b < a => Some((b, true)),
        (Some(a), _) => Some((a, false)),
        (None, Some(b)) => Some((b, true)),
        (None, None) => None,
    }
}

/// Convert a TeX fragment to Unicode text.
fn tex_to_unicode(tex: &str) -> Result<String, TypesetError> {
    check_braces(tex)?;
    let mut parser = TexParser {
        chars: tex.char_indices().collect(),
        pos: 0,
        depth: 0,
    };
    parser.sequence(None)
}

fn check_braces(tex: &str) -> Result<(), TypesetError> {
    let mut open: Vec<usize> = Vec::new();
    let mut escaped = false;
    for (offset, c) in tex.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '{' => open.push(offset),
            '}' => {
                if open.pop().is_none() {
                    return Err(TypesetError::UnbalancedBraces { offset });
                }
            }
            _ => {}
        }
    }
    match open.pop() {
        Some(offset) => Err(TypesetError::UnbalancedBraces { offset }),
        None => Ok(()),
    }
}

struct TexParser {
    /// Characters with their byte offsets in the source.
    chars: Vec<(usize, char)>,
    pos: usize,
    depth: usize,
}

impl TexParser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    /// Byte offset of the last consumed character.
    fn offset(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.chars.get(i))
            .map_or(0, |&(offset, _)| offset)
    }

    /// Run `parse` one nesting level deeper.
    fn nested<F>(&mut self, parse: F) -> Result<String, TypesetError>
    where
        F: FnOnce(&mut Self) -> Result<String, TypesetError>,
    {
        if self.depth >= MAX_NESTING {
            return Err(TypesetError::TooDeep {
                offset: self.offset(),
            });
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Render until `end` (exclusive, consumed) or end of input.
    fn sequence(&mut self, end: Option<char>) -> Result<String, TypesetError> {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if Some(c) == end {
                self.pos += 1;
                break;
            }
            self.atom_into(&mut out)?;
        }
        Ok(out)
    }

    fn atom_into(&mut self, out: &mut String) -> Result<(), TypesetError> {
        let Some(c) = self.bump() else {
            return Ok(());
        };
        match c {
            '{' => out.push_str(&self.nested(|p| p.sequence(Some('}')))?),
            '\\' => self.command_into(out)?,
            '^' => {
                let group = self.group()?;
                out.push_str(&scripted(&group, superscript, '^'));
            }
            '_' => {
                let group = self.group()?;
                out.push_str(&scripted(&group, subscript, '_'));
            }
            _ => out.push(c),
        }
        Ok(())
    }

    /// One braced group or a single atom, rendered.
    fn group(&mut self) -> Result<String, TypesetError> {
        self.nested(|p| {
            while p.peek() == Some(' ') {
                p.pos += 1;
            }
            let mut out = String::new();
            p.atom_into(&mut out)?;
            Ok(out)
        })
    }

    fn command_into(&mut self, out: &mut String) -> Result<(), TypesetError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        if self.pos == start {
            match self.bump() {
                Some(',' | ';' | ' ' | '!' | ':' | '\\') => out.push(' '),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
            return Ok(());
        }

        let name: String = self.chars[start..self.pos].iter().map(|&(_, c)| c).collect();
        match name.as_str() {
            "frac" | "dfrac" | "tfrac" => {
                let num = self.group()?;
                let den = self.group()?;
                out.push_str(&parenthesize(&num));
                out.push('/');
                out.push_str(&parenthesize(&den));
            }
            "sqrt" => {
                let radicand = self.group()?;
                out.push('\u{221A}');
                out.push_str(&parenthesize(&radicand));
            }
            "text" | "mathrm" | "mathbf" | "mathit" | "operatorname" => {
                out.push_str(&self.group()?);
            }
            "left" | "right" | "displaystyle" => {}
            _ => match symbol(&name) {
                Some(symbol) => out.push_str(symbol),
                None => {
                    out.push('\\');
                    out.push_str(&name);
                }
            },
        }
        Ok(())
    }
}

fn parenthesize(s: &str) -> String {
    if s.chars().count() <= 1 || s.chars().all(|c| c.is_alphanumeric()) {
        s.to_string()
    } else {
        format!("({s})")
    }
}

fn scripted(group: &str, map: fn(char) -> Option<char>, marker: char) -> String {
    let mapped: Option<String> = group.chars().map(map).collect();
    match mapped {
        Some(mapped) if !mapped.is_empty() => mapped,
        _ if group.chars().count() == 1 => format!("{marker}{group}"),
        _ => format!("{marker}({group})"),
    }
}

const fn superscript(c: char) -> Option<char> {
    Some(match c {
        '0' => '\u{2070}',
        '1' => '\u{00B9}',
        '2' => '\u{00B2}',
        '3' => '\u{00B3}',
        '4' => '\u{2074}',
        '5' => '\u{2075}',
        '6' => '\u{2076}',
        '7' => '\u{2077}',
        '8' => '\u{2078}',
        '9' => '\u{2079}',
        '+' => '\u{207A}',
        '-' | '\u{2212}' => '\u{207B}',
        '=' => '\u{207C}',
        '(' => '\u{207D}',
        ')' => '\u{207E}',
        'i' => '\u{2071}',
        'n' => '\u{207F}',
        _ => return None,
    })
}

const fn subscript(c: char) -> Option<char> {
    Some(match c {
        '0' => '\u{2080}',
        '1' => '\u{2081}',
        '2' => '\u{2082}',
        '3' => '\u{2083}',
        '4' => '\u{2084}',
        '5' => '\u{2085}',
        '6' => '\u{2086}',
        '7' => '\u{2087}',
        '8' => '\u{2088}',
        '9' => '\u{2089}',
        '+' => '\u{208A}',
        '-' | '\u{2212}' => '\u{208B}',
        '=' => '\u{208C}',
        '(' => '\u{208D}',
        ')' => '\u{208E}',
        'a' => '\u{2090}',
        'e' => '\u{2091}',
        'o' => '\u{2092}',
        'x' => '\u{2093}',
        'i' => '\u{1D62}',
        'j' => '\u{2C7C}',
        'n' => '\u{2099}',
        _ => return None,
    })
}

fn symbol(name: &str) -> Option<&'static str> {
    Some(match name {
        "alpha" => "\u{03B1}",
        "beta" => "\u{03B2}",
        "gamma" => "\u{03B3}",
        "delta" => "\u{03B4}",
        "epsilon" | "varepsilon" => "\u{03B5}",
        "theta" => "\u{03B8}",
        "lambda" => "\u{03BB}",
        "mu" => "\u{03BC}",
        "pi" => "\u{03C0}",
        "rho" => "\u{03C1}",
        "sigma" => "\u{03C3}",
        "tau" => "\u{03C4}",
        "phi" | "varphi" => "\u{03C6}",
        "omega" => "\u{03C9}",
        "Gamma" => "\u{0393}",
        "Delta" => "\u{0394}",
        "Theta" => "\u{0398}",
        "Lambda" => "\u{039B}",
        "Pi" => "\u{03A0}",
        "Sigma" => "\u{03A3}",
        "Phi" => "\u{03A6}",
        "Omega" => "\u{03A9}",
        "times" => "\u{00D7}",
        "cdot" => "\u{22C5}",
        "div" => "\u{00F7}",
        "pm" => "\u{00B1}",
        "mp" => "\u{2213}",
        "le" | "leq" => "\u{2264}",
        "ge" | "geq" => "\u{2265}",
        "ne" | "neq" => "\u{2260}",
        "approx" => "\u{2248}",
        "equiv" => "\u{2261}",
        "infty" => "\u{221E}",
        "sum" => "\u{2211}",
        "prod" => "\u{220F}",
        "int" => "\u{222B}",
        "partial" => "\u{2202}",
        "nabla" => "\u{2207}",
        "to" | "rightarrow" => "\u{2192}",
        "leftarrow" => "\u{2190}",
        "Rightarrow" | "implies" => "\u{21D2}",
        "iff" | "Leftrightarrow" => "\u{21D4}",
        "in" => "\u{2208}",
        "notin" => "\u{2209}",
        "subset" => "\u{2282}",
        "cup" => "\u{222A}",
        "cap" => "\u{2229}",
        "forall" => "\u{2200}",
        "exists" => "\u{2203}",
        "ldots" | "dots" => "\u{2026}",
        "cdots" => "\u{22EF}",
        "quad" | "qquad" => "  ",
        _ => return None,
    })
}
