//! Console markup.
//!
//! Messages may carry inline style tags such as `[bold red]failed[/]`.
//! The console sink renders them as terminal styles; the file sink strips
//! them so the log stays plain text.
//!
//! A tag is `[` + content + `]` where the content starts with a lowercase
//! ASCII letter, `#`, `/` or `@` and contains no `[`. Anything else, e.g.
//! `[1, 2]` or `[INFO]`, is ordinary text. An odd number of backslashes
//! before a tag escapes it.

use colored::{Color, Colorize};
use std::borrow::Cow;

#[derive(Debug, PartialEq)]
enum Token<'a> {
    Text(String),
    Open(&'a str),
    Close(Option<&'a str>),
}

/// Byte index of the `]` ending a tag opened at `open`, if it is one.
fn tag_end(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let first = *bytes.get(open + 1)?;
    if !(first.is_ascii_lowercase() || matches!(first, b'#' | b'/' | b'@')) {
        return None;
    }
    for (i, &b) in bytes.iter().enumerate().skip(open + 1) {
        match b {
            b']' => return Some(i),
            b'[' => return None,
            _ => {}
        }
    }
    None
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut pending = String::new();
    let mut text_start = 0;
    let mut pos = 0;

    while let Some(offset) = text[pos..].find('[') {
        let open = pos + offset;
        let Some(close) = tag_end(text, open) else {
            pos = open + 1;
            continue;
        };

        let mut slashes = 0;
        while open - slashes > text_start && bytes[open - slashes - 1] == b'\\' {
            slashes += 1;
        }

        pending.push_str(&text[text_start..open - slashes]);
        pending.extend(std::iter::repeat('\\').take(slashes / 2));

        if slashes % 2 == 1 {
            pending.push_str(&text[open..=close]);
        } else {
            if !pending.is_empty() {
                tokens.push(Token::Text(std::mem::take(&mut pending)));
            }
            let content = &text[open + 1..close];
            match content.strip_prefix('/') {
                Some(name) => {
                    let name = name.trim();
                    tokens.push(Token::Close((!name.is_empty()).then_some(name)));
                }
                None => tokens.push(Token::Open(content.trim())),
            }
        }

        pos = close + 1;
        text_start = pos;
    }

    pending.push_str(&text[text_start..]);
    if !pending.is_empty() {
        tokens.push(Token::Text(pending));
    }
    tokens
}

/// Removes all markup tags, keeping the text between them.
pub fn strip(text: &str) -> Cow<'_, str> {
    if !text.contains('[') {
        return Cow::Borrowed(text);
    }
    let plain: String = tokenize(text)
        .into_iter()
        .filter_map(|token| match token {
            Token::Text(s) => Some(s),
            _ => None,
        })
        .collect();
    Cow::Owned(plain)
}

/// Text attributes accumulated from open tags.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Style {
    fg: Option<Color>,
    bg: Option<Color>,
    bold: Option<bool>,
    dim: Option<bool>,
    italic: Option<bool>,
    underline: Option<bool>,
    strike: Option<bool>,
    reverse: Option<bool>,
    blink: Option<bool>,
}

impl Style {
    /// Later styles override earlier ones attribute by attribute.
    fn merge(self, over: Style) -> Style {
        Style {
            fg: over.fg.or(self.fg),
            bg: over.bg.or(self.bg),
            bold: over.bold.or(self.bold),
            dim: over.dim.or(self.dim),
            italic: over.italic.or(self.italic),
            underline: over.underline.or(self.underline),
            strike: over.strike.or(self.strike),
            reverse: over.reverse.or(self.reverse),
            blink: over.blink.or(self.blink),
        }
    }

    fn attr_mut(&mut self, attr: Attr) -> &mut Option<bool> {
        match attr {
            Attr::Bold => &mut self.bold,
            Attr::Dim => &mut self.dim,
            Attr::Italic => &mut self.italic,
            Attr::Underline => &mut self.underline,
            Attr::Strike => &mut self.strike,
            Attr::Reverse => &mut self.reverse,
            Attr::Blink => &mut self.blink,
        }
    }

    fn parse(definition: &str) -> Style {
        let mut style = Style::default();
        let mut words = definition.split_whitespace();
        while let Some(word) = words.next() {
            match word {
                "on" => style.bg = words.next().and_then(parse_color),
                "not" => {
                    if let Some(attr) = words.next().and_then(attr_name) {
                        *style.attr_mut(attr) = Some(false);
                    }
                }
                w if w.contains('=') => {}
                w => {
                    if let Some(attr) = attr_name(w) {
                        *style.attr_mut(attr) = Some(true);
                    } else if let Some(color) = parse_color(w) {
                        style.fg = Some(color);
                    }
                }
            }
        }
        style
    }

    fn apply(&self, text: &str) -> String {
        let mut s = text.normal();
        if let Some(color) = self.fg {
            s = s.color(color);
        }
        if let Some(color) = self.bg {
            s = s.on_color(color);
        }
        if self.bold == Some(true) {
            s = s.bold();
        }
        if self.dim == Some(true) {
            s = s.dimmed();
        }
        if self.italic == Some(true) {
            s = s.italic();
        }
        if self.underline == Some(true) {
            s = s.underline();
        }
        if self.strike == Some(true) {
            s = s.strikethrough();
        }
        if self.reverse == Some(true) {
            s = s.reversed();
        }
        if self.blink == Some(true) {
            s = s.blink();
        }
        s.to_string()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Attr {
    Bold,
    Dim,
    Italic,
    Underline,
    Strike,
    Reverse,
    Blink,
}

fn attr_name(word: &str) -> Option<Attr> {
    match word {
        "bold" | "b" => Some(Attr::Bold),
        "dim" | "d" => Some(Attr::Dim),
        "italic" | "i" => Some(Attr::Italic),
        "underline" | "u" => Some(Attr::Underline),
        "strike" | "s" => Some(Attr::Strike),
        "reverse" | "r" => Some(Attr::Reverse),
        "blink" => Some(Attr::Blink),
        _ => None,
    }
}

fn parse_color(name: &str) -> Option<Color> {
    if let Some(hex) = name.strip_prefix('#') {
        if hex.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        return Some(Color::TrueColor {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        });
    }
    name.replace('_', " ").parse::<Color>().ok()
}

/// Renders markup tags as ANSI terminal styles.
///
/// `[/name]` closes the most recent `[name]`, `[/]` closes the most recent
/// tag. Unknown style words are ignored, as are closing tags that match
/// nothing.
pub fn render(text: &str) -> String {
    if !text.contains('[') {
        return text.to_string();
    }

    let mut stack: Vec<(&str, Style)> = Vec::new();
    let mut out = String::with_capacity(text.len());

    for token in tokenize(text) {
        match token {
            Token::Text(s) => {
                let style = stack
                    .iter()
                    .fold(Style::default(), |acc, (_, style)| acc.merge(*style));
                if style == Style::default() {
                    out.push_str(&s);
                } else {
                    out.push_str(&style.apply(&s));
                }
            }
            Token::Open(definition) => stack.push((definition, Style::parse(definition))),
            Token::Close(None) => {
                stack.pop();
            }
            Token::Close(Some(name)) => {
                if let Some(i) = stack.iter().rposition(|(open, _)| *open == name) {
                    stack.remove(i);
                }
            }
        }
    }
    out
}
