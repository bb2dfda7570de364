// src/codegen/writer.rs
// Token pieces and the printer that lays them out as indented source lines.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    Token(String),
    /// Prefix operator; never followed by a space.
    Prefix(String),
    /// Postfix operator; never preceded by a space.
    Suffix(String),
    /// A whole preprocessor line, always alone at column 0.
    Directive(String),
}

impl Piece {
    pub fn token(s: impl Into<String>) -> Self {
        Piece::Token(s.into())
    }
}

const INDENT: &str = "    ";

/// Lays out pieces one statement per line with brace-based indentation.
pub fn render(pieces: &[Piece]) -> String {
    let mut w = Writer::default();
    for p in pieces {
        match p {
            Piece::Token(t) => w.token(t, false, false),
            Piece::Prefix(t) => w.token(t, true, false),
            Piece::Suffix(t) => w.token(t, false, true),
            Piece::Directive(line) => w.directive(line),
        }
    }
    w.finish()
}

#[derive(Default)]
struct Writer {
    lines: Vec<String>,
    cur: String,
    /// Last token on the current line and whether it was a prefix operator.
    prev: Option<(String, bool)>,
    indent: usize,
    parens: usize,
    after_close: bool,
}

impl Writer {
    fn flush(&mut self) {
        let line = std::mem::take(&mut self.cur);
        if !line.trim().is_empty() {
            self.lines.push(format!("{}{}", INDENT.repeat(self.indent), line.trim_end()));
        }
        self.prev = None;
        self.after_close = false;
    }

    fn token(&mut self, text: &str, prefix: bool, suffix: bool) {
        if self.after_close {
            self.after_close = false;
            if !matches!(text, ";" | "else" | "while") {
                self.flush();
            }
        }
        if text == "}" {
            self.flush();
            self.indent = self.indent.saturating_sub(1);
        }

        if let Some((prev, prev_prefix)) = &self.prev {
            if needs_space(prev, *prev_prefix, text, suffix) {
                self.cur.push(' ');
            }
        }
        self.cur.push_str(text);
        self.prev = Some((text.to_string(), prefix));

        match text {
            "(" | "[" => self.parens += 1,
            ")" | "]" => self.parens = self.parens.saturating_sub(1),
            ";" if self.parens == 0 => self.flush(),
            "{" => {
                self.flush();
                self.indent += 1;
            }
            "}" => self.after_close = true,
            _ => {}
        }
    }

    fn directive(&mut self, line: &str) {
        self.flush();
        self.lines.push(line.trim().to_string());
    }

    fn finish(mut self) -> String {
        self.flush();
        self.lines.join("\n")
    }
}

fn is_word(s: &str) -> bool {
    s.chars().last().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn needs_space(prev: &str, prev_prefix: bool, next: &str, next_suffix: bool) -> bool {
    if prev_prefix {
        // `- -x` must not collapse into `--x`
        let (a, b) = (prev.chars().last(), next.chars().next());
        return a == b && matches!(a, Some('-' | '+'));
    }
    if next_suffix || matches!(next, "," | ";" | ")" | "]" | ".") {
        return false;
    }
    if matches!(prev, "(" | "[" | ".") {
        return false;
    }
    if matches!(next, "(" | "[") {
        if matches!(prev, "if" | "for" | "while" | "return") {
            return true;
        }
        return !(is_word(prev) || prev == ")" || prev == "]");
    }
    true
}
