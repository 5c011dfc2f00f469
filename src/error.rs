use ariadne::{Color, Fmt, Label, Report, ReportKind, Source};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn single(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos + 1,
        }
    }

    /// Join two spans into one covering both.
    pub fn to(self, other: Span) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    // ariadne counts characters, our tokens count bytes.
    fn char_range(&self, source: &str) -> std::ops::Range<usize> {
        let clamp = |offset: usize| {
            let mut offset = offset.min(source.len());
            while !source.is_char_boundary(offset) {
                offset -= 1;
            }
            source[..offset].chars().count()
        };
        let start = clamp(self.start);
        let end = clamp(self.end).max(start);
        start..end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lex { character: char },
    Syntax,
    Eval,
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LilithError {
    pub kind: ErrorKind,
    pub span: Span,
    pub message: String,
    pub help: Option<String>,
}

impl LilithError {
    pub fn new(kind: ErrorKind, span: Span, message: String) -> Self {
        Self {
            kind,
            span,
            message,
            help: None,
        }
    }

    pub fn new_with_help(kind: ErrorKind, span: Span, message: String, help: String) -> Self {
        Self {
            kind,
            span,
            message,
            help: Some(help),
        }
    }

    pub fn lex_error(character: char, pos: usize, message: String) -> Self {
        let span = Span::new(pos, pos + character.len_utf8());
        Self::new(ErrorKind::Lex { character }, span, message)
    }

    pub fn syntax_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::Syntax, span, message)
    }

    pub fn syntax_error_with_help(span: Span, message: String, help: String) -> Self {
        Self::new_with_help(ErrorKind::Syntax, span, message, help)
    }

    pub fn eval_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::Eval, span, message)
    }

    pub fn eval_error_with_help(span: Span, message: String, help: String) -> Self {
        Self::new_with_help(ErrorKind::Eval, span, message, help)
    }

    pub fn is_lex(&self) -> bool {
        matches!(self.kind, ErrorKind::Lex { .. })
    }

    pub fn is_syntax(&self) -> bool {
        self.kind == ErrorKind::Syntax
    }

    pub fn is_eval(&self) -> bool {
        self.kind == ErrorKind::Eval
    }

    pub fn report(&self, source: &str, filename: Option<&str>) {
        let filename = filename.unwrap_or("<repl>");

        let color = match self.kind {
            ErrorKind::Lex { .. } => Color::Red,
            ErrorKind::Syntax => Color::Yellow,
            ErrorKind::Eval => Color::Magenta,
        };

        let kind_str = match self.kind {
            ErrorKind::Lex { .. } => "Lexical Error",
            ErrorKind::Syntax => "Syntax Error",
            ErrorKind::Eval => "Evaluation Error",
        };

        let range = self.span.char_range(source);
        let mut report_builder = Report::build(ReportKind::Error, filename, range.start)
            .with_message(format!("{}: {}", kind_str.fg(color), self.message))
            .with_label(
                Label::new((filename, range))
                    .with_message(&self.message)
                    .with_color(color),
            );

        if let Some(ref help_text) = self.help {
            report_builder =
                report_builder.with_note(format!("{}: {}", "help".fg(Color::Cyan), help_text));
        }

        if let Err(error) = report_builder
            .finish()
            .eprint((filename, Source::from(source)))
        {
            eprintln!("{}: {} (could not render diagnostic: {})", kind_str, self.message, error);
        }
    }
}
