//! Lexer for Forge script
//!
//! Tokenizes source code into a stream of spanned tokens.

use logos::Logos;
use crate::error::{Error, Result};

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*[^/])*\*/")]
pub enum Token {
    // Keywords
    #[token("fn")]
    Fn,
    #[token("async")]
    Async,
    #[token("await")]
    Await,
    #[token("let")]
    Let,
    #[token("return")]
    Return,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("loop")]
    Loop,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("none")]
    None,

    // Identifiers
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    // Literals
    #[regex(r"[0-9]+", |lex| lex.slice().parse().ok())]
    Int(i64),

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse().ok())]
    Float(f64),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        unescape(&s[1..s.len() - 1])
    })]
    String(String),

    /// A string literal that runs into end of input. Never reaches the parser.
    #[regex(r#""([^"\\]|\\.)*"#)]
    UnterminatedString,

    // Operators
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,

    #[token("==")]
    EqEq,
    #[token("!=")]
    Ne,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,

    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("!")]
    Bang,

    // Delimiters
    #[token("=")]
    Eq,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
}

/// Resolve backslash escapes inside a string literal body.
fn unescape(body: &str) -> Option<String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            _ => return None,
        }
    }
    Some(out)
}

/// Source location span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub col: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, col: usize) -> Self {
        Self { start, end, line, col }
    }

    pub fn dummy() -> Self {
        Self { start: 0, end: 0, line: 0, col: 0 }
    }

    /// Merge two spans into one that covers both
    pub fn merge(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line: self.line.min(other.line),
            col: if self.line <= other.line { self.col } else { other.col },
        }
    }
}

/// Token with source location
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

pub struct Lexer<'src> {
    source: &'src str,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self { source }
    }

    /// Tokenize returning tokens without spans
    pub fn tokenize(&self) -> Result<Vec<Token>> {
        Ok(self.tokenize_with_spans()?.into_iter().map(|st| st.token).collect())
    }

    /// Tokenize returning tokens with source spans
    pub fn tokenize_with_spans(&self) -> Result<Vec<SpannedToken>> {
        let mut tokens = Vec::new();
        let mut lex = Token::lexer(self.source);

        // Pre-compute line starts for fast line/col lookup
        let line_starts: Vec<usize> = std::iter::once(0)
            .chain(self.source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();

        while let Some(token) = lex.next() {
            let byte_span = lex.span();
            let (line, col) = offset_to_line_col(&line_starts, byte_span.start);

            match token {
                Ok(Token::UnterminatedString) => {
                    return Err(Error::LexError {
                        message: "unterminated string literal".to_string(),
                        line,
                        col,
                    });
                }
                Ok(tok) => {
                    tokens.push(SpannedToken {
                        token: tok,
                        span: Span::new(byte_span.start, byte_span.end, line, col),
                    });
                }
                Err(_) => {
                    return Err(Error::LexError {
                        message: format!("unexpected input: '{}'", &self.source[byte_span]),
                        line,
                        col,
                    });
                }
            }
        }

        Ok(tokens)
    }
}

/// Convert byte offset to line and column (1-indexed)
fn offset_to_line_col(line_starts: &[usize], offset: usize) -> (usize, usize) {
    let line = line_starts.partition_point(|&start| start <= offset);
    let line_start = line_starts.get(line.saturating_sub(1)).copied().unwrap_or(0);
    (line, offset - line_start + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords() {
        let source = "fn async await let return if else while loop break continue none";
        let tokens = Lexer::new(source).tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Fn,
                Token::Async,
                Token::Await,
                Token::Let,
                Token::Return,
                Token::If,
                Token::Else,
                Token::While,
                Token::Loop,
                Token::Break,
                Token::Continue,
                Token::None,
            ]
        );
    }

    #[test]
    fn test_identifiers() {
        let source = "input __forge_main__ x123 awaiting";
        let tokens = Lexer::new(source).tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("input".to_string()),
                Token::Ident("__forge_main__".to_string()),
                Token::Ident("x123".to_string()),
                Token::Ident("awaiting".to_string()),
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let source = "42 3.14 2.5e-3";
        let tokens = Lexer::new(source).tokenize().unwrap();
        assert_eq!(tokens, vec![Token::Int(42), Token::Float(3.14), Token::Float(2.5e-3)]);
    }

    #[test]
    fn test_negative_number_is_two_tokens() {
        let tokens = Lexer::new("-7").tokenize().unwrap();
        assert_eq!(tokens, vec![Token::Minus, Token::Int(7)]);
    }

    #[test]
    fn test_operators() {
        let source = "+ - * / % == != < <= > >= && || ! =";
        let tokens = Lexer::new(source).tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Plus,
                Token::Minus,
                Token::Star,
                Token::Slash,
                Token::Percent,
                Token::EqEq,
                Token::Ne,
                Token::Lt,
                Token::Le,
                Token::Gt,
                Token::Ge,
                Token::AndAnd,
                Token::OrOr,
                Token::Bang,
                Token::Eq,
            ]
        );
    }

    #[test]
    fn test_comments() {
        let source = r#"
            // Line comment
            let x = 42; /* inline */
        "#;
        let tokens = Lexer::new(source).tokenize().unwrap();
        assert_eq!(tokens.len(), 5);
        assert!(!tokens.iter().any(|t| matches!(t, Token::Ident(s) if s.contains("comment"))));
    }

    #[test]
    fn test_string_escapes() {
        let source = r#""hello" "tab\there" "say \"hi\"""#;
        let tokens = Lexer::new(source).tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::String("hello".to_string()),
                Token::String("tab\there".to_string()),
                Token::String("say \"hi\"".to_string()),
            ]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let err = Lexer::new("print(\"oops);").tokenize().unwrap_err();
        match err {
            Error::LexError { message, line, col } => {
                assert!(message.contains("unterminated"));
                assert_eq!((line, col), (1, 7));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_spans_track_lines() {
        let tokens = Lexer::new("let a = 1;\nlet b = 2;").tokenize_with_spans().unwrap();
        let b = tokens.iter().find(|t| t.token == Token::Ident("b".to_string())).unwrap();
        assert_eq!((b.span.line, b.span.col), (2, 5));
    }
}
