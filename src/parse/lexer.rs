use logos::Logos;
use std::fmt;
use std::ops::Range;

#[derive(Logos, Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TokenKind {
    #[regex(r"[0-9]+")]
    Integer,
    // `dF` is kept whole so fate dice can be followed directly by a modifier (`4dFkh2`)
    #[token("dF")]
    #[regex(r"[a-zA-Z_][a-z_]*")]
    Identifier,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Asterisk,
    #[token("**")]
    DoubleAsterisk,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("=")]
    Equals,
    #[token(">")]
    Greater,
    #[token(">=")]
    GreaterOrEqual,
    #[token("<")]
    Less,
    #[token("<=")]
    LessOrEqual,
    #[token("!")]
    Exclamation,
    #[token("...")]
    Ellipsis,

    #[token("(")]
    ParenthesisOpen,
    #[token(")")]
    ParenthesisClose,
    #[token("{")]
    BraceOpen,
    #[token("}")]
    BraceClose,
    #[token(",")]
    Comma,

    EndOfInput,

    #[regex(r"[ \t\r\n]+", logos::skip)]
    #[error]
    Unknown,
}

impl TokenKind {
    pub const ADDITION_OPS: &'static [Self] = &[Self::Plus, Self::Minus];

    pub const MULTIPLICATION_OPS: &'static [Self] = &[Self::Asterisk, Self::Slash, Self::Percent];

    pub fn as_str(&self) -> &'static str {
        use TokenKind::*;

        match self {
            Integer => "<integer>",
            Identifier => "<identifier>",
            Plus => "'+'",
            Minus => "'-'",
            Asterisk => "'*'",
            DoubleAsterisk => "'**'",
            Slash => "'/'",
            Percent => "'%'",
            Equals => "'='",
            Greater => "'>'",
            GreaterOrEqual => "'>='",
            Less => "'<'",
            LessOrEqual => "'<='",
            Exclamation => "'!'",
            Ellipsis => "'...'",
            ParenthesisOpen => "'('",
            ParenthesisClose => "')'",
            BraceOpen => "'{'",
            BraceClose => "'}'",
            Comma => "','",
            EndOfInput => "<end of input>",
            Unknown => "<unknown>",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub span: Range<usize>,
    pub slice: &'a str,
}

impl<'a> Token<'a> {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    pub fn is_any(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.kind)
    }

    /// `true` for an identifier token spelling exactly `text`.
    pub fn is_ident(&self, text: &str) -> bool {
        self.kind == TokenKind::Identifier && self.slice == text
    }
}

/// One-token lookahead over the logos token stream.
///
/// Once the input is exhausted every further call yields an
/// [`TokenKind::EndOfInput`] token positioned at the end of the source.
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, TokenKind>,
    peeked: Option<Token<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(s: &'a str) -> Self {
        Self {
            inner: TokenKind::lexer(s),
            peeked: None,
        }
    }

    pub fn peek_token(&mut self) -> &Token<'a> {
        let inner = &mut self.inner;
        self.peeked.get_or_insert_with(|| lex(inner))
    }

    pub fn next_token(&mut self) -> Token<'a> {
        match self.peeked.take() {
            Some(token) => token,
            None => lex(&mut self.inner),
        }
    }
}

fn lex<'a>(inner: &mut logos::Lexer<'a, TokenKind>) -> Token<'a> {
    match inner.next() {
        Some(kind) => Token {
            kind,
            span: inner.span(),
            slice: inner.slice(),
        },
        None => {
            let end = inner.source().len();
            Token {
                kind: TokenKind::EndOfInput,
                span: end..end,
                slice: "",
            }
        }
    }
}
