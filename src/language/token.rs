use crate::language::span::Span;

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    Number(f64),
    String(String),

    Function,
    Let,
    New,
    Return,
    This,
    Null,
    Undefined,
    True,
    False,

    LParen,
    RParen,
    LBrace,
    RBrace,
    Dot,
    Comma,
    Semicolon,
    Eq,
    Plus,

    Eof,
}

impl TokenKind {
    pub fn keyword(ident: &str) -> Option<TokenKind> {
        let kind = match ident {
            "function" => TokenKind::Function,
            "let" => TokenKind::Let,
            "new" => TokenKind::New,
            "return" => TokenKind::Return,
            "this" => TokenKind::This,
            "null" => TokenKind::Null,
            "undefined" => TokenKind::Undefined,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            _ => return None,
        };
        Some(kind)
    }

    pub fn keyword_text(&self) -> Option<&'static str> {
        let text = match self {
            TokenKind::Function => "function",
            TokenKind::Let => "let",
            TokenKind::New => "new",
            TokenKind::Return => "return",
            TokenKind::This => "this",
            TokenKind::Null => "null",
            TokenKind::Undefined => "undefined",
            TokenKind::True => "true",
            TokenKind::False => "false",
            _ => return None,
        };
        Some(text)
    }

    pub fn describe(&self) -> String {
        if let Some(word) = self.keyword_text() {
            return format!("`{word}`");
        }
        match self {
            TokenKind::Identifier(name) => format!("identifier `{name}`"),
            TokenKind::Number(value) => format!("number `{value}`"),
            TokenKind::String(_) => "string literal".to_string(),
            TokenKind::LParen => "`(`".to_string(),
            TokenKind::RParen => "`)`".to_string(),
            TokenKind::LBrace => "`{`".to_string(),
            TokenKind::RBrace => "`}`".to_string(),
            TokenKind::Dot => "`.`".to_string(),
            TokenKind::Comma => "`,`".to_string(),
            TokenKind::Semicolon => "`;`".to_string(),
            TokenKind::Eq => "`=`".to_string(),
            TokenKind::Plus => "`+`".to_string(),
            TokenKind::Eof => "end of input".to_string(),
            _ => unreachable!("keywords are described above"),
        }
    }
}
