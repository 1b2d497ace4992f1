use crate::language::{
    span::Span,
    token::{Token, TokenKind},
};
use nom::{
    IResult, Parser as NomParser,
    branch::alt,
    bytes::complete::{is_not, tag, take_till, take_until},
    character::complete::{alpha1, alphanumeric1, anychar, char, digit1, multispace1},
    combinator::{map, map_res, opt, recognize, value},
    multi::{fold_many0, many0_count},
    sequence::{delimited, pair, preceded},
};

#[derive(Debug)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

pub fn lex(source: &str) -> Result<Vec<Token>, Vec<LexError>> {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    let mut rest = source;

    while !rest.is_empty() {
        let offset = source.len() - rest.len();
        if let Ok((remaining, ())) = trivia(rest) {
            rest = remaining;
            continue;
        }
        if rest.starts_with("/*") {
            errors.push(LexError {
                message: "Unterminated block comment".into(),
                span: Span::new(offset, offset + 2),
            });
            break;
        }

        match token_kind(rest) {
            Ok((remaining, kind)) => {
                let end = source.len() - remaining.len();
                tokens.push(Token {
                    kind,
                    span: Span::new(offset, end),
                });
                rest = remaining;
            }
            Err(_) if rest.starts_with(['"', '\'']) => {
                let line_len = rest.find('\n').unwrap_or(rest.len());
                errors.push(LexError {
                    message: "Unterminated string literal".into(),
                    span: Span::new(offset, offset + line_len),
                });
                rest = &rest[line_len..];
            }
            Err(_) => {
                let ch = rest.chars().next().unwrap_or_default();
                errors.push(LexError {
                    message: format!("Unexpected character `{ch}`"),
                    span: Span::new(offset, offset + ch.len_utf8()),
                });
                rest = &rest[ch.len_utf8()..];
            }
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span::new(source.len(), source.len()),
    });

    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}

fn trivia(input: &str) -> IResult<&str, ()> {
    alt((
        value((), multispace1),
        value((), pair(tag("//"), take_till(|ch: char| ch == '\n' || ch == '\r'))),
        value((), delimited(tag("/*"), take_until("*/"), tag("*/"))),
    ))
    .parse(input)
}

fn token_kind(input: &str) -> IResult<&str, TokenKind> {
    alt((identifier, number, string_literal, punctuation)).parse(input)
}

fn identifier(input: &str) -> IResult<&str, TokenKind> {
    let (input, ident) = recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))
    .parse(input)?;
    let kind = TokenKind::keyword(ident).unwrap_or_else(|| TokenKind::Identifier(ident.into()));
    Ok((input, kind))
}

fn number(input: &str) -> IResult<&str, TokenKind> {
    map_res(
        recognize(pair(digit1, opt(pair(char('.'), digit1)))),
        |digits: &str| digits.parse::<f64>().map(TokenKind::Number),
    )
    .parse(input)
}

fn string_literal(input: &str) -> IResult<&str, TokenKind> {
    alt((quoted('"'), quoted('\''))).parse(input)
}

fn quoted<'a>(quote: char) -> impl FnMut(&'a str) -> IResult<&'a str, TokenKind> {
    move |input: &'a str| {
        let stop = if quote == '"' { "\"\\\n" } else { "'\\\n" };
        let body = fold_many0(
            alt((
                map(is_not(stop), |chunk: &'a str| chunk.to_string()),
                map(preceded(char('\\'), anychar), |escaped: char| {
                    unescape(escaped).to_string()
                }),
            )),
            String::new,
            |mut text: String, piece: String| {
                text.push_str(&piece);
                text
            },
        );
        map(delimited(char(quote), body, char(quote)), TokenKind::String).parse(input)
    }
}

fn unescape(ch: char) -> char {
    match ch {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        other => other,
    }
}

fn punctuation(input: &str) -> IResult<&str, TokenKind> {
    alt((
        value(TokenKind::LParen, char('(')),
        value(TokenKind::RParen, char(')')),
        value(TokenKind::LBrace, char('{')),
        value(TokenKind::RBrace, char('}')),
        value(TokenKind::Dot, char('.')),
        value(TokenKind::Comma, char(',')),
        value(TokenKind::Semicolon, char(';')),
        value(TokenKind::Eq, char('=')),
        value(TokenKind::Plus, char('+')),
    ))
    .parse(input)
}
