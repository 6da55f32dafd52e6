//! Tokeniser for the vSQL expression grammar (`spec.md` §6.1).
//!
//! Produces a flat `Vec<Token>` up front rather than streaming, since vSQL
//! expressions are short (a single `select`/`where`/`orderby` argument, not
//! a whole program) -- in the idiom of the teacher's `Lexer`, but simpler:
//! no peek buffer, since the parser below indexes the token vector directly.

use crate::error::{Error, Result, Span};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    None,
    True,
    False,
    And,
    Or,
    Not,
    In,
    Is,
    If,
    Else,
    Ident(String),
    Int(i64),
    Number(f64),
    Str(String),
    Color(u8, u8, u8, u8),
    Date(i32, u32, u32),
    DateTime(i32, u32, u32, u32, u32, u32),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Dot,
    Colon,
    Plus,
    Minus,
    Star,
    Slash,
    SlashSlash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Shl,
    Shr,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Assign,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Human-readable token label, for `ErrorKind::UnexpectedToken` messages.
impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(s) => format!("identifier '{}'", s),
            TokenKind::Int(v) => format!("integer '{}'", v),
            TokenKind::Str(s) => format!("string '{}'", s),
            TokenKind::Eof => "end of input".to_string(),
            other => format!("{:?}", other),
        }
    }
}

pub struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let start = self.pos;
            if self.pos >= self.bytes.len() {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    span: Span::empty(start),
                });
                break;
            }
            let kind = self.next_token()?;
            tokens.push(Token {
                kind,
                span: Span::new(start, self.pos),
            });
        }
        Ok(tokens)
    }

    fn peek_byte(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_byte_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek_byte(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn next_token(&mut self) -> Result<TokenKind> {
        let start = self.pos;
        let b = self.bytes[self.pos];
        match b {
            b'(' => {
                self.pos += 1;
                Ok(TokenKind::LParen)
            }
            b')' => {
                self.pos += 1;
                Ok(TokenKind::RParen)
            }
            b'[' => {
                self.pos += 1;
                Ok(TokenKind::LBracket)
            }
            b']' => {
                self.pos += 1;
                Ok(TokenKind::RBracket)
            }
            b'{' => {
                self.pos += 1;
                Ok(TokenKind::LBrace)
            }
            b'}' => {
                self.pos += 1;
                Ok(TokenKind::RBrace)
            }
            b',' => {
                self.pos += 1;
                Ok(TokenKind::Comma)
            }
            b'.' if !matches!(self.peek_byte_at(1), Some(d) if d.is_ascii_digit()) => {
                self.pos += 1;
                Ok(TokenKind::Dot)
            }
            b':' => {
                self.pos += 1;
                Ok(TokenKind::Colon)
            }
            b'+' => {
                self.pos += 1;
                Ok(TokenKind::Plus)
            }
            b'-' => {
                self.pos += 1;
                Ok(TokenKind::Minus)
            }
            b'*' => {
                self.pos += 1;
                Ok(TokenKind::Star)
            }
            b'/' => {
                self.pos += 1;
                if self.peek_byte() == Some(b'/') {
                    self.pos += 1;
                    Ok(TokenKind::SlashSlash)
                } else {
                    Ok(TokenKind::Slash)
                }
            }
            b'%' => {
                self.pos += 1;
                Ok(TokenKind::Percent)
            }
            b'&' => {
                self.pos += 1;
                Ok(TokenKind::Amp)
            }
            b'|' => {
                self.pos += 1;
                Ok(TokenKind::Pipe)
            }
            b'^' => {
                self.pos += 1;
                Ok(TokenKind::Caret)
            }
            b'~' => {
                self.pos += 1;
                Ok(TokenKind::Tilde)
            }
            b'<' => {
                self.pos += 1;
                if self.peek_byte() == Some(b'<') {
                    self.pos += 1;
                    Ok(TokenKind::Shl)
                } else if self.peek_byte() == Some(b'=') {
                    self.pos += 1;
                    Ok(TokenKind::Le)
                } else {
                    Ok(TokenKind::Lt)
                }
            }
            b'>' => {
                self.pos += 1;
                if self.peek_byte() == Some(b'>') {
                    self.pos += 1;
                    Ok(TokenKind::Shr)
                } else if self.peek_byte() == Some(b'=') {
                    self.pos += 1;
                    Ok(TokenKind::Ge)
                } else {
                    Ok(TokenKind::Gt)
                }
            }
            b'=' => {
                self.pos += 1;
                if self.peek_byte() == Some(b'=') {
                    self.pos += 1;
                    Ok(TokenKind::EqEq)
                } else {
                    Ok(TokenKind::Assign)
                }
            }
            b'!' => {
                self.pos += 1;
                if self.peek_byte() == Some(b'=') {
                    self.pos += 1;
                    Ok(TokenKind::NotEq)
                } else {
                    Err(Error::unexpected_char('!', start))
                }
            }
            b'\'' | b'"' => self.scan_string(b),
            b'#' => self.scan_color(),
            b'@' => self.scan_date(),
            b'0'..=b'9' => self.scan_number(),
            c if c.is_ascii_alphabetic() || c == b'_' => self.scan_ident_or_keyword(),
            other => Err(Error::unexpected_char(other as char, start)),
        }
    }

    fn scan_string(&mut self, quote: u8) -> Result<TokenKind> {
        let start = self.pos;
        self.pos += 1;
        let mut value = String::new();
        loop {
            match self.peek_byte() {
                None => return Err(Error::unterminated_string(Span::new(start, self.pos))),
                Some(b) if b == quote => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    self.pos += 1;
                    match self.peek_byte() {
                        Some(b'n') => {
                            value.push('\n');
                            self.pos += 1;
                        }
                        Some(b't') => {
                            value.push('\t');
                            self.pos += 1;
                        }
                        Some(b'\\') => {
                            value.push('\\');
                            self.pos += 1;
                        }
                        Some(b'\'') => {
                            value.push('\'');
                            self.pos += 1;
                        }
                        Some(b'"') => {
                            value.push('"');
                            self.pos += 1;
                        }
                        _ => return Err(Error::unterminated_string(Span::new(start, self.pos))),
                    }
                }
                Some(_) => {
                    let rest = &self.input[self.pos..];
                    let ch = rest.chars().next().unwrap();
                    value.push(ch);
                    self.pos += ch.len_utf8();
                }
            }
        }
        Ok(TokenKind::Str(value))
    }

    /// `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa` (`spec.md` §6.3's colour
    /// formatting table in reverse).
    fn scan_color(&mut self) -> Result<TokenKind> {
        let start = self.pos;
        self.pos += 1;
        let hex_start = self.pos;
        while matches!(self.peek_byte(), Some(b) if b.is_ascii_hexdigit()) {
            self.pos += 1;
        }
        let hex = &self.input[hex_start..self.pos];
        let expand = |c: char| -> u8 {
            let v = c.to_digit(16).unwrap() as u8;
            v * 16 + v
        };
        let parse2 = |s: &str| -> u8 { u8::from_str_radix(s, 16).unwrap() };
        match hex.len() {
            3 => {
                let mut cs = hex.chars();
                let r = expand(cs.next().unwrap());
                let g = expand(cs.next().unwrap());
                let b = expand(cs.next().unwrap());
                Ok(TokenKind::Color(r, g, b, 255))
            }
            4 => {
                let mut cs = hex.chars();
                let r = expand(cs.next().unwrap());
                let g = expand(cs.next().unwrap());
                let b = expand(cs.next().unwrap());
                let a = expand(cs.next().unwrap());
                Ok(TokenKind::Color(r, g, b, a))
            }
            6 => Ok(TokenKind::Color(parse2(&hex[0..2]), parse2(&hex[2..4]), parse2(&hex[4..6]), 255)),
            8 => Ok(TokenKind::Color(
                parse2(&hex[0..2]),
                parse2(&hex[2..4]),
                parse2(&hex[4..6]),
                parse2(&hex[6..8]),
            )),
            _ => Err(Error::unexpected_char('#', start)),
        }
    }

    /// `@(YYYY-MM-DD)` or `@(YYYY-MM-DD HH:MM:SS)`.
    fn scan_date(&mut self) -> Result<TokenKind> {
        let start = self.pos;
        self.pos += 1;
        if self.peek_byte() != Some(b'(') {
            return Err(Error::unexpected_char('@', start));
        }
        self.pos += 1;
        let body_start = self.pos;
        while matches!(self.peek_byte(), Some(b) if b != b')') {
            self.pos += 1;
        }
        if self.peek_byte() != Some(b')') {
            return Err(Error::unexpected_eof(self.pos));
        }
        let body = &self.input[body_start..self.pos];
        self.pos += 1;

        let malformed = || Error::unexpected_char('@', start);
        let mut date_part = body;
        let mut time_part = None;
        if let Some(idx) = body.find(' ') {
            date_part = &body[..idx];
            time_part = Some(&body[idx + 1..]);
        }
        let mut ymd = date_part.splitn(3, '-');
        let year: i32 = ymd.next().ok_or_else(malformed)?.parse().map_err(|_| malformed())?;
        let month: u32 = ymd.next().ok_or_else(malformed)?.parse().map_err(|_| malformed())?;
        let day: u32 = ymd.next().ok_or_else(malformed)?.parse().map_err(|_| malformed())?;
        match time_part {
            None => Ok(TokenKind::Date(year, month, day)),
            Some(t) => {
                let mut hms = t.splitn(3, ':');
                let hour: u32 = hms.next().ok_or_else(malformed)?.parse().map_err(|_| malformed())?;
                let minute: u32 = hms.next().ok_or_else(malformed)?.parse().map_err(|_| malformed())?;
                let second: u32 = hms.next().ok_or_else(malformed)?.parse().map_err(|_| malformed())?;
                Ok(TokenKind::DateTime(year, month, day, hour, minute, second))
            }
        }
    }

    fn scan_number(&mut self) -> Result<TokenKind> {
        let start = self.pos;
        while matches!(self.peek_byte(), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        let mut is_float = false;
        if self.peek_byte() == Some(b'.') && matches!(self.peek_byte_at(1), Some(d) if d.is_ascii_digit()) {
            is_float = true;
            self.pos += 1;
            while matches!(self.peek_byte(), Some(b) if b.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek_byte(), Some(b'e') | Some(b'E')) {
            let save = self.pos;
            self.pos += 1;
            if matches!(self.peek_byte(), Some(b'+') | Some(b'-')) {
                self.pos += 1;
            }
            if matches!(self.peek_byte(), Some(b) if b.is_ascii_digit()) {
                is_float = true;
                while matches!(self.peek_byte(), Some(b) if b.is_ascii_digit()) {
                    self.pos += 1;
                }
            } else {
                self.pos = save;
            }
        }
        let text = &self.input[start..self.pos];
        if is_float {
            Ok(TokenKind::Number(text.parse().map_err(|_| Error::unexpected_char('.', start))?))
        } else {
            Ok(TokenKind::Int(text.parse().map_err(|_| Error::unexpected_char('0', start))?))
        }
    }

    fn scan_ident_or_keyword(&mut self) -> Result<TokenKind> {
        let start = self.pos;
        while matches!(self.peek_byte(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
            self.pos += 1;
        }
        let text = &self.input[start..self.pos];
        Ok(match text {
            "None" => TokenKind::None,
            "True" => TokenKind::True,
            "False" => TokenKind::False,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "in" => TokenKind::In,
            "is" => TokenKind::Is,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            _ => TokenKind::Ident(text.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).tokenize().unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_tokenizes_field_chain() {
        let ks = kinds("user.email");
        assert_eq!(ks, vec![TokenKind::Ident("user".into()), TokenKind::Dot, TokenKind::Ident("email".into()), TokenKind::Eof]);
    }

    #[test]
    fn test_not_in_is_two_tokens() {
        let ks = kinds("not in");
        assert_eq!(ks, vec![TokenKind::Not, TokenKind::In, TokenKind::Eof]);
    }

    #[test]
    fn test_color_literal() {
        let ks = kinds("#ff0000ff");
        assert_eq!(ks[0], TokenKind::Color(255, 0, 0, 255));
    }

    #[test]
    fn test_date_literal() {
        let ks = kinds("@(2024-01-02)");
        assert_eq!(ks[0], TokenKind::Date(2024, 1, 2));
    }

    #[test]
    fn test_datetime_literal() {
        let ks = kinds("@(2024-01-02 03:04:05)");
        assert_eq!(ks[0], TokenKind::DateTime(2024, 1, 2, 3, 4, 5));
    }

    #[test]
    fn test_string_escapes() {
        let ks = kinds(r"'it\'s'");
        assert_eq!(ks[0], TokenKind::Str("it's".to_string()));
    }

    #[test]
    fn test_float_vs_int() {
        assert_eq!(kinds("42")[0], TokenKind::Int(42));
        assert_eq!(kinds("4.5")[0], TokenKind::Number(4.5));
    }
}
