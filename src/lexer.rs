//! PDF textual lexer (§4.1): restartable from any byte offset, shares no
//! mutable state beyond its cursor position so the xref recovery path can
//! reparse segments on demand.

use crate::bytes::{is_delimiter, is_pdf_whitespace, ByteReader};
use crate::error::{PDFError, Result};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Integer(i64),
    Real(f64),
    Name(Vec<u8>),
    LiteralString(Vec<u8>),
    HexString(Vec<u8>),
    ArrayStart,
    ArrayEnd,
    DictStart,
    DictEnd,
    Keyword(Vec<u8>),
    Eof,
}

pub(crate) struct Lexer {
    reader: ByteReader,
}

impl Lexer {
    pub(crate) fn new(reader: ByteReader) -> Self {
        Self { reader }
    }

    pub(crate) fn position(&self) -> usize {
        self.reader.position()
    }

    pub(crate) fn move_to(&mut self, pos: usize) {
        self.reader.move_to(pos);
    }

    pub(crate) fn reader(&self) -> &ByteReader {
        &self.reader
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.reader.peek() {
                Some(b) if is_pdf_whitespace(b) => {
                    self.reader.advance();
                }
                Some(b'%') => {
                    while let Some(b) = self.reader.peek() {
                        if b == b'\n' || b == b'\r' {
                            break;
                        }
                        self.reader.advance();
                    }
                }
                _ => break,
            }
        }
    }

    pub(crate) fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace_and_comments();
        let start = self.reader.position();
        let Some(b) = self.reader.peek() else {
            return Ok(Token::Eof);
        };
        match b {
            b'/' => self.lex_name(),
            b'(' => self.lex_literal_string(),
            b'<' => {
                if self.reader.peek_at(1) == Some(b'<') {
                    self.reader.skip(2);
                    Ok(Token::DictStart)
                } else {
                    self.lex_hex_string()
                }
            }
            b'>' => {
                if self.reader.peek_at(1) == Some(b'>') {
                    self.reader.skip(2);
                    Ok(Token::DictEnd)
                } else {
                    Err(PDFError::malformed(start as u64, "stray '>' outside dictionary close"))
                }
            }
            b'[' => {
                self.reader.advance();
                Ok(Token::ArrayStart)
            }
            b']' => {
                self.reader.advance();
                Ok(Token::ArrayEnd)
            }
            b'+' | b'-' | b'.' | b'0'..=b'9' => self.lex_number(),
            _ => self.lex_keyword(),
        }
    }

    fn lex_name(&mut self) -> Result<Token> {
        self.reader.advance(); // '/'
        let mut bytes = Vec::new();
        while let Some(b) = self.reader.peek() {
            if is_pdf_whitespace(b) || is_delimiter(b) {
                break;
            }
            if b == b'#' {
                let h1 = self.reader.peek_at(1);
                let h2 = self.reader.peek_at(2);
                match (h1, h2) {
                    (Some(h1), Some(h2)) if h1.is_ascii_hexdigit() && h2.is_ascii_hexdigit() => {
                        bytes.push(crate::bytes::hex2byte(h2, h1));
                        self.reader.skip(3);
                        continue;
                    }
                    _ => {}
                }
            }
            bytes.push(b);
            self.reader.advance();
        }
        Ok(Token::Name(bytes))
    }

    fn lex_literal_string(&mut self) -> Result<Token> {
        let start = self.reader.position();
        self.reader.advance(); // '('
        let mut depth = 1usize;
        let mut bytes = Vec::new();
        loop {
            let Some(b) = self.reader.advance() else {
                return Err(PDFError::malformed(start as u64, "unterminated literal string"));
            };
            match b {
                b'(' => {
                    depth += 1;
                    bytes.push(b);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    bytes.push(b);
                }
                b'\\' => self.lex_escape(&mut bytes),
                _ => bytes.push(b),
            }
        }
        Ok(Token::LiteralString(bytes))
    }

    fn lex_escape(&mut self, bytes: &mut Vec<u8>) {
        let Some(b) = self.reader.advance() else { return };
        match b {
            b'n' => bytes.push(b'\n'),
            b'r' => bytes.push(b'\r'),
            b't' => bytes.push(b'\t'),
            b'b' => bytes.push(0x08),
            b'f' => bytes.push(0x0c),
            b'(' => bytes.push(b'('),
            b')' => bytes.push(b')'),
            b'\\' => bytes.push(b'\\'),
            b'\r' => {
                // line continuation; swallow an immediately following \n too
                if self.reader.peek() == Some(b'\n') {
                    self.reader.advance();
                }
            }
            b'\n' => {}
            b'0'..=b'7' => {
                let mut value = (b - b'0') as u32;
                for _ in 0..2 {
                    match self.reader.peek() {
                        Some(d @ b'0'..=b'7') => {
                            value = value * 8 + (d - b'0') as u32;
                            self.reader.advance();
                        }
                        _ => break,
                    }
                }
                bytes.push((value & 0xff) as u8);
            }
            other => bytes.push(other),
        }
    }

    fn lex_hex_string(&mut self) -> Result<Token> {
        let start = self.reader.position();
        self.reader.advance(); // '<'
        let mut digits = Vec::new();
        loop {
            let Some(b) = self.reader.advance() else {
                return Err(PDFError::malformed(start as u64, "unterminated hex string"));
            };
            if b == b'>' {
                break;
            }
            if is_pdf_whitespace(b) {
                continue;
            }
            if !b.is_ascii_hexdigit() {
                return Err(PDFError::malformed(self.reader.position() as u64, "non-hex byte in hex string"));
            }
            digits.push(b);
        }
        Ok(Token::HexString(crate::bytes::hex2bytes(&digits)))
    }

    fn lex_number(&mut self) -> Result<Token> {
        let start = self.reader.position();
        let mut text = Vec::new();
        if matches!(self.reader.peek(), Some(b'+') | Some(b'-')) {
            text.push(self.reader.advance().unwrap());
        }
        let mut is_real = false;
        while let Some(b) = self.reader.peek() {
            match b {
                b'0'..=b'9' => {
                    text.push(b);
                    self.reader.advance();
                }
                b'.' => {
                    is_real = true;
                    text.push(b);
                    self.reader.advance();
                }
                _ => break,
            }
        }
        let s = std::str::from_utf8(&text)
            .map_err(|_| PDFError::malformed(start as u64, "non-UTF8 number token"))?;
        if is_real {
            let v: f64 = s.parse().map_err(|_| PDFError::malformed(start as u64, "malformed real number"))?;
            Ok(Token::Real(v))
        } else {
            match s.parse::<i64>() {
                Ok(v) => Ok(Token::Integer(v)),
                // Overflowing a 64-bit int is treated as a real per lenient
                // practice in the wild; §3.2 only guarantees ints that fit.
                Err(_) => {
                    let v: f64 = s.parse().map_err(|_| PDFError::malformed(start as u64, "malformed integer"))?;
                    Ok(Token::Real(v))
                }
            }
        }
    }

    fn lex_keyword(&mut self) -> Result<Token> {
        let mut bytes = Vec::new();
        while let Some(b) = self.reader.peek() {
            if is_pdf_whitespace(b) || is_delimiter(b) {
                break;
            }
            bytes.push(b);
            self.reader.advance();
        }
        if bytes.is_empty() {
            let pos = self.reader.position();
            let bad = self.reader.advance();
            return Err(PDFError::malformed(pos as u64, format!("unexpected byte {:?}", bad)));
        }
        Ok(Token::Keyword(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn lexer(bytes: &[u8]) -> Lexer {
        Lexer::new(ByteReader::new(Rc::from(bytes)))
    }

    #[test]
    fn lexes_numbers() {
        let mut l = lexer(b"12 -3.5 +7 .25");
        assert_eq!(l.next_token().unwrap(), Token::Integer(12));
        assert_eq!(l.next_token().unwrap(), Token::Real(-3.5));
        assert_eq!(l.next_token().unwrap(), Token::Integer(7));
        assert_eq!(l.next_token().unwrap(), Token::Real(0.25));
    }

    #[test]
    fn lexes_name_with_hex_escape() {
        let mut l = lexer(b"/A#20B");
        assert_eq!(l.next_token().unwrap(), Token::Name(b"A B".to_vec()));
    }

    #[test]
    fn lexes_literal_string_with_escapes_and_nesting() {
        let mut l = lexer(b"(a\\(b\\)c\\n)");
        assert_eq!(l.next_token().unwrap(), Token::LiteralString(b"a(b)c\n".to_vec()));
    }

    #[test]
    fn lexes_hex_string_with_odd_digit_padding() {
        let mut l = lexer(b"<9>");
        assert_eq!(l.next_token().unwrap(), Token::HexString(vec![0x90]));
    }

    #[test]
    fn lexes_dict_and_array_delimiters() {
        let mut l = lexer(b"<< [ ] >>");
        assert_eq!(l.next_token().unwrap(), Token::DictStart);
        assert_eq!(l.next_token().unwrap(), Token::ArrayStart);
        assert_eq!(l.next_token().unwrap(), Token::ArrayEnd);
        assert_eq!(l.next_token().unwrap(), Token::DictEnd);
    }

    #[test]
    fn skips_comments() {
        let mut l = lexer(b"% a comment\n42");
        assert_eq!(l.next_token().unwrap(), Token::Integer(42));
    }

    #[test]
    fn restarts_from_arbitrary_offset() {
        let mut l = lexer(b"junk 42");
        l.move_to(5);
        assert_eq!(l.next_token().unwrap(), Token::Integer(42));
    }
}
