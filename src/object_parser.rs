//! `n g obj…endobj` reader and object-stream (`/Type /ObjStm`) decoder
//! (overview table; spec'd in full by SPEC_FULL §C.4).

use std::rc::Rc;

use crate::bytes::ByteReader;
use crate::constants;
use crate::error::{PDFError, Result};
use crate::filters;
use crate::lexer::{Lexer, Token};
use crate::objects::{Dictionary, Name, PDFNumber, PDFObject, PDFString, Reference, Stream};
use crate::registry::NameTable;

/// What a `Registry` asks its backing source to do when a slot needs
/// parsing. Implemented once per loaded file by [`FileSource`].
pub(crate) trait ObjectSource {
    fn parse_indirect_object(&self, expected_number: u32, offset: u64) -> Result<PDFObject>;
    fn parse_compressed_object(&self, stream: &Stream, index: u32) -> Result<PDFObject>;
}

pub(crate) struct FileSource {
    bytes: Rc<[u8]>,
    names: NameTable,
}

impl FileSource {
    pub(crate) fn new(bytes: Rc<[u8]>, names: NameTable) -> Self {
        Self { bytes, names }
    }
}

impl ObjectSource for FileSource {
    fn parse_indirect_object(&self, expected_number: u32, offset: u64) -> Result<PDFObject> {
        let mut parser = ValueParser::new(self.bytes.clone(), self.names.clone());
        parser.parse_indirect_object(expected_number, offset)
    }

    fn parse_compressed_object(&self, stream: &Stream, index: u32) -> Result<PDFObject> {
        let names = stream.filter_names();
        let parms = stream.decode_parms();
        let decoded = filters::decode_chain(&names, &parms, stream.raw())?;
        let decoded: Rc<[u8]> = Rc::from(decoded.into_boxed_slice());
        let mut parser = ValueParser::new(decoded, self.names.clone());
        parser.parse_object_stream_entry(&stream.dict, index)
    }
}

/// Recursive-descent builder of [`PDFObject`] values from a token stream,
/// plus the raw-byte handling stream payloads need (their bytes are never
/// tokenized).
pub(crate) struct ValueParser {
    bytes: Rc<[u8]>,
    lexer: Lexer,
    names: NameTable,
}

impl ValueParser {
    pub(crate) fn new(bytes: Rc<[u8]>, names: NameTable) -> Self {
        let lexer = Lexer::new(ByteReader::new(bytes.clone()));
        Self { bytes, lexer, names }
    }

    pub(crate) fn parse_indirect_object(&mut self, expected_number: u32, offset: u64) -> Result<PDFObject> {
        self.lexer.move_to(offset as usize);
        let num_tok = self.lexer.next_token()?;
        let Token::Integer(num) = num_tok else {
            return Err(PDFError::malformed(offset, "expected object number at indirect object offset"));
        };
        if num as u32 != expected_number {
            log::warn!("object at offset {} declares number {}, expected {}", offset, num, expected_number);
        }
        let gen_tok = self.lexer.next_token()?;
        let Token::Integer(_gen) = gen_tok else {
            return Err(PDFError::malformed(offset, "expected generation number"));
        };
        let obj_kw = self.lexer.next_token()?;
        match obj_kw {
            Token::Keyword(kw) if kw == constants::pdf_key::OBJ.as_bytes() => {}
            _ => return Err(PDFError::malformed(offset, "expected 'obj' keyword")),
        }
        let value = self.parse_value()?;
        // Tolerate a missing/garbled `endobj`: the object body is already
        // fully parsed at this point.
        let save = self.lexer.position();
        match self.lexer.next_token() {
            Ok(Token::Keyword(kw)) if kw == constants::pdf_key::END_OBJ.as_bytes() => {}
            _ => {
                self.lexer.move_to(save);
                log::warn!("object {} is missing 'endobj'", expected_number);
            }
        }
        Ok(value)
    }

    /// Parses a value with no surrounding `obj`/`endobj` wrapper, at an
    /// arbitrary offset — used for trailer dictionaries, which sit directly
    /// after the `trailer` keyword.
    pub(crate) fn parse_bare_value_at(&mut self, offset: usize) -> Result<PDFObject> {
        self.lexer.move_to(offset);
        self.parse_value()
    }

    /// Byte offset just past the last value this parser produced — lets a
    /// caller that shares the same underlying bytes (the content-stream
    /// tokeniser, for array/dict operands) resume from where this parser
    /// stopped.
    pub(crate) fn position(&self) -> usize {
        self.lexer.position()
    }

    /// Like [`Self::parse_indirect_object`], but for xref stream objects
    /// encountered while walking `/Prev`, whose object number the caller
    /// doesn't know ahead of time.
    pub(crate) fn parse_indirect_object_any_number(&mut self, offset: u64) -> Result<PDFObject> {
        self.lexer.move_to(offset as usize);
        let Token::Integer(num) = self.lexer.next_token()? else {
            return Err(PDFError::malformed(offset, "expected object number at indirect object offset"));
        };
        self.parse_indirect_object(num as u32, offset)
    }

    /// Parses one entry of a decoded object stream: a bare value at the
    /// byte offset recorded in the stream's header table (§C.4).
    pub(crate) fn parse_object_stream_entry(&mut self, stream_dict: &Dictionary, index: u32) -> Result<PDFObject> {
        let n = stream_dict
            .get(constants::N)
            .and_then(|o| o.as_number())
            .and_then(|n| n.as_i64())
            .ok_or_else(|| PDFError::malformed(0, "object stream missing /N"))?;
        let first = stream_dict
            .get(constants::FIRST)
            .and_then(|o| o.as_number())
            .and_then(|n| n.as_i64())
            .ok_or_else(|| PDFError::malformed(0, "object stream missing /First"))?;
        if index as i64 >= n {
            return Err(PDFError::malformed(0, format!("object stream slot {} out of range (/N={})", index, n)));
        }
        self.lexer.move_to(0);
        let mut offsets = Vec::with_capacity(n as usize);
        for _ in 0..n {
            let obj_num = self.expect_integer()?;
            let rel_offset = self.expect_integer()?;
            offsets.push((obj_num, rel_offset));
        }
        let (_, rel_offset) = offsets[index as usize];
        let absolute = (first + rel_offset) as u64;
        self.lexer.move_to(absolute as usize);
        self.parse_value()
    }

    fn expect_integer(&mut self) -> Result<i64> {
        match self.lexer.next_token()? {
            Token::Integer(v) => Ok(v),
            other => Err(PDFError::malformed(
                self.lexer.position() as u64,
                format!("expected integer, found {:?}", other),
            )),
        }
    }

    fn intern(&self, bytes: &[u8]) -> Name {
        self.names.intern(bytes)
    }

    fn parse_value(&mut self) -> Result<PDFObject> {
        let token = self.lexer.next_token()?;
        self.parse_from_token(token)
    }

    fn parse_from_token(&mut self, token: Token) -> Result<PDFObject> {
        match token {
            Token::Integer(n) => self.parse_number_or_reference(n),
            Token::Real(v) => Ok(PDFObject::Number(PDFNumber::Real(v))),
            Token::Name(bytes) => Ok(PDFObject::Name(self.intern(&bytes))),
            Token::LiteralString(bytes) => Ok(PDFObject::String(PDFString::Literal(bytes))),
            Token::HexString(bytes) => Ok(PDFObject::String(PDFString::Hex(bytes))),
            Token::ArrayStart => self.parse_array(),
            Token::DictStart => self.parse_dict_or_stream(),
            Token::Keyword(kw) => match kw.as_slice() {
                b"true" => Ok(PDFObject::Bool(true)),
                b"false" => Ok(PDFObject::Bool(false)),
                b"null" => Ok(PDFObject::Null),
                other => Err(PDFError::malformed(
                    self.lexer.position() as u64,
                    format!("unexpected keyword {:?} in value position", String::from_utf8_lossy(other)),
                )),
            },
            other => Err(PDFError::malformed(
                self.lexer.position() as u64,
                format!("unexpected token {:?} in value position", other),
            )),
        }
    }

    /// An integer might be a plain number, or the first of `n g R`. Looks
    /// ahead up to two tokens and rewinds if the reference pattern doesn't
    /// match (the lexer is restartable from any offset, so this is cheap).
    fn parse_number_or_reference(&mut self, n: i64) -> Result<PDFObject> {
        if n < 0 || n > u32::MAX as i64 {
            return Ok(PDFObject::Number(PDFNumber::Int(n)));
        }
        let before_gen = self.lexer.position();
        if let Ok(Token::Integer(gen)) = self.lexer.next_token() {
            if gen >= 0 && gen <= u16::MAX as i64 {
                let before_r = self.lexer.position();
                if let Ok(Token::Keyword(kw)) = self.lexer.next_token() {
                    if kw.as_slice() == b"R" {
                        return Ok(PDFObject::Reference(Reference::new(n as u32, gen as u16)));
                    }
                }
                let _ = before_r;
            }
        }
        self.lexer.move_to(before_gen);
        Ok(PDFObject::Number(PDFNumber::Int(n)))
    }

    fn parse_array(&mut self) -> Result<PDFObject> {
        let mut items = Vec::new();
        loop {
            let token = self.lexer.next_token()?;
            if token == Token::ArrayEnd {
                break;
            }
            if token == Token::Eof {
                return Err(PDFError::malformed(self.lexer.position() as u64, "unterminated array"));
            }
            items.push(self.parse_from_token(token)?);
        }
        Ok(PDFObject::Array(items))
    }

    fn parse_dict_or_stream(&mut self) -> Result<PDFObject> {
        let mut dict = Dictionary::new();
        loop {
            let token = self.lexer.next_token()?;
            match token {
                Token::DictEnd => break,
                Token::Name(key) => {
                    let value = self.parse_value()?;
                    dict.insert(String::from_utf8_lossy(&key).into_owned(), value);
                }
                Token::Eof => return Err(PDFError::malformed(self.lexer.position() as u64, "unterminated dictionary")),
                other => {
                    return Err(PDFError::malformed(
                        self.lexer.position() as u64,
                        format!("expected a name key in dictionary, found {:?}", other),
                    ));
                }
            }
        }
        let save = self.lexer.position();
        match self.lexer.next_token() {
            Ok(Token::Keyword(kw)) if kw == constants::pdf_key::STREAM.as_bytes() => {
                self.parse_stream_body(dict)
            }
            _ => {
                self.lexer.move_to(save);
                Ok(PDFObject::Dict(dict))
            }
        }
    }

    fn parse_stream_body(&mut self, dict: Dictionary) -> Result<PDFObject> {
        let after_keyword = self.lexer.position();
        let data_start = skip_stream_eol(&self.bytes, after_keyword);

        let declared_length = dict
            .get(constants::LENGTH)
            .and_then(|o| o.as_number())
            .and_then(|n| n.as_i64());

        let (raw_end, resume_at) = match declared_length {
            Some(len) if len >= 0 => {
                let candidate_end = data_start + len as usize;
                if self.confirm_endstream_at(candidate_end) {
                    (candidate_end, candidate_end)
                } else {
                    log::warn!("/Length did not land on 'endstream'; recovering by scanning");
                    self.scan_for_endstream(data_start)?
                }
            }
            _ => {
                log::warn!("stream has no direct /Length; recovering by scanning for 'endstream'");
                self.scan_for_endstream(data_start)?
            }
        };

        let raw = self.bytes[data_start..raw_end].to_vec();
        self.lexer.move_to(resume_at);
        match self.lexer.next_token() {
            Ok(Token::Keyword(kw)) if kw == constants::pdf_key::END_STREAM.as_bytes() => {}
            _ => log::warn!("stream body not followed by 'endstream' keyword"),
        }
        Ok(PDFObject::Stream(Rc::new(Stream::new(dict, raw))))
    }

    fn confirm_endstream_at(&self, pos: usize) -> bool {
        let trimmed = skip_optional_eol(&self.bytes, pos);
        self.bytes[trimmed..].starts_with(constants::pdf_key::END_STREAM.as_bytes())
    }

    fn scan_for_endstream(&self, data_start: usize) -> Result<(usize, usize)> {
        let needle = constants::pdf_key::END_STREAM.as_bytes();
        let pos = find_subslice(&self.bytes, needle, data_start)
            .ok_or_else(|| PDFError::malformed(data_start as u64, "no 'endstream' found while recovering stream length"))?;
        let mut end = pos;
        if end > data_start && self.bytes[end - 1] == b'\n' {
            end -= 1;
            if end > data_start && self.bytes[end - 1] == b'\r' {
                end -= 1;
            }
        } else if end > data_start && self.bytes[end - 1] == b'\r' {
            end -= 1;
        }
        Ok((end, pos))
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..].windows(needle.len()).position(|w| w == needle).map(|rel| from + rel)
}

/// `stream` must be followed by CRLF or a bare LF before data begins; a lone
/// CR is tolerated leniently.
fn skip_stream_eol(bytes: &[u8], pos: usize) -> usize {
    skip_optional_eol(bytes, pos)
}

fn skip_optional_eol(bytes: &[u8], pos: usize) -> usize {
    match bytes.get(pos) {
        Some(b'\r') if bytes.get(pos + 1) == Some(&b'\n') => pos + 2,
        Some(b'\r') | Some(b'\n') => pos + 1,
        _ => pos,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser(bytes: &'static [u8]) -> ValueParser {
        ValueParser::new(Rc::from(bytes), NameTable::new())
    }

    #[test]
    fn parses_indirect_object_dict() {
        let mut p = parser(b"7 0 obj << /Type /Catalog /Pages 2 0 R >> endobj");
        let value = p.parse_indirect_object(7, 0).unwrap();
        let dict = value.as_dict().unwrap();
        assert_eq!(dict.get("Type").unwrap().as_name(), Some("Catalog"));
        assert_eq!(dict.get("Pages").unwrap().as_reference(), Some(Reference::new(2, 0)));
    }

    #[test]
    fn distinguishes_numbers_from_references() {
        let mut p = parser(b"1 0 obj [ 1 2 3 0 R ] endobj");
        let value = p.parse_indirect_object(1, 0).unwrap();
        let arr = value.as_array().unwrap();
        assert_eq!(arr[0].as_number(), Some(PDFNumber::Int(1)));
        assert_eq!(arr[1].as_number(), Some(PDFNumber::Int(2)));
        assert_eq!(arr[2].as_reference(), Some(Reference::new(3, 0)));
    }

    #[test]
    fn parses_stream_with_direct_length() {
        let mut p = parser(b"5 0 obj << /Length 5 >> stream\nhello\nendstream endobj");
        let value = p.parse_indirect_object(5, 0).unwrap();
        let stream = value.as_stream().unwrap();
        assert_eq!(stream.raw(), b"hello");
    }

    #[test]
    fn recovers_stream_length_by_scanning() {
        let mut p = parser(b"5 0 obj << /Length 999 >> stream\nhello\nendstream endobj");
        let value = p.parse_indirect_object(5, 0).unwrap();
        let stream = value.as_stream().unwrap();
        assert_eq!(stream.raw(), b"hello");
    }

    #[test]
    fn tolerates_missing_endobj() {
        let mut p = parser(b"3 0 obj 42 ");
        let value = p.parse_indirect_object(3, 0).unwrap();
        assert_eq!(value.as_number(), Some(PDFNumber::Int(42)));
    }
}
