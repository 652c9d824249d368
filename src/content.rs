//! Content-stream operator model (§4.6): a typed operator set with operand
//! encoding to bytes, plus the tokeniser that reads a byte payload back into
//! a [`ContentStream`] (overview table: "content-stream tokeniser").

use std::rc::Rc;

use crate::bytes::{ByteReader, ByteWriter};
use crate::error::{PDFError, Result};
use crate::lexer::{Lexer, Token};
use crate::objects::{Dictionary, Name, PDFNumber, PDFObject, PDFString};
use crate::registry::NameTable;

/// One operand of a content-stream operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Number(PDFNumber),
    /// A pre-formatted token, written verbatim — e.g. an inline-image
    /// abbreviation that isn't a full PDF name.
    Token(String),
    Name(Name),
    String(PDFString),
    Array(Vec<Operand>),
    Dict(Dictionary),
    /// Pre-encoded bytes written verbatim — the inline-image (`BI…ID…EI`)
    /// payload, which is not itself PDF-syntax tokens.
    Raw(Vec<u8>),
}

impl Operand {
    fn serialize(&self, w: &mut ByteWriter) {
        match self {
            Operand::Number(n) => match n {
                PDFNumber::Int(v) => w.push_int(*v),
                PDFNumber::Real(v) => w.push_real(*v),
            },
            Operand::Token(text) => w.push_str(text),
            Operand::Name(name) => {
                w.push(b'/');
                w.push_str(name.as_str());
            }
            Operand::String(s) => w.extend(&crate::objects::PDFObject::String(s.clone()).serialize()),
            Operand::Array(items) => {
                w.push(b'[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        w.push(b' ');
                    }
                    item.serialize(w);
                }
                w.push(b']');
            }
            Operand::Dict(dict) => w.extend(&crate::objects::PDFObject::Dict(dict.clone()).serialize()),
            Operand::Raw(bytes) => w.extend(bytes),
        }
    }
}

/// All operator mnemonics from the content-stream operator tables (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum Op {
    // Graphics state
    q, Q, cm, w, J, j, M, d, ri, i, gs,
    // Path construction
    m, l, c, v, y, h, re,
    // Path painting
    S, s, f, F, fStar, B, BStar, b, bStar, n,
    // Clipping
    W, WStar,
    // Text state
    Tc, Tw, Tz, TL, Tf, Tr, Ts,
    // Text positioning
    BT, ET, Td, TD, Tm, TStar,
    // Text showing
    Tj, TJ, Quote, DoubleQuote,
    // Colour
    CS, cs, SC, SCN, sc, scn, G, g, RG, rg, K, k,
    // XObjects
    Do,
    // Marked content
    MP, DP, BMC, BDC, EMC,
    // Shading
    sh,
    // Inline image
    BI, ID, EI,
}

impl Op {
    /// The inverse of [`Self::mnemonic`] — used by the tokeniser to map a
    /// keyword token back to its operator variant.
    fn from_mnemonic(text: &str) -> Option<Op> {
        Some(match text {
            "q" => Op::q, "Q" => Op::Q, "cm" => Op::cm, "w" => Op::w, "J" => Op::J,
            "j" => Op::j, "M" => Op::M, "d" => Op::d, "ri" => Op::ri, "i" => Op::i, "gs" => Op::gs,
            "m" => Op::m, "l" => Op::l, "c" => Op::c, "v" => Op::v, "y" => Op::y, "h" => Op::h, "re" => Op::re,
            "S" => Op::S, "s" => Op::s, "f" => Op::f, "F" => Op::F, "f*" => Op::fStar,
            "B" => Op::B, "B*" => Op::BStar, "b" => Op::b, "b*" => Op::bStar, "n" => Op::n,
            "W" => Op::W, "W*" => Op::WStar,
            "Tc" => Op::Tc, "Tw" => Op::Tw, "Tz" => Op::Tz, "TL" => Op::TL,
            "Tf" => Op::Tf, "Tr" => Op::Tr, "Ts" => Op::Ts,
            "BT" => Op::BT, "ET" => Op::ET, "Td" => Op::Td, "TD" => Op::TD,
            "Tm" => Op::Tm, "T*" => Op::TStar,
            "Tj" => Op::Tj, "TJ" => Op::TJ, "'" => Op::Quote, "\"" => Op::DoubleQuote,
            "CS" => Op::CS, "cs" => Op::cs, "SC" => Op::SC, "SCN" => Op::SCN,
            "sc" => Op::sc, "scn" => Op::scn, "G" => Op::G, "g" => Op::g,
            "RG" => Op::RG, "rg" => Op::rg, "K" => Op::K, "k" => Op::k,
            "Do" => Op::Do,
            "MP" => Op::MP, "DP" => Op::DP, "BMC" => Op::BMC, "BDC" => Op::BDC, "EMC" => Op::EMC,
            "sh" => Op::sh,
            _ => return None,
        })
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Op::q => "q", Op::Q => "Q", Op::cm => "cm", Op::w => "w", Op::J => "J",
            Op::j => "j", Op::M => "M", Op::d => "d", Op::ri => "ri", Op::i => "i", Op::gs => "gs",
            Op::m => "m", Op::l => "l", Op::c => "c", Op::v => "v", Op::y => "y", Op::h => "h", Op::re => "re",
            Op::S => "S", Op::s => "s", Op::f => "f", Op::F => "F", Op::fStar => "f*",
            Op::B => "B", Op::BStar => "B*", Op::b => "b", Op::bStar => "b*", Op::n => "n",
            Op::W => "W", Op::WStar => "W*",
            Op::Tc => "Tc", Op::Tw => "Tw", Op::Tz => "Tz", Op::TL => "TL",
            Op::Tf => "Tf", Op::Tr => "Tr", Op::Ts => "Ts",
            Op::BT => "BT", Op::ET => "ET", Op::Td => "Td", Op::TD => "TD",
            Op::Tm => "Tm", Op::TStar => "T*",
            Op::Tj => "Tj", Op::TJ => "TJ", Op::Quote => "'", Op::DoubleQuote => "\"",
            Op::CS => "CS", Op::cs => "cs", Op::SC => "SC", Op::SCN => "SCN",
            Op::sc => "sc", Op::scn => "scn", Op::G => "G", Op::g => "g",
            Op::RG => "RG", Op::rg => "rg", Op::K => "K", Op::k => "k",
            Op::Do => "Do",
            Op::MP => "MP", Op::DP => "DP", Op::BMC => "BMC", Op::BDC => "BDC", Op::EMC => "EMC",
            Op::sh => "sh",
            Op::BI => "BI", Op::ID => "ID", Op::EI => "EI",
        }
    }
}

/// An immutable `{ op, operands }` record. Serialisation writes each
/// operand followed by a space, then the mnemonic (§4.6).
#[derive(Debug, Clone, PartialEq)]
pub struct Operator {
    pub op: Op,
    pub operands: Vec<Operand>,
}

impl Operator {
    pub fn new(op: Op, operands: Vec<Operand>) -> Self {
        Self { op, operands }
    }

    fn serialize(&self, w: &mut ByteWriter) {
        // Inline images are the one operator/operand sequence that isn't
        // "operands then mnemonic": BI leads, the abbreviated dict pairs
        // follow compactly, then ID, the raw sample bytes, and EI.
        if self.op == Op::BI {
            self.serialize_inline_image(w);
            return;
        }
        for operand in &self.operands {
            operand.serialize(w);
            w.push(b' ');
        }
        w.push_str(self.op.mnemonic());
    }

    fn serialize_inline_image(&self, w: &mut ByteWriter) {
        w.push_str("BI");
        if let Some(Operand::Dict(dict)) = self.operands.first() {
            for (key, value) in dict.iter() {
                w.push(b'\n');
                w.push(b'/');
                w.push_str(key);
                w.push(b' ');
                w.extend(&value.serialize());
            }
        }
        w.push_str("\nID ");
        if let Some(Operand::Raw(bytes)) = self.operands.get(1) {
            w.extend(bytes);
        }
        w.push_str("\nEI");
    }
}

/// A parsed or constructed content stream: operators joined by LF (§4.6).
#[derive(Debug, Clone, Default)]
pub struct ContentStream {
    pub operators: Vec<Operator>,
}

impl ContentStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, operator: Operator) {
        self.operators.push(operator);
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        for (i, operator) in self.operators.iter().enumerate() {
            if i > 0 {
                w.push(b'\n');
            }
            operator.serialize(&mut w);
        }
        w.into_vec()
    }
}

/// Reads a content-stream byte payload back into a [`ContentStream`]
/// (overview table: "content-stream tokeniser"). Array and dictionary
/// operands are delegated to [`crate::object_parser::ValueParser`] so the
/// same recursive-descent logic that reads object values reads operands.
pub(crate) fn parse(bytes: Rc<[u8]>, names: NameTable) -> Result<ContentStream> {
    let mut lexer = Lexer::new(ByteReader::new(bytes.clone()));
    let mut stream = ContentStream::new();
    let mut operands: Vec<Operand> = Vec::new();
    loop {
        let pos_before = lexer.position();
        let token = lexer.next_token()?;
        match token {
            Token::Eof => break,
            Token::Integer(n) => operands.push(Operand::Number(PDFNumber::Int(n))),
            Token::Real(v) => operands.push(Operand::Number(PDFNumber::Real(v))),
            Token::Name(name_bytes) => operands.push(Operand::Name(names.intern(&name_bytes))),
            Token::LiteralString(string_bytes) => operands.push(Operand::String(PDFString::Literal(string_bytes))),
            Token::HexString(string_bytes) => operands.push(Operand::String(PDFString::Hex(string_bytes))),
            Token::ArrayStart | Token::DictStart => {
                let mut value_parser = crate::object_parser::ValueParser::new(bytes.clone(), names.clone());
                let value = value_parser.parse_bare_value_at(pos_before)?;
                lexer.move_to(value_parser.position());
                operands.push(pdf_object_to_operand(value));
            }
            Token::ArrayEnd | Token::DictEnd => {
                return Err(PDFError::malformed(pos_before as u64, "unexpected array/dict close in content stream"));
            }
            Token::Keyword(kw) if kw == b"BI" => {
                let operator = parse_inline_image(&mut lexer, &bytes, &names)?;
                stream.push(operator);
            }
            Token::Keyword(kw) => {
                let text = String::from_utf8_lossy(&kw).into_owned();
                match Op::from_mnemonic(&text) {
                    Some(op) => stream.push(Operator::new(op, std::mem::take(&mut operands))),
                    None => {
                        return Err(PDFError::malformed(
                            pos_before as u64,
                            format!("unrecognised content-stream operator {:?}", text),
                        ));
                    }
                }
            }
        }
    }
    Ok(stream)
}

/// Converts a parsed [`PDFObject`] into the corresponding operand. Variants
/// that can't occur as a bare content-stream operand (booleans, null,
/// references, streams) fall back to their serialised bytes as a token —
/// this path is only reached by malformed input.
fn pdf_object_to_operand(obj: PDFObject) -> Operand {
    match obj {
        PDFObject::Number(n) => Operand::Number(n),
        PDFObject::Name(n) => Operand::Name(n),
        PDFObject::String(s) => Operand::String(s),
        PDFObject::Array(items) => Operand::Array(items.into_iter().map(pdf_object_to_operand).collect()),
        PDFObject::Dict(d) => Operand::Dict(d),
        other => Operand::Token(String::from_utf8_lossy(&other.serialize()).into_owned()),
    }
}

/// Parses the body of an inline image: `BI` has already been consumed.
/// Reads the abbreviated-key dictionary up to `ID`, skips the one
/// whitespace byte that separates `ID` from the sample data, then scans
/// raw bytes up to a whitespace-delimited `EI`.
fn parse_inline_image(lexer: &mut Lexer, bytes: &Rc<[u8]>, names: &NameTable) -> Result<Operator> {
    let mut dict = Dictionary::new();
    loop {
        let pos = lexer.position();
        match lexer.next_token()? {
            Token::Name(key) => {
                let value_pos = lexer.position();
                let mut value_parser = crate::object_parser::ValueParser::new(bytes.clone(), names.clone());
                let value = value_parser.parse_bare_value_at(value_pos)?;
                lexer.move_to(value_parser.position());
                dict.insert(String::from_utf8_lossy(&key).into_owned(), value);
            }
            Token::Keyword(kw) if kw == b"ID" => break,
            Token::Eof => return Err(PDFError::malformed(pos as u64, "unterminated inline image dictionary")),
            other => {
                return Err(PDFError::malformed(
                    pos as u64,
                    format!("unexpected token {:?} in inline image dictionary", other),
                ));
            }
        }
    }
    let mut start = lexer.position();
    if bytes.get(start).copied().map(crate::bytes::is_pdf_whitespace).unwrap_or(false) {
        start += 1;
    }
    let (raw_end, ei_start) = find_ei_terminator(bytes, start)?;
    let raw = bytes[start..raw_end].to_vec();
    lexer.move_to(ei_start);
    match lexer.next_token() {
        Ok(Token::Keyword(kw)) if kw == b"EI" => {}
        _ => log::warn!("inline image not terminated by 'EI'"),
    }
    Ok(Operator::new(Op::BI, vec![Operand::Dict(dict), Operand::Raw(raw)]))
}

/// Finds the next whitespace-delimited `EI` at or after `start`. Returns
/// the raw-data end (trimmed of the one whitespace byte before `EI`) and
/// the byte offset `EI` itself starts at.
fn find_ei_terminator(bytes: &[u8], start: usize) -> Result<(usize, usize)> {
    let mut i = start;
    while i + 1 < bytes.len() {
        if bytes[i] == b'E' && bytes[i + 1] == b'I' {
            let before_ok = i == start || crate::bytes::is_pdf_whitespace(bytes[i - 1]);
            let after_ok = i + 2 >= bytes.len()
                || crate::bytes::is_pdf_whitespace(bytes[i + 2])
                || crate::bytes::is_delimiter(bytes[i + 2]);
            if before_ok && after_ok {
                let mut raw_end = i;
                if raw_end > start && crate::bytes::is_pdf_whitespace(bytes[raw_end - 1]) {
                    raw_end -= 1;
                }
                return Ok((raw_end, i));
            }
        }
        i += 1;
    }
    Err(PDFError::malformed(start as u64, "no 'EI' terminator found for inline image"))
}
