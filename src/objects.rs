//! Primitive PDF values (§3.2) and their canonical serialisation (§4.2).
//!
//! `PDFObject` is the one enum every parser produces and every writer
//! consumes. It knows nothing about the registry: a `Reference` here is just
//! `(object_number, generation)`, resolved elsewhere.

use std::rc::Rc;

use crate::bytes::ByteWriter;

/// `(object_number, generation)`. `(0, 65535)` is the head of the free list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reference {
    pub object_number: u32,
    pub generation: u16,
}

impl Reference {
    pub fn new(object_number: u32, generation: u16) -> Self {
        Self { object_number, generation }
    }

    pub const FREE_LIST_HEAD: Reference = Reference { object_number: 0, generation: 65535 };
}

/// An integer or a finite real. Kept as two variants (rather than always
/// widening to `f64`) so round-trips of integer-looking input stay exact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PDFNumber {
    Int(i64),
    Real(f64),
}

impl PDFNumber {
    pub fn as_f64(&self) -> f64 {
        match self {
            PDFNumber::Int(v) => *v as f64,
            PDFNumber::Real(v) => *v,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PDFNumber::Int(v) => Some(*v),
            PDFNumber::Real(v) if v.fract() == 0.0 => Some(*v as i64),
            PDFNumber::Real(_) => None,
        }
    }

    fn serialize(&self, w: &mut ByteWriter) {
        match self {
            PDFNumber::Int(v) => w.push_int(*v),
            PDFNumber::Real(v) => w.push_real(*v),
        }
    }
}

/// Interned name. Equality and hashing are by byte content; the registry is
/// what guarantees two equal-content names share one `Rc` (§3.2: "interned
/// globally within a registry").
#[derive(Debug, Clone, Eq)]
pub struct Name(pub Rc<str>);

impl Name {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl std::hash::Hash for Name {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name(Rc::from(s))
    }
}

fn serialize_name(name: &str, w: &mut ByteWriter) {
    w.push(b'/');
    for &b in name.as_bytes() {
        if b.is_ascii_graphic() && b != b'#' && !crate::bytes::is_delimiter(b) {
            w.push(b);
        } else {
            w.push(b'#');
            w.push_hex_upper(&[b]);
        }
    }
}

/// Opaque string payload. Both flavours wrap raw bytes; text semantics
/// (UTF-16BE-with-BOM or PDFDocEncoding) are layered on in `encoding.rs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PDFString {
    Literal(Vec<u8>),
    Hex(Vec<u8>),
}

impl PDFString {
    pub fn bytes(&self) -> &[u8] {
        match self {
            PDFString::Literal(b) | PDFString::Hex(b) => b,
        }
    }

    /// Decode to text per §3.2: UTF-16BE with a leading BOM, else
    /// PDFDocEncoding.
    pub fn to_text(&self) -> String {
        crate::encoding::decode_pdf_text(self.bytes())
    }

    fn serialize(&self, w: &mut ByteWriter) {
        match self {
            PDFString::Literal(bytes) => serialize_literal_string(bytes, w),
            PDFString::Hex(bytes) => {
                w.push(b'<');
                w.push_hex_upper(bytes);
                w.push(b'>');
            }
        }
    }
}

/// Prefer the literal form; escape only what the grammar requires. Binary
/// payloads that would need escaping every other byte are still written as
/// literal here — callers that want the hex fallback construct
/// `PDFString::Hex` directly (§4.2: "hex fallback for binary").
fn serialize_literal_string(bytes: &[u8], w: &mut ByteWriter) {
    w.push(b'(');
    for &b in bytes {
        match b {
            b'\n' => w.extend(b"\\n"),
            b'\r' => w.extend(b"\\r"),
            b'\t' => w.extend(b"\\t"),
            0x08 => w.extend(b"\\b"),
            0x0c => w.extend(b"\\f"),
            b'(' => w.extend(b"\\("),
            b')' => w.extend(b"\\)"),
            b'\\' => w.extend(b"\\\\"),
            _ => w.push(b),
        }
    }
    w.push(b')');
}

/// Insertion-ordered name → value map. A plain `Vec` rather than a hash map:
/// dictionaries are small, lookup is rarely on the hot path, and this is the
/// only structure that gives the stable output order §3.2 requires without
/// pulling in an ordered-map dependency.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary {
    entries: Vec<(Rc<str>, PDFObject)>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&PDFObject> {
        self.entries.iter().find(|(k, _)| k.as_ref() == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k.as_ref() == key)
    }

    /// Inserts or, if `key` is already present, overwrites in place
    /// (preserving its original position — duplicate keys are forbidden by
    /// §3.2, so this is the one place a second write to the same key is
    /// tolerated rather than producing a duplicate entry).
    pub fn insert(&mut self, key: impl Into<Rc<str>>, value: PDFObject) {
        let key = key.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<PDFObject> {
        let idx = self.entries.iter().position(|(k, _)| k.as_ref() == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PDFObject)> {
        self.entries.iter().map(|(k, v)| (k.as_ref(), v))
    }

    fn serialize(&self, w: &mut ByteWriter, depth: usize, compact: bool) {
        w.extend(b"<<");
        for (key, value) in &self.entries {
            if compact {
                w.push(b' ');
            } else {
                w.push(b'\n');
                push_indent(w, depth + 1);
            }
            serialize_name(key, w);
            w.push(b' ');
            value.serialize_at(w, depth + 1, compact);
        }
        if compact {
            w.push(b' ');
        } else {
            w.push(b'\n');
            push_indent(w, depth);
        }
        w.extend(b">>");
    }
}

fn push_indent(w: &mut ByteWriter, depth: usize) {
    for _ in 0..depth {
        w.extend(b"  ");
    }
}

/// A dictionary plus a raw byte payload and the filter chain that produced
/// it. Decode/encode logic lives in `filters`; this struct only stores the
/// data and caches the decoded form.
#[derive(Debug, Clone)]
pub struct Stream {
    pub dict: Dictionary,
    raw: Vec<u8>,
}

impl Stream {
    pub fn new(dict: Dictionary, raw: Vec<u8>) -> Self {
        Self { dict, raw }
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn set_raw(&mut self, raw: Vec<u8>) {
        self.raw = raw;
    }

    /// Names of the filters in `/Filter`, in decode order. Empty if absent.
    pub fn filter_names(&self) -> Vec<String> {
        match self.dict.get("Filter") {
            Some(PDFObject::Name(n)) => vec![n.as_str().to_string()],
            Some(PDFObject::Array(items)) => items
                .iter()
                .filter_map(|o| match o {
                    PDFObject::Name(n) => Some(n.as_str().to_string()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// The `/DecodeParms` entry (or entries) aligned with `filter_names`.
    pub fn decode_parms(&self) -> Vec<Option<&Dictionary>> {
        match self.dict.get("DecodeParms") {
            Some(PDFObject::Dict(d)) => vec![Some(d)],
            Some(PDFObject::Array(items)) => items
                .iter()
                .map(|o| match o {
                    PDFObject::Dict(d) => Some(d),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    fn serialize(&self, w: &mut ByteWriter, depth: usize) {
        self.dict.serialize(w, depth, false);
        w.extend(b"\nstream\n");
        w.extend(&self.raw);
        w.extend(b"\nendstream");
    }
}

/// Any PDF primitive value (§3.2).
#[derive(Debug, Clone)]
pub enum PDFObject {
    Null,
    Bool(bool),
    Number(PDFNumber),
    Name(Name),
    String(PDFString),
    Array(Vec<PDFObject>),
    Dict(Dictionary),
    Stream(Rc<Stream>),
    Reference(Reference),
    /// Pre-encoded bytes that serialise verbatim, preserving exact width —
    /// used by signature `/Contents`/`/ByteRange` placeholders (§4.9).
    Raw(Vec<u8>),
}

impl PartialEq for PDFObject {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PDFObject::Null, PDFObject::Null) => true,
            (PDFObject::Bool(a), PDFObject::Bool(b)) => a == b,
            (PDFObject::Number(a), PDFObject::Number(b)) => a == b,
            (PDFObject::Name(a), PDFObject::Name(b)) => a == b,
            (PDFObject::String(a), PDFObject::String(b)) => a == b,
            (PDFObject::Array(a), PDFObject::Array(b)) => a == b,
            (PDFObject::Dict(a), PDFObject::Dict(b)) => a == b,
            (PDFObject::Reference(a), PDFObject::Reference(b)) => a == b,
            (PDFObject::Raw(a), PDFObject::Raw(b)) => a == b,
            (PDFObject::Stream(a), PDFObject::Stream(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PDFObject {
    pub fn as_number(&self) -> Option<PDFNumber> {
        match self {
            PDFObject::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            PDFObject::Name(n) => Some(n.as_str()),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            PDFObject::Dict(d) => Some(d),
            PDFObject::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PDFObject]> {
        match self {
            PDFObject::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<Reference> {
        match self {
            PDFObject::Reference(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&Rc<Stream>> {
        match self {
            PDFObject::Stream(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&PDFString> {
        match self {
            PDFObject::String(s) => Some(s),
            _ => None,
        }
    }

    /// Render to canonical bytes per §4.2.
    pub fn serialize(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        self.serialize_at(&mut w, 0, false);
        w.into_vec()
    }

    /// `compact` is true once any `Array` ancestor has been entered — dicts
    /// nested inside arrays stay single-line for their whole subtree, while
    /// dicts reached only through other dicts keep pretty-printing with
    /// 2-space-per-depth indentation (§4.2: "dictionaries pretty-printed on
    /// independent lines only at the top level; compact inside arrays").
    fn serialize_at(&self, w: &mut ByteWriter, depth: usize, compact: bool) {
        match self {
            PDFObject::Null => w.push_str("null"),
            PDFObject::Bool(true) => w.push_str("true"),
            PDFObject::Bool(false) => w.push_str("false"),
            PDFObject::Number(n) => n.serialize(w),
            PDFObject::Name(n) => serialize_name(n.as_str(), w),
            PDFObject::String(s) => s.serialize(w),
            PDFObject::Array(items) => {
                w.push(b'[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        w.push(b' ');
                    }
                    item.serialize_at(w, depth, true);
                }
                w.push(b']');
            }
            PDFObject::Dict(d) => d.serialize(w, depth, compact),
            PDFObject::Stream(s) => s.serialize(w, depth),
            PDFObject::Reference(r) => {
                w.push_uint(r.object_number as u64);
                w.push(b' ');
                w.push_uint(r.generation as u64);
                w.push_str(" R");
            }
            PDFObject::Raw(bytes) => w.extend(bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_numbers_without_exponent() {
        assert_eq!(PDFObject::Number(PDFNumber::Int(42)).serialize(), b"42");
        assert_eq!(PDFObject::Number(PDFNumber::Real(1.5)).serialize(), b"1.5");
        assert_eq!(PDFObject::Number(PDFNumber::Real(3.0)).serialize(), b"3");
        assert_eq!(PDFObject::Number(PDFNumber::Real(0.100)).serialize(), b"0.1");
    }

    #[test]
    fn escapes_names_outside_printable_range() {
        let name = Name::from("A B#");
        assert_eq!(PDFObject::Name(name).serialize(), b"/A#20B#23");
    }

    #[test]
    fn hex_string_is_uppercase() {
        let s = PDFString::Hex(vec![0xde, 0xad]);
        assert_eq!(PDFObject::String(s).serialize(), b"<DEAD>");
    }

    #[test]
    fn reference_round_trip_format() {
        let r = Reference::new(3, 0);
        assert_eq!(PDFObject::Reference(r).serialize(), b"3 0 R");
    }

    #[test]
    fn array_forces_compact_nested_dicts() {
        let mut inner = Dictionary::new();
        inner.insert("A", PDFObject::Number(PDFNumber::Int(1)));
        let arr = PDFObject::Array(vec![PDFObject::Dict(inner)]);
        assert_eq!(arr.serialize(), b"[<< /A 1 >>]");
    }

    #[test]
    fn top_level_dict_pretty_prints() {
        let mut dict = Dictionary::new();
        dict.insert("A", PDFObject::Number(PDFNumber::Int(1)));
        dict.insert("B", PDFObject::Bool(true));
        let out = String::from_utf8(PDFObject::Dict(dict).serialize()).unwrap();
        assert_eq!(out, "<<\n  /A 1\n  /B true\n>>");
    }

    #[test]
    fn dictionary_insert_overwrites_in_place() {
        let mut dict = Dictionary::new();
        dict.insert("A", PDFObject::Number(PDFNumber::Int(1)));
        dict.insert("B", PDFObject::Number(PDFNumber::Int(2)));
        dict.insert("A", PDFObject::Number(PDFNumber::Int(9)));
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get("A"), Some(&PDFObject::Number(PDFNumber::Int(9))));
    }
}
