//! Signature placeholder machinery (§4.9): fixed-width `/ByteRange` and
//! `/Contents` placeholders, the post-write scan that locates them, the
//! `ByteRange` computation, and in-place patching once a signer has
//! produced the CMS/DER blob. The signer itself is a caller-supplied
//! closure — it lives outside the core, same as any external fetcher.

use std::ops::Range;

use crate::error::{PDFError, Result};
use crate::objects::PDFObject;

/// The literal bytes `scan_placeholders` searches for: the full
/// `/ByteRange <value>` pair as it appears once written (key, one space,
/// three ten-character numeric fields). Three ten-character numeric fields,
/// `offset1` fixed at `0` since the signed data always starts at the
/// beginning of the file.
pub const BYTE_RANGE_PLACEHOLDER: &[u8] = b"/ByteRange [0 ********** ********** **********]";

/// `BYTE_RANGE_PLACEHOLDER` with the `/ByteRange ` key prefix stripped —
/// just the array value, for callers building the dictionary entry
/// themselves via [`byte_range_placeholder_object`].
const BYTE_RANGE_VALUE_PLACEHOLDER: &[u8] = b"[0 ********** ********** **********]";

const BYTE_RANGE_FIELD_WIDTH: usize = 10;

/// Returns a fresh copy of the full `/ByteRange <value>` placeholder bytes
/// (key included), matching what `scan_placeholders` looks for on disk.
pub fn byte_range_placeholder() -> Vec<u8> {
    BYTE_RANGE_PLACEHOLDER.to_vec()
}

/// The placeholder array as a [`PDFObject::Raw`] *value*, ready to insert
/// into a signature dictionary under the `/ByteRange` key — `Dictionary`'s
/// own serialisation supplies the key and the single separating space, so
/// together they reproduce `BYTE_RANGE_PLACEHOLDER` exactly.
pub fn byte_range_placeholder_object() -> PDFObject {
    PDFObject::Raw(BYTE_RANGE_VALUE_PLACEHOLDER.to_vec())
}

/// Width in bytes of a `/Contents` placeholder capable of holding a
/// `capacity`-byte signature: `<` + `2*capacity` hex digits + `>`.
pub fn contents_placeholder_width(capacity: usize) -> usize {
    2 * capacity + 2
}

/// Returns the `/Contents` placeholder value bytes: a hex string of zeros
/// sized for a signature of up to `capacity` bytes.
pub fn contents_placeholder(capacity: usize) -> Vec<u8> {
    let mut buf = Vec::with_capacity(contents_placeholder_width(capacity));
    buf.push(b'<');
    buf.extend(std::iter::repeat(b'0').take(2 * capacity));
    buf.push(b'>');
    buf
}

/// The placeholder as a [`PDFObject::Raw`] value, ready to insert into a
/// signature dictionary under the `/Contents` key.
pub fn contents_placeholder_object(capacity: usize) -> PDFObject {
    PDFObject::Raw(contents_placeholder(capacity))
}

/// The four-number tuple a signed file's `/ByteRange` array holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub offset1: u64,
    pub length1: u64,
    pub offset2: u64,
    pub length2: u64,
}

/// Byte spans located by [`scan_placeholders`]: the full `/ByteRange ...`
/// text, and the `/Contents` value's hex digits (excluding the angle
/// brackets — `contents_value_start`/`length` in §4.9's own terms).
#[derive(Debug, Clone)]
pub(crate) struct PlaceholderSpans {
    pub(crate) byte_range_span: Range<usize>,
    pub(crate) contents_value_span: Range<usize>,
}

/// Scans `bytes` for one `/ByteRange` placeholder and one `/Contents`
/// placeholder, returning their exact spans. Fails with
/// [`PDFError::PlaceholderError`] if either is missing or malformed.
pub(crate) fn scan_placeholders(bytes: &[u8]) -> Result<PlaceholderSpans> {
    let byte_range_start = find(bytes, BYTE_RANGE_PLACEHOLDER, 0).ok_or_else(|| PDFError::PlaceholderError {
        message: "no /ByteRange placeholder found".to_string(),
        required: None,
        available: None,
    })?;
    let byte_range_span = byte_range_start..byte_range_start + BYTE_RANGE_PLACEHOLDER.len();

    let key = b"/Contents <";
    let key_start = find(bytes, key, 0).ok_or_else(|| PDFError::PlaceholderError {
        message: "no /Contents placeholder found".to_string(),
        required: None,
        available: None,
    })?;
    let lt_pos = key_start + key.len() - 1;
    let digits_start = lt_pos + 1;
    let mut digits_end = digits_start;
    while bytes.get(digits_end) == Some(&b'0') {
        digits_end += 1;
    }
    if bytes.get(digits_end) != Some(&b'>') || digits_end == digits_start {
        return Err(PDFError::PlaceholderError {
            message: "malformed /Contents placeholder".to_string(),
            required: None,
            available: None,
        });
    }

    Ok(PlaceholderSpans {
        byte_range_span,
        contents_value_span: digits_start..digits_end,
    })
}

/// Computes the `ByteRange` tuple per §4.9 step 2: the signed data is
/// everything in `bytes` except the `/Contents` hex value itself.
fn compute_byte_range(total_len: usize, contents_value_span: &Range<usize>) -> ByteRange {
    let contents_value_start = contents_value_span.start;
    let contents_value_length = contents_value_span.len();
    let length1 = (contents_value_start - 1) as u64;
    let offset2 = (contents_value_start + contents_value_length + 1) as u64;
    let length2 = total_len as u64 - offset2;
    ByteRange { offset1: 0, length1, offset2, length2 }
}

/// Patches `/ByteRange` in place, right-padding each numeric field to fit
/// the fixed 47-byte width established at placeholder time.
fn patch_byte_range(bytes: &mut [u8], span: Range<usize>, range: &ByteRange) -> Result<()> {
    let text = format!(
        "/ByteRange [0 {:<w$} {:<w$} {:<w$}]",
        range.length1,
        range.offset2,
        range.length2,
        w = BYTE_RANGE_FIELD_WIDTH,
    );
    let text = text.into_bytes();
    if text.len() != span.len() {
        return Err(PDFError::InvariantViolation("computed /ByteRange does not fit the placeholder width"));
    }
    bytes[span.start..span.end].copy_from_slice(&text);
    Ok(())
}

/// Patches `/Contents` in place: uppercase hex of `signature`, zero-padded
/// out to the placeholder's capacity.
fn patch_contents(bytes: &mut [u8], span: Range<usize>, signature: &[u8]) -> Result<()> {
    let capacity = span.len() / 2;
    if signature.len() > capacity {
        return Err(PDFError::PlaceholderError {
            message: "signature exceeds /Contents placeholder capacity".to_string(),
            required: Some(signature.len()),
            available: Some(capacity),
        });
    }
    let mut hex = String::with_capacity(span.len());
    for byte in signature {
        hex.push_str(&format!("{:02X}", byte));
    }
    hex.extend(std::iter::repeat('0').take(span.len() - hex.len()));
    bytes[span.start..span.end].copy_from_slice(hex.as_bytes());
    Ok(())
}

/// Runs the full §4.9 flow against a freshly written buffer that already
/// contains one `/ByteRange` and one `/Contents` placeholder: scans for
/// the placeholders, patches `/ByteRange`, hands the signed-data slices to
/// `signer`, and patches `/Contents` with the result. Neither patch
/// changes `bytes.len()`.
pub fn sign_in_place<F>(bytes: &mut [u8], signer: F) -> Result<ByteRange>
where
    F: FnOnce(&[u8]) -> Result<Vec<u8>>,
{
    let spans = scan_placeholders(bytes)?;
    let range = compute_byte_range(bytes.len(), &spans.contents_value_span);
    patch_byte_range(bytes, spans.byte_range_span.clone(), &range)?;

    let mut signed_data = Vec::with_capacity((range.length1 + range.length2) as usize);
    signed_data.extend_from_slice(&bytes[0..range.length1 as usize]);
    signed_data.extend_from_slice(&bytes[range.offset2 as usize..(range.offset2 + range.length2) as usize]);

    let signature = signer(&signed_data)?;
    patch_contents(bytes, spans.contents_value_span, &signature)?;
    Ok(range)
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..].windows(needle.len()).position(|w| w == needle).map(|rel| from + rel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_range_placeholder_is_exactly_47_bytes() {
        assert_eq!(BYTE_RANGE_PLACEHOLDER.len(), 47);
    }

    #[test]
    fn contents_placeholder_width_is_2n_plus_2() {
        assert_eq!(contents_placeholder(1024).len(), 2050);
        assert_eq!(contents_placeholder_width(1024), 2050);
    }

    /// `byte_range_placeholder_object` returns a dictionary *value*; once a
    /// `Dictionary` supplies the `/ByteRange` key and separating space, the
    /// two must reproduce `BYTE_RANGE_PLACEHOLDER` byte-for-byte so
    /// `scan_placeholders` finds it after a normal object write.
    #[test]
    fn byte_range_object_round_trips_through_dictionary_serialization() {
        let mut dict = crate::objects::Dictionary::new();
        dict.insert("ByteRange", byte_range_placeholder_object());
        let rendered = PDFObject::Dict(dict).serialize();
        let text = String::from_utf8(rendered).unwrap();
        assert!(text.contains(std::str::from_utf8(BYTE_RANGE_PLACEHOLDER).unwrap()));
    }

    fn synthetic_document() -> Vec<u8> {
        let mut doc = Vec::new();
        doc.extend_from_slice(b"%PDF-1.7\n1 0 obj\n<< ");
        doc.extend_from_slice(BYTE_RANGE_PLACEHOLDER);
        doc.extend_from_slice(b" /Contents ");
        doc.extend_from_slice(&contents_placeholder(8));
        doc.extend_from_slice(b" >>\nendobj\n%%EOF");
        doc
    }

    #[test]
    fn signs_in_place_preserving_length() {
        let mut doc = synthetic_document();
        let original_len = doc.len();
        let range = sign_in_place(&mut doc, |data| {
            assert!(!data.is_empty());
            Ok(vec![0xDE, 0xAD, 0xBE, 0xEF])
        })
        .unwrap();

        assert_eq!(doc.len(), original_len);
        assert_eq!(range.offset1, 0);
        assert_eq!(range.length1 + range.length2, (original_len as u64) - (16 + 2));

        let text = String::from_utf8_lossy(&doc);
        assert!(text.contains("/ByteRange [0 "));
        assert!(text.contains("DEADBEEF"));
        assert!(!text.contains('*'));
    }

    #[test]
    fn rejects_signature_larger_than_capacity() {
        let mut doc = synthetic_document();
        let err = sign_in_place(&mut doc, |_| Ok(vec![0u8; 64])).unwrap_err();
        match err {
            PDFError::PlaceholderError { required, available, .. } => {
                assert_eq!(required, Some(64));
                assert_eq!(available, Some(8));
            }
            other => panic!("expected PlaceholderError, got {:?}", other),
        }
    }

    #[test]
    fn missing_placeholder_is_an_error() {
        let mut doc = b"no placeholders here".to_vec();
        let err = sign_in_place(&mut doc, |_| Ok(vec![1, 2, 3])).unwrap_err();
        assert!(matches!(err, PDFError::PlaceholderError { .. }));
    }
}
