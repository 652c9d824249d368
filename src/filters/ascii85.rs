//! `ASCII85Decode` / `ASCII85Encode` (§4.5).

use crate::bytes::is_pdf_whitespace;
use crate::error::{PDFError, Result};

const OFFSET: u32 = b'!' as u32;

/// Accepts the `z` shortcut for four zero bytes, skips whitespace, stops at
/// `~>`, and pads a partial final group per the standard formula.
pub(crate) fn decode(input: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len() * 4 / 5);
    let mut group = [0u8; 5];
    let mut count = 0usize;
    let mut i = 0usize;
    while i < input.len() {
        let b = input[i];
        if b == b'~' {
            break;
        }
        if is_pdf_whitespace(b) {
            i += 1;
            continue;
        }
        if b == b'z' && count == 0 {
            out.extend_from_slice(&[0, 0, 0, 0]);
            i += 1;
            continue;
        }
        if !(b'!'..=b'u').contains(&b) {
            return Err(PDFError::filter("ASCII85Decode", format!("byte {:#x} out of range", b)));
        }
        group[count] = b;
        count += 1;
        i += 1;
        if count == 5 {
            decode_group(&group, 5, &mut out)?;
            count = 0;
        }
    }
    if count > 0 {
        if count == 1 {
            return Err(PDFError::filter("ASCII85Decode", "final group has only one byte"));
        }
        for slot in group.iter_mut().skip(count) {
            *slot = b'u';
        }
        decode_group(&group, count, &mut out)?;
    }
    Ok(out)
}

fn decode_group(group: &[u8; 5], count: usize, out: &mut Vec<u8>) -> Result<()> {
    let mut value: u64 = 0;
    for &b in group {
        let digit = b as u32 - OFFSET;
        value = value * 85 + digit as u64;
    }
    if value > u32::MAX as u64 {
        return Err(PDFError::filter("ASCII85Decode", "group overflows 32 bits"));
    }
    let bytes = (value as u32).to_be_bytes();
    out.extend_from_slice(&bytes[..count - 1]);
    Ok(())
}

/// Encodes with the `z` shortcut for four zero bytes, terminated by `~>`.
pub(crate) fn encode(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() * 5 / 4 + 2);
    for chunk in input.chunks(4) {
        if chunk.len() == 4 && chunk == [0, 0, 0, 0] {
            out.push(b'z');
            continue;
        }
        let mut buf = [0u8; 4];
        buf[..chunk.len()].copy_from_slice(chunk);
        let value = u32::from_be_bytes(buf);
        let mut digits = [0u8; 5];
        let mut v = value;
        for d in digits.iter_mut().rev() {
            *d = (v % 85) as u8;
            v /= 85;
        }
        let n = chunk.len() + 1;
        for &d in &digits[..n] {
            out.push(d + OFFSET as u8);
        }
    }
    out.extend_from_slice(b"~>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_arbitrary_bytes() {
        let data = b"Man is distinguished";
        let encoded = encode(data);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn z_shortcut_round_trips_zero_run() {
        let data = [0u8; 8];
        let encoded = encode(&data);
        assert_eq!(encoded, b"zz~>");
        assert_eq!(decode(&encoded).unwrap(), data);
    }

    #[test]
    fn decode_stops_at_terminator() {
        let encoded = encode(b"hi");
        assert_eq!(decode(&encoded).unwrap(), b"hi");
    }
}
