//! `ASCIIHexDecode` / `ASCIIHexEncode` (§4.5).

use crate::bytes::is_pdf_whitespace;
use crate::error::Result;

/// Stops at `>`, skips PDF whitespace, pads an odd trailing nibble with `0`,
/// and silently skips any non-hex byte (lenient, per §4.5).
pub(crate) fn decode(input: &[u8]) -> Result<Vec<u8>> {
    let mut digits = Vec::with_capacity(input.len());
    for &b in input {
        if b == b'>' {
            break;
        }
        if is_pdf_whitespace(b) || !b.is_ascii_hexdigit() {
            continue;
        }
        digits.push(b);
    }
    Ok(crate::bytes::hex2bytes(&digits))
}

/// Uppercase hex, terminated by `>`.
pub(crate) fn encode(input: &[u8]) -> Vec<u8> {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = Vec::with_capacity(input.len() * 2 + 1);
    for &b in input {
        out.push(HEX[(b >> 4) as usize]);
        out.push(HEX[(b & 0x0f) as usize]);
    }
    out.push(b'>');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_with_whitespace_and_odd_nibble() {
        let out = decode(b"9 0 a f 1>").unwrap();
        assert_eq!(out, vec![0x90, 0xaf, 0x10]);
    }

    #[test]
    fn encode_decode_round_trip() {
        let data = b"\x00\x01\xfe\xff";
        let encoded = encode(data);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn decode_skips_non_hex_bytes() {
        let out = decode(b"9g0>").unwrap();
        assert_eq!(out, vec![0x90]);
    }
}
