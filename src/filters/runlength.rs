//! `RunLengthDecode` / `RunLengthEncode` (§4.5): byte-count protocol, `128`
//! marks end-of-data.

use crate::error::{PDFError, Result};

pub(crate) fn decode(input: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len() * 2);
    let mut i = 0;
    while i < input.len() {
        let length = input[i];
        i += 1;
        if length == 128 {
            break;
        } else if length < 128 {
            let count = length as usize + 1;
            let end = i + count;
            if end > input.len() {
                return Err(PDFError::filter("RunLengthDecode", "literal run exceeds input"));
            }
            out.extend_from_slice(&input[i..end]);
            i = end;
        } else {
            let count = 257 - length as usize;
            if i >= input.len() {
                return Err(PDFError::filter("RunLengthDecode", "replicated run missing byte"));
            }
            let b = input[i];
            i += 1;
            out.extend(std::iter::repeat(b).take(count));
        }
    }
    Ok(out)
}

pub(crate) fn encode(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() + input.len() / 64 + 2);
    let mut i = 0;
    while i < input.len() {
        let run_len = input[i..].iter().take_while(|&&b| b == input[i]).count();
        if run_len >= 2 {
            let run_len = run_len.min(128);
            out.push((257 - run_len) as u8);
            out.push(input[i]);
            i += run_len;
        } else {
            let start = i;
            let mut len = 1;
            i += 1;
            while i < input.len() && len < 128 {
                let next_run = input[i..].iter().take_while(|&&b| b == input[i]).count();
                if next_run >= 2 {
                    break;
                }
                len += 1;
                i += 1;
            }
            out.push((len - 1) as u8);
            out.extend_from_slice(&input[start..start + len]);
        }
    }
    out.push(128);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_mixed_runs() {
        let data = b"aaaaabcdefg";
        let encoded = encode(data);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn decode_stops_at_eod_marker() {
        let mut encoded = encode(b"hi");
        encoded.extend_from_slice(b"\x00z-should-be-ignored");
        assert_eq!(decode(&encoded).unwrap(), b"hi");
    }
}
