//! Stream filter pipeline (§4.5). Decoding applies the `/Filter` list
//! left-to-right; encoding applies it right-to-left. Each filter is a pure
//! `decode`/`encode` pair over byte slices plus optional parameters.

mod ascii85;
mod asciihex;
mod flate;
mod lzw;
mod predictor;
mod runlength;

use crate::error::Result;
use crate::objects::Dictionary;

/// Decodes `input` through one named filter, applying its `/DecodeParms`
/// (image codecs are pass-through: the core does not decode image payloads).
pub(crate) fn decode_one(filter: &str, input: &[u8], params: Option<&Dictionary>) -> Result<Vec<u8>> {
    match filter {
        "ASCIIHexDecode" | "AHx" => asciihex::decode(input),
        "ASCII85Decode" | "A85" => ascii85::decode(input),
        "FlateDecode" | "Fl" => flate::decode(input, params),
        "LZWDecode" | "LZW" => lzw::decode(input, params),
        "RunLengthDecode" | "RL" => runlength::decode(input),
        "DCTDecode" | "DCT" | "JPXDecode" | "JBIG2Decode" | "CCITTFaxDecode" | "CCF" => Ok(input.to_vec()),
        other => {
            log::warn!("unrecognised filter {}, passing through unchanged", other);
            Ok(input.to_vec())
        }
    }
}

pub(crate) fn encode_one(filter: &str, input: &[u8], params: Option<&Dictionary>) -> Result<Vec<u8>> {
    match filter {
        "ASCIIHexDecode" | "AHx" => Ok(asciihex::encode(input)),
        "ASCII85Decode" | "A85" => Ok(ascii85::encode(input)),
        "FlateDecode" | "Fl" => flate::encode(input, params),
        "LZWDecode" | "LZW" => lzw::encode(input, params),
        "RunLengthDecode" | "RL" => Ok(runlength::encode(input)),
        "DCTDecode" | "DCT" | "JPXDecode" | "JBIG2Decode" | "CCITTFaxDecode" | "CCF" => Ok(input.to_vec()),
        other => {
            log::warn!("unrecognised filter {}, passing through unchanged", other);
            Ok(input.to_vec())
        }
    }
}

/// Runs `names` left-to-right over `input`, pairing each with its aligned
/// `/DecodeParms` entry (or `None` if that position has none).
pub(crate) fn decode_chain(names: &[String], parms: &[Option<&Dictionary>], input: &[u8]) -> Result<Vec<u8>> {
    let mut data = input.to_vec();
    for (i, name) in names.iter().enumerate() {
        let p = parms.get(i).copied().flatten();
        data = decode_one(name, &data, p)?;
    }
    Ok(data)
}

pub(crate) fn encode_chain(names: &[String], parms: &[Option<&Dictionary>], input: &[u8]) -> Result<Vec<u8>> {
    let mut data = input.to_vec();
    for (i, name) in names.iter().enumerate().rev() {
        let p = parms.get(i).copied().flatten();
        data = encode_one(name, &data, p)?;
    }
    Ok(data)
}
