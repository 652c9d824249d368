//! `FlateDecode` / `FlateEncode` (§4.5): zlib-wrapped deflate, with PNG/TIFF
//! predictor post-processing when `/Predictor` requests it.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use super::predictor::PredictorParams;
use crate::error::{PDFError, Result};
use crate::objects::Dictionary;

fn read_predictor_params(params: Option<&Dictionary>) -> PredictorParams {
    let mut p = PredictorParams::default();
    let Some(params) = params else { return p };
    if let Some(n) = params.get("Predictor").and_then(|o| o.as_number()).and_then(|n| n.as_i64()) {
        p.predictor = n;
    }
    if let Some(n) = params.get("Columns").and_then(|o| o.as_number()).and_then(|n| n.as_i64()) {
        p.columns = n.max(1) as usize;
    }
    if let Some(n) = params.get("Colors").and_then(|o| o.as_number()).and_then(|n| n.as_i64()) {
        p.colors = n.max(1) as usize;
    }
    if let Some(n) = params.get("BitsPerComponent").and_then(|o| o.as_number()).and_then(|n| n.as_i64()) {
        p.bits_per_component = n.max(1) as usize;
    }
    p
}

pub(crate) fn decode(input: &[u8], params: Option<&Dictionary>) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(input);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| PDFError::filter("FlateDecode", e.to_string()))?;
    let p = read_predictor_params(params);
    if p.predictor >= 2 {
        out = super::predictor::reverse(&out, &p)?;
    }
    Ok(out)
}

pub(crate) fn encode(input: &[u8], params: Option<&Dictionary>) -> Result<Vec<u8>> {
    let p = read_predictor_params(params);
    let data = if p.predictor >= 2 { super::predictor::apply(input, &p)? } else { input.to_vec() };
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&data)
        .map_err(|e| PDFError::filter("FlateDecode", e.to_string()))?;
    encoder.finish().map_err(|e| PDFError::filter("FlateDecode", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_without_predictor() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let encoded = encode(data, None).unwrap();
        let decoded = decode(&encoded, None).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn round_trips_with_tiff_predictor() {
        let mut parms = Dictionary::new();
        parms.insert("Predictor", crate::objects::PDFObject::Number(crate::objects::PDFNumber::Int(2)));
        parms.insert("Columns", crate::objects::PDFObject::Number(crate::objects::PDFNumber::Int(4)));
        parms.insert("Colors", crate::objects::PDFObject::Number(crate::objects::PDFNumber::Int(1)));
        let data = [1u8, 2, 3, 4, 10, 10, 10, 10];
        let encoded = encode(&data, Some(&parms)).unwrap();
        let decoded = decode(&encoded, Some(&parms)).unwrap();
        assert_eq!(decoded, data);
    }
}
