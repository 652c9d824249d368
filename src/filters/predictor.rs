//! PNG (`/Predictor >= 10`) and TIFF (`/Predictor == 2`) row predictors
//! applied after Flate/LZW decode and reversed before encode (§4.5).

use crate::error::{PDFError, Result};

#[derive(Debug, Clone, Copy)]
pub(crate) struct PredictorParams {
    pub predictor: i64,
    pub columns: usize,
    pub colors: usize,
    pub bits_per_component: usize,
}

impl Default for PredictorParams {
    fn default() -> Self {
        Self { predictor: 1, columns: 1, colors: 1, bits_per_component: 8 }
    }
}

impl PredictorParams {
    fn bytes_per_pixel(&self) -> usize {
        ((self.colors * self.bits_per_component) + 7) / 8
    }

    fn row_bytes(&self) -> usize {
        (self.columns * self.colors * self.bits_per_component + 7) / 8
    }
}

pub(crate) fn reverse(data: &[u8], p: &PredictorParams) -> Result<Vec<u8>> {
    if p.predictor == 1 {
        return Ok(data.to_vec());
    }
    if p.predictor == 2 {
        return Ok(reverse_tiff(data, p));
    }
    reverse_png(data, p)
}

pub(crate) fn apply(data: &[u8], p: &PredictorParams) -> Result<Vec<u8>> {
    if p.predictor == 1 {
        return Ok(data.to_vec());
    }
    if p.predictor == 2 {
        return Ok(apply_tiff(data, p));
    }
    // PNG predictors: encode with filter type 0 (None) per row, which is
    // always valid, if less compact than choosing per-row heuristically.
    let row_len = p.row_bytes();
    let mut out = Vec::with_capacity(data.len() + data.len() / row_len.max(1) + 1);
    for row in data.chunks(row_len) {
        out.push(0);
        out.extend_from_slice(row);
    }
    Ok(out)
}

fn reverse_tiff(data: &[u8], p: &PredictorParams) -> Vec<u8> {
    if p.bits_per_component != 8 {
        return data.to_vec();
    }
    let row_len = p.row_bytes();
    let bpp = p.bytes_per_pixel();
    let mut out = data.to_vec();
    for row in out.chunks_mut(row_len) {
        for i in bpp..row.len() {
            row[i] = row[i].wrapping_add(row[i - bpp]);
        }
    }
    out
}

fn apply_tiff(data: &[u8], p: &PredictorParams) -> Vec<u8> {
    if p.bits_per_component != 8 {
        return data.to_vec();
    }
    let row_len = p.row_bytes();
    let bpp = p.bytes_per_pixel();
    let mut out = data.to_vec();
    for row in out.chunks_mut(row_len) {
        for i in (bpp..row.len()).rev() {
            row[i] = row[i].wrapping_sub(row[i - bpp]);
        }
    }
    out
}

fn reverse_png(data: &[u8], p: &PredictorParams) -> Result<Vec<u8>> {
    let row_len = p.row_bytes();
    let bpp = p.bytes_per_pixel().max(1);
    let mut out = Vec::with_capacity(data.len());
    let mut prev = vec![0u8; row_len];
    let mut i = 0;
    while i < data.len() {
        if i + 1 + row_len > data.len() {
            return Err(PDFError::filter("Predictor", "truncated row in PNG-predicted stream"));
        }
        let filter_type = data[i];
        let row = &data[i + 1..i + 1 + row_len];
        let mut current = row.to_vec();
        for x in 0..row_len {
            let a = if x >= bpp { current[x - bpp] } else { 0 };
            let b = prev[x];
            let c = if x >= bpp { prev[x - bpp] } else { 0 };
            let recon = match filter_type {
                0 => current[x],
                1 => current[x].wrapping_add(a),
                2 => current[x].wrapping_add(b),
                3 => current[x].wrapping_add(((a as u16 + b as u16) / 2) as u8),
                4 => current[x].wrapping_add(paeth(a, b, c)),
                other => {
                    return Err(PDFError::filter("Predictor", format!("unknown PNG filter type {}", other)));
                }
            };
            current[x] = recon;
        }
        out.extend_from_slice(&current);
        prev = current;
        i += 1 + row_len;
    }
    Ok(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let (a, b, c) = (a as i32, b as i32, c as i32);
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();
    if pa <= pb && pa <= pc {
        a as u8
    } else if pb <= pc {
        b as u8
    } else {
        c as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_predictor_is_identity() {
        let p = PredictorParams { predictor: 1, ..Default::default() };
        assert_eq!(reverse(b"abc", &p).unwrap(), b"abc");
    }

    #[test]
    fn tiff_predictor_round_trips() {
        let p = PredictorParams { predictor: 2, columns: 3, colors: 1, bits_per_component: 8 };
        let original = [10u8, 20, 5];
        let applied = apply_tiff(&original, &p);
        let restored = reverse_tiff(&applied, &p);
        assert_eq!(restored, original);
    }

    #[test]
    fn png_sub_filter_reverses() {
        let p = PredictorParams { predictor: 10, columns: 3, colors: 1, bits_per_component: 8 };
        // row: filter type 1 (Sub), raw deltas [10, 5, 5] over pixel width 1
        let encoded = [1u8, 10, 5, 5];
        let decoded = reverse_png(&encoded, &p).unwrap();
        assert_eq!(decoded, vec![10, 15, 20]);
    }
}
