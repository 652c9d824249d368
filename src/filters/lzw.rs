//! `LZWDecode` / `LZWEncode` (§4.5): variable-width codes (9..12 bits), PDF's
//! `/EarlyChange` convention (default 1: the table grows one code early).

use crate::error::{PDFError, Result};
use crate::objects::Dictionary;

const CLEAR_CODE: u16 = 256;
const EOD_CODE: u16 = 257;
const FIRST_FREE_CODE: u16 = 258;

fn early_change(params: Option<&Dictionary>) -> i64 {
    params
        .and_then(|p| p.get("EarlyChange"))
        .and_then(|o| o.as_number())
        .and_then(|n| n.as_i64())
        .unwrap_or(1)
}

struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    fn read(&mut self, width: u32) -> Option<u16> {
        let mut value: u32 = 0;
        for _ in 0..width {
            let byte_idx = self.bit_pos / 8;
            if byte_idx >= self.data.len() {
                return None;
            }
            let bit_idx = 7 - (self.bit_pos % 8);
            let bit = (self.data[byte_idx] >> bit_idx) & 1;
            value = (value << 1) | bit as u32;
            self.bit_pos += 1;
        }
        Some(value as u16)
    }
}

struct BitWriter {
    out: Vec<u8>,
    cur: u32,
    bits: u32,
}

impl BitWriter {
    fn new() -> Self {
        Self { out: Vec::new(), cur: 0, bits: 0 }
    }

    fn write(&mut self, value: u16, width: u32) {
        self.cur = (self.cur << width) | value as u32;
        self.bits += width;
        while self.bits >= 8 {
            let shift = self.bits - 8;
            self.out.push((self.cur >> shift) as u8);
            self.bits -= 8;
            self.cur &= (1 << self.bits) - 1;
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.bits > 0 {
            let pad = 8 - self.bits;
            self.out.push((self.cur << pad) as u8);
        }
        self.out
    }
}

pub(crate) fn decode(input: &[u8], params: Option<&Dictionary>) -> Result<Vec<u8>> {
    let early = early_change(params);
    let mut reader = BitReader::new(input);
    let mut table: Vec<Vec<u8>> = Vec::new();
    let mut out = Vec::new();
    let mut code_width = 9u32;
    let mut prev: Option<Vec<u8>> = None;

    let reset_table = |table: &mut Vec<Vec<u8>>| {
        table.clear();
        for i in 0..256u16 {
            table.push(vec![i as u8]);
        }
        table.push(Vec::new()); // CLEAR_CODE placeholder
        table.push(Vec::new()); // EOD_CODE placeholder
    };
    reset_table(&mut table);

    loop {
        let Some(code) = reader.read(code_width) else { break };
        if code == CLEAR_CODE {
            reset_table(&mut table);
            code_width = 9;
            prev = None;
            continue;
        }
        if code == EOD_CODE {
            break;
        }
        let entry = if (code as usize) < table.len() {
            table[code as usize].clone()
        } else if code as usize == table.len() {
            let mut e = prev.clone().ok_or_else(|| {
                PDFError::filter("LZWDecode", "code references entry not yet in table")
            })?;
            let first = e[0];
            e.push(first);
            e
        } else {
            return Err(PDFError::filter("LZWDecode", "invalid LZW code"));
        };
        out.extend_from_slice(&entry);
        if let Some(prev_entry) = &prev {
            let mut new_entry = prev_entry.clone();
            new_entry.push(entry[0]);
            table.push(new_entry);
        }
        prev = Some(entry);

        let threshold = table.len() as i64 + early - 1;
        if threshold >= 2047 {
            code_width = 12;
        } else if threshold >= 1023 {
            code_width = 11;
        } else if threshold >= 511 {
            code_width = 10;
        } else {
            code_width = 9;
        }
    }
    Ok(out)
}

pub(crate) fn encode(input: &[u8], params: Option<&Dictionary>) -> Result<Vec<u8>> {
    let early = early_change(params);
    let mut table: std::collections::HashMap<Vec<u8>, u16> = std::collections::HashMap::new();
    let reset_table = |table: &mut std::collections::HashMap<Vec<u8>, u16>| {
        table.clear();
        for i in 0..256u16 {
            table.insert(vec![i as u8], i);
        }
    };
    reset_table(&mut table);
    let mut next_code = FIRST_FREE_CODE;
    let mut code_width = 9u32;
    let mut writer = BitWriter::new();
    writer.write(CLEAR_CODE, code_width);

    let mut current: Vec<u8> = Vec::new();
    for &byte in input {
        let mut extended = current.clone();
        extended.push(byte);
        if table.contains_key(&extended) {
            current = extended;
        } else {
            let code = *table.get(&current).expect("prefix always present");
            writer.write(code, code_width);
            table.insert(extended, next_code);
            next_code += 1;
            let threshold = next_code as i64 + early - 1;
            code_width = if threshold >= 2048 {
                12
            } else if threshold >= 1024 {
                11
            } else if threshold >= 512 {
                10
            } else {
                9
            };
            if next_code >= 4094 {
                writer.write(CLEAR_CODE, code_width);
                reset_table(&mut table);
                next_code = FIRST_FREE_CODE;
                code_width = 9;
            }
            current = vec![byte];
        }
    }
    if !current.is_empty() {
        let code = *table.get(&current).expect("prefix always present");
        writer.write(code, code_width);
    }
    writer.write(EOD_CODE, code_width);
    Ok(writer.finish())
}
