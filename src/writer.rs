//! Writer (§4.7 complete write, §4.8 incremental write).

use std::collections::{HashMap, HashSet, VecDeque};

use crate::bytes::ByteWriter;
use crate::constants;
use crate::error::{PDFError, Result};
use crate::filters;
use crate::objects::{Dictionary, PDFObject, Reference, Stream};
use crate::registry::Registry;
use crate::vpdf::PDFVersion;

/// Writer-behaviour knobs threaded in by the caller (SPEC_FULL §B: no env
/// vars or config files — options are a plain struct, per the teacher's
/// pattern of passing small option structs rather than reading ambient
/// state).
#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub compress_streams: bool,
    pub use_xref_stream: bool,
    pub pdf_version: PDFVersion,
    /// If true, reachable objects are renumbered contiguously from 1 in BFS
    /// discovery order; if false (the default), existing object numbers are
    /// preserved (§4.7 step 2: "The default is preserve.").
    pub renumber_objects: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            compress_streams: true,
            use_xref_stream: false,
            pdf_version: PDFVersion::V1_7,
            renumber_objects: false,
        }
    }
}

/// BFS from `roots` through every reference reachable via dictionaries,
/// arrays, and stream dictionaries (§4.7 step 1). Returns object numbers in
/// discovery order (first-seen order), which matters when renumbering.
fn reachable_objects(registry: &mut Registry, roots: &[Reference]) -> Result<Vec<u32>> {
    let mut seen = HashSet::new();
    let mut order = Vec::new();
    let mut queue: VecDeque<Reference> = roots.iter().copied().collect();
    while let Some(r) = queue.pop_front() {
        if !seen.insert(r.object_number) {
            continue;
        }
        order.push(r.object_number);
        let value = registry.resolve(r)?;
        collect_refs(&value, &mut queue);
    }
    Ok(order)
}

fn collect_refs(value: &PDFObject, queue: &mut VecDeque<Reference>) {
    match value {
        PDFObject::Reference(r) => queue.push_back(*r),
        PDFObject::Array(items) => items.iter().for_each(|v| collect_refs(v, queue)),
        PDFObject::Dict(d) => d.iter().for_each(|(_, v)| collect_refs(v, queue)),
        PDFObject::Stream(s) => s.dict.iter().for_each(|(_, v)| collect_refs(v, queue)),
        _ => {}
    }
}

fn remap_value(value: &PDFObject, map: &HashMap<u32, u32>) -> PDFObject {
    match value {
        PDFObject::Reference(r) => {
            let new_num = map.get(&r.object_number).copied().unwrap_or(r.object_number);
            PDFObject::Reference(Reference::new(new_num, 0))
        }
        PDFObject::Array(items) => PDFObject::Array(items.iter().map(|v| remap_value(v, map)).collect()),
        PDFObject::Dict(d) => {
            let mut out = Dictionary::new();
            for (k, v) in d.iter() {
                out.insert(k.to_string(), remap_value(v, map));
            }
            PDFObject::Dict(out)
        }
        PDFObject::Stream(s) => {
            let mut dict = Dictionary::new();
            for (k, v) in s.dict.iter() {
                dict.insert(k.to_string(), remap_value(v, map));
            }
            PDFObject::Stream(std::rc::Rc::new(Stream::new(dict, s.raw().to_vec())))
        }
        other => other.clone(),
    }
}

/// Applies `compress_streams` (sets `/Filter /FlateDecode` and Flate-encodes
/// the payload when the stream has no existing filter) and recomputes
/// `/Length` (§4.7 step 4).
fn prepare_stream_for_write(stream: &Stream, compress: bool) -> Result<Stream> {
    let mut dict = stream.dict.clone();
    let existing_filters = stream.filter_names();
    let raw = if compress && existing_filters.is_empty() {
        let encoded = filters::encode_one("FlateDecode", stream.raw(), None)?;
        dict.insert(constants::FILTER, PDFObject::Name("FlateDecode".into()));
        encoded
    } else {
        stream.raw().to_vec()
    };
    dict.insert(constants::LENGTH, PDFObject::Number(crate::objects::PDFNumber::Int(raw.len() as i64)));
    Ok(Stream::new(dict, raw))
}

fn write_header(w: &mut ByteWriter, version: PDFVersion) {
    w.push_str("%PDF-");
    w.push_str(version.label());
    w.push(b'\n');
    w.push(b'%');
    w.extend(&[0x93, 0x8C, 0x8B, 0x9E]);
    w.push(b'\n');
}

fn write_object_body(w: &mut ByteWriter, num: u32, gen: u16, value: &PDFObject) {
    w.push_uint(num as u64);
    w.push(b' ');
    w.push_uint(gen as u64);
    w.push_str(" obj\n");
    w.extend(&value.serialize());
    w.push_str("\nendobj\n");
}

/// §4.7: complete write with garbage collection, (optional) renumbering,
/// stream compression, and either a classical xref table or an xref stream.
pub fn write_complete(
    registry: &mut Registry,
    catalog: Reference,
    info: Option<Reference>,
    options: &WriteOptions,
) -> Result<(Vec<u8>, u64)> {
    let mut roots = vec![catalog];
    if let Some(info) = info {
        roots.push(info);
    }
    let order = reachable_objects(registry, &roots)?;

    let remap: HashMap<u32, u32> = if options.renumber_objects {
        order.iter().enumerate().map(|(i, &num)| (num, i as u32 + 1)).collect()
    } else {
        order.iter().map(|&num| (num, num)).collect()
    };

    let mut w = ByteWriter::new();
    write_header(&mut w, options.pdf_version);

    let mut offsets: HashMap<u32, usize> = HashMap::new();
    for &old_num in &order {
        let new_num = remap[&old_num];
        let value = registry.resolve(Reference::new(old_num, 0))?;
        let value = if options.renumber_objects { remap_value(&value, &remap) } else { value };
        let value = match &value {
            PDFObject::Stream(s) => {
                PDFObject::Stream(std::rc::Rc::new(prepare_stream_for_write(s, options.compress_streams)?))
            }
            other => other.clone(),
        };
        offsets.insert(new_num, w.len());
        write_object_body(&mut w, new_num, 0, &value);
    }

    let catalog_num = remap[&catalog.object_number];
    let info_num = info.map(|r| remap[&r.object_number]);
    let max_num = offsets.keys().copied().max().unwrap_or(0);

    let xref_offset = w.len() as u64;
    if options.use_xref_stream {
        write_xref_stream(&mut w, &offsets, max_num, catalog_num, info_num)?;
    } else {
        write_classical_xref_and_trailer(&mut w, &offsets, max_num, catalog_num, info_num, None);
    }

    w.push_str("startxref\n");
    w.push_uint(xref_offset);
    w.push_str("\n%%EOF\n");

    Ok((w.into_vec(), xref_offset))
}

fn write_classical_xref_and_trailer(
    w: &mut ByteWriter,
    offsets: &HashMap<u32, usize>,
    max_num: u32,
    catalog_num: u32,
    info_num: Option<u32>,
    prev: Option<u64>,
) {
    w.push_str("xref\n");
    // One contiguous subsection covering 0..=max_num; object 0 is always
    // the free-list head.
    w.push_uint(0);
    w.push(b' ');
    w.push_uint(max_num as u64 + 1);
    w.push(b'\n');
    w.push_str("0000000000 65535 f \n");
    for num in 1..=max_num {
        match offsets.get(&num) {
            Some(offset) => {
                w.push_str(&format!("{:010} 00000 n \n", offset));
            }
            None => w.push_str("0000000000 00000 f \n"),
        }
    }
    w.push_str("trailer\n");
    let mut trailer = Dictionary::new();
    trailer.insert(constants::SIZE, PDFObject::Number(crate::objects::PDFNumber::Int(max_num as i64 + 1)));
    trailer.insert(constants::ROOT, PDFObject::Reference(Reference::new(catalog_num, 0)));
    if let Some(info_num) = info_num {
        trailer.insert(constants::INFO, PDFObject::Reference(Reference::new(info_num, 0)));
    }
    if let Some(prev) = prev {
        trailer.insert(constants::PREV, PDFObject::Number(crate::objects::PDFNumber::Int(prev as i64)));
    }
    w.extend(&PDFObject::Dict(trailer).serialize());
    w.push(b'\n');
}

/// `/Type /XRef` stream whose field widths fit the largest offset present
/// (§4.7 step 5).
fn write_xref_stream(
    w: &mut ByteWriter,
    offsets: &HashMap<u32, usize>,
    max_num: u32,
    catalog_num: u32,
    info_num: Option<u32>,
) -> Result<()> {
    // The xref stream object is itself entry `max_num + 1`, at the offset we
    // are about to write it — `/Size` (= max_num + 2) must cover it, and its
    // own offset must be included in the width2 sizing below.
    let xref_obj_num = max_num + 1;
    let stream_offset = w.len() as u64;
    let max_offset = offsets.values().copied().max().unwrap_or(0) as u64;
    let width2 = bytes_needed(max_offset.max(stream_offset));
    let w3 = 2usize;

    let mut body = Vec::new();
    body.push(0u8);
    push_be(&mut body, 0, width2);
    push_be(&mut body, 65535, w3);
    for num in 1..=max_num {
        match offsets.get(&num) {
            Some(&offset) => {
                body.push(1);
                push_be(&mut body, offset as u64, width2);
                push_be(&mut body, 0, w3);
            }
            None => {
                body.push(0);
                push_be(&mut body, 0, width2);
                push_be(&mut body, 0, w3);
            }
        }
    }
    body.push(1);
    push_be(&mut body, stream_offset, width2);
    push_be(&mut body, 0, w3);

    let mut dict = Dictionary::new();
    dict.insert(constants::TYPE, PDFObject::Name("XRef".into()));
    dict.insert(constants::SIZE, PDFObject::Number(crate::objects::PDFNumber::Int(xref_obj_num as i64 + 1)));
    dict.insert(
        constants::W,
        PDFObject::Array(vec![
            PDFObject::Number(crate::objects::PDFNumber::Int(1)),
            PDFObject::Number(crate::objects::PDFNumber::Int(width2 as i64)),
            PDFObject::Number(crate::objects::PDFNumber::Int(2)),
        ]),
    );
    dict.insert(constants::ROOT, PDFObject::Reference(Reference::new(catalog_num, 0)));
    if let Some(info_num) = info_num {
        dict.insert(constants::INFO, PDFObject::Reference(Reference::new(info_num, 0)));
    }
    dict.insert(constants::LENGTH, PDFObject::Number(crate::objects::PDFNumber::Int(body.len() as i64)));
    let value = PDFObject::Stream(std::rc::Rc::new(Stream::new(dict, body)));
    write_object_body(w, xref_obj_num, 0, &value);
    Ok(())
}

fn bytes_needed(value: u64) -> usize {
    let mut n = 1;
    let mut v = value;
    while v > 0xff {
        v >>= 8;
        n += 1;
    }
    n.max(1)
}

fn push_be(out: &mut Vec<u8>, value: u64, width: usize) {
    for i in (0..width).rev() {
        out.push(((value >> (8 * i)) & 0xff) as u8);
    }
}

/// §4.8: append-only incremental write. Returns the original bytes
/// unchanged if nothing is dirty or new. `base_id` is the first element of
/// the prior trailer's `/ID` pair, when one exists (§4.8 step 5); the
/// second, freshly generated element always changes.
pub fn write_incremental(
    registry: &mut Registry,
    prior_bytes: &[u8],
    prior_xref_offset: u64,
    catalog: Reference,
    info: Option<Reference>,
    base_id: Option<&[u8]>,
    options: &WriteOptions,
) -> Result<(Vec<u8>, u64)> {
    let dirty = registry.dirty_objects();
    if dirty.is_empty() {
        return Ok((prior_bytes.to_vec(), prior_xref_offset));
    }
    let mut sorted = dirty.clone();
    sorted.sort_unstable();

    let mut w = ByteWriter::new();
    w.extend(prior_bytes);
    if !prior_bytes.ends_with(b"\n") {
        w.push(b'\n');
    }

    let mut offsets: HashMap<u32, usize> = HashMap::new();
    for num in &sorted {
        // Only a never-before-written object may pick up compression; a
        // dirty preexisting stream keeps whatever filter it already has
        // (§4.8 step 3).
        let is_new = registry.is_new(*num);
        let value = registry.resolve(Reference::new(*num, 0))?;
        let value = match &value {
            PDFObject::Stream(s) if is_new && s.filter_names().is_empty() && options.compress_streams => {
                PDFObject::Stream(std::rc::Rc::new(prepare_stream_for_write(s, true)?))
            }
            other => other.clone(),
        };
        offsets.insert(*num, w.len());
        write_object_body(&mut w, *num, 0, &value);
    }

    let xref_offset = w.len() as u64;
    let max_num = registry.highest_object_number();
    w.push_str("xref\n");
    w.push_str("0 1\n0000000000 65535 f \n");
    for &num in &sorted {
        let &offset = &offsets[&num];
        w.push_uint(num as u64);
        w.push(b' ');
        w.push_uint(1);
        w.push(b'\n');
        w.push_str(&format!("{:010} 00000 n \n", offset));
    }
    w.push_str("trailer\n");
    let mut trailer = Dictionary::new();
    trailer.insert(constants::SIZE, PDFObject::Number(crate::objects::PDFNumber::Int(max_num as i64 + 1)));
    trailer.insert(constants::ROOT, PDFObject::Reference(catalog));
    if let Some(info) = info {
        trailer.insert(constants::INFO, PDFObject::Reference(info));
    }
    trailer.insert(constants::PREV, PDFObject::Number(crate::objects::PDFNumber::Int(prior_xref_offset as i64)));
    let new_id = generate_id(prior_bytes, prior_xref_offset, &sorted);
    let unchanged_id = base_id.map(|b| b.to_vec()).unwrap_or_else(|| new_id.clone());
    trailer.insert(
        constants::ID,
        PDFObject::Array(vec![
            PDFObject::String(crate::objects::PDFString::Hex(unchanged_id)),
            PDFObject::String(crate::objects::PDFString::Hex(new_id)),
        ]),
    );
    w.extend(&PDFObject::Dict(trailer).serialize());
    w.push(b'\n');
    w.push_str("startxref\n");
    w.push_uint(xref_offset);
    w.push_str("\n%%EOF\n");

    registry.commit_written(&sorted);
    Ok((w.into_vec(), xref_offset))
}

/// Deterministic stand-in for the usual MD5-of-volatile-state recipe: the
/// exact algorithm is implementation-defined (§9), so this hashes the
/// inputs that make this save unique rather than pulling in a digest crate
/// for a non-cryptographic identifier.
fn generate_id(prior_bytes: &[u8], prior_xref_offset: u64, dirty: &[u32]) -> Vec<u8> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut out = Vec::with_capacity(16);
    for salt in 0u8..2 {
        let mut hasher = DefaultHasher::new();
        salt.hash(&mut hasher);
        prior_bytes.len().hash(&mut hasher);
        prior_xref_offset.hash(&mut hasher);
        dirty.hash(&mut hasher);
        out.extend_from_slice(&hasher.finish().to_be_bytes());
    }
    out
}

/// Checked by `verifyIncrementalSave` (§4.8 post-conditions).
pub fn verify_incremental_save(original: &[u8], result: &[u8]) -> Result<()> {
    if result.len() < original.len() {
        return Err(PDFError::InvariantViolation("incremental save shrank the file"));
    }
    if &result[..original.len()] != original {
        return Err(PDFError::InvariantViolation("incremental save did not preserve the original prefix"));
    }
    let trimmed = result.strip_suffix(b"\n").unwrap_or(result);
    if !trimmed.ends_with(b"%%EOF") {
        return Err(PDFError::InvariantViolation("incremental save does not end with %%EOF"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::PDFNumber;

    #[test]
    fn bytes_needed_grows_with_magnitude() {
        assert_eq!(bytes_needed(0), 1);
        assert_eq!(bytes_needed(255), 1);
        assert_eq!(bytes_needed(256), 2);
        assert_eq!(bytes_needed(1 << 16), 3);
    }

    #[test]
    fn complete_write_roundtrip_contains_objects_and_trailer() {
        let mut registry = Registry::new();
        let mut catalog_dict = Dictionary::new();
        catalog_dict.insert(constants::TYPE, PDFObject::Name("Catalog".into()));
        let catalog = registry.allocate(PDFObject::Dict(catalog_dict));
        let options = WriteOptions::default();
        let (bytes, xref_offset) = write_complete(&mut registry, catalog, None, &options).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.7\n"));
        assert!(bytes.ends_with(b"%%EOF\n"));
        assert!((xref_offset as usize) < bytes.len());
    }

    #[test]
    fn incremental_write_with_no_dirty_objects_is_identity() {
        let mut registry = Registry::new();
        let original = b"%PDF-1.7\n...original...\n%%EOF\n".to_vec();
        let (result, offset) =
            write_incremental(&mut registry, &original, 42, Reference::new(1, 0), None, None, &WriteOptions::default()).unwrap();
        assert_eq!(result, original);
        assert_eq!(offset, 42);
    }

    #[test]
    fn incremental_write_preserves_prefix_and_grows() {
        let mut registry = Registry::new();
        registry.register_unresolved(1, 9); // pretend object 1 already exists on disk
        let original = b"%PDF-1.7\noriginal bytes\n%%EOF\n".to_vec();
        registry.set(1, PDFObject::Number(PDFNumber::Int(7))).unwrap();
        let (result, _offset) =
            write_incremental(&mut registry, &original, 10, Reference::new(1, 0), None, None, &WriteOptions::default()).unwrap();
        verify_incremental_save(&original, &result).unwrap();
    }

    #[test]
    fn incremental_write_clears_dirty_flags_so_a_second_save_is_identity() {
        let mut registry = Registry::new();
        registry.register_unresolved(1, 9);
        let original = b"%PDF-1.7\noriginal bytes\n%%EOF\n".to_vec();
        registry.set(1, PDFObject::Number(PDFNumber::Int(7))).unwrap();
        assert_eq!(registry.dirty_objects().len(), 1);
        let (result, offset) =
            write_incremental(&mut registry, &original, 10, Reference::new(1, 0), None, None, &WriteOptions::default()).unwrap();
        assert!(registry.dirty_objects().is_empty());
        let (second, second_offset) =
            write_incremental(&mut registry, &result, offset, Reference::new(1, 0), None, None, &WriteOptions::default()).unwrap();
        assert_eq!(second, result);
        assert_eq!(second_offset, offset);
    }

    #[test]
    fn xref_stream_entry_count_matches_declared_size() {
        let mut registry = Registry::new();
        let mut catalog_dict = Dictionary::new();
        catalog_dict.insert(constants::TYPE, PDFObject::Name("Catalog".into()));
        let catalog = registry.allocate(PDFObject::Dict(catalog_dict));
        let options = WriteOptions { use_xref_stream: true, ..WriteOptions::default() };
        let (bytes, xref_offset) = write_complete(&mut registry, catalog, None, &options).unwrap();
        // Reparsing must succeed: /Size must cover exactly the objects whose
        // rows were written, including the xref stream object itself.
        let names = crate::registry::NameTable::new();
        let table = crate::xref::parse_chain(std::rc::Rc::from(bytes.into_boxed_slice()), names, xref_offset).unwrap();
        assert_eq!(table.trailer.get(constants::ROOT).and_then(|o| o.as_reference()), Some(catalog));
    }
}
