//! Document facade (§6): owns the registry, wires the load/resolve/save
//! path together, and gives callers a consolidated page-tree walk and
//! `/Info` accessors instead of a second ad hoc traversal (SPEC_FULL §C.3).

use std::rc::Rc;
use std::str::FromStr;

use crate::constants;
use crate::content::{self, ContentStream};
use crate::date::Date;
use crate::error::{PDFError, Result};
use crate::filters;
use crate::object_parser::FileSource;
use crate::objects::{Dictionary, PDFObject, Reference};
use crate::registry::{NameTable, Registry};
use crate::vpdf::PDFVersion;
use crate::writer::{self, WriteOptions};
use crate::xref::{self, XRefRow};

/// One loaded (or freshly created) PDF document: a registry plus the two
/// references every writer pass needs (`/Root`, optional `/Info`).
pub struct Document {
    registry: Registry,
    version: PDFVersion,
    catalog: Reference,
    info: Option<Reference>,
    prior_bytes: Option<Rc<[u8]>>,
    prior_xref_offset: Option<u64>,
    /// First element of the trailer's `/ID` pair, when the loaded file had
    /// one — carried unchanged into every subsequent incremental save's
    /// `/ID` (§4.8 step 5).
    base_id: Option<Vec<u8>>,
}

impl Document {
    /// Starts a fresh, empty document: a bare `/Type /Catalog` with a
    /// zero-kid `/Type /Pages` tree, no `/Info`. Nothing to save
    /// incrementally since there is no prior byte buffer.
    pub fn new() -> Self {
        let mut registry = Registry::new();
        let mut pages_dict = Dictionary::new();
        pages_dict.insert(constants::TYPE, PDFObject::Name(constants::PAGES.into()));
        pages_dict.insert(constants::KIDS, PDFObject::Array(Vec::new()));
        pages_dict.insert(constants::COUNT, PDFObject::Number(crate::objects::PDFNumber::Int(0)));
        let pages = registry.allocate(PDFObject::Dict(pages_dict));

        let mut catalog_dict = Dictionary::new();
        catalog_dict.insert(constants::TYPE, PDFObject::Name(constants::CATALOG.into()));
        catalog_dict.insert(constants::PAGES, PDFObject::Reference(pages));
        let catalog = registry.allocate(PDFObject::Dict(catalog_dict));

        Self {
            registry,
            version: PDFVersion::V1_7,
            catalog,
            info: None,
            prior_bytes: None,
            prior_xref_offset: None,
            base_id: None,
        }
    }

    /// Loads a document from a complete byte buffer (§6 `load`): finds the
    /// header version, locates `startxref`, follows the `/Prev` chain (or
    /// falls back to a linear scan per §4.4/§7 if either step fails), and
    /// wires a lazy [`Registry`] over it.
    pub fn load(bytes: Vec<u8>) -> Result<Self> {
        let bytes: Rc<[u8]> = Rc::from(bytes.into_boxed_slice());
        let version = parse_header_version(&bytes)?;
        let names = NameTable::new();

        let table = match find_startxref_offset_and_parse(&bytes, names.clone()) {
            Ok(table) => table,
            Err(err) => {
                log::warn!("xref parse failed ({}); recovering by linear scan", err);
                xref::recover_by_scanning(&bytes)
            }
        };

        let catalog = table
            .trailer
            .get(constants::ROOT)
            .and_then(|o| o.as_reference())
            .ok_or_else(|| PDFError::malformed(0, "trailer missing /Root"))?;
        let info = table.trailer.get(constants::INFO).and_then(|o| o.as_reference());
        let base_id = table
            .trailer
            .get(constants::ID)
            .and_then(|o| o.as_array())
            .and_then(|items| items.first())
            .and_then(|o| o.as_string())
            .map(|s| s.bytes().to_vec());

        let source = Rc::new(FileSource::new(bytes.clone(), names.clone()));
        let mut registry = Registry::with_source(source, names);
        for (num, row) in table.rows {
            match row {
                XRefRow::Free { next_free, generation } => registry.register_free(num, next_free, generation),
                XRefRow::Uncompressed { offset, .. } => registry.register_unresolved(num, offset),
                XRefRow::Compressed { stream_obj, index } => {
                    registry.register_unresolved_compressed(num, stream_obj, index)
                }
            }
        }

        let xref_offset = xref::find_startxref_offset(&bytes).ok();

        Ok(Self {
            registry,
            version,
            catalog,
            info,
            prior_bytes: Some(bytes),
            prior_xref_offset: xref_offset,
            base_id,
        })
    }

    pub fn version(&self) -> PDFVersion {
        self.version
    }

    pub fn catalog_reference(&self) -> Reference {
        self.catalog
    }

    pub fn info_reference(&self) -> Option<Reference> {
        self.info
    }

    /// Wires (or clears) the document's `/Info` reference, e.g. after
    /// registering a metadata dictionary — it joins the catalog as a root
    /// for garbage collection on the next complete write (§4.7 step 1).
    pub fn set_info(&mut self, info: Option<Reference>) {
        self.info = info;
    }

    /// Resolves `reference` to its value, parsing lazily on first access
    /// (§6 `getObject`).
    pub fn get_object(&mut self, reference: Reference) -> Result<PDFObject> {
        self.registry.resolve(reference)
    }

    /// Allocates a new indirect object, always dirty (§6 `register`).
    pub fn register(&mut self, value: PDFObject) -> Reference {
        self.registry.allocate(value)
    }

    /// Overwrites an already-registered object and marks it dirty.
    pub fn set_object(&mut self, reference: Reference, value: PDFObject) -> Result<()> {
        self.registry.set(reference.object_number, value)
    }

    pub fn intern_name(&self, bytes: &[u8]) -> crate::objects::Name {
        self.registry.intern_name(bytes)
    }

    pub fn warnings(&self) -> Vec<String> {
        self.registry.warnings()
    }

    /// §6 `save` (complete): garbage-collects from the catalog (and
    /// `/Info`, when present), then writes a fresh file.
    pub fn save_complete(&mut self, options: &WriteOptions) -> Result<Vec<u8>> {
        let (bytes, _xref_offset) = writer::write_complete(&mut self.registry, self.catalog, self.info, options)?;
        Ok(bytes)
    }

    /// §6 `save` (incremental): requires this document to have been
    /// produced by [`Self::load`] (or a prior incremental save), since it
    /// appends to a known prior byte buffer and `/Prev` offset.
    pub fn save_incremental(&mut self, options: &WriteOptions) -> Result<Vec<u8>> {
        let prior_bytes = self
            .prior_bytes
            .clone()
            .ok_or_else(|| PDFError::InvariantViolation("incremental save requires a document loaded from bytes"))?;
        let prior_xref_offset = self
            .prior_xref_offset
            .ok_or_else(|| PDFError::InvariantViolation("incremental save requires a known prior xref offset"))?;

        let (result, xref_offset) = writer::write_incremental(
            &mut self.registry,
            &prior_bytes,
            prior_xref_offset,
            self.catalog,
            self.info,
            self.base_id.as_deref(),
            options,
        )?;
        writer::verify_incremental_save(&prior_bytes, &result)?;

        self.prior_bytes = Some(Rc::from(result.clone().into_boxed_slice()));
        self.prior_xref_offset = Some(xref_offset);
        Ok(result)
    }

    /// Walks `/Type /Pages` → `/Kids` → leaf `/Type /Page` dictionaries
    /// once and counts them. The one consolidated page-tree traversal
    /// (SPEC_FULL §C.3) — `pages()` below reuses the same walk.
    pub fn page_count(&mut self) -> Result<usize> {
        Ok(self.pages()?.len())
    }

    /// Returns every leaf page's reference, in document order.
    pub fn pages(&mut self) -> Result<Vec<Reference>> {
        let catalog = self.get_object(self.catalog)?;
        let catalog_dict = catalog
            .as_dict()
            .ok_or_else(|| PDFError::malformed(0, "catalog is not a dictionary"))?;
        let pages_ref = catalog_dict
            .get(constants::PAGES)
            .and_then(|o| o.as_reference())
            .ok_or_else(|| PDFError::malformed(0, "catalog missing /Pages"))?;

        let mut out = Vec::new();
        let mut visited = std::collections::HashSet::new();
        self.walk_page_tree(pages_ref, &mut out, &mut visited)?;
        Ok(out)
    }

    fn walk_page_tree(
        &mut self,
        node_ref: Reference,
        out: &mut Vec<Reference>,
        visited: &mut std::collections::HashSet<u32>,
    ) -> Result<()> {
        if !visited.insert(node_ref.object_number) {
            return Ok(());
        }
        let node = self.get_object(node_ref)?;
        let dict = node
            .as_dict()
            .ok_or_else(|| PDFError::malformed(0, "page-tree node is not a dictionary"))?;
        match dict.get(constants::KIDS).and_then(|o| o.as_array()) {
            Some(kids) => {
                let kid_refs: Vec<Reference> = kids.iter().filter_map(|o| o.as_reference()).collect();
                for kid in kid_refs {
                    self.walk_page_tree(kid, out, visited)?;
                }
            }
            None => out.push(node_ref),
        }
        Ok(())
    }

    /// Decodes and tokenises a page's `/Contents` (a single stream or an
    /// array of streams, concatenated per §4.6) into a [`ContentStream`].
    pub fn page_content(&mut self, page: Reference) -> Result<ContentStream> {
        let page_obj = self.get_object(page)?;
        let contents = page_obj
            .as_dict()
            .ok_or_else(|| PDFError::malformed(0, "page is not a dictionary"))?
            .get(constants::CONTENTS)
            .cloned();

        let mut payload = Vec::new();
        match contents {
            Some(PDFObject::Reference(r)) => self.append_stream_payload(r, &mut payload)?,
            Some(PDFObject::Array(items)) => {
                for item in items {
                    if let Some(r) = item.as_reference() {
                        self.append_stream_payload(r, &mut payload)?;
                        payload.push(b'\n');
                    }
                }
            }
            _ => {}
        }

        let names = self.registry.name_table();
        content::parse(Rc::from(payload.into_boxed_slice()), names)
    }

    fn append_stream_payload(&mut self, reference: Reference, out: &mut Vec<u8>) -> Result<()> {
        let value = self.get_object(reference)?;
        let stream = value
            .as_stream()
            .ok_or_else(|| PDFError::malformed(0, "/Contents entry is not a stream"))?
            .clone();
        let filter_names = stream.filter_names();
        let parms = stream.decode_parms();
        let decoded = filters::decode_chain(&filter_names, &parms, stream.raw())?;
        out.extend(decoded);
        Ok(())
    }

    fn info_dict(&mut self) -> Result<Option<Dictionary>> {
        match self.info {
            Some(reference) => Ok(self.get_object(reference)?.as_dict().cloned()),
            None => Ok(None),
        }
    }

    fn info_text(&mut self, key: &str) -> Result<Option<String>> {
        let dict = self.info_dict()?;
        Ok(dict
            .and_then(|d| d.get(key).cloned())
            .and_then(|value| match value {
                PDFObject::String(s) => Some(s.to_text()),
                _ => None,
            }))
    }

    pub fn title(&mut self) -> Result<Option<String>> {
        self.info_text(constants::TITLE)
    }

    pub fn author(&mut self) -> Result<Option<String>> {
        self.info_text(constants::AUTHOR)
    }

    pub fn producer(&mut self) -> Result<Option<String>> {
        self.info_text(constants::PRODUCER)
    }

    pub fn creation_date(&mut self) -> Result<Option<Date>> {
        match self.info_text(constants::CREATION_DATE)? {
            Some(text) => Ok(Some(Date::from_str(&text)?)),
            None => Ok(None),
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// `%PDF-x.y` is a fixed three-byte version label right after the header
/// keyword (§6: "versions 1.0 through 2.0").
fn parse_header_version(bytes: &[u8]) -> Result<PDFVersion> {
    const PREFIX: &[u8] = b"%PDF-";
    let start = bytes
        .windows(PREFIX.len())
        .position(|w| w == PREFIX)
        .ok_or_else(|| PDFError::malformed(0, "missing %PDF- header"))?;
    let version_start = start + PREFIX.len();
    let version_bytes = bytes
        .get(version_start..version_start + 3)
        .ok_or_else(|| PDFError::malformed(version_start as u64, "truncated %PDF- version"))?;
    let text = String::from_utf8_lossy(version_bytes).into_owned();
    PDFVersion::try_from(text)
}

fn find_startxref_offset_and_parse(bytes: &Rc<[u8]>, names: NameTable) -> Result<xref::XRefTable> {
    let start_offset = xref::find_startxref_offset(bytes)?;
    xref::parse_chain(bytes.clone(), names, start_offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_minimal_pdf() -> Vec<u8> {
        let mut doc = Document::new();
        doc.save_complete(&WriteOptions::default()).unwrap()
    }

    #[test]
    fn new_document_has_an_empty_page_tree() {
        let mut doc = Document::new();
        assert_eq!(doc.page_count().unwrap(), 0);
    }

    #[test]
    fn round_trips_through_complete_write_and_load() {
        let bytes = write_minimal_pdf();
        let mut loaded = Document::load(bytes).unwrap();
        assert_eq!(loaded.version(), PDFVersion::V1_7);
        assert_eq!(loaded.page_count().unwrap(), 0);
        let catalog = loaded.get_object(loaded.catalog_reference()).unwrap();
        assert_eq!(catalog.as_dict().unwrap().get(constants::TYPE).unwrap().as_name(), Some(constants::CATALOG));
    }

    #[test]
    fn page_tree_with_one_leaf_is_counted() {
        let mut doc = Document::new();
        let mut page_dict = Dictionary::new();
        page_dict.insert(constants::TYPE, PDFObject::Name("Page".into()));
        let page = doc.register(PDFObject::Dict(page_dict));

        let pages_ref = doc
            .get_object(doc.catalog_reference())
            .unwrap()
            .as_dict()
            .unwrap()
            .get(constants::PAGES)
            .unwrap()
            .as_reference()
            .unwrap();
        let mut pages_dict = doc.get_object(pages_ref).unwrap().as_dict().unwrap().clone();
        pages_dict.insert(constants::KIDS, PDFObject::Array(vec![PDFObject::Reference(page)]));
        pages_dict.insert(constants::COUNT, PDFObject::Number(crate::objects::PDFNumber::Int(1)));
        doc.set_object(pages_ref, PDFObject::Dict(pages_dict)).unwrap();

        assert_eq!(doc.page_count().unwrap(), 1);
        assert_eq!(doc.pages().unwrap(), vec![page]);
    }

    #[test]
    fn incremental_save_without_a_loaded_prior_is_an_error() {
        let mut doc = Document::new();
        let err = doc.save_incremental(&WriteOptions::default()).unwrap_err();
        assert!(matches!(err, PDFError::InvariantViolation(_)));
    }

    #[test]
    fn incremental_save_after_load_preserves_prefix() {
        let bytes = write_minimal_pdf();
        let mut loaded = Document::load(bytes.clone()).unwrap();
        let mut new_page = Dictionary::new();
        new_page.insert(constants::TYPE, PDFObject::Name("Page".into()));
        loaded.register(PDFObject::Dict(new_page));
        let result = loaded.save_incremental(&WriteOptions::default()).unwrap();
        assert!(result.len() >= bytes.len());
        assert_eq!(&result[..bytes.len().min(result.len())], &bytes[..bytes.len().min(result.len())]);
    }

    #[test]
    fn page_content_decodes_and_tokenises_contents_stream() {
        let mut doc = Document::new();
        let content_ref = doc.register(PDFObject::Stream(Rc::new(crate::objects::Stream::new(
            Dictionary::new(),
            b"1 0 0 1 0 0 cm\nq\n1 0 0 RG\nS\nQ".to_vec(),
        ))));
        let mut page_dict = Dictionary::new();
        page_dict.insert(constants::TYPE, PDFObject::Name("Page".into()));
        page_dict.insert(constants::CONTENTS, PDFObject::Reference(content_ref));
        let page = doc.register(PDFObject::Dict(page_dict));

        let stream = doc.page_content(page).unwrap();
        assert_eq!(stream.operators.len(), 4);
        assert_eq!(stream.operators[0].op, crate::content::Op::cm);
        assert_eq!(stream.operators[3].op, crate::content::Op::Q);
    }

    #[test]
    fn info_accessors_read_trailer_info_dict() {
        let mut doc = Document::new();
        let mut info = Dictionary::new();
        info.insert(constants::TITLE, PDFObject::String(crate::objects::PDFString::Literal(b"Report".to_vec())));
        let info_ref = doc.register(PDFObject::Dict(info));
        doc.set_info(Some(info_ref));
        assert_eq!(doc.title().unwrap().as_deref(), Some("Report"));
        assert_eq!(doc.author().unwrap(), None);
    }
}
