//! Black-box tests for the `Document` facade's load/save lifecycle, page
//! tree, and `/Info` accessors (§6).

use pdf_core::{Dictionary, Document, Name, PDFNumber, PDFObject, PDFString, WriteOptions};

fn document_with_one_page() -> Vec<u8> {
    let mut doc = Document::new();

    let mut page = Dictionary::new();
    page.insert("Type", PDFObject::Name(Name::from("Page")));
    let page_ref = doc.register(PDFObject::Dict(page));

    let catalog = doc.get_object(doc.catalog_reference()).unwrap();
    let pages_ref = catalog.as_dict().unwrap().get("Pages").unwrap().as_reference().unwrap();
    let mut pages = doc.get_object(pages_ref).unwrap().as_dict().unwrap().clone();
    pages.insert("Kids", PDFObject::Array(vec![PDFObject::Reference(page_ref)]));
    pages.insert("Count", PDFObject::Number(PDFNumber::Int(1)));
    doc.set_object(pages_ref, PDFObject::Dict(pages)).unwrap();

    doc.save_complete(&WriteOptions::default()).unwrap()
}

fn document_with_one_page_and_info() -> Vec<u8> {
    let mut doc = Document::new();

    let mut page = Dictionary::new();
    page.insert("Type", PDFObject::Name(Name::from("Page")));
    let page_ref = doc.register(PDFObject::Dict(page));

    let catalog = doc.get_object(doc.catalog_reference()).unwrap();
    let pages_ref = catalog.as_dict().unwrap().get("Pages").unwrap().as_reference().unwrap();
    let mut pages = doc.get_object(pages_ref).unwrap().as_dict().unwrap().clone();
    pages.insert("Kids", PDFObject::Array(vec![PDFObject::Reference(page_ref)]));
    pages.insert("Count", PDFObject::Number(PDFNumber::Int(1)));
    doc.set_object(pages_ref, PDFObject::Dict(pages)).unwrap();

    let mut info = Dictionary::new();
    info.insert("Title", PDFObject::String(PDFString::Literal(b"Quarterly Report".to_vec())));
    info.insert("Author", PDFObject::String(PDFString::Literal(b"Ada".to_vec())));
    let info_ref = doc.register(PDFObject::Dict(info));
    doc.set_info(Some(info_ref));

    doc.save_complete(&WriteOptions::default()).unwrap()
}

#[test]
fn loads_a_previously_saved_document_and_counts_its_pages() {
    let bytes = document_with_one_page_and_info();
    let mut loaded = Document::load(bytes).unwrap();
    assert_eq!(loaded.page_count().unwrap(), 1);
    let pages = loaded.pages().unwrap();
    assert_eq!(pages.len(), 1);
}

#[test]
fn info_accessors_read_back_title_and_author() {
    let bytes = document_with_one_page_and_info();
    let mut loaded = Document::load(bytes).unwrap();
    assert_eq!(loaded.title().unwrap().as_deref(), Some("Quarterly Report"));
    assert_eq!(loaded.author().unwrap().as_deref(), Some("Ada"));
}

#[test]
fn info_accessors_return_none_when_no_info_dictionary_is_set() {
    let bytes = document_with_one_page();
    let mut loaded = Document::load(bytes).unwrap();
    assert_eq!(loaded.title().unwrap(), None);
    assert_eq!(loaded.author().unwrap(), None);
}

#[test]
fn mutating_a_loaded_document_and_saving_incrementally_preserves_the_prefix() {
    let bytes = document_with_one_page_and_info();
    let mut loaded = Document::load(bytes.clone()).unwrap();

    let mut extra_page = Dictionary::new();
    extra_page.insert("Type", PDFObject::Name(Name::from("Page")));
    let extra_ref = loaded.register(PDFObject::Dict(extra_page));

    let pages_ref = loaded
        .get_object(loaded.catalog_reference())
        .unwrap()
        .as_dict()
        .unwrap()
        .get("Pages")
        .unwrap()
        .as_reference()
        .unwrap();
    let mut pages = loaded.get_object(pages_ref).unwrap().as_dict().unwrap().clone();
    let mut kids = pages.get("Kids").unwrap().as_array().unwrap().to_vec();
    kids.push(PDFObject::Reference(extra_ref));
    pages.insert("Kids", PDFObject::Array(kids));
    pages.insert("Count", PDFObject::Number(PDFNumber::Int(2)));
    loaded.set_object(pages_ref, PDFObject::Dict(pages)).unwrap();

    let saved = loaded.save_incremental(&WriteOptions::default()).unwrap();
    assert!(saved.starts_with(&bytes[..bytes.len().min(saved.len())]));
    assert!(saved.len() > bytes.len());

    let mut reloaded = Document::load(saved).unwrap();
    assert_eq!(reloaded.page_count().unwrap(), 2);
}

#[test]
fn orphaned_registration_does_not_appear_in_a_fresh_complete_write() {
    let mut doc = Document::new();
    let mut orphan = Dictionary::new();
    orphan.insert("Type", PDFObject::Name(Name::from("OrphanMarker")));
    doc.register(PDFObject::Dict(orphan));

    let bytes = doc.save_complete(&WriteOptions::default()).unwrap();
    let rendered = String::from_utf8_lossy(&bytes);
    assert!(!rendered.contains("OrphanMarker"));
}
