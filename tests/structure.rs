//! Black-box tests for the core object model and a minimal document's
//! on-disk shape (§8 scenario 1): built entirely through the public facade,
//! never reaching into crate-private parsing internals.

use pdf_core::{Dictionary, Document, Name, PDFNumber, PDFObject, PDFString, Reference, WriteOptions};

#[test]
fn minimal_document_round_trips_primitive_shapes() {
    let number = PDFObject::Number(PDFNumber::Int(42));
    assert_eq!(number.serialize(), b"42");

    let name = PDFObject::Name(Name::from("Catalog"));
    assert_eq!(name.serialize(), b"/Catalog");

    let string = PDFObject::String(PDFString::Literal(b"hello".to_vec()));
    assert_eq!(string.serialize(), b"(hello)");

    let reference = PDFObject::Reference(Reference::new(3, 0));
    assert_eq!(reference.serialize(), b"3 0 R");

    let mut dict = Dictionary::new();
    dict.insert("Type", PDFObject::Name(Name::from("Catalog")));
    assert_eq!(dict.get("Type").unwrap().as_name(), Some("Catalog"));
}

#[test]
fn minimal_pdf_has_the_expected_on_disk_shape() {
    let mut doc = Document::new();
    let bytes = doc.save_complete(&WriteOptions::default()).unwrap();

    assert!(bytes.starts_with(b"%PDF-1.7"));
    let rendered = String::from_utf8_lossy(&bytes);
    assert!(rendered.contains("/Type /Catalog"));
    assert!(rendered.contains("/Type /Pages"));
    assert!(rendered.contains("xref"));
    assert!(rendered.contains("trailer"));
    assert!(bytes.ends_with(b"%%EOF\n"));
}

#[test]
fn registered_dictionary_survives_a_round_trip() {
    let mut doc = Document::new();
    let mut page = Dictionary::new();
    page.insert("Type", PDFObject::Name(Name::from("Page")));
    let page_ref = doc.register(PDFObject::Dict(page));

    let fetched = doc.get_object(page_ref).unwrap();
    assert_eq!(fetched.as_dict().unwrap().get("Type").unwrap().as_name(), Some("Page"));
}
