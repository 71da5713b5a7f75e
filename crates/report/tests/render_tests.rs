//! End-to-end rendering of in-memory Open Document packages

use std::io::{Cursor, Read, Write};

use mail_merge::{load_context_from_file, JsonConfig, RenderContext};
use report::names::namespaces;
use report::xml::{parse_document, Tree};
use report::{DiagnosticKind, DocumentState, MemorySink, OpenDocument, ReportError};
use serde_json::json;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MIMETYPE: &str = "application/vnd.oasis.opendocument.text";
const PNG: [u8; 8] = [0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a];

fn annotation(text: &str) -> String {
    format!(
        r#"<office:annotation office:name="__Annotation__1"><dc:creator>Report Author</dc:creator><dc:date>2024-03-01T10:00:00</dc:date><text:p text:style-name="P3"><text:span text:style-name="T2">{}</text:span></text:p></office:annotation>"#,
        text
    )
}

fn content(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><office:document-content xmlns:office="{}" xmlns:text="{}" xmlns:table="{}" xmlns:dc="{}" office:version="1.2"><office:body><office:text>{}</office:text></office:body></office:document-content>"#,
        namespaces::OFFICE,
        namespaces::TEXT,
        namespaces::TABLE,
        namespaces::DC,
        body
    )
}

fn invoice_table() -> String {
    format!(
        concat!(
            r#"<table:table table:name="Items">"#,
            r#"<table:table-row>"#,
            r#"<table:table-cell><text:p text:style-name="P1">{}<text:span text:style-name="T1">{{{{.Item</text:span><text:span text:style-name="T1">No}}}}</text:span></text:p></table:table-cell>"#,
            r#"<table:table-cell><text:p text:style-name="P1">{{{{.Name}}}}</text:p></table:table-cell>"#,
            r#"<table:table-cell><text:p text:style-name="P1">{}{{{{.Total}}}}</text:p></table:table-cell>"#,
            r#"</table:table-row>"#,
            r#"</table:table>"#,
            r#"<text:p>{{{{printf &quot;Items: %d&quot; (len .Items)}}}}</text:p>"#
        ),
        annotation("{{range .Items}}"),
        annotation("{{end}}")
    )
}

fn build_package(content_xml: &str) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("mimetype", stored).unwrap();
    zip.write_all(MIMETYPE.as_bytes()).unwrap();
    zip.start_file("content.xml", deflated).unwrap();
    zip.write_all(content_xml.as_bytes()).unwrap();
    zip.start_file("styles.xml", deflated).unwrap();
    zip.write_all(br#"<office:document-styles><style:master-page><style:header><text:p>{{.Company}}</text:p></style:header></style:master-page></office:document-styles>"#)
        .unwrap();
    zip.start_file("Pictures/logo.png", stored).unwrap();
    zip.write_all(&PNG).unwrap();
    zip.start_file("META-INF/manifest.xml", deflated).unwrap();
    zip.write_all(b"<manifest:manifest/>").unwrap();

    zip.finish().unwrap().into_inner()
}

fn invoice_data() -> RenderContext {
    RenderContext::from_value(json!({
        "Company": "Acme",
        "Items": [
            {"ItemNo": 1, "Name": "Pen", "Total": "$1.00"},
            {"ItemNo": 2, "Name": "Pad", "Total": "$2.00"}
        ]
    }))
}

fn read_entry(archive: &[u8], name: &str) -> Vec<u8> {
    let mut zip = ZipArchive::new(Cursor::new(archive)).unwrap();
    let mut file = zip.by_name(name).unwrap();
    let mut data = Vec::new();
    file.read_to_end(&mut data).unwrap();
    data
}

fn row_texts(tree: &Tree) -> Vec<Vec<String>> {
    tree.find_elements(|e| e.local_name() == "table-row")
        .into_iter()
        .map(|row| tree.child_elements(row).map(|cell| tree.text_content(cell)).collect())
        .collect()
}

#[test]
fn test_invoice_rows_repeat_in_order() {
    let mut doc = OpenDocument::from_bytes(&build_package(&content(&invoice_table())))
        .unwrap()
        .with_sink(MemorySink::new());
    doc.execute(&invoice_data()).unwrap();
    assert_eq!(doc.state(), DocumentState::Merged);
    assert_eq!(doc.sink().count(DiagnosticKind::LoopMarkerInserted), 2);

    let archive = doc.to_bytes().unwrap();
    let merged = String::from_utf8(read_entry(&archive, "content.xml")).unwrap();
    let tree = parse_document(&merged).unwrap();

    assert_eq!(
        row_texts(&tree),
        vec![
            vec!["1".to_string(), "Pen".to_string(), "$1.00".to_string()],
            vec!["2".to_string(), "Pad".to_string(), "$2.00".to_string()],
        ]
    );
    assert!(tree.find_elements(|e| e.local_name() == "annotation").is_empty());
    assert!(merged.contains("<text:p>Items: 2</text:p>"));
    assert!(!merged.contains("{{"));

    let styles = String::from_utf8(read_entry(&archive, "styles.xml")).unwrap();
    assert!(styles.contains("<text:p>Acme</text:p>"));
}

#[test]
fn test_every_entry_survives_packaging() {
    let mut doc = OpenDocument::from_bytes(&build_package(&content(&invoice_table()))).unwrap();
    doc.execute(&invoice_data()).unwrap();
    let archive = doc.to_bytes().unwrap();

    let zip = ZipArchive::new(Cursor::new(archive.as_slice())).unwrap();
    let mut names: Vec<&str> = zip.file_names().collect();
    names.sort_unstable();
    assert_eq!(
        names,
        vec!["META-INF/manifest.xml", "Pictures/logo.png", "content.xml", "mimetype", "styles.xml"]
    );

    assert_eq!(read_entry(&archive, "Pictures/logo.png"), PNG);
    assert_eq!(read_entry(&archive, "mimetype"), MIMETYPE.as_bytes());
}

#[test]
fn test_write_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let template = dir.path().join("invoice.odt");
    let output = dir.path().join("invoice-out.odt");
    let data = dir.path().join("invoice.json");
    std::fs::write(&template, build_package(&content(&invoice_table()))).unwrap();
    std::fs::write(
        &data,
        r#"{"report": {"Company": "Acme", "Items": [{"ItemNo": 7, "Name": "Ink", "Total": "$9.99"}]}}"#,
    )
    .unwrap();

    let ctx = load_context_from_file(&data, JsonConfig::new().with_root_path("report")).unwrap();
    let mut doc = OpenDocument::open(&template).unwrap();
    doc.execute(&ctx).unwrap();
    doc.write_file(&output).unwrap();

    let reopened = OpenDocument::open(&output).unwrap();
    let tree = parse_document(reopened.entry("content.xml").unwrap()).unwrap();
    assert_eq!(
        row_texts(&tree),
        vec![vec!["7".to_string(), "Ink".to_string(), "$9.99".to_string()]]
    );
}

#[test]
fn test_annotation_outside_table_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let template = dir.path().join("broken.odt");
    let output = dir.path().join("broken-out.odt");
    let body = format!("<text:p>{}Loose text</text:p>", annotation("{{range .X}}"));
    std::fs::write(&template, build_package(&content(&body))).unwrap();

    let mut doc = OpenDocument::open(&template).unwrap();
    let err = doc.execute(&invoice_data()).unwrap_err();

    match &err {
        ReportError::Structure { entry, marker } => {
            assert_eq!(entry, "content.xml");
            assert_eq!(marker, "{{range .X}}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(doc.state(), DocumentState::Opened);
    assert!(!output.exists());
}

#[test]
fn test_prepared_template_merges_after_reopen() {
    let mut doc = OpenDocument::from_bytes(&build_package(&content(&invoice_table()))).unwrap();
    doc.prepare().unwrap();
    let prepared = doc.entry("content.xml").unwrap().to_string();
    assert!(prepared.contains(r#"<table:table table:name="Items">{{range .Items}}<table:table-row>"#));
    assert!(prepared.contains("</table:table-row>{{end}}</table:table>"));
    assert!(prepared.contains(r#"{{printf "Items: %d" (len .Items)}}"#));

    let mut reopened = OpenDocument::from_bytes(&doc.to_bytes().unwrap()).unwrap();
    reopened.execute(&invoice_data()).unwrap();
    let tree = parse_document(reopened.entry("content.xml").unwrap()).unwrap();
    assert_eq!(row_texts(&tree).len(), 2);
}

#[test]
fn test_malformed_content_is_a_parse_error() {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("content.xml", SimpleFileOptions::default()).unwrap();
    zip.write_all(b"<office:document-content><text:p></office:document-content>").unwrap();
    let bytes = zip.finish().unwrap().into_inner();

    let mut doc = OpenDocument::from_bytes(&bytes).unwrap();
    let err = doc.execute(&RenderContext::new()).unwrap_err();
    assert!(matches!(err, ReportError::Parse { .. }));
    assert_eq!(err.entry(), Some("content.xml"));
}

#[test]
fn test_not_a_zip_is_a_container_error() {
    let err = OpenDocument::from_bytes(b"plain text, not a package").unwrap_err();
    assert!(matches!(err, ReportError::Container(_)));
}
