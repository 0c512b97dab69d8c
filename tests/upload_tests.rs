mod test_utils;

use studygen::error::UploadError;
use studygen::upload::{
    validate_selection, PdfDocument, UploadedFile, MAX_UPLOAD_BYTES, PDF_MIME_TYPE, REJECTED_NOTICE,
};
use test_utils::sample_pdf;

#[test]
fn selection_keeps_only_small_pdfs() {
    let too_big = UploadedFile::from_bytes("huge.pdf", PDF_MIME_TYPE, &vec![0u8; MAX_UPLOAD_BYTES + 1]);
    let image = UploadedFile::from_bytes("scan.png", "image/png", b"\x89PNG");

    let selection = validate_selection(vec![sample_pdf(), too_big, image]);

    assert_eq!(selection.accepted.len(), 1);
    assert_eq!(selection.accepted[0].name, "biology.pdf");
    assert_eq!(selection.rejected.len(), 2);
    assert!(matches!(selection.rejected[0], UploadError::TooLarge { size, .. } if size == MAX_UPLOAD_BYTES + 1));
    assert!(matches!(selection.rejected[1], UploadError::UnsupportedType { .. }));
    assert_eq!(selection.notice, Some(REJECTED_NOTICE));
}

#[test]
fn exactly_five_megabytes_is_allowed() {
    let file = UploadedFile::from_bytes("limit.pdf", PDF_MIME_TYPE, &vec![1u8; MAX_UPLOAD_BYTES]);
    assert!(file.check().is_ok());
    assert_eq!(PdfDocument::from_upload(&file).unwrap().len(), MAX_UPLOAD_BYTES);
}

#[test]
fn clean_selection_has_no_notice() {
    let selection = validate_selection(vec![sample_pdf()]);
    assert!(selection.rejected.is_empty());
    assert!(selection.notice.is_none());
}

#[test]
fn only_the_first_file_is_used() {
    let second = UploadedFile::from_bytes("other.pdf", PDF_MIME_TYPE, b"%PDF-other");
    let doc = PdfDocument::from_first(&[sample_pdf(), second]).unwrap();
    assert_eq!(doc.name, "biology.pdf");
    assert!(doc.bytes().starts_with(b"%PDF-1.4"));
}

#[test]
fn empty_submission_has_no_document() {
    assert_eq!(PdfDocument::from_first(&[]), Err(UploadError::NoFiles));
}

#[test]
fn browser_payload_deserializes_with_type_field() {
    let raw = r#"{"name":"notes.pdf","type":"application/pdf","data":"data:application/pdf;base64,JVBERg=="}"#;
    let file: UploadedFile = serde_json::from_str(raw).unwrap();
    assert_eq!(file.mime_type, PDF_MIME_TYPE);
    assert_eq!(PdfDocument::from_upload(&file).unwrap().bytes(), b"%PDF");
}

#[tokio::test]
async fn from_path_infers_pdf_type() {
    let path = std::env::temp_dir().join(format!("studygen-upload-{}.pdf", std::process::id()));
    tokio::fs::write(&path, b"%PDF-1.7").await.unwrap();

    let file = UploadedFile::from_path(&path).await.unwrap();
    assert_eq!(file.mime_type, PDF_MIME_TYPE);
    assert!(file.check().is_ok());

    let _ = tokio::fs::remove_file(&path).await;
}
