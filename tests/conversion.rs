use std::fs;
use std::path::{Path, PathBuf};

use gumruk_tools::ToolError;
use gumruk_tools::flatten::ShapePolicy;
use gumruk_tools::index;
use gumruk_tools::io::{excel_read, excel_write, xml_read};
use gumruk_tools::layout::{DocumentKind, flatten_document};
use gumruk_tools::sync::{self, ConvertOptions};
use gumruk_tools::workspace::Workspace;
use tempfile::tempdir;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn gelen_document_flattens_every_section() {
    let root = xml_read::read_document(&fixture("gelen.xml")).expect("XML parsed");
    let workbook =
        flatten_document(&root, DocumentKind::Gelen, ShapePolicy::Strict).expect("flattened");

    let beyanname = workbook.table("Beyanname").expect("Beyanname sheet");
    assert_eq!(
        beyanname.columns,
        vec!["Rejim", "Gumruk_idaresi", "Beyanname_tipi"]
    );
    assert_eq!(beyanname.cell(0, "Rejim"), Some("4000"));

    let firma = workbook.table("FirmaBilgi").expect("FirmaBilgi sheet");
    assert_eq!(firma.columns, vec!["Tip", "No", "Adres", "Il", "Posta_kodu"]);
    assert_eq!(firma.rows.len(), 2);
    assert_eq!(firma.cell(0, "Adres"), None);
    assert_eq!(firma.cell(1, "Il"), Some("İzmir"));

    let kalem = workbook.table("Kalem").expect("Kalem sheet");
    assert_eq!(kalem.rows.len(), 2);
    assert_eq!(kalem.cell(1, "Gtip"), Some("851712000000"));

    let ozet = workbook.table("Özetbeyanlar").expect("Özetbeyanlar sheet");
    assert_eq!(
        ozet.columns,
        vec!["Ozetbeyan_no", "Tasima_senetleri", "Tasima_senedi_no"]
    );

    let kiymet = workbook.table("Kıymet").expect("Kıymet sheet");
    assert_eq!(kiymet.columns, vec!["Fatura_tarihi", "Fatura_no"]);

    let kiymet_kalem = workbook.table("KıymetBildirim").expect("KıymetBildirim sheet");
    assert_eq!(kiymet_kalem.cell(0, "Navlun"), Some("10"));
}

#[test]
fn written_workbook_reads_back_unchanged() {
    let root = xml_read::read_document(&fixture("gelen.xml")).expect("XML parsed");
    let workbook =
        flatten_document(&root, DocumentKind::Gelen, ShapePolicy::Strict).expect("flattened");

    let temp_dir = tempdir().expect("temporary directory");
    let xlsx_path = temp_dir.path().join("gelen.xlsx");
    excel_write::write_workbook(&xlsx_path, &workbook).expect("Excel written");
    let restored = excel_read::read_workbook(&xlsx_path).expect("Excel read");

    assert_eq!(workbook, restored);
}

#[test]
fn batch_converts_both_kinds_into_their_folders() {
    let temp_dir = tempdir().expect("temporary directory");
    let inputs = temp_dir.path().join("inputs");
    fs::create_dir(&inputs).expect("input directory");
    fs::copy(fixture("gelen.xml"), inputs.join("gelen.xml")).expect("gelen copied");
    fs::copy(fixture("sonuc.xml"), inputs.join("sonuc.xml")).expect("sonuc copied");
    fs::write(inputs.join("notes.txt"), "not a document").expect("noise written");

    let workspace = Workspace::new(temp_dir.path().join("out"));
    let report = sync::convert_batch(&[inputs], &workspace, &ConvertOptions::default())
        .expect("batch ran");

    assert!(report.is_success());
    assert_eq!(report.outcomes.len(), 2);

    let gelen_output = workspace.kind_dir(DocumentKind::Gelen).join("gelen.xlsx");
    let sonuc_output = workspace.kind_dir(DocumentKind::Sonuc).join("sonuc.xlsx");
    assert!(gelen_output.is_file());
    assert!(sonuc_output.is_file());

    let sonuc = excel_read::read_workbook(&sonuc_output).expect("Excel read");
    let names: Vec<&str> = sonuc
        .tables
        .iter()
        .map(|table| table.sheet_name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "Sonuc",
            "Belgeler",
            "Vergiler",
            "ToplamVergiler",
            "HesapDetaylari",
            "GumrukKiymetleri",
            "IstatistikiKiymetleri",
        ]
    );
    let genel = sonuc.table("Sonuc").expect("Sonuc sheet");
    assert_eq!(genel.columns, vec!["Beyanname_no", "Tescil_tarihi", "Durum"]);
    assert_eq!(
        sonuc.table("ToplamVergiler").and_then(|t| t.cell(0, "Miktar")),
        Some("234.00")
    );
}

#[test]
fn inputs_sharing_a_name_get_separate_workbooks() {
    let temp_dir = tempdir().expect("temporary directory");
    let mut inputs = Vec::new();
    for dir_name in ["a", "b"] {
        let dir = temp_dir.path().join(dir_name);
        fs::create_dir(&dir).expect("input directory");
        fs::copy(fixture("sonuc.xml"), dir.join("sonuc.xml")).expect("sonuc copied");
        inputs.push(dir);
    }

    let workspace = Workspace::new(temp_dir.path().join("out"));
    let report =
        sync::convert_batch(&inputs, &workspace, &ConvertOptions::default()).expect("batch ran");

    assert!(report.is_success());
    let outputs: Vec<PathBuf> = report.succeeded().map(|o| o.output.clone()).collect();
    let sonuc_dir = workspace.kind_dir(DocumentKind::Sonuc);
    assert_eq!(
        outputs,
        vec![sonuc_dir.join("sonuc.xlsx"), sonuc_dir.join("sonuc_1.xlsx")]
    );
    assert!(outputs.iter().all(|path| path.is_file()));
}

#[test]
fn latin5_document_converts_with_turkish_text() {
    let temp_dir = tempdir().expect("temporary directory");
    let workspace = Workspace::new(temp_dir.path());
    workspace.prepare().expect("workspace prepared");

    let outcome = sync::convert_document(
        &fixture("sonuc_latin5.xml"),
        &workspace,
        &ConvertOptions::default(),
    )
    .expect("Latin-5 document converted");

    assert_eq!(outcome.kind, DocumentKind::Sonuc);
    let workbook = excel_read::read_workbook(&outcome.output).expect("Excel read");
    assert_eq!(
        workbook.table("Sonuc").and_then(|t| t.cell(0, "Durum")),
        Some("Kapandı")
    );
    assert_eq!(
        workbook.table("Belgeler").and_then(|t| t.cell(0, "Il")),
        Some("İzmir")
    );
    assert_eq!(
        workbook.table("HesapDetaylari").and_then(|t| t.cell(0, "Aciklama")),
        Some("Gümrük vergisi")
    );
}

#[test]
fn batch_continues_after_a_broken_document() {
    let temp_dir = tempdir().expect("temporary directory");
    let broken = temp_dir.path().join("broken.xml");
    fs::write(&broken, "<Gelen><BeyannameBilgi>").expect("broken written");
    let missing = temp_dir.path().join("missing.xml");

    let workspace = Workspace::new(temp_dir.path().join("out"));
    let inputs = vec![broken.clone(), missing.clone(), fixture("sonuc.xml")];
    let report =
        sync::convert_batch(&inputs, &workspace, &ConvertOptions::default()).expect("batch ran");

    assert!(!report.is_success());
    assert_eq!(report.succeeded().count(), 1);

    let failed: Vec<(&Path, &ToolError)> = report.failed().collect();
    assert_eq!(failed.len(), 2);
    assert_eq!(failed[0].0, broken.as_path());
    assert!(matches!(failed[0].1, ToolError::Xml(_)));
    assert!(matches!(failed[1].1, ToolError::MissingInput(path) if *path == missing));
}

#[test]
fn forced_kind_reports_missing_sections() {
    let temp_dir = tempdir().expect("temporary directory");
    let workspace = Workspace::new(temp_dir.path());
    workspace.prepare().expect("workspace prepared");

    let options = ConvertOptions {
        kind: Some(DocumentKind::Gelen),
        shape: ShapePolicy::Strict,
    };
    let error = sync::convert_document(&fixture("sonuc.xml"), &workspace, &options)
        .expect_err("sonuc is not a gelen document");

    assert!(matches!(
        error,
        ToolError::MissingSection { ref sheet, .. } if sheet == "Beyanname"
    ));
}

#[test]
fn mismatched_rows_fail_strict_and_align_on_request() {
    let temp_dir = tempdir().expect("temporary directory");
    let input = temp_dir.path().join("uneven.xml");
    fs::write(
        &input,
        "<Sonuc><Beyanname_no>1</Beyanname_no><Vergiler>\
         <Vergi><Kod>40</Kod><Miktar>1</Miktar></Vergi>\
         <Vergi><Kod>41</Kod><Oran>18</Oran><Miktar>2</Miktar></Vergi>\
         </Vergiler></Sonuc>",
    )
    .expect("input written");
    let workspace = Workspace::new(temp_dir.path().join("out"));
    workspace.prepare().expect("workspace prepared");

    let strict = sync::convert_document(&input, &workspace, &ConvertOptions::default());
    assert!(matches!(
        strict,
        Err(ToolError::ShapeMismatch { ref section, row: 2, .. }) if section == "Vergiler"
    ));

    let options = ConvertOptions {
        kind: None,
        shape: ShapePolicy::Align,
    };
    let outcome = sync::convert_document(&input, &workspace, &options).expect("aligned");
    let workbook = excel_read::read_workbook(&outcome.output).expect("Excel read");
    let vergiler = workbook.table("Vergiler").expect("Vergiler sheet");
    assert_eq!(vergiler.columns, vec!["Kod", "Miktar", "Oran"]);
    assert_eq!(vergiler.cell(0, "Oran"), None);
    assert_eq!(vergiler.cell(1, "Miktar"), Some("2"));
    assert_eq!(vergiler.cell(1, "Oran"), Some("18"));
}

#[test]
fn index_lists_declaration_numbers() {
    let entries = index::index_documents(&[fixture("sonuc.xml")]).expect("indexed");

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].declaration_number, "21340100IM000001");

    let json: serde_json::Value =
        serde_json::from_str(&index::to_json(&entries).expect("JSON")).expect("JSON parsed");
    assert_eq!(json[0]["declaration_number"], "21340100IM000001");
}

#[test]
fn index_rejects_documents_without_a_number() {
    let error = index::index_documents(&[fixture("gelen.xml")]).expect_err("no number");

    assert!(matches!(error, ToolError::MissingSection { .. }));
}
