//! Section layouts of the two customs document kinds.
//!
//! Each layout is a declared list of sections: where the section lives in the
//! document, how it is shaped, and which sheet it lands on. Column names are
//! still discovered from the data, but the set of sections and their row tags
//! are fixed here rather than inferred.

use std::fmt;

use tracing::{debug, warn};

use crate::gumruk::tools::error::{Result, ToolError};
use crate::gumruk::tools::flatten::{
    ShapePolicy, SheetTable, WorkbookData, flatten_fields, flatten_record, flatten_rows,
};
use crate::gumruk::tools::model::XmlNode;

/// How a section element maps onto table rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionShape {
    /// Each direct child named `row_tag` is one row.
    Rows { row_tag: &'static str },
    /// The section element itself is the only row, walked depth-first.
    /// Not used by the built-in layouts; available to custom section lists.
    Record,
    /// One row holding the direct leaf children of the section element.
    Fields,
}

/// Declaration of one section of a document kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionSpec {
    pub sheet: &'static str,
    /// Child element names leading from the document root to the section.
    pub path: &'static [&'static str],
    pub shape: SectionShape,
    pub required: bool,
}

impl SectionSpec {
    /// Human readable path, used in errors and logs.
    pub fn display_path(&self) -> String {
        if self.path.is_empty() {
            "/".to_string()
        } else {
            self.path.join("/")
        }
    }

    /// Flattens this section out of `root`.
    ///
    /// A missing required section is an error; a missing optional one yields
    /// an empty table.
    pub fn flatten(&self, root: &XmlNode, policy: ShapePolicy) -> Result<SheetTable> {
        let Some(section) = root.find_path(self.path) else {
            if self.required {
                return Err(ToolError::MissingSection {
                    sheet: self.sheet.to_string(),
                    path: self.display_path(),
                });
            }
            warn!(sheet = self.sheet, path = %self.display_path(), "optional section missing");
            return Ok(SheetTable::empty(self.sheet));
        };

        let table = match self.shape {
            SectionShape::Rows { row_tag } => flatten_rows(self.sheet, section, row_tag, policy)?,
            SectionShape::Record => flatten_record(self.sheet, section),
            SectionShape::Fields => flatten_fields(self.sheet, section),
        };
        debug!(
            sheet = self.sheet,
            columns = table.columns.len(),
            rows = table.rows.len(),
            "section flattened"
        );
        Ok(table)
    }
}

const DECLARATION: &str = "BeyannameBilgi";
const DECLARATION_NUMBER: &str = "Beyanname_no";

const GELEN_SECTIONS: &[SectionSpec] = &[
    SectionSpec {
        sheet: "Beyanname",
        path: &[DECLARATION],
        shape: SectionShape::Fields,
        required: true,
    },
    SectionSpec {
        sheet: "FirmaBilgi",
        path: &[DECLARATION, "Firma_bilgi"],
        shape: SectionShape::Rows { row_tag: "firma" },
        required: true,
    },
    SectionSpec {
        sheet: "Özetbeyanlar",
        path: &[DECLARATION, "Ozetbeyanlar"],
        shape: SectionShape::Rows {
            row_tag: "Ozetbeyan",
        },
        required: false,
    },
    SectionSpec {
        sheet: "Kalem",
        path: &[DECLARATION, "Kalemler"],
        shape: SectionShape::Rows { row_tag: "kalem" },
        required: true,
    },
    SectionSpec {
        sheet: "SorularCevaplar",
        path: &[DECLARATION, "Sorular_cevaplar"],
        shape: SectionShape::Rows {
            row_tag: "Soru_Cevap",
        },
        required: false,
    },
    SectionSpec {
        sheet: "Dokümanlar",
        path: &[DECLARATION, "Dokumanlar"],
        shape: SectionShape::Rows { row_tag: "Dokuman" },
        required: false,
    },
    SectionSpec {
        sheet: "Vergiler",
        path: &[DECLARATION, "Vergiler"],
        shape: SectionShape::Rows { row_tag: "Vergi" },
        required: true,
    },
    SectionSpec {
        sheet: "Kıymet",
        path: &[DECLARATION, "KiymetBildirim", "Kiymet"],
        shape: SectionShape::Fields,
        required: false,
    },
    SectionSpec {
        sheet: "KıymetBildirim",
        path: &[DECLARATION, "KiymetBildirim", "Kiymet", "KiymetKalemler"],
        shape: SectionShape::Rows {
            row_tag: "KiymetKalem",
        },
        required: false,
    },
];

const SONUC_SECTIONS: &[SectionSpec] = &[
    SectionSpec {
        sheet: "Sonuc",
        path: &[],
        shape: SectionShape::Fields,
        required: true,
    },
    SectionSpec {
        sheet: "Belgeler",
        path: &["Belgeler"],
        shape: SectionShape::Rows { row_tag: "Belge" },
        required: false,
    },
    SectionSpec {
        sheet: "Vergiler",
        path: &["Vergiler"],
        shape: SectionShape::Rows { row_tag: "Vergi" },
        required: false,
    },
    SectionSpec {
        sheet: "ToplamVergiler",
        path: &["Toplam_vergiler"],
        shape: SectionShape::Rows {
            row_tag: "Toplam_Vergi",
        },
        required: false,
    },
    SectionSpec {
        sheet: "HesapDetaylari",
        path: &["Hesap_detaylari"],
        shape: SectionShape::Rows {
            row_tag: "Hesap_detay",
        },
        required: false,
    },
    SectionSpec {
        sheet: "GumrukKiymetleri",
        path: &["Gumruk_kiymetleri"],
        shape: SectionShape::Rows {
            row_tag: "Gumruk_Kiymeti",
        },
        required: false,
    },
    SectionSpec {
        sheet: "IstatistikiKiymetleri",
        path: &["Istatistiki_kiymetleri"],
        shape: SectionShape::Rows {
            row_tag: "Istatistiki_Kiymeti",
        },
        required: false,
    },
];

/// The two customs document kinds the tool understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// Incoming declaration ("Gelen").
    Gelen,
    /// Customs result document ("Sonuç").
    Sonuc,
}

impl DocumentKind {
    /// Guesses the kind from the children of the document root.
    pub fn detect(root: &XmlNode) -> Result<Self> {
        if root.find(DECLARATION).is_some() {
            Ok(DocumentKind::Gelen)
        } else if root.find(DECLARATION_NUMBER).is_some() {
            Ok(DocumentKind::Sonuc)
        } else {
            Err(ToolError::UnknownDocument(root.name.clone()))
        }
    }

    /// Sections emitted for this kind, in sheet order.
    pub fn sections(self) -> &'static [SectionSpec] {
        match self {
            DocumentKind::Gelen => GELEN_SECTIONS,
            DocumentKind::Sonuc => SONUC_SECTIONS,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Gelen => write!(f, "gelen"),
            DocumentKind::Sonuc => write!(f, "sonuc"),
        }
    }
}

/// Flattens every section of a document into workbook tables.
///
/// The first failing section aborts the whole document.
pub fn flatten_document(
    root: &XmlNode,
    kind: DocumentKind,
    policy: ShapePolicy,
) -> Result<WorkbookData> {
    let tables = kind
        .sections()
        .iter()
        .map(|section| section.flatten(root, policy))
        .collect::<Result<Vec<_>>>()?;
    Ok(WorkbookData::from_tables(tables))
}

/// Reads the declaration number of a result document.
pub fn declaration_number(root: &XmlNode) -> Result<&str> {
    root.find(DECLARATION_NUMBER)
        .and_then(|node| node.text.as_deref())
        .ok_or_else(|| ToolError::MissingSection {
            sheet: DECLARATION_NUMBER.to_string(),
            path: DECLARATION_NUMBER.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gumruk::tools::io::xml_read::parse_str;

    const GELEN: &str = r#"<Beyanname xmlns="urn:gelen">
  <BeyannameBilgi>
    <Rejim>4000</Rejim>
    <Gumruk_idaresi>340100</Gumruk_idaresi>
    <Firma_bilgi>
      <firma><Tip>1</Tip><No>123</No></firma>
      <firma><Tip>2</Tip><No>456</No></firma>
    </Firma_bilgi>
    <Kalemler>
      <kalem><Kalem_sira_no>1</Kalem_sira_no><Gtip>8471</Gtip></kalem>
    </Kalemler>
    <Vergiler>
      <Vergi><Kalem_no>1</Kalem_no><Vergi_kodu>40</Vergi_kodu></Vergi>
    </Vergiler>
  </BeyannameBilgi>
</Beyanname>"#;

    #[test]
    fn detects_document_kinds() {
        let gelen = parse_str(GELEN).unwrap();
        let sonuc = parse_str("<Sonuc><Beyanname_no>21340100IM000001</Beyanname_no></Sonuc>")
            .unwrap();
        let other = parse_str("<Fatura/>").unwrap();

        assert_eq!(DocumentKind::detect(&gelen).unwrap(), DocumentKind::Gelen);
        assert_eq!(DocumentKind::detect(&sonuc).unwrap(), DocumentKind::Sonuc);
        assert!(matches!(
            DocumentKind::detect(&other),
            Err(ToolError::UnknownDocument(name)) if name == "Fatura"
        ));
    }

    #[test]
    fn gelen_layout_produces_every_sheet() {
        let root = parse_str(GELEN).unwrap();

        let workbook = flatten_document(&root, DocumentKind::Gelen, ShapePolicy::Strict).unwrap();

        let names: Vec<&str> = workbook
            .tables
            .iter()
            .map(|t| t.sheet_name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "Beyanname",
                "FirmaBilgi",
                "Özetbeyanlar",
                "Kalem",
                "SorularCevaplar",
                "Dokümanlar",
                "Vergiler",
                "Kıymet",
                "KıymetBildirim",
            ]
        );

        let beyanname = workbook.table("Beyanname").unwrap();
        assert_eq!(beyanname.columns, vec!["Rejim", "Gumruk_idaresi"]);

        let firma = workbook.table("FirmaBilgi").unwrap();
        assert_eq!(firma.columns, vec!["Tip", "No"]);
        assert_eq!(firma.rows.len(), 2);
        assert_eq!(firma.cell(1, "No"), Some("456"));

        assert!(workbook.table("Özetbeyanlar").unwrap().is_empty());
    }

    #[test]
    fn missing_required_section_fails() {
        let root = parse_str(
            "<Beyanname><BeyannameBilgi><Firma_bilgi/><Kalemler/></BeyannameBilgi></Beyanname>",
        )
        .unwrap();

        let error = flatten_document(&root, DocumentKind::Gelen, ShapePolicy::Strict).unwrap_err();

        match error {
            ToolError::MissingSection { sheet, path } => {
                assert_eq!(sheet, "Vergiler");
                assert_eq!(path, "BeyannameBilgi/Vergiler");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn record_sections_walk_the_whole_element() {
        let root = parse_str(GELEN).unwrap();
        let spec = SectionSpec {
            sheet: "Firmalar",
            path: &[DECLARATION, "Firma_bilgi"],
            shape: SectionShape::Record,
            required: true,
        };

        let table = spec.flatten(&root, ShapePolicy::Strict).unwrap();

        assert_eq!(table.columns, vec!["firma", "Tip", "No", "firma_1", "Tip_1", "No_1"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.cell(0, "No_1"), Some("456"));
    }

    #[test]
    fn sonuc_root_fields_and_number() {
        let root = parse_str(
            "<Sonuc><Beyanname_no>21340100IM000001</Beyanname_no><Durum>Kapandi</Durum>\
             <Belgeler><Belge><Kod>0101</Kod></Belge></Belgeler></Sonuc>",
        )
        .unwrap();

        let workbook = flatten_document(&root, DocumentKind::Sonuc, ShapePolicy::Strict).unwrap();

        let genel = workbook.table("Sonuc").unwrap();
        assert_eq!(genel.columns, vec!["Beyanname_no", "Durum"]);
        assert_eq!(workbook.table("Belgeler").unwrap().cell(0, "Kod"), Some("0101"));
        assert_eq!(declaration_number(&root).unwrap(), "21340100IM000001");
    }
}
