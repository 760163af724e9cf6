use std::fs;
use std::path::Path;

use encoding_rs::{Encoding, UTF_8};
use tracing::{debug, instrument};

use crate::gumruk::tools::error::{Result, ToolError};
use crate::gumruk::tools::model::XmlNode;

/// Reads and parses an XML document from disk.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub fn read_document(path: &Path) -> Result<XmlNode> {
    let bytes = fs::read(path)?;
    parse_bytes(&bytes)
}

/// Decodes raw document bytes and parses them.
///
/// The encoding comes from a byte order mark, else from the `encoding`
/// attribute of the XML declaration, else UTF-8. Customs systems commonly
/// emit `ISO-8859-9` or `windows-1254`.
pub fn parse_bytes(bytes: &[u8]) -> Result<XmlNode> {
    let (encoding, body) = match Encoding::for_bom(bytes) {
        Some((encoding, bom_len)) => (encoding, &bytes[bom_len..]),
        None => (declared_encoding(bytes).unwrap_or(UTF_8), bytes),
    };
    debug!(encoding = encoding.name(), "decoding XML document");

    let source = encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .ok_or_else(|| ToolError::Encoding(encoding.name().to_string()))?;
    parse_str(&source)
}

// Only an ASCII-compatible declaration can be sniffed; anything else needs a BOM.
fn declared_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = bytes.strip_prefix(b"<?xml")?;
    let end = head.windows(2).take(512).position(|pair| pair == b"?>")?;
    let declaration = std::str::from_utf8(&head[..end]).ok()?;

    let (_, rest) = declaration.split_once("encoding")?;
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|ch| *ch == '"' || *ch == '\'')?;
    let (label, _) = rest[1..].split_once(quote)?;
    Encoding::for_label(label.as_bytes())
}

/// Parses XML text into an [`XmlNode`] tree with namespace prefixes removed.
///
/// Every element keeps only its local name, so `<ns:Vergi>` and `<Vergi>` are
/// indistinguishable afterwards. Comments and processing instructions are
/// dropped.
pub fn parse_str(source: &str) -> Result<XmlNode> {
    let document = roxmltree::Document::parse(source)?;
    let root = convert(document.root_element());
    debug!(root = %root.name, children = root.children.len(), "parsed XML document");
    Ok(root)
}

fn convert(element: roxmltree::Node<'_, '_>) -> XmlNode {
    let mut node = XmlNode::new(element.tag_name().name());
    let mut head_text: Option<String> = None;

    for child in element.children() {
        if child.is_element() {
            node.children.push(convert(child));
        } else if child.is_text() && node.children.is_empty() {
            if let Some(text) = child.text() {
                head_text.get_or_insert_with(String::new).push_str(text);
            }
        }
    }

    node.text = match head_text {
        Some(text) if !node.children.is_empty() && text.trim().is_empty() => None,
        other => other,
    };
    node
}
