//! EPUB parsing utilities (container.xml, OPF manifest and spine).

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::book::{Manifest, ManifestItem, MediaType, PageDirection, Spine, SpineItem};
use crate::error::{Error, Result};
use crate::io::strip_bom;
use crate::util::percent_decode;
use crate::xml::{local_name, resolve_entity};

/// Parsed package document.
#[derive(Debug, Clone, Default)]
pub struct PackageDocument {
    pub title: String,
    pub identifier: String,
    pub manifest: Manifest,
    pub spine: Spine,
}

/// Parse META-INF/container.xml to find the OPF path.
pub fn parse_container_xml(bytes: &[u8]) -> Result<String> {
    let content = std::str::from_utf8(strip_bom(bytes))
        .map_err(|e| Error::InvalidEpub(format!("container.xml is not UTF-8: {}", e)))?;

    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Empty(e) | Event::Start(e) if local_name(e.name().as_ref()) == b"rootfile" => {
                if let Some(path) = attr_value(&e, b"full-path") {
                    return Ok(path);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Err(Error::InvalidEpub("No rootfile found in container.xml".into()))
}

/// Parse an OPF package document.
///
/// Manifest hrefs are percent-decoded so they compare equal to resolved
/// navigation targets.
pub fn parse_package(content: &str) -> Result<PackageDocument> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut package = PackageDocument::default();

    let mut in_metadata = false;
    let mut current_element: Option<&'static str> = None;
    let mut buf_text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"metadata" => in_metadata = true,
                    b"title" if in_metadata => {
                        current_element = Some("title");
                        buf_text.clear();
                    }
                    b"identifier" if in_metadata => {
                        current_element = Some("identifier");
                        buf_text.clear();
                    }
                    b"spine" => read_spine_attrs(&e, &mut package.spine),
                    b"item" => read_manifest_item(&e, &mut package.manifest),
                    b"itemref" => read_itemref(&e, &mut package.spine),
                    _ => {}
                }
            }
            Event::Empty(e) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"item" => read_manifest_item(&e, &mut package.manifest),
                    b"itemref" => read_itemref(&e, &mut package.spine),
                    b"spine" => read_spine_attrs(&e, &mut package.spine),
                    _ => {}
                }
            }
            Event::Text(e) => {
                if current_element.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::GeneralRef(e) => {
                if current_element.is_some()
                    && let Some(resolved) = resolve_entity(&String::from_utf8_lossy(&e))
                {
                    buf_text.push_str(&resolved);
                }
            }
            Event::End(e) => {
                let name = e.name();
                if local_name(name.as_ref()) == b"metadata" {
                    in_metadata = false;
                }

                match current_element.take() {
                    Some("title") if package.title.is_empty() => {
                        package.title = buf_text.trim().to_string()
                    }
                    Some("identifier") if package.identifier.is_empty() => {
                        package.identifier = buf_text.trim().to_string()
                    }
                    _ => {}
                }
                buf_text.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(package)
}

fn read_manifest_item(e: &BytesStart<'_>, manifest: &mut Manifest) {
    let Some(id) = attr_value(e, b"id") else {
        return;
    };
    let href = attr_value(e, b"href").unwrap_or_default();
    let media_type = attr_value(e, b"media-type").unwrap_or_default();

    manifest.insert(ManifestItem {
        id,
        path: percent_decode(&href).into_owned(),
        media_type: MediaType::from_mime(&media_type),
        property: attr_value(e, b"properties"),
        extra_attributes: other_attributes(e, &[b"id", b"href", b"media-type", b"properties"]),
    });
}

fn read_itemref(e: &BytesStart<'_>, spine: &mut Spine) {
    let Some(idref) = attr_value(e, b"idref") else {
        return;
    };
    spine.items.push(SpineItem {
        id: attr_value(e, b"id"),
        idref,
        linear: attr_value(e, b"linear").as_deref() != Some("no"),
        extra_attributes: other_attributes(e, &[b"id", b"idref", b"linear"]),
    });
}

fn read_spine_attrs(e: &BytesStart<'_>, spine: &mut Spine) {
    spine.id = attr_value(e, b"id");
    spine.toc = attr_value(e, b"toc");
    spine.page_progression = attr_value(e, b"page-progression-direction")
        .map(|v| PageDirection::from_attr(&v))
        .unwrap_or_default();
    spine.extra_attributes = other_attributes(e, &[b"id", b"toc", b"page-progression-direction"]);
}

/// Attributes whose local name is not in `known`, skipping namespace
/// declarations.
fn other_attributes(e: &BytesStart<'_>, known: &[&[u8]]) -> Vec<(String, String)> {
    e.attributes()
        .flatten()
        .filter(|attr| {
            let key = attr.key.as_ref();
            key != b"xmlns" && !key.starts_with(b"xmlns:") && !known.contains(&local_name(key))
        })
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            (key, unescape_value(&attr.value))
        })
        .collect()
}

/// Unescaped value of the attribute whose local name is `key`.
fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| local_name(attr.key.as_ref()) == key)
        .map(|attr| unescape_value(&attr.value))
}

fn unescape_value(value: &[u8]) -> String {
    let raw = String::from_utf8_lossy(value).into_owned();
    match quick_xml::escape::unescape(&raw) {
        Ok(value) => value.into_owned(),
        Err(_) => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_container_xml() {
        let container = br#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

        assert_eq!(parse_container_xml(container).unwrap(), "OEBPS/content.opf");
    }

    #[test]
    fn test_parse_container_xml_with_bom() {
        let mut container = vec![0xEF, 0xBB, 0xBF];
        container.extend_from_slice(
            br#"<container><rootfiles><rootfile full-path="content.opf"/></rootfiles></container>"#,
        );
        assert_eq!(parse_container_xml(&container).unwrap(), "content.opf");
    }

    #[test]
    fn test_parse_container_xml_without_rootfile() {
        assert!(matches!(
            parse_container_xml(b"<container/>"),
            Err(Error::InvalidEpub(_))
        ));
    }

    #[test]
    fn test_parse_package() {
        let opf = r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Test Book</dc:title>
    <dc:identifier>urn:isbn:1234567890</dc:identifier>
  </metadata>
  <manifest>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="text" href="Text/My%20Book.xhtml" media-type="application/xhtml+xml"/>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="css" href="style.css" media-type="text/css"/>
  </manifest>
  <spine toc="ncx" page-progression-direction="rtl">
    <itemref idref="text"/>
    <itemref idref="nav" linear="no"/>
  </spine>
</package>"#;

        let package = parse_package(opf).unwrap();

        assert_eq!(package.title, "Test Book");
        assert_eq!(package.identifier, "urn:isbn:1234567890");
        assert_eq!(package.manifest.len(), 4);
        assert_eq!(package.manifest.get("text").unwrap().path, "Text/My Book.xhtml");
        assert!(package.manifest.get("nav").unwrap().is_nav());
        assert_eq!(package.manifest.get("ncx").unwrap().media_type, MediaType::Ncx);

        assert_eq!(package.spine.toc.as_deref(), Some("ncx"));
        assert_eq!(package.spine.page_progression, PageDirection::Rtl);
        assert_eq!(package.spine.items.len(), 2);
        assert!(package.spine.items[0].linear);
        assert!(!package.spine.items[1].linear);
    }
}
