use std::fs;
use std::path::Path;

use chapterize::epub::parse_nav_tree;
use chapterize::{EpubDir, Error, NoChange, Outcome, StandardizeConfig};
use tempfile::TempDir;

const CONTAINER: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

const OPF: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Split Book</dc:title>
    <dc:identifier id="uid">urn:uuid:1234</dc:identifier>
  </metadata>
  <manifest>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="nav" href="nav/nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="css" href="styles/style.css" media-type="text/css"/>
    <item id="book" href="text/book.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine toc="ncx">
    <itemref idref="book"/>
  </spine>
  <guide>
    <reference type="text" title="Start" href="text/book.xhtml"/>
  </guide>
</package>"#;

const NCX: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="urn:uuid:1234"/>
  </head>
  <docTitle><text>Split Book</text></docTitle>
  <navMap>
    <navPoint id="np-cover" playOrder="1">
      <navLabel><text>Cover</text></navLabel>
      <content src="text/book.xhtml#cover"/>
    </navPoint>
    <navPoint id="np-1" playOrder="2">
      <navLabel><text>Chapter 1</text></navLabel>
      <content src="text/book.xhtml#ch1"/>
      <navPoint id="np-1-1" playOrder="3">
        <navLabel><text>Section 1.1</text></navLabel>
        <content src="text/book.xhtml#s11"/>
      </navPoint>
    </navPoint>
  </navMap>
</ncx>"#;

const NAV: &str = r##"<?xml version="1.0" encoding="utf-8"?>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head><title>Split Book</title></head>
<body>
  <nav epub:type="toc" id="toc">
    <h1>Contents</h1>
    <ol>
      <li><a href="../text/book.xhtml#cover">Cover</a></li>
      <li><a href="../text/book.xhtml#ch1">Chapter 1</a>
        <ol><li><a href="../text/book.xhtml#s11">Section 1.1</a></li></ol>
      </li>
    </ol>
  </nav>
  <nav epub:type="landmarks"><ol><li><a href="../text/book.xhtml">Start</a></li></ol></nav>
</body>
</html>"##;

const BOOK: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
  <title>Split Book</title>
  <link rel="stylesheet" href="../styles/style.css"/>
</head>
<body>
<section id="cover"><p>Cover</p></section>
<p>ii</p>
<h1 id="ch1">Chapter 1</h1>
<p>Once upon a time.</p>
<p>12</p>
<h2 id="s11">Section 1.1</h2>
<p>The end.</p>
</body>
</html>"#;

fn write(root: &Path, path: &str, content: &str) {
    let full = root.join(path);
    fs::create_dir_all(full.parent().unwrap()).unwrap();
    fs::write(full, content).unwrap();
}

fn unpacked_book() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "META-INF/container.xml", CONTAINER);
    write(dir.path(), "OEBPS/content.opf", OPF);
    write(dir.path(), "OEBPS/toc.ncx", NCX);
    write(dir.path(), "OEBPS/nav/nav.xhtml", NAV);
    write(dir.path(), "OEBPS/styles/style.css", "body { margin: 0 }");
    write(dir.path(), "OEBPS/text/book.xhtml", BOOK);
    dir
}

#[test]
fn test_open_prefers_ncx() {
    let dir = unpacked_book();
    let book = EpubDir::open(dir.path()).unwrap();

    assert_eq!(book.title(), "Split Book");
    assert_eq!(book.package_path(), "OEBPS/content.opf");
    assert_eq!(book.nav_path(), "toc.ncx");
    assert_eq!(book.toc().children[0].id, "np-cover");
    assert_eq!(book.toc().descendant_count(), 3);
    assert_eq!(book.manifest().len(), 4);
}

#[test]
fn test_open_falls_back_to_nav_document() {
    let dir = unpacked_book();
    let opf = OPF.replace(r#"<spine toc="ncx">"#, "<spine>");
    write(dir.path(), "OEBPS/content.opf", &opf);

    let book = EpubDir::open(dir.path()).unwrap();
    assert_eq!(book.nav_path(), "nav/nav.xhtml");
    assert_eq!(book.toc().children[1].children[0].label, "Section 1.1");
}

#[test]
fn test_open_without_container_is_error() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(EpubDir::open(dir.path()), Err(Error::Io(_))));
}

#[test]
fn test_standardize_and_save_roundtrip() {
    let dir = unpacked_book();
    let mut book = EpubDir::open(dir.path()).unwrap();

    let outcome = book.standardize(&StandardizeConfig::default()).unwrap();
    let Outcome::Rewritten(result) = outcome else {
        panic!("expected a rewrite");
    };
    assert_eq!(result.chapters.len(), 3);
    book.save().unwrap();

    let oebps = dir.path().join("OEBPS");
    let chapter = fs::read_to_string(oebps.join("text/chapter_0002.xhtml")).unwrap();
    assert!(chapter.contains("Once upon a time."));
    assert!(!chapter.contains("<p>12</p>"));
    assert!(chapter.contains(r#"<link rel="stylesheet" href="../styles/style.css"/>"#));

    let opf = fs::read_to_string(oebps.join("content.opf")).unwrap();
    assert!(opf.contains("<dc:title>Split Book</dc:title>"));
    assert!(opf.contains(r#"<reference type="text" title="Start" href="text/book.xhtml"/>"#));
    assert!(!opf.contains(r#"id="book""#));

    let reopened = EpubDir::open(dir.path()).unwrap();
    assert_eq!(reopened.spine().items.len(), 3);
    assert_eq!(reopened.spine().items[0].idref, "std_chapter_0001");
    assert_eq!(
        reopened.manifest().get("std_chapter_0003").unwrap().path,
        "text/chapter_0003.xhtml"
    );
    assert_eq!(reopened.spine().toc.as_deref(), Some("ncx"));

    let toc = reopened.toc();
    assert_eq!(toc.item.as_deref(), Some("urn:uuid:1234"));
    assert_eq!(toc.children[0].id, "np-cover");
    assert_eq!(toc.children[0].item.as_deref(), Some("text/chapter_0001.xhtml"));
    assert_eq!(
        toc.children[1].children[0].item.as_deref(),
        Some("text/chapter_0003.xhtml")
    );

    let nav = fs::read_to_string(oebps.join("nav/nav.xhtml")).unwrap();
    assert!(nav.contains("<h1>Contents</h1>"));
    assert!(nav.contains(r#"<a href="../text/book.xhtml">Start</a>"#));
    let nav_tree = parse_nav_tree(&nav).unwrap();
    assert_eq!(
        nav_tree.children[1].item.as_deref(),
        Some("../text/chapter_0002.xhtml")
    );
    assert_eq!(nav_tree.children[1].children[0].label, "Section 1.1");
}

#[test]
fn test_save_keeps_extra_package_attributes() {
    let dir = unpacked_book();
    let opf = OPF
        .replace(
            r#"<item id="css" href="styles/style.css" media-type="text/css"/>"#,
            r#"<item id="css" href="styles/style.css" media-type="text/css"/>
    <item id="cover" href="text/cover.xhtml" media-type="application/xhtml+xml" fallback="css"/>"#,
        )
        .replace(
            r#"<itemref idref="book"/>"#,
            r#"<itemref idref="book"/>
    <itemref idref="cover" properties="page-spread-left"/>"#,
        );
    write(dir.path(), "OEBPS/content.opf", &opf);
    write(dir.path(), "OEBPS/text/cover.xhtml", "<html><head/><body/></html>");

    let mut book = EpubDir::open(dir.path()).unwrap();
    assert!(matches!(
        book.standardize(&StandardizeConfig::default()).unwrap(),
        Outcome::Rewritten(_)
    ));
    book.save().unwrap();

    let saved = fs::read_to_string(dir.path().join("OEBPS/content.opf")).unwrap();
    assert!(saved.contains(r#"id="cover" href="text/cover.xhtml" media-type="application/xhtml+xml" fallback="css"/>"#));
    assert!(saved.contains(r#"<itemref idref="cover" properties="page-spread-left"/>"#));

    let reopened = EpubDir::open(dir.path()).unwrap();
    let cover = reopened.spine().items.last().unwrap();
    assert_eq!(cover.idref, "cover");
    assert_eq!(
        cover.extra_attributes,
        vec![("properties".to_string(), "page-spread-left".to_string())]
    );
}

#[test]
fn test_second_pass_after_save_is_no_op() {
    let dir = unpacked_book();
    let mut book = EpubDir::open(dir.path()).unwrap();
    book.standardize(&StandardizeConfig::default()).unwrap();
    book.save().unwrap();

    let mut reopened = EpubDir::open(dir.path()).unwrap();
    let outcome = reopened.standardize(&StandardizeConfig::default()).unwrap();
    assert!(matches!(outcome, Outcome::Unchanged(NoChange::NoSplitChapters)));

    // The in-memory state is also consistent without a reopen.
    let again = book.standardize(&StandardizeConfig::default()).unwrap();
    assert!(matches!(again, Outcome::Unchanged(NoChange::NoSplitChapters)));
}

#[test]
fn test_dry_run_leaves_disk_untouched() {
    let dir = unpacked_book();
    let book = EpubDir::open(dir.path()).unwrap();

    let (outcome, writes) = book.standardize_dry_run(&StandardizeConfig::default()).unwrap();
    assert!(matches!(outcome, Outcome::Rewritten(_)));
    assert_eq!(
        writes.paths(),
        vec![
            "text/chapter_0001.xhtml",
            "text/chapter_0002.xhtml",
            "text/chapter_0003.xhtml"
        ]
    );

    assert!(!dir.path().join("OEBPS/text/chapter_0001.xhtml").exists());
    assert_eq!(
        fs::read_to_string(dir.path().join("OEBPS/content.opf")).unwrap(),
        OPF
    );
}
