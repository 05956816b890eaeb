//! Package model: manifest, spine and navigation tree.
//!
//! These are the three interlinked structures a standardization pass reads
//! and replaces. Paths are always relative to the content root (the
//! directory holding the package document) and percent-decoded.

/// Media type of a manifest resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MediaType {
    /// `application/xhtml+xml`
    Xhtml,
    /// `text/html`
    Html,
    /// `application/x-dtbncx+xml` (legacy navigation resource)
    Ncx,
    /// `text/css`
    Css,
    /// Anything else, kept verbatim.
    Other(String),
}

impl MediaType {
    pub fn from_mime(mime: &str) -> Self {
        match mime.trim() {
            "application/xhtml+xml" => MediaType::Xhtml,
            "text/html" => MediaType::Html,
            "application/x-dtbncx+xml" => MediaType::Ncx,
            "text/css" => MediaType::Css,
            other => MediaType::Other(other.to_string()),
        }
    }

    /// The MIME type string for this media type.
    pub fn mime(&self) -> &str {
        match self {
            MediaType::Xhtml => "application/xhtml+xml",
            MediaType::Html => "text/html",
            MediaType::Ncx => "application/x-dtbncx+xml",
            MediaType::Css => "text/css",
            MediaType::Other(mime) => mime,
        }
    }

    /// Check if this media type is a content document.
    pub fn is_document(&self) -> bool {
        matches!(self, MediaType::Xhtml | MediaType::Html)
    }
}

/// A manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    pub path: String,
    pub media_type: MediaType,
    /// Raw `properties` value, e.g. `nav` for the navigation document.
    pub property: Option<String>,
    /// Any other attributes (`fallback`, `media-overlay`, ...) as qualified
    /// name and unescaped value, in document order.
    pub extra_attributes: Vec<(String, String)>,
}

impl ManifestItem {
    pub fn new(id: impl Into<String>, path: impl Into<String>, media_type: MediaType) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            media_type,
            property: None,
            extra_attributes: Vec::new(),
        }
    }

    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    /// Whether the `properties` list contains `name`.
    pub fn has_property(&self, name: &str) -> bool {
        self.property
            .as_deref()
            .is_some_and(|props| props.split_ascii_whitespace().any(|p| p == name))
    }

    /// Whether this item is the navigation document itself.
    pub fn is_nav(&self) -> bool {
        self.has_property("nav")
    }
}

/// All resources of a package, keyed by unique id.
///
/// Insertion order is kept so a rewritten package document lists items in
/// a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    items: Vec<ManifestItem>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an item, replacing any existing item with the same id in place.
    pub fn insert(&mut self, item: ManifestItem) {
        match self.items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
    }

    pub fn with_item(mut self, item: ManifestItem) -> Self {
        self.insert(item);
        self
    }

    pub fn get(&self, id: &str) -> Option<&ManifestItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ManifestItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<ManifestItem> for Manifest {
    fn from_iter<T: IntoIterator<Item = ManifestItem>>(iter: T) -> Self {
        let mut manifest = Manifest::new();
        for item in iter {
            manifest.insert(item);
        }
        manifest
    }
}

/// Page progression direction declared on the spine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PageDirection {
    Ltr,
    Rtl,
    #[default]
    Default,
}

impl PageDirection {
    pub fn from_attr(value: &str) -> Self {
        match value.trim() {
            "ltr" => PageDirection::Ltr,
            "rtl" => PageDirection::Rtl,
            _ => PageDirection::Default,
        }
    }

    /// Attribute value, or `None` when unspecified.
    pub fn as_attr(self) -> Option<&'static str> {
        match self {
            PageDirection::Ltr => Some("ltr"),
            PageDirection::Rtl => Some("rtl"),
            PageDirection::Default => None,
        }
    }
}

/// An item in the reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpineItem {
    pub id: Option<String>,
    pub idref: String,
    pub linear: bool,
    /// Other itemref attributes, e.g. `properties="page-spread-left"`.
    pub extra_attributes: Vec<(String, String)>,
}

impl SpineItem {
    pub fn new(idref: impl Into<String>) -> Self {
        Self {
            id: None,
            idref: idref.into(),
            linear: true,
            extra_attributes: Vec::new(),
        }
    }

    pub fn non_linear(mut self) -> Self {
        self.linear = false;
        self
    }
}

/// The reading order of a package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Spine {
    pub id: Option<String>,
    /// Manifest id of the legacy navigation resource.
    pub toc: Option<String>,
    pub page_progression: PageDirection,
    /// Other attributes of the `<spine>` element.
    pub extra_attributes: Vec<(String, String)>,
    pub items: Vec<SpineItem>,
}

impl Spine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_toc(mut self, toc: impl Into<String>) -> Self {
        self.toc = Some(toc.into());
        self
    }

    pub fn with_item(mut self, item: SpineItem) -> Self {
        self.items.push(item);
        self
    }
}

/// A node of the navigation tree, independent of the source dialect.
///
/// The builder returns a synthetic root whose label is the document title;
/// its children are the table of contents entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavNode {
    pub label: String,
    pub id: String,
    /// Raw `file#fragment` target before standardization, a bare
    /// content-root-relative path after it.
    pub item: Option<String>,
    pub children: Vec<NavNode>,
}

impl NavNode {
    pub fn new(label: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            id: id.into(),
            item: None,
            children: Vec::new(),
        }
    }

    pub fn with_item(mut self, item: impl Into<String>) -> Self {
        self.item = Some(item.into());
        self
    }

    pub fn with_child(mut self, child: NavNode) -> Self {
        self.children.push(child);
        self
    }

    /// Total number of nodes below this one.
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|c| 1 + c.descendant_count())
            .sum()
    }

    /// Pre-order list of every node below this one.
    pub fn flatten(&self) -> Vec<&NavNode> {
        let mut out = Vec::new();
        fn walk<'a>(nodes: &'a [NavNode], out: &mut Vec<&'a NavNode>) {
            for node in nodes {
                out.push(node);
                walk(&node.children, out);
            }
        }
        walk(&self.children, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_roundtrip() {
        assert_eq!(MediaType::from_mime("application/xhtml+xml"), MediaType::Xhtml);
        assert_eq!(MediaType::from_mime("image/png").mime(), "image/png");
        assert!(MediaType::Html.is_document());
        assert!(!MediaType::Ncx.is_document());
    }

    #[test]
    fn test_manifest_insert_replaces_same_id() {
        let mut manifest = Manifest::new()
            .with_item(ManifestItem::new("a", "a.xhtml", MediaType::Xhtml))
            .with_item(ManifestItem::new("b", "b.xhtml", MediaType::Xhtml));
        manifest.insert(ManifestItem::new("a", "a2.xhtml", MediaType::Xhtml));

        assert_eq!(manifest.len(), 2);
        let ids: Vec<_> = manifest.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(manifest.get("a").unwrap().path, "a2.xhtml");
    }

    #[test]
    fn test_nav_property() {
        let item = ManifestItem::new("nav", "nav.xhtml", MediaType::Xhtml)
            .with_property("scripted nav");
        assert!(item.is_nav());
        assert!(!ManifestItem::new("c", "c.xhtml", MediaType::Xhtml).is_nav());
    }

    #[test]
    fn test_nav_flatten_preorder() {
        let root = NavNode::new("Book", "root")
            .with_child(NavNode::new("One", "1").with_child(NavNode::new("One.A", "1a")))
            .with_child(NavNode::new("Two", "2"));

        let labels: Vec<_> = root.flatten().iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["One", "One.A", "Two"]);
        assert_eq!(root.descendant_count(), 3);
    }
}
