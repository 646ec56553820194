//! Thin DOM facade used by the rest of the crate.
//!
//! The actual XML parser (a DOM with child/sibling iteration and attribute
//! lookup) is an external collaborator per the component design; this
//! module wraps `roxmltree` behind a small, crate-local type so the
//! metadata/content walkers never import `roxmltree` directly. Matching
//! matches on the element's *local* name, ignoring namespace prefixes,
//! since SIARD documents declare a default namespace on the root element.

use std::fmt;

use roxmltree::Node;

#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("xml parse error: {0}")]
    Parse(#[from] roxmltree::Error),
}

/// A parsed XML document, borrowing from the source text the caller keeps
/// alive. Callers own the source `String` and parse it into a `Document`
/// with a matching lifetime, the usual `roxmltree` usage pattern.
pub struct Document<'a> {
    inner: roxmltree::Document<'a>,
}

impl<'a> Document<'a> {
    pub fn parse(source: &'a str) -> Result<Self, XmlError> {
        Ok(Document {
            inner: roxmltree::Document::parse(source)?,
        })
    }

    pub fn root_element(&self) -> Element<'_> {
        Element {
            node: self.inner.root_element(),
        }
    }
}

/// A borrowed element node.
#[derive(Clone, Copy)]
pub struct Element<'a> {
    node: Node<'a, 'a>,
}

impl<'a> fmt::Debug for Element<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.local_name())
    }
}

impl<'a> Element<'a> {
    /// The element's tag name, ignoring any namespace prefix.
    pub fn local_name(&self) -> &'a str {
        self.node.tag_name().name()
    }

    /// The value of an attribute, if present and non-empty after trimming.
    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.node.attribute(name)
    }

    /// Direct child elements in document order (text nodes skipped).
    pub fn children(&self) -> impl Iterator<Item = Element<'a>> + 'a {
        self.node
            .children()
            .filter(|n| n.is_element())
            .map(|node| Element { node })
    }

    /// First direct child element with the given local name.
    pub fn child(&self, name: &str) -> Option<Element<'a>> {
        self.children().find(|child| child.local_name() == name)
    }

    /// All direct child elements with the given local name.
    pub fn children_named(&self, name: &str) -> impl Iterator<Item = Element<'a>> + 'a {
        self.children().filter(move |child| child.local_name() == name)
    }

    /// The element's concatenated direct text content, trimmed. Intended
    /// for metadata labels (names, folders, type references) where
    /// pretty-printed surrounding whitespace is not meaningful.
    pub fn text(&self) -> Option<&'a str> {
        let text = self.node.text()?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }

    /// The element's direct text content, untrimmed. Row content values
    /// (`<cN>`, `<aN>`, `<uN>`) may carry meaningful leading/trailing
    /// whitespace (e.g. a padded `CHAR(n)` value) that must survive into
    /// the emitted SQL literal.
    pub fn raw_text(&self) -> Option<&'a str> {
        self.node.text()
    }

    /// The trimmed text of a single named child element, if present.
    pub fn child_text(&self, name: &str) -> Option<&'a str> {
        self.child(name).and_then(|child| child.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_children_and_attributes() {
        let doc = Document::parse(
            r#"<root xmlns="http://example"><a x="1">hi</a><a x="2"/></root>"#,
        )
        .unwrap();
        let root = doc.root_element();
        assert_eq!(root.local_name(), "root");

        let children: Vec<_> = root.children_named("a").collect();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].attribute("x"), Some("1"));
        assert_eq!(children[0].text(), Some("hi"));
        assert_eq!(children[1].text(), None);
    }

    #[test]
    fn child_text_reads_single_named_child() {
        let doc = Document::parse("<root><name>T</name></root>").unwrap();
        assert_eq!(doc.root_element().child_text("name"), Some("T"));
        assert_eq!(doc.root_element().child_text("missing"), None);
    }
}
