//! Parsed fiscalization document with namespace-aware tree lookup.
//!
//! All elements of the fiscalization format live in the MEC namespace;
//! lookups match on local name plus namespace URI, anywhere in the tree
//! or along explicit child paths, always in document order.

use crate::error::LibXml2Result;
use crate::libxml2::{LibXml2Wrapper, XmlDocPtr, XmlNodeRef};

/// Namespace of the MEC digital-diploma XSD family.
pub const MEC_NAMESPACE: &str = "http://portal.mec.gov.br/diplomadigital/arquivos-em-xsd";

/// An XML document tree parsed from one input item.
///
/// Built per item and discarded after that item's processing; the
/// underlying tree is read-only.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    doc: XmlDocPtr,
}

impl ParsedDocument {
    /// Parse raw bytes into a document tree.
    pub fn parse(wrapper: &LibXml2Wrapper, data: &[u8]) -> LibXml2Result<Self> {
        let doc = wrapper.parse_document(data)?;
        Ok(Self { doc })
    }

    pub fn doc(&self) -> &XmlDocPtr {
        &self.doc
    }

    /// First MEC element with the given local name, anywhere in the tree.
    pub fn find_descendant(&self, name: &str) -> Option<XmlNodeRef<'_>> {
        let root = self.doc.root()?;
        if is_mec_element(root, name) {
            return Some(root);
        }
        find_descendant_in(root, name)
    }

    /// All MEC elements with the given local name, in document order.
    pub fn find_descendants(&self, name: &str) -> Vec<XmlNodeRef<'_>> {
        let mut out = Vec::new();
        if let Some(root) = self.doc.root() {
            if is_mec_element(root, name) {
                out.push(root);
            }
            collect_descendants(root, name, &mut out);
        }
        out
    }

    /// Trimmed text of the first matching descendant, or the empty
    /// string. Field-level absence is not an error.
    pub fn text_of(&self, name: &str) -> String {
        self.find_descendant(name)
            .map(|n| n.text().trim().to_string())
            .unwrap_or_default()
    }
}

fn is_mec_element(node: XmlNodeRef<'_>, name: &str) -> bool {
    node.is_element() && node.name() == name && node.ns_href() == Some(MEC_NAMESPACE)
}

fn find_descendant_in<'d>(node: XmlNodeRef<'d>, name: &str) -> Option<XmlNodeRef<'d>> {
    for child in node.element_children() {
        if is_mec_element(child, name) {
            return Some(child);
        }
        if let Some(found) = find_descendant_in(child, name) {
            return Some(found);
        }
    }
    None
}

fn collect_descendants<'d>(node: XmlNodeRef<'d>, name: &str, out: &mut Vec<XmlNodeRef<'d>>) {
    for child in node.element_children() {
        if is_mec_element(child, name) {
            out.push(child);
        }
        collect_descendants(child, name, out);
    }
}

/// Direct MEC child of a node by local name.
pub fn mec_child<'d>(node: XmlNodeRef<'d>, name: &str) -> Option<XmlNodeRef<'d>> {
    node.element_children().find(|c| is_mec_element(*c, name))
}

/// Trimmed text at a child path below a node; empty string if any step
/// of the path is missing.
pub fn text_at(node: XmlNodeRef<'_>, path: &[&str]) -> String {
    let mut current = node;
    for step in path {
        match mec_child(current, step) {
            Some(next) => current = next,
            None => return String::new(),
        }
    }
    current.text().trim().to_string()
}

/// First MEC descendant below a node (not the node itself).
pub fn mec_descendant<'d>(node: XmlNodeRef<'d>, name: &str) -> Option<XmlNodeRef<'d>> {
    find_descendant_in(node, name)
}

/// Trimmed text at a path anchored at the first matching descendant,
/// mirroring the `.//Anchor/Step` lookups of the extraction tables.
pub fn text_at_descendant(node: XmlNodeRef<'_>, path: &[&str]) -> String {
    let Some((anchor, rest)) = path.split_first() else {
        return String::new();
    };
    match mec_descendant(node, anchor) {
        Some(found) => text_at(found, rest),
        None => String::new(),
    }
}
