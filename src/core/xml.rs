//! Namespace-agnostic helpers over `roxmltree` nodes.
//!
//! ARXML files come with and without the AUTOSAR default namespace, so every
//! lookup here compares local tag names only.

use regex::Regex;
use roxmltree::Node;
use std::collections::BTreeMap;

pub fn local_name<'a>(node: Node<'a, '_>) -> &'a str {
    node.tag_name().name()
}

pub fn is_element_named(node: Node<'_, '_>, name: &str) -> bool {
    node.is_element() && local_name(node) == name
}

pub fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| is_element_named(*c, name))
}

pub fn children<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children().filter(move |c| is_element_named(*c, name))
}

pub fn element_children<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|c| c.is_element())
}

/// Trimmed text of a node, `None` when empty.
pub fn text_of(node: Node<'_, '_>) -> Option<String> {
    let text: String = node
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn child_text(node: Node<'_, '_>, name: &str) -> Option<String> {
    child(node, name).and_then(text_of)
}

/// Follows a `/`-separated chain of child names, e.g. `"DESC/L-2"`.
pub fn path_text(node: Node<'_, '_>, path: &str) -> Option<String> {
    let mut current = node;
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        current = child(current, segment)?;
    }
    text_of(current)
}

pub fn descendant<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.descendants().skip(1).find(|n| is_element_named(*n, name))
}

pub fn descendant_ending_with<'a, 'input>(
    node: Node<'a, 'input>,
    suffix: &str,
) -> Option<Node<'a, 'input>> {
    node.descendants()
        .skip(1)
        .find(|n| n.is_element() && local_name(*n).ends_with(suffix))
}

/// XPath-like location such as `/AUTOSAR/AR-PACKAGES/AR-PACKAGE[2]/ELEMENTS`.
pub fn element_xpath(node: Node<'_, '_>) -> String {
    let mut segments = Vec::new();
    let mut current = Some(node);

    while let Some(n) = current {
        if !n.is_element() {
            break;
        }
        let name = local_name(n);
        let same_name_before = n
            .prev_siblings()
            .skip(1)
            .filter(|s| is_element_named(*s, name))
            .count();
        let same_name_total = n
            .parent()
            .map(|p| children(p, name).count())
            .unwrap_or(1);

        if same_name_total > 1 {
            segments.push(format!("{}[{}]", name, same_name_before + 1));
        } else {
            segments.push(name.to_string());
        }
        current = n.parent();
    }

    segments.reverse();
    format!("/{}", segments.join("/"))
}

/// 1-based line number of the element's start tag.
pub fn source_line(node: Node<'_, '_>) -> u32 {
    node.document().text_pos_at(node.range().start).row
}

pub fn is_autosar_document(root: Node<'_, '_>) -> bool {
    let name = local_name(root);
    if name == "AUTOSAR" || name == "MSRSW" {
        return true;
    }
    root.tag_name()
        .namespace()
        .map(|ns| ns.to_lowercase().contains("autosar"))
        .unwrap_or(false)
}

/// Version from `xsi:schemaLocation`, e.g. `AUTOSAR_4-3-0.xsd` -> `4.3.0`.
pub fn detect_autosar_version(root: Node<'_, '_>) -> String {
    let schema_location = root
        .attributes()
        .find(|a| a.name() == "schemaLocation")
        .map(|a| a.value().to_string())
        .unwrap_or_default();

    let full = Regex::new(r"AUTOSAR_(\d+)-(\d+)-(\d+)")
        .ok()
        .and_then(|re| {
            re.captures(&schema_location)
                .map(|caps| format!("{}.{}.{}", &caps[1], &caps[2], &caps[3]))
        });
    let release = || {
        Regex::new(r"AUTOSAR_(000\d+)").ok().and_then(|re| {
            re.captures(&schema_location)
                .map(|caps| format!("R-{}", &caps[1]))
        })
    };

    full.or_else(release)
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Namespaces declared on the root. The default namespace is also listed as `ar`.
pub fn collect_namespaces(root: Node<'_, '_>) -> BTreeMap<String, String> {
    let mut namespaces = BTreeMap::new();
    for ns in root.namespaces() {
        match ns.name() {
            Some(prefix) => {
                namespaces.insert(prefix.to_string(), ns.uri().to_string());
            }
            None => {
                namespaces.insert(String::new(), ns.uri().to_string());
                namespaces
                    .entry("ar".to_string())
                    .or_insert_with(|| ns.uri().to_string());
            }
        }
    }
    namespaces
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlInfo {
    pub root_element: String,
    pub namespace: Option<String>,
    pub element_count: usize,
    pub max_depth: usize,
    pub autosar_version: String,
    pub is_autosar: bool,
}

pub fn xml_info(doc: &roxmltree::Document<'_>) -> XmlInfo {
    let root = doc.root_element();
    let mut element_count = 0;
    let mut max_depth = 0;

    for node in root.descendants().filter(|n| n.is_element()) {
        element_count += 1;
        let depth = node.ancestors().filter(|a| a.is_element()).count();
        max_depth = max_depth.max(depth);
    }

    XmlInfo {
        root_element: local_name(root).to_string(),
        namespace: root.tag_name().namespace().map(str::to_string),
        element_count,
        max_depth,
        autosar_version: detect_autosar_version(root),
        is_autosar: is_autosar_document(root),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<AUTOSAR xmlns="http://autosar.org/schema/r4.0" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://autosar.org/schema/r4.0 AUTOSAR_4-3-0.xsd">
  <AR-PACKAGES>
    <AR-PACKAGE>
      <SHORT-NAME>First</SHORT-NAME>
      <DESC><L-2 L="EN">  First package  </L-2></DESC>
    </AR-PACKAGE>
    <AR-PACKAGE>
      <SHORT-NAME>Second</SHORT-NAME>
      <ELEMENTS>
        <P-PORT-PROTOTYPE>
          <PROVIDED-INTERFACE-TREF DEST="SENDER-RECEIVER-INTERFACE">/If/Speed</PROVIDED-INTERFACE-TREF>
        </P-PORT-PROTOTYPE>
      </ELEMENTS>
    </AR-PACKAGE>
  </AR-PACKAGES>
</AUTOSAR>"#;

    #[test]
    fn test_namespace_agnostic_lookup() {
        let doc = roxmltree::Document::parse(SAMPLE).unwrap();
        let root = doc.root_element();
        assert!(is_autosar_document(root));

        let packages = child(root, "AR-PACKAGES").unwrap();
        let names: Vec<String> = children(packages, "AR-PACKAGE")
            .filter_map(|p| child_text(p, "SHORT-NAME"))
            .collect();
        assert_eq!(names, vec!["First", "Second"]);

        let first = children(packages, "AR-PACKAGE").next().unwrap();
        assert_eq!(path_text(first, "DESC/L-2").as_deref(), Some("First package"));
    }

    #[test]
    fn test_descendant_and_xpath() {
        let doc = roxmltree::Document::parse(SAMPLE).unwrap();
        let port = doc
            .descendants()
            .find(|n| is_element_named(*n, "P-PORT-PROTOTYPE"))
            .unwrap();
        let tref = descendant_ending_with(port, "INTERFACE-TREF").unwrap();
        assert_eq!(text_of(tref).as_deref(), Some("/If/Speed"));
        assert_eq!(
            element_xpath(port),
            "/AUTOSAR/AR-PACKAGES/AR-PACKAGE[2]/ELEMENTS/P-PORT-PROTOTYPE"
        );
        assert!(source_line(port) > 1);
    }

    #[test]
    fn test_version_and_namespaces() {
        let doc = roxmltree::Document::parse(SAMPLE).unwrap();
        let root = doc.root_element();
        assert_eq!(detect_autosar_version(root), "4.3.0");

        let namespaces = collect_namespaces(root);
        assert_eq!(namespaces.get("ar").map(String::as_str), Some("http://autosar.org/schema/r4.0"));
        assert!(namespaces.contains_key("xsi"));

        let release = roxmltree::Document::parse(
            r#"<AUTOSAR xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://autosar.org/schema/r4.0 AUTOSAR_00048.xsd"/>"#,
        )
        .unwrap();
        assert_eq!(detect_autosar_version(release.root_element()), "R-00048");

        let plain = roxmltree::Document::parse("<AUTOSAR/>").unwrap();
        assert_eq!(detect_autosar_version(plain.root_element()), "Unknown");
    }

    #[test]
    fn test_xml_info() {
        let doc = roxmltree::Document::parse("<root><a><b/></a><c/></root>").unwrap();
        let info = xml_info(&doc);
        assert_eq!(info.root_element, "root");
        assert_eq!(info.element_count, 4);
        assert_eq!(info.max_depth, 3);
        assert!(!info.is_autosar);
    }
}
