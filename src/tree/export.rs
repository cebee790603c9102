//! JSON record format for the normalized tree
//!
//! Writing walks the tree with an explicit stack and lays out the record
//! fields by hand; `serde_json` only encodes the scalar values. Output
//! matches what `serde_json` would produce for the same records, compact or
//! two-space indented. Reading goes through serde and stops with an error at
//! `serde_json`'s recursion limit.

use super::TreeNode;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Serialize;
use std::fmt;

/// Compact JSON for a tree
pub fn to_json(root: &TreeNode) -> Result<String, serde_json::Error> {
    RecordWriter::new(None).write(root)
}

/// Indented JSON for a tree
pub fn to_json_pretty(root: &TreeNode) -> Result<String, serde_json::Error> {
    RecordWriter::new(Some("  ")).write(root)
}

/// Read a tree back from its JSON record format.
///
/// `source` is not part of the format and comes back as 0.
pub fn from_json(json: &str) -> Result<TreeNode, serde_json::Error> {
    serde_json::from_str(json)
}

enum Step<'a> {
    /// Record head up to and including the opening of `children`
    Open { node: &'a TreeNode, level: usize, first: bool },
    /// Closing of `children` and the record tail
    Close { node: &'a TreeNode, level: usize },
}

struct RecordWriter {
    out: String,
    indent: Option<&'static str>,
}

impl RecordWriter {
    fn new(indent: Option<&'static str>) -> Self {
        RecordWriter {
            out: String::new(),
            indent,
        }
    }

    fn write(mut self, root: &TreeNode) -> Result<String, serde_json::Error> {
        let mut stack = vec![Step::Open {
            node: root,
            level: 0,
            first: true,
        }];

        while let Some(step) = stack.pop() {
            match step {
                Step::Open { node, level, first } => {
                    if !first {
                        self.out.push(',');
                    }
                    if level > 0 {
                        self.newline(level);
                    }
                    self.head(node, level)?;
                    if node.children.is_empty() {
                        self.out.push_str("[]");
                        self.tail(node, level)?;
                    } else {
                        self.out.push('[');
                        stack.push(Step::Close { node, level });
                        for (i, child) in node.children.iter().enumerate().rev() {
                            stack.push(Step::Open {
                                node: child,
                                level: level + 2,
                                first: i == 0,
                            });
                        }
                    }
                }
                Step::Close { node, level } => {
                    self.newline(level + 1);
                    self.out.push(']');
                    self.tail(node, level)?;
                }
            }
        }

        Ok(self.out)
    }

    fn head(&mut self, node: &TreeNode, level: usize) -> Result<(), serde_json::Error> {
        let fields = level + 1;
        self.out.push('{');
        self.entry(fields, true, "tagName", &node.tag_name)?;
        self.entry(fields, false, "localName", &node.local_name)?;
        self.entry(fields, false, "prefix", &node.prefix)?;
        self.entry(fields, false, "namespaceURI", &node.namespace_uri)?;

        self.key(fields, false, "attributes")?;
        if node.attributes.is_empty() {
            self.out.push_str("{}");
        } else {
            self.out.push('{');
            for (i, (name, value)) in node.attributes.iter().enumerate() {
                self.entry(fields + 1, i == 0, name, value)?;
            }
            self.newline(fields);
            self.out.push('}');
        }

        self.entry(fields, false, "textContent", &node.text_content)?;
        self.key(fields, false, "children")
    }

    fn tail(&mut self, node: &TreeNode, level: usize) -> Result<(), serde_json::Error> {
        let fields = level + 1;
        self.entry(fields, false, "depth", &node.depth)?;
        self.entry(fields, false, "hasChildren", &node.has_children)?;
        self.entry(fields, false, "isEmpty", &node.is_empty)?;
        self.entry(fields, false, "nodeIndex", &node.node_index)?;
        self.newline(level);
        self.out.push('}');
        Ok(())
    }

    fn entry<T: Serialize + ?Sized>(
        &mut self,
        level: usize,
        first: bool,
        name: &str,
        value: &T,
    ) -> Result<(), serde_json::Error> {
        self.key(level, first, name)?;
        self.out.push_str(&serde_json::to_string(value)?);
        Ok(())
    }

    fn key(&mut self, level: usize, first: bool, name: &str) -> Result<(), serde_json::Error> {
        if !first {
            self.out.push(',');
        }
        self.newline(level);
        self.out.push_str(&serde_json::to_string(name)?);
        self.out.push(':');
        if self.indent.is_some() {
            self.out.push(' ');
        }
        Ok(())
    }

    fn newline(&mut self, level: usize) {
        if let Some(unit) = self.indent {
            self.out.push('\n');
            for _ in 0..level {
                self.out.push_str(unit);
            }
        }
    }
}

/// Attribute object to pairs, keeping stored order
pub(super) fn ordered_attributes<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_map(PairsVisitor)
}

struct PairsVisitor;

impl<'de> Visitor<'de> for PairsVisitor {
    type Value = Vec<(String, String)>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of attribute names to values")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut pairs = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((name, value)) = access.next_entry::<String, String>()? {
            pairs.push((name, value));
        }
        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::XmlDocument;
    use crate::tree::{build_tree, NamespaceRegistry, ParseStatistics};

    const XML: &str = r#"<lib xmlns:b="urn:b" z="1" a="2"><b:book id="x">Dune</b:book><shelf/></lib>"#;

    fn built() -> crate::tree::BuiltTree {
        let doc = XmlDocument::parse(XML).unwrap();
        build_tree(&doc, &mut NamespaceRegistry::new()).unwrap()
    }

    #[test]
    fn test_field_names_and_attribute_order() {
        let json = to_json(&built().root).unwrap();
        assert!(json.starts_with(r#"{"tagName":"lib","localName":"lib","prefix":null,"namespaceURI":null,"attributes":{"xmlns:b":"urn:b","z":"1","a":"2"}"#));
        assert!(json.contains(r#""namespaceURI":"urn:b""#));
        assert!(json.contains(r#""textContent":"Dune""#));
        assert!(json.contains(r#""hasChildren":false,"isEmpty":true,"nodeIndex":2"#));
        assert!(!json.contains("source"));
    }

    #[test]
    fn test_statistics_survive_json() {
        let built = built();
        let back = from_json(&to_json_pretty(&built.root).unwrap()).unwrap();
        assert_eq!(back.attributes, built.root.attributes);
        assert_eq!(ParseStatistics::from_tree(&back, built.stats.source_bytes), built.stats);
    }

    #[test]
    fn test_pretty_layout() {
        let doc = XmlDocument::parse(r#"<a k="v"><b/></a>"#).unwrap();
        let built = build_tree(&doc, &mut NamespaceRegistry::new()).unwrap();
        let expected = r#"{
  "tagName": "a",
  "localName": "a",
  "prefix": null,
  "namespaceURI": null,
  "attributes": {
    "k": "v"
  },
  "textContent": "",
  "children": [
    {
      "tagName": "b",
      "localName": "b",
      "prefix": null,
      "namespaceURI": null,
      "attributes": {},
      "textContent": "",
      "children": [],
      "depth": 1,
      "hasChildren": false,
      "isEmpty": true,
      "nodeIndex": 1
    }
  ],
  "depth": 0,
  "hasChildren": true,
  "isEmpty": false,
  "nodeIndex": 0
}"#;
        assert_eq!(to_json_pretty(&built.root).unwrap(), expected);
    }

    #[test]
    fn test_escapes_names_and_values() {
        let doc = XmlDocument::parse(r#"<a q="say &quot;hi&quot;">x</a>"#).unwrap();
        let built = build_tree(&doc, &mut NamespaceRegistry::new()).unwrap();
        let json = to_json(&built.root).unwrap();
        assert!(json.contains(r#""attributes":{"q":"say \"hi\""}"#));
        let back = from_json(&json).unwrap();
        assert_eq!(back.attribute("q"), Some(r#"say "hi""#));
    }

    #[test]
    fn test_deep_export_reads_back_as_error() {
        let depth = 5_000;
        let xml = format!("{}{}", "<d>".repeat(depth), "</d>".repeat(depth));
        let doc = XmlDocument::parse(&xml).unwrap();
        let built = build_tree(&doc, &mut NamespaceRegistry::new()).unwrap();
        let json = to_json(&built.root).unwrap();
        assert_eq!(json.matches(r#""tagName":"d""#).count(), depth);
        assert!(from_json(&json).is_err());
    }

    #[test]
    fn test_rejects_non_map_attributes() {
        let bad = r#"{"tagName":"a","localName":"a","prefix":null,"namespaceURI":null,"attributes":[],"textContent":"","children":[],"depth":0,"hasChildren":false,"isEmpty":true,"nodeIndex":0}"#;
        assert!(from_json(bad).is_err());
    }
}
