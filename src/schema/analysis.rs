//! Per-element-name profiles gathered from the source document

use super::infer::{infer_type, ScalarType};
use crate::dom::{direct_text, DocumentAccess, NodeId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeProfile {
    pub name: String,
    pub types: BTreeSet<ScalarType>,
    /// Present on every instance of the element
    pub required: bool,
    pub default_value: Option<String>,
    /// Instances carrying the attribute
    pub occurrences: usize,
}

/// Fewest and most occurrences of a child within one parent instance,
/// over the instances that contain it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChildOccurs {
    pub min: usize,
    pub max: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementProfile {
    pub name: String,
    /// In first-seen order
    pub attributes: Vec<AttributeProfile>,
    /// Distinct child tag names, first-seen order
    pub children: Vec<String>,
    /// Distinct parent tag names, first-seen order
    pub parents: Vec<String>,
    /// Types of non-empty direct text
    pub content_types: BTreeSet<ScalarType>,
    pub occurrences: BTreeMap<String, ChildOccurs>,
    pub instances: usize,
    pub namespace_uri: Option<String>,
    pub prefix: Option<String>,
}

impl ElementProfile {
    fn new(name: &str, namespace_uri: Option<&str>, prefix: Option<&str>) -> Self {
        ElementProfile {
            name: name.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
            parents: Vec::new(),
            content_types: BTreeSet::new(),
            occurrences: BTreeMap::new(),
            instances: 0,
            namespace_uri: namespace_uri.map(str::to_string),
            prefix: prefix.map(str::to_string),
        }
    }

    /// Whether the element is described by its own complex type
    #[inline]
    pub fn needs_complex_type(&self) -> bool {
        !self.children.is_empty() || !self.attributes.is_empty()
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeProfile> {
        self.attributes.iter().find(|a| a.name == name)
    }

    fn attribute_mut(&mut self, name: &str) -> &mut AttributeProfile {
        let index = match self.attributes.iter().position(|a| a.name == name) {
            Some(index) => index,
            None => {
                self.attributes.push(AttributeProfile {
                    name: name.to_string(),
                    types: BTreeSet::new(),
                    required: false,
                    default_value: None,
                    occurrences: 0,
                });
                self.attributes.len() - 1
            }
        };
        &mut self.attributes[index]
    }
}

/// Everything schema generation needs about a document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaAnalysis {
    /// One profile per distinct tag name, in pre-order of first sight
    pub profiles: Vec<ElementProfile>,
    pub namespaces: BTreeSet<String>,
    pub root_element: String,
    #[serde(skip)]
    by_name: HashMap<String, usize>,
}

impl SchemaAnalysis {
    pub fn profile(&self, name: &str) -> Option<&ElementProfile> {
        self.by_name.get(name).map(|&i| &self.profiles[i])
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    fn ensure(&mut self, name: &str, namespace_uri: Option<&str>, prefix: Option<&str>) -> usize {
        if let Some(&index) = self.by_name.get(name) {
            return index;
        }
        let index = self.profiles.len();
        self.profiles.push(ElementProfile::new(name, namespace_uri, prefix));
        self.by_name.insert(name.to_string(), index);
        index
    }
}

fn push_unique(set: &mut Vec<String>, value: &str) {
    if !set.iter().any(|v| v == value) {
        set.push(value.to_string());
    }
}

/// Profile every element under `root` in one pre-order pass.
///
/// Namespace declarations are not treated as attributes.
pub fn analyze<D: DocumentAccess>(doc: &D, root: NodeId) -> SchemaAnalysis {
    let mut analysis = SchemaAnalysis {
        root_element: doc.node_name(root).unwrap_or_default().to_string(),
        ..Default::default()
    };
    let mut stack = vec![root];
    let mut parent_links: Vec<(&str, &str)> = Vec::new();

    while let Some(id) = stack.pop() {
        let name = doc.node_name(id).unwrap_or_default();
        let index = analysis.ensure(name, doc.node_namespace_uri(id), doc.node_prefix(id));
        if let Some(uri) = doc.node_namespace_uri(id) {
            analysis.namespaces.insert(uri.to_string());
        }

        let profile = &mut analysis.profiles[index];
        profile.instances += 1;

        let strings = doc.strings();
        for attr in doc.attributes(id).iter().filter(|a| !a.is_namespace_decl) {
            let attr_name = strings.get_str(attr.name_id).unwrap_or_default();
            let value = strings.get_str(attr.value_id).unwrap_or_default();
            let entry = profile.attribute_mut(attr_name);
            entry.types.insert(infer_type(value));
            entry.occurrences += 1;
        }

        let text = direct_text(doc, id);
        if !text.is_empty() {
            profile.content_types.insert(infer_type(&text));
        }

        let children: Vec<NodeId> = doc
            .children_vec(id)
            .into_iter()
            .filter(|&c| doc.get_node(c).is_some_and(|n| n.is_element()))
            .collect();

        let mut counts: Vec<(&str, usize)> = Vec::new();
        for &child in &children {
            let child_name = doc.node_name(child).unwrap_or_default();
            match counts.iter_mut().find(|(n, _)| *n == child_name) {
                Some((_, count)) => *count += 1,
                None => counts.push((child_name, 1)),
            }
        }

        for &(child_name, count) in &counts {
            let profile = &mut analysis.profiles[index];
            push_unique(&mut profile.children, child_name);
            profile
                .occurrences
                .entry(child_name.to_string())
                .and_modify(|o| {
                    o.min = o.min.min(count);
                    o.max = o.max.max(count);
                })
                .or_insert(ChildOccurs { min: count, max: count });
        }

        for &(child_name, _) in &counts {
            parent_links.push((child_name, name));
        }
        for &child in children.iter().rev() {
            stack.push(child);
        }
    }

    // Linked after the walk so that profiles are only created by their own visit
    for (child_name, parent_name) in parent_links {
        if let Some(&child_index) = analysis.by_name.get(child_name) {
            push_unique(&mut analysis.profiles[child_index].parents, parent_name);
        }
    }

    for profile in &mut analysis.profiles {
        let instances = profile.instances;
        for attr in &mut profile.attributes {
            attr.required = attr.occurrences == instances;
        }
    }

    analysis
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::XmlDocument;

    fn run(xml: &str) -> SchemaAnalysis {
        let doc = XmlDocument::parse(xml).unwrap();
        let root = doc.root_element_id().unwrap();
        analyze(&doc, root)
    }

    #[test]
    fn test_profiles_in_pre_order() {
        let analysis = run("<r><a><c/></a><b/><a/></r>");
        let names: Vec<_> = analysis.profiles.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["r", "a", "c", "b"]);
        assert_eq!(analysis.root_element, "r");
        assert_eq!(analysis.profile("a").unwrap().instances, 2);
        assert_eq!(analysis.profile("r").unwrap().children, vec!["a", "b"]);
        assert_eq!(analysis.profile("c").unwrap().parents, vec!["a"]);
    }

    #[test]
    fn test_child_occurrence_bounds() {
        let analysis = run("<r><g><i>1</i><i>2</i><i>3</i></g><g><i>4</i></g><g><x/></g></r>");
        let g = analysis.profile("g").unwrap();
        assert_eq!(g.occurrences["i"], ChildOccurs { min: 1, max: 3 });
        assert_eq!(g.occurrences["x"], ChildOccurs { min: 1, max: 1 });
        let i = analysis.profile("i").unwrap();
        assert_eq!(i.content_types.iter().copied().collect::<Vec<_>>(), vec![ScalarType::Integer]);
    }

    #[test]
    fn test_attribute_profiles() {
        let analysis = run(r#"<r xmlns:n="urn:n"><e k="1" on="true"/><e k="x"/></r>"#);
        let r = analysis.profile("r").unwrap();
        assert!(r.attributes.is_empty());
        let e = analysis.profile("e").unwrap();
        let k = e.attribute("k").unwrap();
        assert!(k.required);
        assert_eq!(k.occurrences, 2);
        assert_eq!(k.types.len(), 2);
        let on = e.attribute("on").unwrap();
        assert!(!on.required);
        assert_eq!(on.types.iter().next(), Some(&ScalarType::Boolean));
    }

    #[test]
    fn test_namespaces_recorded() {
        let analysis = run(r#"<r xmlns="urn:d"><p:a xmlns:p="urn:p"/></r>"#);
        assert_eq!(analysis.namespaces.iter().collect::<Vec<_>>(), vec!["urn:d", "urn:p"]);
        let a = analysis.profile("p:a").unwrap();
        assert_eq!(a.prefix.as_deref(), Some("p"));
        assert_eq!(a.namespace_uri.as_deref(), Some("urn:p"));
    }
}
