//! XSD text generation from a [`SchemaAnalysis`]

use super::analysis::{ElementProfile, SchemaAnalysis};
use super::infer::ScalarType;
use crate::core::entities::encode_text;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// Schema generation options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XsdOptions {
    /// Emit minOccurs/maxOccurs on sequence children
    pub include_occurrence: bool,
    /// Use inferred types where a single one was seen, `string` otherwise
    pub infer_data_types: bool,
    pub include_annotations: bool,
    pub target_namespace: Option<String>,
    pub schema_prefix: String,
    /// Shown in the header annotation
    pub source_name: Option<String>,
    /// Write any `maxOccurs` above 1 as `unbounded`
    pub unbounded_repeats: bool,
    /// `use="required"` for attributes present on every instance
    pub mark_required_attributes: bool,
}

impl Default for XsdOptions {
    fn default() -> Self {
        XsdOptions {
            include_occurrence: true,
            infer_data_types: true,
            include_annotations: true,
            target_namespace: None,
            schema_prefix: "xs".to_string(),
            source_name: None,
            unbounded_repeats: false,
            mark_required_attributes: false,
        }
    }
}

/// Declared name for a qualified element or attribute name
fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

/// Complex type name for an element; the prefix stays in the name so that
/// `p:a` and `q:a` get distinct types
fn type_name(element: &str) -> String {
    format!("{}Type", element.replace(':', "_"))
}

/// Generate XSD text, stamped with the current time
pub fn generate_xsd(analysis: &SchemaAnalysis, options: &XsdOptions) -> String {
    generate_xsd_at(analysis, options, Utc::now())
}

/// Generate XSD text with an explicit generation time
pub fn generate_xsd_at(analysis: &SchemaAnalysis, options: &XsdOptions, generated_at: DateTime<Utc>) -> String {
    let mut w = XsdWriter::new(analysis, options);
    w.document(generated_at);
    w.out
}

struct XsdWriter<'a> {
    analysis: &'a SchemaAnalysis,
    options: &'a XsdOptions,
    prefix: &'a str,
    out: String,
}

impl<'a> XsdWriter<'a> {
    fn new(analysis: &'a SchemaAnalysis, options: &'a XsdOptions) -> Self {
        let prefix = match options.schema_prefix.trim() {
            "" => "xs",
            p => p,
        };
        XsdWriter {
            analysis,
            options,
            prefix,
            out: String::new(),
        }
    }

    fn line(&mut self, indent: usize, text: &str) {
        for _ in 0..indent {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    /// `xs:name` for a built-in type
    fn builtin(&self, ty: ScalarType) -> String {
        format!("{}:{}", self.prefix, ty.xsd_name())
    }

    fn simple_type(&self, types: &BTreeSet<ScalarType>) -> ScalarType {
        match types.iter().next() {
            Some(&ty) if self.options.infer_data_types && types.len() == 1 => ty,
            _ => ScalarType::String,
        }
    }

    fn document(&mut self, generated_at: DateTime<Utc>) {
        let p = self.prefix;
        self.line(0, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        self.line(0, &format!(r#"<{p}:schema xmlns:{p}="{XSD_NAMESPACE}""#));
        if let Some(ns) = self.options.target_namespace.as_deref().map(str::trim).filter(|ns| !ns.is_empty()) {
            let ns = encode_text(ns);
            self.line(2, &format!(r#"targetNamespace="{ns}""#));
            self.line(2, &format!(r#"xmlns="{ns}""#));
        }
        self.line(2, r#"elementFormDefault="qualified">"#);
        self.blank();

        if self.options.include_annotations {
            let source = self.options.source_name.as_deref().unwrap_or("uploaded file");
            let stamp = generated_at.to_rfc3339_opts(SecondsFormat::Millis, true);
            self.line(1, &format!("<{p}:annotation>"));
            self.line(2, &format!("<{p}:documentation>"));
            self.line(3, &format!("Generated XSD schema from XML file: {}", encode_text(source)));
            self.line(3, &format!("Generated on: {stamp}"));
            self.line(3, &format!("Total elements analyzed: {}", self.analysis.len()));
            self.line(2, &format!("</{p}:documentation>"));
            self.line(1, &format!("</{p}:annotation>"));
            self.blank();
        }

        self.root_element();
        self.blank();

        let analysis = self.analysis;
        for profile in analysis.profiles.iter().filter(|p| p.needs_complex_type()) {
            self.complex_type(profile);
            self.blank();
        }

        self.out.push_str(&format!("</{p}:schema>"));
    }

    fn root_element(&mut self) {
        let root = &self.analysis.root_element;
        let ty = match self.analysis.profile(root) {
            Some(profile) if !profile.needs_complex_type() => {
                self.builtin(self.simple_type(&profile.content_types))
            }
            _ => type_name(root),
        };
        let text = format!(
            r#"<{}:element name="{}" type="{}"/>"#,
            self.prefix,
            encode_text(local_part(root)),
            encode_text(&ty)
        );
        self.line(1, &text);
    }

    fn complex_type(&mut self, profile: &ElementProfile) {
        let p = self.prefix;
        self.line(1, &format!(r#"<{p}:complexType name="{}">"#, encode_text(&type_name(&profile.name))));

        if self.options.include_annotations {
            self.line(2, &format!("<{p}:annotation>"));
            self.line(3, &format!("<{p}:documentation>"));
            self.line(4, &format!("Element: {}", encode_text(&profile.name)));
            if !profile.children.is_empty() {
                self.line(4, &format!("Child elements: {}", encode_text(&profile.children.join(", "))));
            }
            if !profile.attributes.is_empty() {
                let names: Vec<&str> = profile.attributes.iter().map(|a| a.name.as_str()).collect();
                self.line(4, &format!("Attributes: {}", encode_text(&names.join(", "))));
            }
            self.line(3, &format!("</{p}:documentation>"));
            self.line(2, &format!("</{p}:annotation>"));
        }

        let has_text = !profile.content_types.is_empty();
        let has_children = !profile.children.is_empty();

        if has_text && has_children {
            self.line(2, &format!("<{p}:complexContent>"));
            self.line(3, &format!(r#"<{p}:extension base="{p}:string">"#));
            self.sequence(profile, 4);
            self.attributes(profile, 4);
            self.line(3, &format!("</{p}:extension>"));
            self.line(2, &format!("</{p}:complexContent>"));
        } else if has_children {
            self.sequence(profile, 2);
            self.attributes(profile, 2);
        } else if has_text {
            let base = self.builtin(self.simple_type(&profile.content_types));
            self.line(2, &format!("<{p}:simpleContent>"));
            self.line(3, &format!(r#"<{p}:extension base="{base}">"#));
            self.attributes(profile, 4);
            self.line(3, &format!("</{p}:extension>"));
            self.line(2, &format!("</{p}:simpleContent>"));
        } else {
            self.attributes(profile, 2);
        }

        self.line(1, &format!("</{p}:complexType>"));
    }

    fn sequence(&mut self, profile: &ElementProfile, indent: usize) {
        let p = self.prefix;
        self.line(indent, &format!("<{p}:sequence>"));
        let mut declared = BTreeSet::new();
        for child in &profile.children {
            // One declaration per local name within a content model
            if !declared.insert(local_part(child)) {
                continue;
            }
            let ty = match self.analysis.profile(child) {
                Some(c) if c.needs_complex_type() => type_name(child),
                Some(c) => self.builtin(self.simple_type(&c.content_types)),
                None => self.builtin(ScalarType::String),
            };
            let mut text = format!(
                r#"<{p}:element name="{}" type="{}""#,
                encode_text(local_part(child)),
                encode_text(&ty)
            );

            if self.options.include_occurrence {
                if let Some(occurs) = profile.occurrences.get(child) {
                    if occurs.min != 1 {
                        text.push_str(&format!(r#" minOccurs="{}""#, occurs.min));
                    }
                    if occurs.max != 1 {
                        if self.options.unbounded_repeats && occurs.max > 1 {
                            text.push_str(r#" maxOccurs="unbounded""#);
                        } else {
                            text.push_str(&format!(r#" maxOccurs="{}""#, occurs.max));
                        }
                    }
                }
            }

            text.push_str("/>");
            self.line(indent + 1, &text);
        }
        self.line(indent, &format!("</{p}:sequence>"));
    }

    fn attributes(&mut self, profile: &ElementProfile, indent: usize) {
        let p = self.prefix;
        let mut declared = BTreeSet::new();
        for attr in &profile.attributes {
            if !declared.insert(local_part(&attr.name)) {
                continue;
            }
            let ty = self.builtin(self.simple_type(&attr.types));
            let usage = if self.options.mark_required_attributes && attr.required {
                "required"
            } else {
                "optional"
            };
            let text = format!(
                r#"<{p}:attribute name="{}" type="{ty}" use="{usage}"/>"#,
                encode_text(local_part(&attr.name))
            );
            self.line(indent, &text);
        }
    }
}
