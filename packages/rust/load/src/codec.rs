//! Graph serialization: Turtle, N-Triples and JSON-LD.
//!
//! Output order follows [`ModelGraph::triples`], so the same graph always
//! serializes to the same bytes.

use std::fmt::Write as _;

use serde_json::{Map, Value, json};

use curator_shared::graph::{RDF_TYPE, VOCAB_NS};
use curator_shared::{CuratorError, Datatype, Literal, ModelGraph, Result, Term};

const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";

/// Supported graph serialization formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Turtle,
    NTriples,
    JsonLd,
}

impl GraphFormat {
    /// Parse a format tag (`ttl`, `nt`, `jsonld`). The tag is also the file
    /// extension, so any other spelling is `UnsupportedFormat`.
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "ttl" => Ok(Self::Turtle),
            "nt" => Ok(Self::NTriples),
            "jsonld" => Ok(Self::JsonLd),
            _ => Err(CuratorError::unsupported("graph", tag)),
        }
    }

    /// File extension (without the dot).
    pub fn extension(self) -> &'static str {
        match self {
            Self::Turtle => "ttl",
            Self::NTriples => "nt",
            Self::JsonLd => "jsonld",
        }
    }

    pub fn serialize(self, graph: &ModelGraph) -> String {
        match self {
            Self::Turtle => to_turtle(graph),
            Self::NTriples => to_ntriples(graph),
            Self::JsonLd => {
                let mut out = serde_json::to_string_pretty(&to_jsonld(graph)).unwrap_or_default();
                out.push('\n');
                out
            }
        }
    }
}

// ---------------------------------------------------------------------------
// N-Triples
// ---------------------------------------------------------------------------

/// One statement per line.
pub fn to_ntriples(graph: &ModelGraph) -> String {
    let mut out = String::new();
    for triple in graph.triples() {
        let _ = writeln!(
            out,
            "<{}> <{}> {} .",
            triple.subject,
            triple.predicate,
            nt_term(&triple.object)
        );
    }
    out
}

fn nt_term(term: &Term) -> String {
    match term {
        Term::Iri(iri) => format!("<{iri}>"),
        Term::Literal(lit) => nt_literal(lit),
    }
}

fn nt_literal(lit: &Literal) -> String {
    let quoted = format!("\"{}\"", escape_literal(&lit.value));
    match lit.datatype {
        Datatype::String => quoted,
        other => format!("{quoted}^^<{}>", other.xsd_iri()),
    }
}

fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Turtle
// ---------------------------------------------------------------------------

/// Subjects as blocks with `;`/`,` abbreviation and `cv:` / `xsd:` prefixes.
pub fn to_turtle(graph: &ModelGraph) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "@prefix rdf: <{RDF_NS}> .");
    let _ = writeln!(out, "@prefix xsd: <{XSD_NS}> .");
    let _ = writeln!(out, "@prefix cv: <{VOCAB_NS}> .");

    let triples = graph.triples();
    let mut index = 0;
    while index < triples.len() {
        let subject = &triples[index].subject;
        let _ = write!(out, "\n<{subject}>");

        let mut first_predicate = true;
        while index < triples.len() && &triples[index].subject == subject {
            let predicate = &triples[index].predicate;
            let separator = if first_predicate { "\n    " } else { " ;\n    " };
            let _ = write!(out, "{separator}{}", ttl_predicate(predicate));
            first_predicate = false;

            let mut first_object = true;
            while index < triples.len()
                && &triples[index].subject == subject
                && &triples[index].predicate == predicate
            {
                let separator = if first_object { " " } else { ", " };
                let _ = write!(out, "{separator}{}", ttl_term(&triples[index].object));
                first_object = false;
                index += 1;
            }
        }
        out.push_str(" .\n");
    }
    out
}

fn ttl_predicate(predicate: &str) -> String {
    if predicate == RDF_TYPE {
        return "a".to_string();
    }
    compact(predicate)
}

fn ttl_term(term: &Term) -> String {
    match term {
        Term::Iri(iri) => compact(iri),
        Term::Literal(lit) => {
            let quoted = format!("\"{}\"", escape_literal(&lit.value));
            match lit.datatype {
                Datatype::String => quoted,
                other => format!("{quoted}^^{}", compact(&other.xsd_iri())),
            }
        }
    }
}

/// Prefixed name when the local part is a plain name, else `<iri>`.
fn compact(iri: &str) -> String {
    for (prefix, ns) in [("cv", VOCAB_NS), ("xsd", XSD_NS)] {
        if let Some(local) = iri.strip_prefix(ns) {
            if is_plain_local_name(local) {
                return format!("{prefix}:{local}");
            }
        }
    }
    format!("<{iri}>")
}

fn is_plain_local_name(local: &str) -> bool {
    let mut chars = local.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ---------------------------------------------------------------------------
// JSON-LD
// ---------------------------------------------------------------------------

/// Compacted JSON-LD document with an `@vocab` context and a flat `@graph`.
pub fn to_jsonld(graph: &ModelGraph) -> Value {
    let nodes: Vec<Value> = graph
        .entities()
        .map(|entity| {
            let mut node = Map::new();
            node.insert("@id".into(), Value::String(entity.id.clone()));
            node.insert("@type".into(), Value::String(entity.class_name.clone()));
            for (property, values) in &entity.properties {
                let mut rendered: Vec<Value> = values.iter().map(jsonld_term).collect();
                let value = if rendered.len() == 1 {
                    rendered.remove(0)
                } else {
                    Value::Array(rendered)
                };
                node.insert(property.clone(), value);
            }
            Value::Object(node)
        })
        .collect();

    json!({
        "@context": {
            "@vocab": VOCAB_NS,
            "xsd": XSD_NS,
        },
        "@graph": nodes,
    })
}

fn jsonld_term(term: &Term) -> Value {
    match term {
        Term::Iri(iri) => json!({ "@id": iri }),
        Term::Literal(lit) => match lit.datatype {
            Datatype::String => Value::String(lit.value.clone()),
            other => json!({ "@value": lit.value, "@type": other.xsd_iri() }),
        },
    }
}
