//! The unified graph model produced by transformers and consumed by loaders.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CuratorError, Result};

/// `rdf:type`.
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// Namespace for class and property IRIs.
pub const VOCAB_NS: &str = "urn:curator:vocab:";

const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";

// ---------------------------------------------------------------------------
// Terms
// ---------------------------------------------------------------------------

/// Datatype of a literal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Datatype {
    String,
    Integer,
    Boolean,
    Date,
}

impl Datatype {
    /// XML Schema datatype IRI.
    pub fn xsd_iri(self) -> String {
        let local = match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Date => "date",
        };
        format!("{XSD_NS}{local}")
    }
}

/// A typed literal. The lexical form is kept verbatim; validation checks it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Literal {
    pub value: String,
    pub datatype: Datatype,
}

impl Literal {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datatype: Datatype::String,
        }
    }
}

/// Object of a property: another entity or a literal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Term {
    Iri(String),
    Literal(Literal),
}

impl Term {
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Self::Iri(iri) => Some(iri),
            Self::Literal(_) => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Self::Literal(lit) => Some(lit),
            Self::Iri(_) => None,
        }
    }
}

/// Subject–predicate–object statement.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: Term,
}

/// IRI of a class in the vocabulary namespace.
pub fn class_iri(class_name: &str) -> String {
    format!("{VOCAB_NS}{class_name}")
}

/// IRI of a property in the vocabulary namespace.
pub fn property_iri(property: &str) -> String {
    format!("{VOCAB_NS}{property}")
}

/// IRI of an entity: `urn:curator:<pipeline_id>:<class_slug>:<key>`.
pub fn entity_iri(pipeline_id: &str, class_slug: &str, key: &str) -> String {
    format!(
        "urn:curator:{}:{class_slug}:{}",
        encode_segment(pipeline_id),
        encode_segment(key)
    )
}

fn encode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// One typed domain entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub class_name: String,
    pub key: String,
    pub properties: BTreeMap<String, Vec<Term>>,
}

impl Entity {
    pub fn new(id: impl Into<String>, class_name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            class_name: class_name.into(),
            key: key.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Append a value to a property.
    pub fn push(&mut self, property: impl Into<String>, term: Term) {
        self.properties.entry(property.into()).or_default().push(term);
    }

    pub fn values(&self, property: &str) -> &[Term] {
        self.properties.get(property).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First literal value of a property, if any.
    pub fn first_literal(&self, property: &str) -> Option<&str> {
        self.values(property)
            .iter()
            .find_map(Term::as_literal)
            .map(|lit| lit.value.as_str())
    }

    /// Human-readable label: the first of `title`, `name`, `label`, `pref_label`, else the key.
    pub fn label(&self) -> &str {
        ["title", "name", "label", "pref_label"]
            .iter()
            .find_map(|p| self.first_literal(p))
            .unwrap_or(&self.key)
    }
}

// ---------------------------------------------------------------------------
// ModelGraph
// ---------------------------------------------------------------------------

/// A reference whose target is not an entity of the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingReference {
    pub subject: String,
    pub property: String,
    pub object: String,
}

/// Immutable set of entities partitioned into root classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelGraph {
    pipeline_id: String,
    entities: BTreeMap<String, Entity>,
}

impl ModelGraph {
    /// Assemble a graph; two entities with the same IRI are a validation error.
    pub fn new(pipeline_id: impl Into<String>, entities: impl IntoIterator<Item = Entity>) -> Result<Self> {
        let mut by_id = BTreeMap::new();
        for entity in entities {
            if let Some(previous) = by_id.insert(entity.id.clone(), entity) {
                return Err(CuratorError::validation(format!(
                    "duplicate entity {} ({}/{})",
                    previous.id, previous.class_name, previous.key
                )));
            }
        }
        Ok(Self {
            pipeline_id: pipeline_id.into(),
            entities: by_id,
        })
    }

    pub fn pipeline_id(&self) -> &str {
        &self.pipeline_id
    }

    pub fn get(&self, iri: &str) -> Option<&Entity> {
        self.entities.get(iri)
    }

    /// Entities in IRI order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities grouped by root class name.
    pub fn roots(&self) -> BTreeMap<&str, Vec<&Entity>> {
        let mut roots: BTreeMap<&str, Vec<&Entity>> = BTreeMap::new();
        for entity in self.entities.values() {
            roots.entry(entity.class_name.as_str()).or_default().push(entity);
        }
        roots
    }

    /// All statements, grouped by subject: the `rdf:type` triple first, then
    /// properties in name order with values in source order.
    pub fn triples(&self) -> Vec<Triple> {
        let mut triples = Vec::new();
        for entity in self.entities.values() {
            triples.push(Triple {
                subject: entity.id.clone(),
                predicate: RDF_TYPE.to_string(),
                object: Term::Iri(class_iri(&entity.class_name)),
            });
            for (property, values) in &entity.properties {
                let predicate = property_iri(property);
                for value in values {
                    triples.push(Triple {
                        subject: entity.id.clone(),
                        predicate: predicate.clone(),
                        object: value.clone(),
                    });
                }
            }
        }
        triples
    }

    /// References pointing outside the graph.
    pub fn dangling_references(&self) -> Vec<DanglingReference> {
        let mut dangling = Vec::new();
        for entity in self.entities.values() {
            for (property, values) in &entity.properties {
                for iri in values.iter().filter_map(Term::as_iri) {
                    if !self.entities.contains_key(iri) {
                        dangling.push(DanglingReference {
                            subject: entity.id.clone(),
                            property: property.clone(),
                            object: iri.to_string(),
                        });
                    }
                }
            }
        }
        dangling
    }

    /// Drop dangling references, returning the pruned graph and how many were removed.
    pub fn without_dangling(self) -> (Self, usize) {
        let Self {
            pipeline_id,
            mut entities,
        } = self;
        let known: std::collections::BTreeSet<String> = entities.keys().cloned().collect();
        let mut removed = 0;
        for entity in entities.values_mut() {
            for values in entity.properties.values_mut() {
                let before = values.len();
                values.retain(|term| term.as_iri().is_none_or(|iri| known.contains(iri)));
                removed += before - values.len();
            }
            entity.properties.retain(|_, values| !values.is_empty());
        }
        (
            Self {
                pipeline_id,
                entities,
            },
            removed,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn work(key: &str, collection: Option<&str>) -> Entity {
        let mut entity = Entity::new(entity_iri("demo", "work", key), "Work", key);
        entity.push("title", Term::Literal(Literal::string(key.to_uppercase())));
        if let Some(c) = collection {
            entity.push("collection", Term::Iri(entity_iri("demo", "collection", c)));
        }
        entity
    }

    fn collection(key: &str) -> Entity {
        let mut entity = Entity::new(entity_iri("demo", "collection", key), "Collection", key);
        entity.push("title", Term::Literal(Literal::string("Paintings")));
        entity
    }

    #[test]
    fn entity_iri_encodes_segments() {
        assert_eq!(
            entity_iri("my site", "work", "a/b"),
            "urn:curator:my+site:work:a%2Fb"
        );
    }

    #[test]
    fn duplicate_entities_rejected() {
        let err = ModelGraph::new("demo", vec![work("a", None), work("a", None)]).unwrap_err();
        assert!(matches!(err, CuratorError::Validation { .. }));
    }

    #[test]
    fn roots_partition_by_class() {
        let graph = ModelGraph::new(
            "demo",
            vec![work("a", Some("p")), work("b", Some("p")), collection("p")],
        )
        .unwrap();
        let roots = graph.roots();
        assert_eq!(roots["Work"].len(), 2);
        assert_eq!(roots["Collection"].len(), 1);
    }

    #[test]
    fn triples_start_with_type() {
        let graph = ModelGraph::new("demo", vec![collection("p")]).unwrap();
        let triples = graph.triples();
        assert_eq!(triples.len(), 2);
        assert_eq!(triples[0].predicate, RDF_TYPE);
        assert_eq!(triples[0].object, Term::Iri(class_iri("Collection")));
    }

    #[test]
    fn dangling_references_detected_and_pruned() {
        let graph = ModelGraph::new("demo", vec![work("a", Some("missing")), collection("p")]).unwrap();
        let dangling = graph.dangling_references();
        assert_eq!(dangling.len(), 1);
        assert_eq!(dangling[0].property, "collection");

        let (pruned, removed) = graph.without_dangling();
        assert_eq!(removed, 1);
        assert!(pruned.dangling_references().is_empty());
        let a = pruned.get(&entity_iri("demo", "work", "a")).unwrap();
        assert!(a.values("collection").is_empty());
        assert_eq!(a.first_literal("title"), Some("A"));
    }

    #[test]
    fn label_prefers_title_then_key() {
        let entity = Entity::new("urn:x", "Work", "fallback");
        assert_eq!(entity.label(), "fallback");
        assert_eq!(work("a", None).label(), "A");
    }
}
