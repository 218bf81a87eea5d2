//! Registry-driven entity construction shared by every transformer.

use curator_shared::{
    ClassRegistry, ClassSpec, CuratorError, Datatype, Entity, Literal, ModelGraph, PropertyKind,
    Result, Term, entity_iri,
};

use crate::validate;

/// Builds entities for one pipeline from property name/value lists.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    pipeline_id: String,
    registry: ClassRegistry,
}

impl GraphBuilder {
    pub fn new(pipeline_id: impl Into<String>, registry: ClassRegistry) -> Self {
        Self {
            pipeline_id: pipeline_id.into(),
            registry,
        }
    }

    pub fn pipeline_id(&self) -> &str {
        &self.pipeline_id
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    /// Look up a class by its source spelling.
    pub fn class(&self, name: &str, record_id: &str) -> Result<&ClassSpec> {
        self.registry.resolve(name).ok_or_else(|| {
            CuratorError::validation(format!("{record_id}: unknown class {name:?}"))
        })
    }

    /// Build one entity. Values are typed by the class schema; undeclared
    /// properties become text, references become entity IRIs.
    pub fn entity<I>(&self, class: &ClassSpec, key: &str, properties: I) -> Entity
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        let mut entity = Entity::new(
            entity_iri(&self.pipeline_id, &class.slug(), key),
            class.name.clone(),
            key,
        );

        for (name, values) in properties {
            let name = property_key(&name);
            if name.is_empty() {
                continue;
            }
            let spec = class.property(&name);
            for value in values {
                let value = value.trim();
                if value.is_empty() {
                    continue;
                }
                let term = match spec {
                    Some(spec) if spec.kind == PropertyKind::Reference => {
                        let target = spec
                            .target
                            .as_deref()
                            .and_then(|t| self.registry.resolve(t))
                            .map(ClassSpec::slug)
                            .unwrap_or_else(|| class.slug());
                        Term::Iri(entity_iri(&self.pipeline_id, &target, value))
                    }
                    Some(spec) => Term::Literal(typed_literal(spec.kind, value)),
                    None => Term::Literal(Literal::string(value)),
                };
                entity.push(name.clone(), term);
            }
        }
        entity
    }

    /// Assemble the graph; duplicate entity IRIs are a `Validation` error.
    pub fn graph(&self, entities: Vec<Entity>) -> Result<ModelGraph> {
        ModelGraph::new(self.pipeline_id.clone(), entities)
    }

    /// Check a graph against this builder's registry.
    pub fn validate(&self, graph: &ModelGraph) -> Result<()> {
        let violations = validate::check_graph(&self.registry, graph);
        if violations.is_empty() {
            return Ok(());
        }
        let shown: Vec<String> = violations.iter().take(MAX_REPORTED).map(ToString::to_string).collect();
        let more = violations.len().saturating_sub(MAX_REPORTED);
        let mut message = format!("{} problem(s): {}", violations.len(), shown.join("; "));
        if more > 0 {
            message.push_str(&format!("; and {more} more"));
        }
        Err(CuratorError::validation(message))
    }
}

/// Violations listed in a validation error message.
const MAX_REPORTED: usize = 10;

fn typed_literal(kind: PropertyKind, value: &str) -> Literal {
    let (datatype, value) = match kind {
        PropertyKind::Integer => (Datatype::Integer, value.to_string()),
        PropertyKind::Boolean => (Datatype::Boolean, value.to_lowercase()),
        PropertyKind::Date => (Datatype::Date, value.to_string()),
        PropertyKind::Text | PropertyKind::Reference => (Datatype::String, value.to_string()),
    };
    Literal { value, datatype }
}

/// Normalize a source property name: trimmed, lowercase, `-` and spaces as `_`.
pub fn property_key(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if c == '-' || c.is_whitespace() { '_' } else { c })
        .flat_map(char::to_lowercase)
        .collect()
}
