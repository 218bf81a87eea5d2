//! Document-set transformer: markdown documents with front matter.

use serde_json::Value;
use tracing::{debug, info, instrument};

use curator_shared::{
    ClassRegistry, CuratorError, ModelGraph, RawDataset, RawPayload, Result,
};

use crate::{GraphBuilder, Transformer};

/// Property receiving a document's body.
const BODY_PROPERTY: &str = "description";

/// Maps front matter scalars and lists to property values, and the body to `description`.
#[derive(Debug, Clone)]
pub struct DocumentSetTransformer {
    builder: GraphBuilder,
}

impl DocumentSetTransformer {
    pub fn new(pipeline_id: impl Into<String>, registry: ClassRegistry) -> Self {
        Self {
            builder: GraphBuilder::new(pipeline_id, registry),
        }
    }
}

impl Transformer for DocumentSetTransformer {
    #[instrument(skip_all, fields(pipeline_id = %self.builder.pipeline_id(), records = dataset.len()))]
    fn transform(&self, dataset: RawDataset) -> Result<ModelGraph> {
        let mut entities = Vec::with_capacity(dataset.len());
        for record in dataset.into_records() {
            let record_id = record.record_id();
            let class = self.builder.class(&record.class_name, &record_id)?;

            let RawPayload::Document { front_matter, body } = record.payload else {
                return Err(CuratorError::validation(format!(
                    "{record_id}: expected a document, found a spreadsheet row"
                )));
            };

            let mut properties = Vec::with_capacity(front_matter.len() + 1);
            for (name, value) in front_matter {
                if name.starts_with('@') {
                    continue;
                }
                let values = scalar_values(&value).ok_or_else(|| {
                    CuratorError::validation(format!(
                        "{record_id}: property {name:?} must be a scalar or a list of scalars"
                    ))
                })?;
                properties.push((name, values));
            }

            let body = body.trim();
            if !body.is_empty() {
                if properties.iter().any(|(name, _)| crate::property_key(name) == BODY_PROPERTY) {
                    debug!(record = %record_id, "front matter description wins over body");
                } else {
                    properties.push((BODY_PROPERTY.to_string(), vec![body.to_string()]));
                }
            }

            entities.push(self.builder.entity(class, &record.key, properties));
        }

        let graph = self.builder.graph(entities)?;
        info!(entities = graph.len(), "transformed documents");
        Ok(graph)
    }

    fn validate(&self, graph: &ModelGraph) -> Result<()> {
        self.builder.validate(graph)
    }

    fn name(&self) -> &str {
        "document-set"
    }
}

/// Text values of a front matter entry. `None` for nested mappings.
fn scalar_values(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Null => Some(Vec::new()),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Array(_) | Value::Object(_) => None,
                scalar => Some(scalar_text(scalar)),
            })
            .filter(|v| v.as_ref().is_none_or(|s| !s.is_empty()))
            .collect(),
        Value::Object(_) => None,
        scalar => Some(vec![scalar_text(scalar)]),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
