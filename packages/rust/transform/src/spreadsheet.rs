//! Spreadsheet transformer: one row per entity.

use tracing::{info, instrument};

use curator_shared::{ClassRegistry, CuratorError, ModelGraph, RawDataset, RawPayload, Result};

use crate::{GraphBuilder, Transformer};

/// Separator for multi-valued cells.
const MULTI_VALUE_SEPARATOR: char = '|';

/// Maps spreadsheet rows to entities. Empty cells are skipped; `a|b` is two values.
#[derive(Debug, Clone)]
pub struct SpreadsheetTransformer {
    builder: GraphBuilder,
}

impl SpreadsheetTransformer {
    pub fn new(pipeline_id: impl Into<String>, registry: ClassRegistry) -> Self {
        Self {
            builder: GraphBuilder::new(pipeline_id, registry),
        }
    }
}

impl Transformer for SpreadsheetTransformer {
    #[instrument(skip_all, fields(pipeline_id = %self.builder.pipeline_id(), records = dataset.len()))]
    fn transform(&self, dataset: RawDataset) -> Result<ModelGraph> {
        let mut entities = Vec::with_capacity(dataset.len());
        for record in dataset.into_records() {
            let record_id = record.record_id();
            let class = self.builder.class(&record.class_name, &record_id)?;

            let RawPayload::Row { cells } = record.payload else {
                return Err(CuratorError::validation(format!(
                    "{record_id}: expected a spreadsheet row, found a document"
                )));
            };

            let properties = cells
                .into_iter()
                .filter(|(_, cell)| !cell.trim().is_empty())
                .map(|(name, cell)| {
                    let values = cell
                        .split(MULTI_VALUE_SEPARATOR)
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .map(str::to_string)
                        .collect::<Vec<_>>();
                    (name, values)
                });

            entities.push(self.builder.entity(class, &record.key, properties));
        }

        let graph = self.builder.graph(entities)?;
        info!(entities = graph.len(), "transformed spreadsheet rows");
        Ok(graph)
    }

    fn validate(&self, graph: &ModelGraph) -> Result<()> {
        self.builder.validate(graph)
    }

    fn name(&self) -> &str {
        "spreadsheet"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use chrono::Utc;
    use curator_shared::{RawRecord, SourceFingerprint, Term, entity_iri};

    fn row(class: &str, key: &str, cells: &[(&str, &str)]) -> RawRecord {
        RawRecord {
            class_name: class.into(),
            key: key.into(),
            payload: RawPayload::Row {
                cells: cells
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect::<BTreeMap<_, _>>(),
            },
        }
    }

    fn dataset(records: Vec<RawRecord>) -> RawDataset {
        let mut dataset = RawDataset::new(SourceFingerprint {
            identity: "google-sheets:test".into(),
            content_hash: String::new(),
            extracted_at: Utc::now(),
        });
        for record in records {
            dataset.insert(record);
        }
        dataset
    }

    fn transformer() -> SpreadsheetTransformer {
        SpreadsheetTransformer::new("demo", ClassRegistry::builtin())
    }

    #[test]
    fn splits_multi_valued_cells_and_skips_empty() {
        let graph = transformer()
            .transform(dataset(vec![
                row(
                    "Work",
                    "a",
                    &[("title", "A"), ("subject", "portrait | renaissance"), ("description", "  ")],
                ),
                row("Concept", "portrait", &[("pref_label", "Portrait")]),
                row("Concept", "renaissance", &[("pref_label", "Renaissance")]),
            ]))
            .unwrap();

        let work = graph.get(&entity_iri("demo", "work", "a")).unwrap();
        assert_eq!(work.values("subject").len(), 2);
        assert!(work.values("subject").iter().all(|t| matches!(t, Term::Iri(_))));
        assert!(!work.properties.contains_key("description"));
        assert!(transformer().validate(&graph).is_ok());
    }

    #[test]
    fn unknown_sheet_is_validation_error() {
        let err = transformer()
            .transform(dataset(vec![row("Gadgets", "x", &[("title", "X")])]))
            .unwrap_err();
        assert!(matches!(err, CuratorError::Validation { .. }));
    }

    #[test]
    fn spelling_variants_collide() {
        let err = transformer()
            .transform(dataset(vec![
                row("Work", "a", &[("title", "A")]),
                row("work", "a", &[("title", "A again")]),
            ]))
            .unwrap_err();
        assert!(err.to_string().contains("duplicate entity"));
    }

    #[test]
    fn bad_integer_fails_validation() {
        let graph = transformer()
            .transform(dataset(vec![row("Image", "i", &[("src", "i.jpg"), ("width", "wide")])]))
            .unwrap();
        assert!(transformer().validate(&graph).is_err());
    }
}
