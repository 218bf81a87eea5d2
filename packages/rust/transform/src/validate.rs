//! Schema checks over a built graph.

use std::fmt;

use chrono::NaiveDate;

use curator_shared::{ClassRegistry, Datatype, Entity, ModelGraph, PropertyKind, Term};

/// One schema violation, attributed to an entity and property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// `<Class>/<key>` of the offending entity.
    pub record: String,
    pub property: String,
    pub problem: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.record, self.property, self.problem)
    }
}

/// Check every entity against its class schema. Returns all violations in
/// entity order.
pub fn check_graph(registry: &ClassRegistry, graph: &ModelGraph) -> Vec<Violation> {
    let mut violations = Vec::new();
    for entity in graph.entities() {
        let record = format!("{}/{}", entity.class_name, entity.key);
        let mut report = |property: &str, problem: String| {
            violations.push(Violation {
                record: record.clone(),
                property: property.to_string(),
                problem,
            });
        };

        let Some(class) = registry.resolve(&entity.class_name) else {
            report("@type", format!("unknown class {:?}", entity.class_name));
            continue;
        };

        for spec in class.properties.iter().filter(|p| p.required) {
            if entity.values(&spec.name).is_empty() {
                report(&spec.name, "missing required property".into());
            }
        }

        for (property, values) in &entity.properties {
            let spec = class.property(property);
            for value in values {
                match (spec.map(|s| s.kind), value) {
                    (Some(PropertyKind::Reference), Term::Iri(iri)) => {
                        let expected = spec.and_then(|s| s.target.as_deref());
                        if let Some(problem) = check_reference(registry, graph, iri, expected) {
                            report(property, problem);
                        }
                    }
                    (Some(PropertyKind::Reference), Term::Literal(lit)) => {
                        report(property, format!("expected a reference, found literal {:?}", lit.value));
                    }
                    (_, Term::Iri(iri)) => {
                        if graph.get(iri).is_none() {
                            report(property, format!("reference to missing entity {iri}"));
                        }
                    }
                    (_, Term::Literal(lit)) => {
                        if !lexical_form_ok(lit.datatype, &lit.value) {
                            report(
                                property,
                                format!("{:?} is not a valid {}", lit.value, datatype_name(lit.datatype)),
                            );
                        }
                    }
                }
            }
        }
    }
    violations
}

fn check_reference(
    registry: &ClassRegistry,
    graph: &ModelGraph,
    iri: &str,
    expected: Option<&str>,
) -> Option<String> {
    let Some(target) = graph.get(iri) else {
        return Some(format!("reference to missing entity {iri}"));
    };
    let expected = expected.and_then(|name| registry.resolve(name))?;
    if same_class(target, &expected.name) {
        None
    } else {
        Some(format!(
            "reference to {} entity {iri}, expected {}",
            target.class_name, expected.name
        ))
    }
}

fn same_class(entity: &Entity, class_name: &str) -> bool {
    curator_shared::normalize_class_name(&entity.class_name)
        == curator_shared::normalize_class_name(class_name)
}

fn datatype_name(datatype: Datatype) -> &'static str {
    match datatype {
        Datatype::String => "string",
        Datatype::Integer => "integer",
        Datatype::Boolean => "boolean",
        Datatype::Date => "date (YYYY, YYYY-MM or YYYY-MM-DD)",
    }
}

/// Whether `value` is a valid lexical form of `datatype`.
pub(crate) fn lexical_form_ok(datatype: Datatype, value: &str) -> bool {
    match datatype {
        Datatype::String => true,
        Datatype::Integer => value.parse::<i64>().is_ok(),
        Datatype::Boolean => matches!(value, "true" | "false" | "1" | "0"),
        Datatype::Date => is_date(value),
    }
}

fn is_date(value: &str) -> bool {
    let digits = |s: &str, n: usize| s.len() == n && s.bytes().all(|b| b.is_ascii_digit());
    match value.split('-').collect::<Vec<_>>().as_slice() {
        [year] => digits(year, 4),
        [year, month] => {
            digits(year, 4) && digits(month, 2) && matches!(month.parse::<u32>(), Ok(1..=12))
        }
        [_, _, _] => NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok() && value.len() == 10,
        _ => false,
    }
}
