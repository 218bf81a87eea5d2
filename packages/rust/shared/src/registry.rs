//! Registry of recognized root entity classes and their property schemas.
//!
//! Transformers are parameterized by a [`ClassRegistry`]. The built-in
//! registry describes a small cultural-collection model; a `[[classes]]` list in
//! the config file replaces it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CuratorError, Result};

/// Value type of a class property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    #[default]
    Text,
    Integer,
    Boolean,
    /// `YYYY`, `YYYY-MM` or `YYYY-MM-DD`.
    Date,
    /// Key of another entity; the target class is named by [`PropertySpec::target`].
    Reference,
}

/// Schema for one property of a class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySpec {
    pub name: String,
    #[serde(default)]
    pub kind: PropertyKind,
    #[serde(default)]
    pub required: bool,
    /// Target class for `reference` properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// Schema for one root entity class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSpec {
    pub name: String,
    #[serde(default)]
    pub properties: Vec<PropertySpec>,
}

impl ClassSpec {
    pub fn property(&self, name: &str) -> Option<&PropertySpec> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// URL/IRI-safe form of the class name (`RightsStatement` → `rights-statement`).
    pub fn slug(&self) -> String {
        class_slug(&self.name)
    }
}

/// Recognized root classes, looked up by a spelling-insensitive name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassRegistry {
    classes: BTreeMap<String, ClassSpec>,
}

impl ClassRegistry {
    /// Build a registry, checking that names are unique and references resolve.
    pub fn from_specs(specs: Vec<ClassSpec>) -> Result<Self> {
        let mut classes = BTreeMap::new();
        for spec in specs {
            let norm = normalize_class_name(&spec.name);
            if norm.is_empty() {
                return Err(CuratorError::config("class with empty name in registry"));
            }
            if classes.insert(norm, spec.clone()).is_some() {
                return Err(CuratorError::config(format!(
                    "class {} declared more than once",
                    spec.name
                )));
            }
        }

        let registry = Self { classes };
        for spec in registry.classes.values() {
            for prop in &spec.properties {
                match (prop.kind, prop.target.as_deref()) {
                    (PropertyKind::Reference, None) => {
                        return Err(CuratorError::config(format!(
                            "{}.{} is a reference without a target class",
                            spec.name, prop.name
                        )));
                    }
                    (PropertyKind::Reference, Some(target)) if registry.resolve(target).is_none() => {
                        return Err(CuratorError::config(format!(
                            "{}.{} references unknown class {target}",
                            spec.name, prop.name
                        )));
                    }
                    _ => {}
                }
            }
        }
        Ok(registry)
    }

    /// Look up a class by any common spelling (`Work`, `work`, `rights_statement`).
    pub fn resolve(&self, name: &str) -> Option<&ClassSpec> {
        self.classes.get(&normalize_class_name(name))
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassSpec> {
        self.classes.values()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// The built-in collection model.
    pub fn builtin() -> Self {
        let classes = builtin_specs()
            .into_iter()
            .map(|spec| (normalize_class_name(&spec.name), spec))
            .collect();
        Self { classes }
    }
}

fn builtin_specs() -> Vec<ClassSpec> {
    vec![
        class("Collection", vec![text("title", true), text("description", false)]),
        class(
            "Work",
            vec![
                text("title", true),
                text("description", false),
                reference("collection", "Collection"),
                reference("creator", "Person"),
                reference("contributor", "Organization"),
                date("date_created"),
                reference("license", "License"),
                reference("rights_statement", "RightsStatement"),
                reference("location", "Location"),
                reference("subject", "Concept"),
            ],
        ),
        class(
            "Person",
            vec![text("name", true), text("sort_name", false), text("page", false)],
        ),
        class("Organization", vec![text("name", true), text("page", false)]),
        class(
            "Image",
            vec![
                text("src", true),
                reference("depicts", "Work"),
                integer("width"),
                integer("height"),
                text("caption", false),
            ],
        ),
        class("License", vec![text("title", true), text("url", false)]),
        class("RightsStatement", vec![text("title", true), text("url", false)]),
        class(
            "Location",
            vec![text("name", true), text("latitude", false), text("longitude", false)],
        ),
        class("Concept", vec![text("pref_label", true), text("description", false)]),
        class(
            "Property",
            vec![text("label", true), boolean("filterable"), boolean("searchable")],
        ),
    ]
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Lowercase with `_`, `-` and spaces removed.
pub fn normalize_class_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Kebab-case form of a class name (`RightsStatement` → `rights-statement`).
pub fn class_slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_uppercase() && prev_lower {
            out.push('-');
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        out.extend(c.to_lowercase());
    }
    slugify(&out)
}

/// Generate a URL-safe slug from arbitrary text.
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

fn class(name: &str, properties: Vec<PropertySpec>) -> ClassSpec {
    ClassSpec {
        name: name.into(),
        properties,
    }
}

fn prop(name: &str, kind: PropertyKind, required: bool, target: Option<&str>) -> PropertySpec {
    PropertySpec {
        name: name.into(),
        kind,
        required,
        target: target.map(String::from),
    }
}

fn text(name: &str, required: bool) -> PropertySpec {
    prop(name, PropertyKind::Text, required, None)
}

fn integer(name: &str) -> PropertySpec {
    prop(name, PropertyKind::Integer, false, None)
}

fn boolean(name: &str) -> PropertySpec {
    prop(name, PropertyKind::Boolean, false, None)
}

fn date(name: &str) -> PropertySpec {
    prop(name, PropertyKind::Date, false, None)
}

fn reference(name: &str, target: &str) -> PropertySpec {
    prop(name, PropertyKind::Reference, false, Some(target))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_resolves_spellings() {
        let registry = ClassRegistry::builtin();
        assert_eq!(registry.len(), 10);
        assert_eq!(registry.resolve("work").map(|c| c.name.as_str()), Some("Work"));
        assert_eq!(
            registry.resolve("rights_statement").map(|c| c.name.as_str()),
            Some("RightsStatement")
        );
        assert_eq!(
            registry.resolve("Rights-Statement").map(|c| c.name.as_str()),
            Some("RightsStatement")
        );
        assert!(registry.resolve("Exhibition").is_none());
    }

    #[test]
    fn builtin_specs_pass_registry_checks() {
        let checked = ClassRegistry::from_specs(builtin_specs()).expect("valid builtin");
        assert_eq!(checked, ClassRegistry::builtin());
    }

    #[test]
    fn class_slugs() {
        assert_eq!(class_slug("RightsStatement"), "rights-statement");
        assert_eq!(class_slug("Work"), "work");
        assert_eq!(slugify("Mona Lisa (1503)"), "mona-lisa-1503");
    }

    #[test]
    fn dangling_reference_target_rejected() {
        let specs = vec![class("Work", vec![reference("collection", "Collection")])];
        let err = ClassRegistry::from_specs(specs).unwrap_err();
        assert!(err.to_string().contains("unknown class Collection"));
    }

    #[test]
    fn duplicate_class_rejected() {
        let specs = vec![class("Work", vec![]), class("work", vec![])];
        assert!(ClassRegistry::from_specs(specs).is_err());
    }

    #[test]
    fn registry_from_toml() {
        #[derive(Deserialize)]
        struct Doc {
            classes: Vec<ClassSpec>,
        }
        let doc: Doc = toml::from_str(
            r#"
[[classes]]
name = "Exhibition"
[[classes.properties]]
name = "title"
required = true
[[classes.properties]]
name = "year"
kind = "integer"
"#,
        )
        .expect("parse");
        let registry = ClassRegistry::from_specs(doc.classes).expect("registry");
        let spec = registry.resolve("exhibition").expect("class");
        assert_eq!(spec.property("year").map(|p| p.kind), Some(PropertyKind::Integer));
        assert!(spec.property("title").is_some_and(|p| p.required));
    }
}
