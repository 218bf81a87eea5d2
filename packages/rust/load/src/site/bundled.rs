//! Built-in static HTML renderer.
//!
//! Layout:
//! ```text
//! <out_dir>/
//! ├── index.html                      entities grouped by root class
//! ├── entities/<class-slug>/<key>.html
//! ├── data.jsonld                     the full graph
//! ├── manifest.json
//! └── configuration.<ext>             when a configuration file is given
//! ```

use std::fmt::Write as _;
use std::path::Path;

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use curator_shared::{
    CURRENT_SCHEMA_VERSION, CuratorError, Entity, ModelGraph, Result, SiteManifest, Term, class_slug,
};

use super::{SiteBuilder, SiteContext};
use crate::codec::to_jsonld;

/// Hex digits of the digest appended to rewritten key segments.
const SEGMENT_DIGEST_LEN: usize = 10;

/// Renders plain HTML pages with no client-side code.
#[derive(Debug, Clone, Default)]
pub struct BundledSiteBuilder;

impl SiteBuilder for BundledSiteBuilder {
    #[instrument(skip_all, fields(out_dir = %out_dir.display(), entities = graph.len()))]
    fn build(&self, graph: &ModelGraph, ctx: &SiteContext, out_dir: &Path) -> Result<()> {
        write_file(&out_dir.join("index.html"), &render_index(graph, ctx))?;

        for entity in graph.entities() {
            let page = entity_page(entity);
            write_file(&out_dir.join(&page), &render_entity(graph, entity, ctx))?;
            debug!(page = %page, "rendered entity page");
        }

        let jsonld = serde_json::to_string_pretty(&to_jsonld(graph))
            .map_err(|e| CuratorError::filesystem(out_dir, format!("JSON-LD serialization failed: {e}")))?;
        write_file(&out_dir.join("data.jsonld"), &jsonld)?;

        let manifest = SiteManifest {
            schema_version: CURRENT_SCHEMA_VERSION,
            pipeline_id: ctx.run.pipeline_id.clone(),
            run_id: ctx.run.run_id.clone(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: Utc::now(),
            entity_count: graph.len(),
            base_url_path: ctx.base_url_path.clone(),
        };
        let manifest_json = serde_json::to_string_pretty(&manifest)
            .map_err(|e| CuratorError::filesystem(out_dir, format!("manifest serialization failed: {e}")))?;
        write_file(&out_dir.join("manifest.json"), &manifest_json)?;

        if let Some(config) = &ctx.configuration_file {
            let name = match config.extension() {
                Some(ext) => format!("configuration.{}", ext.to_string_lossy()),
                None => "configuration".to_string(),
            };
            let dest = out_dir.join(name);
            std::fs::copy(config, &dest).map_err(|e| CuratorError::io(config, e))?;
        }

        info!(pages = graph.len() + 1, "rendered bundled site");
        Ok(())
    }

    fn name(&self) -> &str {
        "bundled"
    }
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

/// Site-relative path of an entity's page.
pub(crate) fn entity_page(entity: &Entity) -> String {
    let segments: Vec<String> = entity.key.split('/').map(file_segment).collect();
    format!("entities/{}/{}.html", class_slug(&entity.class_name), segments.join("/"))
}

/// File-safe form of one key segment. A segment that had to be rewritten gets
/// `~` and a digest of the original, so distinct keys never share a page.
fn file_segment(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '-' })
        .collect();
    let reserved = cleaned.is_empty() || cleaned.chars().all(|c| c == '.');
    if !reserved && cleaned == segment {
        return cleaned;
    }
    let base = if reserved { "_" } else { cleaned.as_str() };
    let digest = format!("{:x}", Sha256::digest(segment.as_bytes()));
    format!("{base}~{}", &digest[..SEGMENT_DIGEST_LEN])
}

fn render_index(graph: &ModelGraph, ctx: &SiteContext) -> String {
    let title = escape_html(&ctx.run.pipeline_id);
    let mut body = format!("<h1>{title}</h1>\n");
    for (class_name, entities) in graph.roots() {
        let _ = writeln!(
            body,
            "<section id=\"{}\">\n<h2>{}</h2>\n<ul>",
            class_slug(class_name),
            escape_html(class_name)
        );
        let mut sorted = entities;
        sorted.sort_by(|a, b| a.label().cmp(b.label()).then_with(|| a.key.cmp(&b.key)));
        for entity in sorted {
            let _ = writeln!(
                body,
                "<li><a href=\"{}\">{}</a></li>",
                escape_html(&ctx.href(&entity_page(entity))),
                escape_html(entity.label())
            );
        }
        body.push_str("</ul>\n</section>\n");
    }
    page(&title, ctx, &body)
}

fn render_entity(graph: &ModelGraph, entity: &Entity, ctx: &SiteContext) -> String {
    let title = escape_html(entity.label());
    let mut body = format!(
        "<p><a href=\"{}\">{}</a></p>\n<h1>{title}</h1>\n<p class=\"class\">{}</p>\n<dl>\n",
        escape_html(&ctx.href("index.html")),
        escape_html(&ctx.run.pipeline_id),
        escape_html(&entity.class_name)
    );
    for (property, values) in &entity.properties {
        let _ = writeln!(body, "<dt>{}</dt>", escape_html(property));
        for value in values {
            let rendered = match value {
                Term::Iri(iri) => match graph.get(iri) {
                    Some(target) => format!(
                        "<a href=\"{}\">{}</a>",
                        escape_html(&ctx.href(&entity_page(target))),
                        escape_html(target.label())
                    ),
                    None => escape_html(iri),
                },
                Term::Literal(lit) => escape_html(&lit.value),
            };
            let _ = writeln!(body, "<dd>{rendered}</dd>");
        }
    }
    body.push_str("</dl>\n");
    page(&title, ctx, &body)
}

fn page(title: &str, ctx: &SiteContext, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n<link rel=\"alternate\" type=\"application/ld+json\" href=\"{}\">\n\
         </head>\n<body>\n{body}</body>\n</html>\n",
        escape_html(&ctx.href("data.jsonld"))
    )
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CuratorError::io(parent, e))?;
    }
    std::fs::write(path, content).map_err(|e| CuratorError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use curator_shared::{Literal, RunId, RunIdentity, entity_iri};

    fn graph() -> ModelGraph {
        let mut person = Entity::new(entity_iri("demo", "person", "leo"), "Person", "leo");
        person.push("name", Term::Literal(Literal::string("Leonardo")));
        let mut work = Entity::new(entity_iri("demo", "work", "drawings/vm"), "Work", "drawings/vm");
        work.push("title", Term::Literal(Literal::string("Vitruvian <Man>")));
        work.push("creator", Term::Iri(person.id.clone()));
        ModelGraph::new("demo", vec![person, work]).unwrap()
    }

    fn ctx(base: Option<&str>, configuration_file: Option<std::path::PathBuf>) -> SiteContext {
        SiteContext {
            run: RunIdentity {
                pipeline_id: "demo".into(),
                run_id: RunId::new(),
            },
            base_url_path: base.map(str::to_string),
            configuration_file,
        }
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn entity_pages_nest_keys() {
        let g = graph();
        let work = g.entities().find(|e| e.class_name == "Work").unwrap();
        assert_eq!(entity_page(work), "entities/work/drawings/vm.html");
        assert!(file_segment("..").starts_with("_~"));
        assert!(file_segment("").starts_with("_~"));
        assert!(file_segment("a b?c").starts_with("a-b-c~"));
        assert_eq!(file_segment("mona-lisa_1.v2"), "mona-lisa_1.v2");
    }

    #[test]
    fn rewritten_keys_get_distinct_pages() {
        let entity = |key: &str, title: &str| {
            let mut e = Entity::new(entity_iri("demo", "work", key), "Work", key);
            e.push("title", Term::Literal(Literal::string(title)));
            e
        };
        let g = ModelGraph::new("demo", vec![entity("a b", "First"), entity("a-b", "Second")]).unwrap();
        let pages: Vec<String> = g.entities().map(entity_page).collect();
        assert_ne!(pages[0], pages[1]);
        assert!(pages.contains(&"entities/work/a-b.html".to_string()));

        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("site");
        BundledSiteBuilder.build(&g, &ctx(None, None), &out).unwrap();

        for entity in g.entities() {
            let html = std::fs::read_to_string(out.join(entity_page(entity))).unwrap();
            assert!(html.contains(entity.label()), "{}", entity.key);
        }
        let index = std::fs::read_to_string(out.join("index.html")).unwrap();
        for page in &pages {
            assert!(index.contains(page.as_str()), "{page}");
        }
    }

    #[test]
    fn renders_bundle_under_base_url() {
        let tmp = tempfile::tempdir().unwrap();
        let config = tmp.path().join("config.json");
        std::fs::write(&config, "{}").unwrap();
        let out = tmp.path().join("site");
        std::fs::create_dir_all(&out).unwrap();

        BundledSiteBuilder
            .build(&graph(), &ctx(Some("/collection"), Some(config)), &out)
            .unwrap();

        let index = std::fs::read_to_string(out.join("index.html")).unwrap();
        assert!(index.contains("href=\"/collection/entities/work/drawings/vm.html\""));
        assert!(index.contains("Vitruvian &lt;Man&gt;"));

        let work_page = std::fs::read_to_string(out.join("entities/work/drawings/vm.html")).unwrap();
        assert!(work_page.contains("<a href=\"/collection/entities/person/leo.html\">Leonardo</a>"));

        let manifest: SiteManifest =
            serde_json::from_str(&std::fs::read_to_string(out.join("manifest.json")).unwrap()).unwrap();
        assert_eq!(manifest.entity_count, 2);
        assert_eq!(manifest.base_url_path.as_deref(), Some("/collection"));

        assert!(out.join("data.jsonld").is_file());
        assert!(out.join("configuration.json").is_file());
    }
}
