//! JSON knowledge-base loader.
//!
//! Reads a directory of `*.json` files and flattens each arbitrarily nested
//! document into titled [`DocumentChunk`]s. Flattening walks the JSON value
//! graph depth-first collecting string leaves, then groups them by top-level
//! section so each section of each file yields at most one chunk.
//!
//! A malformed file is logged and skipped; a missing or empty data directory
//! yields an empty corpus. Both are normal conditions, not errors.

use chrono::{DateTime, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::CorpusConfig;
use crate::models::{Category, ChunkMetadata, Corpus, DocumentChunk};

/// Domain vocabulary used for per-chunk keyword extraction.
pub const DOMAIN_VOCABULARY: &[&str] = &[
    "palma",
    "aceite",
    "oleico",
    "OxG",
    "híbrido",
    "sostenible",
    "RSPO",
    "fedepalma",
    "cenipalma",
    "palmicultura",
    "extracción",
    "beneficio",
    "congreso",
    "conferencia",
    "guaicaramo",
    "dao",
    "sirius",
];

/// Filename substrings per category, first match wins.
const CATEGORY_RULES: &[(Category, &[&str])] = &[
    (Category::Events, &["congreso", "congress", "agenda"]),
    (Category::Company, &["dao", "sirius"]),
    (
        Category::Foundation,
        &["guaicaramo", "fundacion", "foundation"],
    ),
];

/// A string leaf collected during flattening, tagged with its JSON path.
#[derive(Debug, Clone)]
struct TextFragment {
    path: String,
    text: String,
}

/// Load every JSON file in the data directory into a corpus.
///
/// Files are processed in file-name order so corpus order (and therefore
/// tie-breaking in search results) is deterministic across loads.
pub fn load_corpus(config: &CorpusConfig) -> Corpus {
    let mut corpus = Vec::new();

    if !config.data_dir.exists() {
        warn!(dir = %config.data_dir.display(), "data directory missing, corpus is empty");
        return corpus;
    }

    let include = match json_globset() {
        Ok(set) => set,
        Err(e) => {
            warn!(error = %e, "failed to build include globs, corpus is empty");
            return corpus;
        }
    };

    let mut files: Vec<_> = WalkDir::new(&config.data_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| include.is_match(entry.file_name().to_string_lossy().as_ref()))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();

    for path in &files {
        match load_file(path, config) {
            Ok(chunks) => {
                debug!(file = %path.display(), chunks = chunks.len(), "loaded document");
                corpus.extend(chunks);
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "skipping malformed document");
            }
        }
    }

    debug!(chunks = corpus.len(), files = files.len(), "corpus loaded");
    corpus
}

fn json_globset() -> anyhow::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    builder.add(Glob::new("*.json")?);
    Ok(builder.build()?)
}

fn load_file(path: &Path, config: &CorpusConfig) -> anyhow::Result<Corpus> {
    let raw = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&raw)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let last_updated = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from);

    let category = categorize(&file_name);

    Ok(build_chunks(
        &file_name,
        &value,
        category,
        last_updated,
        config,
    ))
}

/// Assign a category from filename substrings; unknown files are general.
pub fn categorize(file_name: &str) -> Category {
    let lower = file_name.to_lowercase();
    for (category, needles) in CATEGORY_RULES {
        if needles.iter().any(|needle| lower.contains(needle)) {
            return *category;
        }
    }
    Category::General
}

/// Flatten one parsed document into per-section chunks.
pub fn build_chunks(
    file_name: &str,
    value: &Value,
    category: Category,
    last_updated: Option<DateTime<Utc>>,
    config: &CorpusConfig,
) -> Corpus {
    let mut fragments = Vec::new();
    flatten(value, String::new(), config, &mut fragments);

    let display_name = document_display_name(file_name, value);
    // Emit at most one chunk per top-level section to bound fragmentation.
    let mut seen_sections: HashSet<String> = HashSet::new();
    let mut chunks = Vec::new();

    for (index, fragment) in fragments.iter().enumerate() {
        let section = top_level_section(&fragment.path);
        if seen_sections.contains(&section) {
            continue;
        }
        // Only a reasonably sized first fragment opens a section.
        if fragment.text.len() <= 50 {
            continue;
        }

        let joined: Vec<&str> = fragments
            .iter()
            .filter(|f| top_level_section(&f.path) == section)
            .filter(|f| f.text.len() > config.min_leaf_len)
            .map(|f| f.text.as_str())
            .collect();

        let content = truncate_to_boundary(&joined.join(". "), config.max_content_len).to_string();
        if content.len() <= config.min_content_len {
            continue;
        }

        let keywords = extract_keywords(&content, config.max_keywords);

        chunks.push(DocumentChunk {
            id: format!("{}_{}_{}", file_name, section, index),
            title: format!("{} - {}", display_name, section.replace('_', " ")),
            source: format!("{} - {}", config.collection, file_name),
            content,
            metadata: ChunkMetadata {
                category,
                section: section.clone(),
                document_type: category,
                keywords,
                last_updated,
            },
        });
        seen_sections.insert(section);
    }

    chunks
}

/// Depth-first walk over the JSON value graph, collecting significant
/// string leaves as `(path, text)` fragments.
fn flatten(value: &Value, path: String, config: &CorpusConfig, out: &mut Vec<TextFragment>) {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.len() > config.min_leaf_len {
                out.push(TextFragment {
                    path,
                    text: trimmed.to_string(),
                });
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                let item_path = format!("{}[{}]", path, index);
                match item {
                    // Bare strings inside arrays get a lower significance bar:
                    // agenda entries are often short standalone lines.
                    Value::String(s) => {
                        let trimmed = s.trim();
                        if trimmed.len() > config.min_array_leaf_len {
                            out.push(TextFragment {
                                path: item_path,
                                text: trimmed.to_string(),
                            });
                        }
                    }
                    Value::Array(_) | Value::Object(_) => {
                        flatten(item, item_path, config, out);
                    }
                    Value::Null | Value::Bool(_) | Value::Number(_) => {}
                }
            }
        }
        Value::Object(map) => {
            for (key, child) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                flatten(child, child_path, config, out);
            }
        }
        // Numbers, booleans, and nulls carry no retrievable text.
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

/// The leading path segment before any `.` or `[`, or `"root"` for leaves
/// at the document top level.
fn top_level_section(path: &str) -> String {
    let head = path
        .split(['.', '['])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("root");
    head.to_string()
}

/// Human-readable document name: a top-level `"name"`, a `"name"` nested one
/// object deep, or the file stem with dashes spaced out.
fn document_display_name(file_name: &str, value: &Value) -> String {
    if let Value::Object(map) = value {
        if let Some(Value::String(name)) = map.get("name") {
            return name.clone();
        }
        for child in map.values() {
            if let Value::Object(inner) = child {
                if let Some(Value::String(name)) = inner.get("name") {
                    return name.clone();
                }
            }
        }
    }
    file_name.trim_end_matches(".json").replace('-', " ")
}

/// Keep domain-vocabulary terms that occur (case-insensitively) in the
/// content, bounded to `max` entries.
pub fn extract_keywords(content: &str, max: usize) -> Vec<String> {
    let lower = content.to_lowercase();
    DOMAIN_VOCABULARY
        .iter()
        .filter(|keyword| lower.contains(&keyword.to_lowercase()))
        .take(max)
        .map(|keyword| (*keyword).to_string())
        .collect()
}

/// Byte-bounded truncation that never splits a UTF-8 code point.
pub fn truncate_to_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
