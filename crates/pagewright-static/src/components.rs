//! Component fragments and page template substitution.
//!
//! A template marks insertion points with `{{name}}`. Each file in the
//! components directory provides the content for the placeholder named after
//! its file stem, so `components/header.html` fills `{{header}}`.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::Serialize;
use tokio::fs;

use crate::error::BuildError;
use crate::read_ahead::ReadAhead;

/// `{{name}}` with no braces inside the name.
fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{([^{}]+)\}\}").expect("placeholder pattern is valid"))
}

/// A named piece of markup substituted into the template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentFragment {
    pub name: String,
    pub content: String,
}

/// Component fragments keyed by name, in the order they were added.
///
/// Names are case-sensitive. The first fragment added under a name keeps it.
#[derive(Debug, Clone, Default)]
pub struct ComponentSet {
    fragments: Vec<ComponentFragment>,
    index: HashMap<String, usize>,
}

impl ComponentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fragment. Hands it back if its name is already taken.
    pub fn insert(&mut self, fragment: ComponentFragment) -> Result<(), ComponentFragment> {
        if self.index.contains_key(&fragment.name) {
            return Err(fragment);
        }
        self.index.insert(fragment.name.clone(), self.fragments.len());
        self.fragments.push(fragment);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.index
            .get(name)
            .map(|&i| self.fragments[i].content.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fragments.iter().map(|f| f.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentFragment> {
        self.fragments.iter()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Collects `(name, content)` pairs. The first entry for a name wins and later
/// duplicates are dropped; use [`ComponentSet::insert`] to detect them.
impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ComponentSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (name, content) in iter {
            let _ = set.insert(ComponentFragment {
                name: name.into(),
                content: content.into(),
            });
        }
        set
    }
}

/// Outcome for a single components directory entry.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ComponentStatus {
    /// Fragment registered under its name
    Loaded { bytes: usize },

    /// Not a regular file
    Skipped,

    /// Another entry already claimed the same name
    Duplicate { name: String },

    Failed { error: BuildError },
}

/// A components directory entry with its outcome.
#[derive(Debug, Serialize)]
pub struct ComponentEntry {
    /// File name as listed
    pub file: String,

    #[serde(flatten)]
    pub status: ComponentStatus,
}

/// Fragments loaded from a components directory.
#[derive(Debug, Default)]
pub struct LoadedComponents {
    pub components: ComponentSet,

    /// Every listed entry, in listing order
    pub entries: Vec<ComponentEntry>,
}

/// Read every file in `components_dir` in full, keyed by file stem.
///
/// Fragments are read concurrently and registered in listing order. When two
/// files share a stem (`header.html` and `header.htm`), the first listed wins
/// and the other is reported as a duplicate.
pub async fn load_components(components_dir: &Path) -> Result<LoadedComponents, BuildError> {
    let mut dir = fs::read_dir(components_dir)
        .await
        .map_err(BuildError::read(components_dir))?;

    let mut listed = Vec::new();

    while let Some(entry) = dir
        .next_entry()
        .await
        .map_err(BuildError::read(components_dir))?
    {
        let file = entry.file_name().to_string_lossy().into_owned();
        let path = entry.path();

        let pending = match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(Some(ReadAhead::spawn(path.clone()))),
            Ok(_) => Ok(None),
            Err(e) => Err(BuildError::read(&path)(e)),
        };

        listed.push((file, path, pending));
    }

    let mut loaded = LoadedComponents::default();

    for (file, path, pending) in listed {
        let status = match pending {
            Ok(Some(read)) => match read.finish().await.and_then(utf8) {
                Ok(content) => {
                    let name = component_name(&path);
                    let bytes = content.len();
                    match loaded.components.insert(ComponentFragment { name, content }) {
                        Ok(()) => {
                            tracing::debug!("Loaded component {}", file);
                            ComponentStatus::Loaded { bytes }
                        }
                        Err(dup) => {
                            tracing::warn!(
                                "Component {} duplicates name '{}', keeping the first",
                                file,
                                dup.name
                            );
                            ComponentStatus::Duplicate { name: dup.name }
                        }
                    }
                }
                Err(e) => {
                    let error = BuildError::read(&path)(e);
                    tracing::warn!("Skipping component {}: {}", file, error);
                    ComponentStatus::Failed { error }
                }
            },
            Ok(None) => {
                tracing::debug!("Skipping non-file entry {}", file);
                ComponentStatus::Skipped
            }
            Err(error) => {
                tracing::warn!("Skipping component {}: {}", file, error);
                ComponentStatus::Failed { error }
            }
        };

        loaded.entries.push(ComponentEntry { file, status });
    }

    Ok(loaded)
}

/// Placeholder name for a component file: its name without extension.
pub fn component_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn utf8(bytes: Vec<u8>) -> io::Result<String> {
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Output of [`render`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rendered {
    pub text: String,

    /// Component names substituted at least once, in order of first use
    pub substituted: Vec<String>,

    /// Placeholder names with no component, left verbatim, in order of first use
    pub unresolved: Vec<String>,
}

/// Replace every `{{name}}` in `template` that has a component.
///
/// Single pass: text coming from a component is never scanned again, so a
/// component containing `{{other}}` ends up with that marker verbatim.
/// Placeholders without a component stay as written and are listed in
/// [`Rendered::unresolved`].
pub fn render(template: &str, components: &ComponentSet) -> Rendered {
    let mut substituted: Vec<String> = Vec::new();
    let mut unresolved: Vec<String> = Vec::new();

    let text = placeholder_pattern()
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            match components.get(name) {
                Some(content) => {
                    if !substituted.iter().any(|n| n == name) {
                        substituted.push(name.to_string());
                    }
                    content.to_string()
                }
                None => {
                    if !unresolved.iter().any(|n| n == name) {
                        unresolved.push(name.to_string());
                    }
                    caps[0].to_string()
                }
            }
        })
        .into_owned();

    Rendered {
        text,
        substituted,
        unresolved,
    }
}

/// A page template together with the components it draws on.
#[derive(Debug, Clone)]
pub struct TemplateDocument {
    pub template: String,
    pub components: ComponentSet,
}

impl TemplateDocument {
    pub fn new(template: impl Into<String>, components: ComponentSet) -> Self {
        Self {
            template: template.into(),
            components,
        }
    }

    pub fn render(&self) -> Rendered {
        render(&self.template, &self.components)
    }
}

/// Write the rendered page in one operation.
pub async fn write_rendered(text: &str, out_file: &Path) -> Result<(), BuildError> {
    fs::write(out_file, text)
        .await
        .map_err(BuildError::write(out_file))
}

/// Result of rendering the page.
#[derive(Debug, Serialize)]
pub struct RenderReport {
    pub template: PathBuf,
    pub output: PathBuf,

    /// Every components directory entry, in listing order
    pub components: Vec<ComponentEntry>,

    pub substituted: Vec<String>,
    pub unresolved: Vec<String>,
    pub bytes_written: usize,
}

/// Load the template and components, render, and write `out_file`.
pub async fn render_page(
    template_path: &Path,
    components_dir: &Path,
    out_file: &Path,
) -> Result<RenderReport, BuildError> {
    let (template, loaded) = tokio::join!(
        fs::read_to_string(template_path),
        load_components(components_dir)
    );
    let template = template.map_err(BuildError::read(template_path))?;
    let loaded = loaded?;

    let document = TemplateDocument::new(template, loaded.components);
    let rendered = document.render();

    for name in &rendered.unresolved {
        tracing::warn!(
            "Placeholder {{{{{}}}}} in {} has no matching component",
            name,
            template_path.display()
        );
    }

    write_rendered(&rendered.text, out_file).await?;

    tracing::info!(
        "Rendered {} with {} components",
        out_file.display(),
        rendered.substituted.len()
    );

    Ok(RenderReport {
        template: template_path.to_path_buf(),
        output: out_file.to_path_buf(),
        components: loaded.entries,
        substituted: rendered.substituted,
        unresolved: rendered.unresolved,
        bytes_written: rendered.text.len(),
    })
}
