//! Build orchestration.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use serde::Serialize;

use crate::assets::{copy_tree, MirrorReport};
use crate::components::{render_page, ComponentStatus, RenderReport};
use crate::destination::{ensure_clean, DestinationReport};
use crate::error::BuildError;
use crate::styles::{bundle, BundleReport};

/// Bundled stylesheet, relative to the output directory.
pub const STYLE_BUNDLE: &str = "style.css";

/// Rendered page, relative to the output directory.
pub const PAGE_OUTPUT: &str = "index.html";

/// Mirrored asset tree, relative to the output directory.
pub const ASSETS_OUTPUT: &str = "assets";

/// Configuration for building a static site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    /// Stylesheet fragments (`*.css`)
    pub styles_dir: PathBuf,

    /// Static asset tree, copied as is
    pub assets_dir: PathBuf,

    /// Component fragments, one per file
    pub components_dir: PathBuf,

    /// Page template with `{{name}}` placeholders
    pub template: PathBuf,

    /// Output directory, wiped at the start of every build
    pub output_dir: PathBuf,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            styles_dir: PathBuf::from("styles"),
            assets_dir: PathBuf::from("assets"),
            components_dir: PathBuf::from("components"),
            template: PathBuf::from("template.html"),
            output_dir: PathBuf::from("project-dist"),
        }
    }
}

impl BuildConfig {
    /// Conventional layout below a project root.
    pub fn from_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let defaults = Self::default();
        Self {
            styles_dir: root.join(defaults.styles_dir),
            assets_dir: root.join(defaults.assets_dir),
            components_dir: root.join(defaults.components_dir),
            template: root.join(defaults.template),
            output_dir: root.join(defaults.output_dir),
        }
    }

    pub fn style_bundle_path(&self) -> PathBuf {
        self.output_dir.join(STYLE_BUNDLE)
    }

    pub fn page_path(&self) -> PathBuf {
        self.output_dir.join(PAGE_OUTPUT)
    }

    pub fn assets_output_dir(&self) -> PathBuf {
        self.output_dir.join(ASSETS_OUTPUT)
    }

    /// Refuse an output directory that would wipe or recurse into a source.
    ///
    /// Paths are compared after [`resolve_path`], so `..`, symlinks and a
    /// mix of relative and absolute paths cannot hide an overlap.
    pub fn check_overlap(&self) -> Result<(), BuildError> {
        let sources = [
            (&self.styles_dir, true),
            (&self.assets_dir, true),
            (&self.components_dir, true),
            (&self.template, false),
        ];

        for (source, is_dir) in sources {
            if paths_overlap(&self.output_dir, source, is_dir)? {
                return Err(BuildError::Overlap {
                    output: self.output_dir.clone(),
                    input: source.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Whether wiping `output` would touch `input`, or `output` lies inside the
/// directory `input`.
pub fn paths_overlap(output: &Path, input: &Path, input_is_dir: bool) -> Result<bool, BuildError> {
    let output = resolve_path(output).map_err(BuildError::access(output))?;
    let input = resolve_path(input).map_err(BuildError::access(input))?;

    Ok(input.starts_with(&output) || (input_is_dir && output.starts_with(&input)))
}

/// Absolute form of `path` with symlinks, `.` and `..` resolved.
///
/// The longest existing prefix is canonicalized and the missing rest is
/// re-appended, so paths that do not exist yet resolve too.
pub fn resolve_path(path: &Path) -> io::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut missing = Vec::new();
    let mut existing = absolute.as_path();

    loop {
        match std::fs::canonicalize(existing) {
            Ok(mut resolved) => {
                for component in missing.into_iter().rev() {
                    match component {
                        Component::ParentDir => {
                            resolved.pop();
                        }
                        Component::CurDir => {}
                        other => resolved.push(other),
                    }
                }
                return Ok(resolved);
            }
            Err(e) => match (existing.parent(), existing.components().next_back()) {
                (Some(parent), Some(last)) => {
                    missing.push(last);
                    existing = parent;
                }
                _ => return Err(e),
            },
        }
    }
}

/// Result of a build.
///
/// Each stage keeps its own outcome: a failed stage does not undo what the
/// others already wrote.
#[derive(Debug, Serialize)]
pub struct BuildResult {
    pub output_dir: PathBuf,
    pub destination: DestinationReport,
    pub page: Result<RenderReport, BuildError>,
    pub styles: Result<BundleReport, BuildError>,
    pub assets: Result<MirrorReport, BuildError>,

    /// Total build time in milliseconds
    pub duration_ms: u64,
}

impl BuildResult {
    /// Stage-level errors.
    pub fn stage_errors(&self) -> impl Iterator<Item = (&'static str, &BuildError)> {
        [
            ("page", self.page.as_ref().err()),
            ("styles", self.styles.as_ref().err()),
            ("assets", self.assets.as_ref().err()),
        ]
        .into_iter()
        .filter_map(|(stage, err)| err.map(|e| (stage, e)))
    }

    /// Number of failures: failed stages plus failed entries within stages.
    pub fn failure_count(&self) -> usize {
        let entry_failures = self.styles.as_ref().map_or(0, |r| r.failed().count())
            + self.assets.as_ref().map_or(0, |r| r.failed().count())
            + self.page.as_ref().map_or(0, |r| {
                r.components
                    .iter()
                    .filter(|c| matches!(c.status, ComponentStatus::Failed { .. }))
                    .count()
            });

        self.stage_errors().count() + entry_failures
    }

    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }
}

/// Static site builder.
pub struct StaticBuilder {
    config: BuildConfig,
}

impl StaticBuilder {
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Build the site into a fresh output directory.
    ///
    /// Everything previously in the output directory is deleted first. That
    /// step and the overlap check are the only errors returned here; stage
    /// failures are reported in [`BuildResult`].
    pub async fn build(&self) -> Result<BuildResult, BuildError> {
        let start = Instant::now();
        let config = &self.config;

        config.check_overlap()?;

        let destination = ensure_clean(&config.output_dir).await?;

        let page_path = config.page_path();
        let style_path = config.style_bundle_path();
        let assets_path = config.assets_output_dir();

        // The three stages write disjoint paths below the output directory.
        let (page, styles, assets) = tokio::join!(
            render_page(&config.template, &config.components_dir, &page_path),
            bundle(&config.styles_dir, &style_path),
            copy_tree(&config.assets_dir, &assets_path),
        );

        let result = BuildResult {
            output_dir: config.output_dir.clone(),
            destination,
            page,
            styles,
            assets,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        for (stage, err) in result.stage_errors() {
            tracing::error!("Stage {} failed: {}", stage, err);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::tempdir;
    use walkdir::WalkDir;

    fn write_project(root: &Path) {
        fs::create_dir_all(root.join("styles")).unwrap();
        fs::create_dir_all(root.join("components")).unwrap();
        fs::create_dir_all(root.join("assets/img")).unwrap();

        fs::write(root.join("styles/main.css"), "body { margin: 0; }").unwrap();
        fs::write(root.join("styles/notes.txt"), "ignored").unwrap();
        fs::write(root.join("components/header.html"), "<h1>Hi</h1>").unwrap();
        fs::write(root.join("template.html"), "<div>{{header}}</div>").unwrap();
        fs::write(root.join("assets/img/logo.png"), [0u8, 1, 2, 3]).unwrap();
    }

    fn tree(root: &Path) -> BTreeSet<PathBuf> {
        WalkDir::new(root)
            .min_depth(1)
            .into_iter()
            .map(|e| e.unwrap().path().strip_prefix(root).unwrap().to_path_buf())
            .collect()
    }

    #[tokio::test]
    async fn builds_simple_site() {
        let temp = tempdir().unwrap();
        write_project(temp.path());
        let config = BuildConfig::from_root(temp.path());
        let out = config.output_dir.clone();

        let result = StaticBuilder::new(config).build().await.unwrap();

        assert!(result.is_success());
        assert_eq!(
            fs::read_to_string(out.join(PAGE_OUTPUT)).unwrap(),
            "<div><h1>Hi</h1></div>"
        );
        assert_eq!(
            fs::read_to_string(out.join(STYLE_BUNDLE)).unwrap(),
            "body { margin: 0; }\n"
        );
        assert_eq!(
            fs::read(out.join("assets/img/logo.png")).unwrap(),
            vec![0u8, 1, 2, 3]
        );
    }

    #[tokio::test]
    async fn removes_stale_output() {
        let temp = tempdir().unwrap();
        write_project(temp.path());
        let config = BuildConfig::from_root(temp.path());
        let out = config.output_dir.clone();
        fs::create_dir_all(out.join("old")).unwrap();
        fs::write(out.join("old/stale.js"), "stale").unwrap();
        fs::write(out.join("bundle.css"), "stale").unwrap();

        let result = StaticBuilder::new(config).build().await.unwrap();

        assert!(result.destination.removed_existing);
        let expected: BTreeSet<PathBuf> = [
            "assets",
            "assets/img",
            "assets/img/logo.png",
            "index.html",
            "style.css",
        ]
        .into_iter()
        .map(PathBuf::from)
        .collect();
        assert_eq!(tree(&out), expected);
    }

    #[tokio::test]
    async fn keeps_other_stages_when_one_fails() {
        let temp = tempdir().unwrap();
        write_project(temp.path());
        fs::remove_file(temp.path().join("template.html")).unwrap();
        let config = BuildConfig::from_root(temp.path());
        let out = config.output_dir.clone();

        let result = StaticBuilder::new(config).build().await.unwrap();

        assert!(matches!(result.page, Err(BuildError::Read { .. })));
        assert!(result.styles.is_ok());
        assert!(result.assets.is_ok());
        assert!(!result.is_success());
        assert_eq!(result.stage_errors().count(), 1);
        assert!(out.join(STYLE_BUNDLE).is_file());
        assert!(out.join("assets/img/logo.png").is_file());
    }

    #[tokio::test]
    async fn counts_rejected_fragments_as_success() {
        let temp = tempdir().unwrap();
        write_project(temp.path());

        let result = StaticBuilder::new(BuildConfig::from_root(temp.path()))
            .build()
            .await
            .unwrap();

        let styles = result.styles.as_ref().unwrap();
        assert_eq!(styles.rejected().count(), 1);
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn refuses_output_over_sources() {
        let temp = tempdir().unwrap();
        write_project(temp.path());
        let config = BuildConfig {
            output_dir: temp.path().to_path_buf(),
            ..BuildConfig::from_root(temp.path())
        };

        let err = StaticBuilder::new(config).build().await.unwrap_err();

        assert!(matches!(err, BuildError::Overlap { .. }));
        assert!(temp.path().join("template.html").exists());
    }

    #[tokio::test]
    async fn refuses_output_reached_through_parent() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("proj");
        write_project(&root);
        let config = BuildConfig {
            output_dir: root.join("..").join("proj"),
            ..BuildConfig::from_root(&root)
        };

        let err = StaticBuilder::new(config).build().await.unwrap_err();

        assert!(matches!(err, BuildError::Overlap { .. }));
        assert!(root.join("template.html").exists());
        assert!(root.join("styles/main.css").exists());
    }

    #[test]
    fn detects_overlap_between_absolute_and_relative_paths() {
        let cwd = std::env::current_dir().unwrap();

        let absolute_root = BuildConfig {
            output_dir: cwd.clone(),
            ..BuildConfig::default()
        };
        assert!(absolute_root.check_overlap().is_err());

        let absolute_inside = BuildConfig {
            output_dir: cwd.join("assets/dist"),
            ..BuildConfig::default()
        };
        assert!(absolute_inside.check_overlap().is_err());
    }

    #[test]
    fn detects_nested_output() {
        let nested = BuildConfig {
            output_dir: PathBuf::from("./assets/dist"),
            ..BuildConfig::default()
        };
        assert!(nested.check_overlap().is_err());

        let climbing = BuildConfig {
            output_dir: PathBuf::from("dist/../styles/out"),
            ..BuildConfig::default()
        };
        assert!(climbing.check_overlap().is_err());

        assert!(BuildConfig::default().check_overlap().is_ok());

        let sibling = BuildConfig {
            output_dir: PathBuf::from("styles-dist"),
            ..BuildConfig::default()
        };
        assert!(sibling.check_overlap().is_ok());
    }

    #[test]
    fn resolves_missing_tail_below_existing_ancestor() {
        let temp = tempdir().unwrap();
        let base = fs::canonicalize(temp.path()).unwrap();

        let resolved = resolve_path(&temp.path().join("a/./b/../c")).unwrap();

        assert_eq!(resolved, base.join("a/c"));
    }

    #[test]
    fn serializes_result() {
        let result = BuildResult {
            output_dir: PathBuf::from("dist"),
            destination: DestinationReport {
                path: PathBuf::from("dist"),
                removed_existing: false,
            },
            page: Err(BuildError::Overlap {
                output: PathBuf::from("dist"),
                input: PathBuf::from("dist/template.html"),
            }),
            styles: Ok(BundleReport {
                output: PathBuf::from("dist/style.css"),
                entries: vec![],
                bytes_written: 0,
            }),
            assets: Ok(MirrorReport {
                source: PathBuf::from("assets"),
                destination: PathBuf::from("dist/assets"),
                entries: vec![],
            }),
            duration_ms: 3,
        };

        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["duration_ms"], 3);
        assert_eq!(
            json["page"]["Err"],
            "Output dist overlaps source dist/template.html"
        );
        assert_eq!(json["styles"]["Ok"]["bytes_written"], 0);
    }
}
