//! Create a sample project.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::CONFIG_FILENAME;

/// Files written by `init`, relative to the current directory.
const SCAFFOLD: &[(&str, &str)] = &[
    (CONFIG_FILENAME, DEFAULT_CONFIG),
    ("template.html", DEFAULT_TEMPLATE),
    ("components/header.html", DEFAULT_HEADER),
    ("components/articles.html", DEFAULT_ARTICLES),
    ("components/footer.html", DEFAULT_FOOTER),
    ("styles/01-base.css", DEFAULT_BASE_CSS),
    ("styles/02-layout.css", DEFAULT_LAYOUT_CSS),
    ("assets/img/.gitkeep", ""),
];

/// Run the init command.
pub async fn run(yes: bool) -> Result<()> {
    tracing::info!("Initializing pagewright project...");

    scaffold(Path::new("."), yes)?;

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'pagewright build' to build the page.");

    Ok(())
}

/// Write the sample files below `root`, keeping existing ones unless `overwrite`.
fn scaffold(root: &Path, overwrite: bool) -> Result<usize> {
    let mut written = 0;

    for (relative, content) in SCAFFOLD {
        let path = root.join(relative);

        if path.exists() && !overwrite {
            tracing::warn!("{} already exists. Use --yes to overwrite.", relative);
            continue;
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        fs::write(&path, content).with_context(|| format!("Failed to write {}", relative))?;
        tracing::info!("Created {}", relative);
        written += 1;
    }

    Ok(written)
}

const DEFAULT_CONFIG: &str = r#"# Pagewright Configuration

[paths]
# Directory the paths below are relative to
root = "."

# Stylesheet fragments, bundled in directory order into style.css
styles = "styles"

# Static files, copied as is into <output>/assets
assets = "assets"

# One file per {{placeholder}}, named after the placeholder
components = "components"

# Page template
template = "template.html"

# Output directory (deleted and recreated on every build)
output = "project-dist"
"#;

const DEFAULT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>My Page</title>
  <link rel="stylesheet" href="style.css">
</head>
<body>
  {{header}}
  <main>
    {{articles}}
  </main>
  {{footer}}
</body>
</html>
"#;

const DEFAULT_HEADER: &str = r#"<header class="header">
  <h1>My Page</h1>
</header>"#;

const DEFAULT_ARTICLES: &str = r#"<article class="article">
  <h2>Hello</h2>
  <p>Edit components/articles.html to change this text.</p>
</article>"#;

const DEFAULT_FOOTER: &str = r#"<footer class="footer">
  <p>Built with pagewright</p>
</footer>"#;

const DEFAULT_BASE_CSS: &str = r#"* {
  box-sizing: border-box;
  margin: 0;
  padding: 0;
}

body {
  font-family: system-ui, -apple-system, sans-serif;
  line-height: 1.6;
}"#;

const DEFAULT_LAYOUT_CSS: &str = r#".header,
.footer {
  padding: 1.5rem 2rem;
}

main {
  max-width: 800px;
  margin: 0 auto;
  padding: 2rem;
}"#;
