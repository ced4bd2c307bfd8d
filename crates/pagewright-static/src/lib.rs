//! Static page builder.
//!
//! Turns a source tree of stylesheet fragments, HTML component fragments, a
//! page template and a static asset tree into a deployable output directory:
//!
//! ```text
//! styles/*.css       ->  <output>/style.css
//! components/* + template.html  ->  <output>/index.html
//! assets/**          ->  <output>/assets/**
//! ```

pub mod assets;
pub mod builder;
pub mod components;
pub mod destination;
pub mod error;
mod read_ahead;
pub mod styles;

pub use assets::{copy_tree, MirrorReport};
pub use builder::{BuildConfig, BuildResult, StaticBuilder};
pub use components::{render, ComponentSet, RenderReport};
pub use destination::{ensure_clean, DestinationReport};
pub use error::BuildError;
pub use styles::{bundle, bundle_styles, BundleReport};
