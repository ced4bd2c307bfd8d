//! Text reports for build results.

use std::fmt::Write;

use pagewright_static::assets::AssetStatus;
use pagewright_static::components::ComponentStatus;
use pagewright_static::styles::FragmentStatus;
use pagewright_static::{
    BuildError, BuildResult, BundleReport, DestinationReport, MirrorReport, RenderReport,
};

// Writing into a String cannot fail, hence the ignored `writeln!` results.

pub fn format_build(result: &BuildResult) -> String {
    let mut out = String::new();

    out.push_str(&format_destination(&result.destination));
    out.push_str(&stage("page", &result.page, format_page));
    out.push_str(&stage("styles", &result.styles, format_bundle));
    out.push_str(&stage("assets", &result.assets, format_mirror));

    let failures = result.failure_count();
    if failures == 0 {
        let _ = writeln!(out, "Build finished in {}ms", result.duration_ms);
    } else {
        let _ = writeln!(
            out,
            "Build finished in {}ms with {} failure{}",
            result.duration_ms,
            failures,
            if failures == 1 { "" } else { "s" }
        );
    }

    out
}

fn stage<T>(name: &str, result: &Result<T, BuildError>, format: fn(&T) -> String) -> String {
    match result {
        Ok(report) => format(report),
        Err(e) => format!("{:<8} FAILED  {}\n", name, e),
    }
}

pub fn format_destination(report: &DestinationReport) -> String {
    if report.removed_existing {
        format!(
            "{:<8} {} (previous contents removed)\n",
            "output",
            report.path.display()
        )
    } else {
        format!("{:<8} {} (created)\n", "output", report.path.display())
    }
}

pub fn format_page(report: &RenderReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<8} {} from {} ({} components substituted)",
        "page",
        report.output.display(),
        report.template.display(),
        report.substituted.len()
    );

    for entry in &report.components {
        match &entry.status {
            ComponentStatus::Loaded { .. } => {}
            ComponentStatus::Skipped => {
                let _ = writeln!(out, "  skipped    {} (not a file)", entry.file);
            }
            ComponentStatus::Duplicate { name } => {
                let _ = writeln!(
                    out,
                    "  duplicate  {} (name '{}' already taken)",
                    entry.file, name
                );
            }
            ComponentStatus::Failed { error } => {
                let _ = writeln!(out, "  failed     {}: {}", entry.file, error);
            }
        }
    }

    for name in &report.unresolved {
        let _ = writeln!(out, "  unresolved {{{{{}}}}} left as is", name);
    }

    out
}

pub fn format_bundle(report: &BundleReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<8} {} ({} of {} entries, {} bytes)",
        "styles",
        report.output.display(),
        report.accepted().count(),
        report.entries.len(),
        report.bytes_written
    );

    for entry in &report.entries {
        match &entry.status {
            FragmentStatus::Accepted { .. } => {
                let _ = writeln!(out, "  added      {}", entry.name);
            }
            FragmentStatus::Rejected { reason } => {
                let _ = writeln!(out, "  rejected   {} ({})", entry.name, reason);
            }
            FragmentStatus::Failed { error } => {
                let _ = writeln!(out, "  failed     {}: {}", entry.name, error);
            }
        }
    }

    out
}

pub fn format_mirror(report: &MirrorReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<8} {} ({} files, {} directories)",
        "assets",
        report.destination.display(),
        report.files_copied(),
        report.directories_created()
    );

    for entry in &report.entries {
        match &entry.status {
            AssetStatus::Skipped => {
                let _ = writeln!(out, "  skipped    {} (linked directory)", entry.path.display());
            }
            AssetStatus::Failed { error } => {
                let _ = writeln!(out, "  failed     {}: {}", entry.path.display(), error);
            }
            AssetStatus::Copied { .. } | AssetStatus::Created => {}
        }
    }

    out
}
