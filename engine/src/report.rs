//! Report composition.
//!
//! Both rendering modes are pure functions of accumulated structured
//! state: sections are collected during traversal and turned into text in
//! a single final pass. Rendering never fails — missing package fields
//! render as empty strings.

use std::path::Path;

use layerlens_core::error::{LensError, Result};

use crate::model::{ClassificationState, Package};
use crate::notes::{build_failure_note, no_packages_note, UNATTRIBUTED_LAYER};

const CONFIRMED_HEADER: &str = "Confirmed sources:\n";
const UNCONFIRMED_HEADER: &str = "Unconfirmed sources:\n";
const UNRECOGNIZED_HEADER: &str = "Unrecognized packages:\n";
const NOTES_HEADER: &str = "NOTES:\n";

const DOCKERFILE_BASE_HEADER: &str = "Dockerfile base image:\n";
const BASE_LAYERS_HEADER: &str = "Base image layers:\n";
const CURRENT_IMAGE_HEADER: &str = "Packages from current image:\n";
const CACHE_RECORD_LINE: &str = "A record for this layer exists in the cache:\n";

const INVOKING_FROM_LIBRARY: &str = "\nChecking the command library for known package listings for this layer. Some\nof the results are shell snippets that will be invoked.\n";

const CHECKING_RUN_COMMANDS: &str =
    "\nChecking the command library for listings matching the Dockerfile RUN commands.\n";

const PARSED_PACKAGES_HEADER: &str = "Packages from parsing Dockerfile RUN commands:\n";
const UNRECOGNIZED_RUNS_HEADER: &str = "Unrecognized RUN commands in Dockerfile:\n";

/// How a base-image layer was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerPath {
    /// The cache already held a record for the layer.
    CacheHit {
        packages: Vec<Package>,
        notes: Vec<String>,
    },
    /// The command library was consulted; an empty package list means
    /// nothing could be recovered.
    Library {
        packages: Vec<Package>,
        notes: Vec<String>,
    },
}

/// Outcome of resolving one aligned RUN instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Resolved {
        from_cache: bool,
        packages: Vec<Package>,
        notes: Vec<String>,
    },
    NoPackages {
        layer_id: String,
    },
    /// No history entry matched the instruction.
    Unattributed,
}

/// One structural piece of the long-form report, in traversal order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section {
    DockerfileBase {
        description: String,
        message: String,
    },
    BaseLayersHeading,
    BaseLayer {
        layer_id: String,
        path: LayerPath,
    },
    CurrentImageHeading,
    Run {
        instruction: String,
        outcome: RunOutcome,
    },
    BuildFallback {
        build_fail_msg: String,
        recognized: Vec<String>,
        unrecognized: Vec<String>,
    },
}

/// Accumulator for the long-form narrative report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LongformReport {
    sections: Vec<Section>,
}

impl LongformReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, section: Section) {
        self.sections.push(section);
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Render all accumulated sections. Pure: identical section lists
    /// yield byte-identical text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            match section {
                Section::DockerfileBase {
                    description,
                    message,
                } => {
                    out.push_str(DOCKERFILE_BASE_HEADER);
                    out.push_str(description);
                    out.push('\n');
                    if !message.is_empty() {
                        out.push_str(message);
                        out.push('\n');
                    }
                }
                Section::BaseLayersHeading => out.push_str(BASE_LAYERS_HEADER),
                Section::BaseLayer { layer_id, path } => {
                    out.push_str(&truncate_layer_id(layer_id));
                    out.push_str(":\n");
                    match path {
                        LayerPath::CacheHit { packages, notes } => {
                            out.push_str(CACHE_RECORD_LINE);
                            render_packages_longform(&mut out, packages);
                            render_notes(&mut out, notes);
                        }
                        LayerPath::Library { packages, notes } => {
                            out.push_str(INVOKING_FROM_LIBRARY);
                            if packages.is_empty() {
                                out.push_str(&no_packages_note(layer_id));
                                out.push('\n');
                            } else {
                                render_packages_longform(&mut out, packages);
                                render_notes(&mut out, notes);
                            }
                        }
                    }
                }
                Section::CurrentImageHeading => out.push_str(CURRENT_IMAGE_HEADER),
                Section::Run {
                    instruction,
                    outcome,
                } => {
                    out.push_str(instruction);
                    out.push('\n');
                    match outcome {
                        RunOutcome::Resolved {
                            from_cache,
                            packages,
                            notes,
                        } => {
                            if *from_cache {
                                out.push_str(CACHE_RECORD_LINE);
                            }
                            render_packages_longform(&mut out, packages);
                            render_notes(&mut out, notes);
                        }
                        RunOutcome::NoPackages { layer_id } => {
                            out.push_str(&no_packages_note(layer_id));
                            out.push('\n');
                        }
                        RunOutcome::Unattributed => {
                            out.push_str(&no_packages_note(UNATTRIBUTED_LAYER));
                            out.push('\n');
                        }
                    }
                }
                Section::BuildFallback {
                    build_fail_msg,
                    recognized,
                    unrecognized,
                } => {
                    out.push_str(&build_failure_note(build_fail_msg));
                    out.push('\n');
                    out.push_str(CHECKING_RUN_COMMANDS);
                    out.push_str(PARSED_PACKAGES_HEADER);
                    for name in recognized {
                        out.push(' ');
                        out.push_str(name);
                    }
                    out.push('\n');
                    out.push_str(UNRECOGNIZED_RUNS_HEADER);
                    for command in unrecognized {
                        out.push_str(command);
                        out.push('\n');
                    }
                }
            }
        }
        out
    }
}

/// Render the condensed summary report from the final classification
/// state. Pure and deterministic.
pub fn render_summary(state: &ClassificationState) -> String {
    let mut out = String::new();

    out.push_str(CONFIRMED_HEADER);
    for package in state.confirmed() {
        out.push('\t');
        out.push_str(&package.name);
        out.push('\n');
        push_field(&mut out, "url", package.source_url.as_deref());
        push_field(&mut out, "version", package.version.as_deref());
        push_field(&mut out, "license", package.license.as_deref());
    }

    out.push_str(UNCONFIRMED_HEADER);
    if !state.unconfirmed().is_empty() {
        out.push_str(&state.unconfirmed().join(" "));
        out.push('\n');
    }

    out.push_str(UNRECOGNIZED_HEADER);
    for command in state.unrecognized() {
        out.push('\t');
        out.push_str(command);
        out.push('\n');
    }

    out.push('\n');
    out.push_str(NOTES_HEADER);
    render_notes(&mut out, state.notes());

    out
}

/// Write the report artifact.
pub fn write_report(path: &Path, report: &str) -> Result<()> {
    std::fs::write(path, report).map_err(|e| {
        LensError::ReportError(format!("failed to write {}: {}", path.display(), e))
    })?;
    tracing::info!(path = %path.display(), "report written");
    Ok(())
}

/// Long-form package listing: name, then version / license / url.
fn render_packages_longform(out: &mut String, packages: &[Package]) {
    for package in packages {
        out.push('\t');
        out.push_str(&package.name);
        out.push('\n');
        push_field(out, "version", package.version.as_deref());
        push_field(out, "license", package.license.as_deref());
        push_field(out, "url", package.source_url.as_deref());
    }
}

/// `\t\t<label>: <value>` with an empty string for a missing value.
fn push_field(out: &mut String, label: &str, value: Option<&str>) {
    out.push_str("\t\t");
    out.push_str(label);
    out.push_str(": ");
    out.push_str(value.unwrap_or(""));
    out.push('\n');
}

fn render_notes(out: &mut String, notes: &[String]) {
    for note in notes {
        out.push_str(note);
        out.push('\n');
    }
}

/// Layer identifiers are shown truncated to 10 characters.
fn truncate_layer_id(layer_id: &str) -> String {
    layer_id.chars().take(10).collect()
}
