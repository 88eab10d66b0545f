//! Data model for the layer-resolution and package-confirmation pipeline.
//!
//! Internally, missing package fields are `None`. The legacy sentinel
//! encoding (empty string for license/source-url, numeric zero for
//! version) only exists at the serialization boundary, see [`RawPackage`].

use serde::{Deserialize, Serialize};

/// A single Dockerfile build instruction.
///
/// Immutable once parsed; order within a Dockerfile is significant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Instruction keyword, uppercased (e.g. "RUN", "FROM").
    pub kind: String,
    /// Everything after the keyword, continuations joined.
    pub argument: String,
    /// Physical line the instruction starts on (1-based).
    pub source_line: usize,
}

impl Instruction {
    pub fn new(kind: &str, argument: &str, source_line: usize) -> Self {
        Self {
            kind: kind.to_uppercase(),
            argument: argument.to_string(),
            source_line,
        }
    }

    /// Whether this instruction creates a filesystem layer we attribute
    /// packages to.
    pub fn is_run(&self) -> bool {
        self.kind == "RUN"
    }

    /// The instruction as it appeared in the Dockerfile.
    pub fn text(&self) -> String {
        format!("{} {}", self.kind, self.argument)
    }
}

/// One entry of an image's build history, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerHistoryEntry {
    /// The command string recorded as having produced the layer.
    pub created_by: String,
    /// Diff identifier (content hash) of the layer.
    pub layer_id: String,
}

/// A software package attributed to a layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    pub version: Option<String>,
    pub license: Option<String>,
    pub source_url: Option<String>,
}

impl Package {
    /// A package known only by name.
    pub fn bare(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: None,
            license: None,
            source_url: None,
        }
    }

    /// A package is complete iff version, license and source url are all
    /// present.
    pub fn is_complete(&self) -> bool {
        self.version.is_some() && self.license.is_some() && self.source_url.is_some()
    }
}

/// Serialized form of [`Package`] preserving the legacy sentinels:
/// empty string for a missing license/source-url, `"0.0"` for a missing
/// version. Used for the cache file; the report renderer applies its own
/// (empty string) placeholders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPackage {
    pub name: String,
    pub version: String,
    pub license: String,
    pub src_url: String,
}

impl From<&Package> for RawPackage {
    fn from(pkg: &Package) -> Self {
        Self {
            name: pkg.name.clone(),
            version: pkg.version.clone().unwrap_or_else(|| "0.0".to_string()),
            license: pkg.license.clone().unwrap_or_default(),
            src_url: pkg.source_url.clone().unwrap_or_default(),
        }
    }
}

impl From<RawPackage> for Package {
    fn from(raw: RawPackage) -> Self {
        Self {
            name: raw.name,
            version: version_from_sentinel(&raw.version),
            license: text_from_sentinel(&raw.license),
            source_url: text_from_sentinel(&raw.src_url),
        }
    }
}

/// `""`, `"0"` and `"0.0"` all mean "no version known".
fn version_from_sentinel(s: &str) -> Option<String> {
    match s {
        "" | "0" | "0.0" => None,
        other => Some(other.to_string()),
    }
}

/// Empty string means "value unknown", not "value is empty".
fn text_from_sentinel(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// The packages resolved for one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerRecord {
    pub layer_id: String,
    pub packages: Vec<Package>,
}

impl LayerRecord {
    pub fn new(layer_id: &str) -> Self {
        Self {
            layer_id: layer_id.to_string(),
            packages: Vec::new(),
        }
    }
}

/// Packages parsed straight out of a Dockerfile, without extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DockerfilePackages {
    /// Package names recognized by the command knowledge rules.
    pub recognized: Vec<String>,
    /// RUN commands no rule could map to a package.
    pub unrecognized: Vec<String>,
}

/// The classification accumulator threaded through a run.
///
/// Mutated by exactly one writer at a time; created empty at run start
/// and discarded after the report is rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationState {
    confirmed: Vec<Package>,
    unconfirmed: Vec<String>,
    unrecognized: Vec<String>,
    notes: Vec<String>,
}

impl ClassificationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a resolved package. Packages without a name are dropped;
    /// a previously unconfirmed entry of the same name is upgraded.
    pub fn add_confirmed(&mut self, package: Package) {
        if package.name.is_empty() {
            tracing::warn!("dropping resolved package with empty name");
            return;
        }
        self.unconfirmed.retain(|n| n != &package.name);
        self.confirmed.push(package);
    }

    /// Record a name recognized without package details. Skipped when the
    /// same name is already confirmed.
    pub fn add_unconfirmed(&mut self, name: &str) {
        if name.is_empty() || self.confirmed.iter().any(|p| p.name == name) {
            return;
        }
        if !self.unconfirmed.iter().any(|n| n == name) {
            self.unconfirmed.push(name.to_string());
        }
    }

    /// Record a build command that mapped to no package at all.
    pub fn add_unrecognized(&mut self, command: &str) {
        self.unrecognized.push(command.to_string());
    }

    /// Append a note; identical notes are recorded only once per run.
    pub fn push_note(&mut self, note: String) {
        if !self.notes.contains(&note) {
            self.notes.push(note);
        }
    }

    pub fn confirmed(&self) -> &[Package] {
        &self.confirmed
    }

    pub fn unconfirmed(&self) -> &[String] {
        &self.unconfirmed
    }

    pub fn unrecognized(&self) -> &[String] {
        &self.unrecognized
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }
}
