//! Package confirmation for a single aligned instruction.
//!
//! Obtains candidate package names from the command knowledge collaborator
//! and enriches them into full records. Both external calls are bounded by
//! a timeout; an elapsed timeout or a collaborator error degrades to "no
//! packages found" and never aborts the run.

use std::time::Duration;

use crate::model::{Instruction, LayerRecord};
use crate::provider::CommandLibrary;

/// Outcome of resolving one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Packages were recovered for the layer.
    Record(LayerRecord),
    /// Nothing could be recovered. Reportable, not an error.
    NoPackages { layer_id: String },
}

/// Resolves instructions into per-layer package records.
pub struct PackageConfirmationEngine<'a> {
    library: &'a dyn CommandLibrary,
    timeout: Duration,
}

impl<'a> PackageConfirmationEngine<'a> {
    pub fn new(library: &'a dyn CommandLibrary, timeout: Duration) -> Self {
        Self { library, timeout }
    }

    /// Resolve the packages installed by `instruction` into a record for
    /// `layer_id`.
    pub async fn resolve(
        &self,
        instruction: &Instruction,
        layer_id: &str,
        shell: &str,
    ) -> Resolution {
        let names = match tokio::time::timeout(
            self.timeout,
            self.library.resolve_packages(instruction, shell),
        )
        .await
        {
            Ok(Ok(names)) => names,
            Ok(Err(e)) => {
                tracing::warn!(layer = layer_id, error = %e, "command lookup failed");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(layer = layer_id, "command lookup timed out");
                Vec::new()
            }
        };

        if names.is_empty() {
            return Resolution::NoPackages {
                layer_id: layer_id.to_string(),
            };
        }

        let packages = match tokio::time::timeout(
            self.timeout,
            self.library.enrich_packages(&names, shell),
        )
        .await
        {
            Ok(Ok(packages)) => packages,
            Ok(Err(e)) => {
                tracing::warn!(layer = layer_id, error = %e, "package enrichment failed");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(layer = layer_id, "package enrichment timed out");
                Vec::new()
            }
        };

        if packages.is_empty() {
            return Resolution::NoPackages {
                layer_id: layer_id.to_string(),
            };
        }

        Resolution::Record(LayerRecord {
            layer_id: layer_id.to_string(),
            packages,
        })
    }
}
