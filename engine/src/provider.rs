//! Collaborator traits the pipeline is driven through.
//!
//! The pipeline never talks to a container runtime, an image store or a
//! command knowledge base directly; it consumes these seams so runs and
//! tests can use isolated instances.

use async_trait::async_trait;
use layerlens_core::error::Result;

use crate::model::{DockerfilePackages, Instruction, LayerHistoryEntry, LayerRecord, Package};

/// Source of image metadata for the analysis.
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// The base image reference from the Dockerfile's FROM instruction,
    /// plus a human-readable message to surface in the report.
    async fn dockerfile_base(&self) -> Result<(String, String)>;

    /// Layer records (diff ids, packages unset) for the base image.
    async fn base_layer_records(&self, image_ref: &str) -> Result<Vec<LayerRecord>>;

    /// Shell to use for command resolution inside the image.
    async fn image_shell(&self, image_ref: &str) -> Result<String>;

    /// Tag under which the Dockerfile's image was built.
    fn image_tag(&self) -> String;

    /// Ordered layer history of the built image, oldest first.
    async fn layer_history(&self, tag: &str) -> Result<Vec<LayerHistoryEntry>>;

    /// Whether the image build succeeded, with the failure message
    /// otherwise.
    async fn build_status(&self) -> (bool, String);
}

/// External command knowledge: maps build commands to the packages they
/// install and enriches package names with version/license/source-url.
#[async_trait]
pub trait CommandLibrary: Send + Sync {
    /// Candidate package names believed to be installed by `instruction`.
    ///
    /// Fallible-by-absence: returns an empty set, not an error, when no
    /// rule matches.
    async fn resolve_packages(&self, instruction: &Instruction, shell: &str)
        -> Result<Vec<String>>;

    /// Fill in version/license/source-url for each candidate name.
    async fn enrich_packages(&self, names: &[String], shell: &str) -> Result<Vec<Package>>;

    /// Package listings known for a base image, used when the cache has
    /// no record for its layers.
    async fn base_image_packages(&self, image_ref: &str, shell: &str) -> Result<Vec<Package>>;

    /// Classify Dockerfile RUN commands without any extraction, for the
    /// build-failure fallback path.
    fn dockerfile_packages(&self, instructions: &[Instruction]) -> DockerfilePackages;
}

/// Scoped container lifecycle around the run-resolution phase.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Start a container from the built image.
    async fn start_container(&self, tag: &str) -> Result<()>;

    /// Tear down the container started by `start_container`.
    async fn remove_container(&self) -> Result<()>;

    /// Remove the built image.
    async fn remove_image(&self, tag: &str) -> Result<()>;
}
