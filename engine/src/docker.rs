//! Docker CLI adapter.
//!
//! Implements the image-source and container-runtime seams by shelling
//! out to the `docker` binary. Container runtime semantics stay in the
//! external tool; this module only invokes it and parses its output.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use layerlens_core::error::{LensError, Result};
use tokio::process::Command;
use uuid::Uuid;

use crate::dockerfile;
use crate::model::{Instruction, LayerHistoryEntry, LayerRecord};
use crate::provider::{ContainerRuntime, ImageSource};
use crate::rules;

/// Image and container collaborator backed by the `docker` CLI.
pub struct DockerCli {
    instructions: Vec<Instruction>,
    dockerfile_path: PathBuf,
    context_dir: PathBuf,
    tag: String,
    container_name: String,
    build_result: tokio::sync::Mutex<Option<(bool, String)>>,
}

impl DockerCli {
    pub fn new(instructions: Vec<Instruction>, dockerfile_path: &Path, tag: &str) -> Self {
        let context_dir = dockerfile_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        Self {
            instructions,
            dockerfile_path: dockerfile_path.to_path_buf(),
            context_dir,
            tag: tag.to_string(),
            container_name: format!("layerlens-{}", Uuid::new_v4().simple()),
            build_result: tokio::sync::Mutex::new(None),
        }
    }

    /// Run `docker` with the given arguments and return its stdout.
    async fn docker(args: &[&str]) -> Result<String> {
        tracing::debug!(?args, "invoking docker");
        let output = Command::new("docker").args(args).output().await.map_err(|e| {
            LensError::RuntimeError(format!("failed to invoke docker: {}", e))
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LensError::RuntimeError(format!(
                "docker {} failed: {}",
                args.first().unwrap_or(&""),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Diff ids (content hashes) of an image's layers, oldest first.
    async fn diff_ids(&self, image: &str) -> Result<Vec<String>> {
        let out = Self::docker(&["inspect", "--format", "{{json .RootFS.Layers}}", image])
            .await
            .map_err(|e| LensError::ImageError(format!("inspect {}: {}", image, e)))?;
        let ids: Vec<String> = serde_json::from_str(out.trim())
            .map_err(|e| LensError::ImageError(format!("unexpected inspect output: {}", e)))?;
        Ok(ids)
    }
}

#[async_trait]
impl ImageSource for DockerCli {
    async fn dockerfile_base(&self) -> Result<(String, String)> {
        dockerfile::base_image(&self.instructions)
    }

    async fn base_layer_records(&self, image_ref: &str) -> Result<Vec<LayerRecord>> {
        let ids = match self.diff_ids(image_ref).await {
            Ok(ids) => ids,
            Err(_) => {
                // image not present locally yet
                Self::docker(&["pull", image_ref])
                    .await
                    .map_err(|e| LensError::ImageError(format!("pull {}: {}", image_ref, e)))?;
                self.diff_ids(image_ref).await?
            }
        };
        Ok(ids.iter().map(|id| LayerRecord::new(id)).collect())
    }

    async fn image_shell(&self, image_ref: &str) -> Result<String> {
        Ok(rules::shell_for_base(image_ref).to_string())
    }

    fn image_tag(&self) -> String {
        self.tag.clone()
    }

    async fn layer_history(&self, tag: &str) -> Result<Vec<LayerHistoryEntry>> {
        let out = Self::docker(&[
            "history",
            "--no-trunc",
            "--format",
            "{{.CreatedBy}}\t{{.Size}}",
            tag,
        ])
        .await
        .map_err(|e| LensError::ImageError(format!("history {}: {}", tag, e)))?;

        // `docker history` prints newest first; layer order is oldest
        // first everywhere else.
        let mut entries: Vec<(String, bool)> = out.lines().filter_map(parse_history_line).collect();
        entries.reverse();

        let diff_ids = self.diff_ids(tag).await?;
        Ok(pair_history(entries, diff_ids))
    }

    async fn build_status(&self) -> (bool, String) {
        let mut cached = self.build_result.lock().await;
        if let Some(result) = cached.as_ref() {
            return result.clone();
        }

        tracing::info!(tag = %self.tag, dockerfile = %self.dockerfile_path.display(), "building image");
        let result = match Command::new("docker")
            .arg("build")
            .arg("-t")
            .arg(&self.tag)
            .arg("-f")
            .arg(&self.dockerfile_path)
            .arg(&self.context_dir)
            .output()
            .await
        {
            Ok(output) if output.status.success() => (true, String::new()),
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                (false, last_lines(stderr.trim(), 3))
            }
            Err(e) => (false, format!("failed to invoke docker build: {}", e)),
        };

        *cached = Some(result.clone());
        result
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn start_container(&self, tag: &str) -> Result<()> {
        Self::docker(&["run", "-td", "--name", &self.container_name, tag]).await?;
        tracing::debug!(container = %self.container_name, "analysis container started");
        Ok(())
    }

    async fn remove_container(&self) -> Result<()> {
        Self::docker(&["rm", "-f", &self.container_name]).await?;
        Ok(())
    }

    async fn remove_image(&self, tag: &str) -> Result<()> {
        Self::docker(&["rmi", tag]).await?;
        Ok(())
    }
}

/// Split a `CreatedBy\tSize` history line into the command and whether
/// the entry carries a filesystem layer.
fn parse_history_line(line: &str) -> Option<(String, bool)> {
    let (created_by, size) = line.rsplit_once('\t')?;
    Some((created_by.to_string(), size.trim() != "0B"))
}

/// Assign diff ids to the history entries that carry a layer, in order.
/// Entries without a layer (and trailing entries once ids run out) are
/// dropped: only attributable layers take part in alignment.
fn pair_history(entries: Vec<(String, bool)>, diff_ids: Vec<String>) -> Vec<LayerHistoryEntry> {
    let mut ids = diff_ids.into_iter();
    let mut history = Vec::new();
    for (created_by, has_layer) in entries {
        if !has_layer {
            continue;
        }
        match ids.next() {
            Some(layer_id) => history.push(LayerHistoryEntry {
                created_by,
                layer_id,
            }),
            None => break,
        }
    }
    history
}

/// The last `n` lines of `text`, for compact failure messages.
fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}
