//! Analysis orchestration.
//!
//! Sequences base-layer resolution, the cache checkpoint, the
//! build-dependent run-layer resolution (with guaranteed container
//! teardown) and report composition. Missing package data never aborts a
//! run; structural failures surface to the caller after a partial report
//! has been composed from whatever state was accumulated.

use layerlens_core::error::Result;
use layerlens_core::AnalysisConfig;
use parking_lot::Mutex;

use crate::align::align;
use crate::cache::LayerCache;
use crate::confirm::{PackageConfirmationEngine, Resolution};
use crate::model::{ClassificationState, Instruction, Package};
use crate::notes::{
    build_failure_note, missing_field_notes, no_packages_note, UNATTRIBUTED_LAYER,
};
use crate::provider::{CommandLibrary, ContainerRuntime, ImageSource};
use crate::report::{self, LayerPath, LongformReport, RunOutcome, Section};

/// Which rendering the run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    /// Per-layer narrative report.
    Longform,
    /// Aggregated summary report.
    Summary,
}

/// Per-run state: the loaded instructions and the layer cache.
///
/// An explicit context rather than process-wide state, so multiple runs
/// and tests use isolated instances. The cache has a single writer per
/// run; the mutex keeps that explicit and leaves room for per-layer
/// serialization if resolution is ever parallelized.
pub struct AnalysisContext {
    instructions: Vec<Instruction>,
    cache: Mutex<LayerCache>,
}

impl AnalysisContext {
    pub fn new(instructions: Vec<Instruction>, cache: LayerCache) -> Self {
        Self {
            instructions,
            cache: Mutex::new(cache),
        }
    }

    /// Load the cache configured in `config` and wrap it with the given
    /// instructions.
    pub fn load(config: &AnalysisConfig, instructions: Vec<Instruction>) -> Result<Self> {
        let cache = LayerCache::load(&config.cache_file)?;
        Ok(Self::new(instructions, cache))
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn cache(&self) -> &Mutex<LayerCache> {
        &self.cache
    }
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The rendered report text, as written to the report artifact.
    pub text: String,
    /// The final classification state.
    pub state: ClassificationState,
}

/// Drives one analysis run against the collaborator seams.
pub struct Analyzer<'a> {
    config: &'a AnalysisConfig,
    image: &'a dyn ImageSource,
    library: &'a dyn CommandLibrary,
    runtime: &'a dyn ContainerRuntime,
}

impl<'a> Analyzer<'a> {
    pub fn new(
        config: &'a AnalysisConfig,
        image: &'a dyn ImageSource,
        library: &'a dyn CommandLibrary,
        runtime: &'a dyn ContainerRuntime,
    ) -> Self {
        Self {
            config,
            image,
            library,
            runtime,
        }
    }

    /// Produce the long-form narrative report. Default execution route.
    pub async fn execute(&self, ctx: &AnalysisContext) -> Result<RunReport> {
        self.run(ctx, ReportMode::Longform).await
    }

    /// Produce the condensed summary report.
    pub async fn execute_summary(&self, ctx: &AnalysisContext) -> Result<RunReport> {
        self.run(ctx, ReportMode::Summary).await
    }

    async fn run(&self, ctx: &AnalysisContext, mode: ReportMode) -> Result<RunReport> {
        let mut narrative = LongformReport::new();
        let mut state = ClassificationState::new();

        let outcome = self.drive(ctx, mode, &mut narrative, &mut state).await;

        // Compose and write the report even after a structural failure:
        // whatever state was accumulated still yields a partial report.
        let text = match mode {
            ReportMode::Longform => narrative.render(),
            ReportMode::Summary => report::render_summary(&state),
        };
        let written = report::write_report(&self.config.report_file, &text);

        match outcome {
            Ok(()) => {
                written?;
                Ok(RunReport { text, state })
            }
            Err(e) => {
                if let Err(write_err) = written {
                    tracing::error!(error = %write_err, "failed to write partial report");
                }
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        ctx: &AnalysisContext,
        mode: ReportMode,
        narrative: &mut LongformReport,
        state: &mut ClassificationState,
    ) -> Result<()> {
        let longform = mode == ReportMode::Longform;

        let (base_ref, base_msg) = self.image.dockerfile_base().await?;
        tracing::info!(base = %base_ref, "resolving base image layers");

        if longform {
            let description = ctx
                .instructions
                .iter()
                .find(|i| i.kind == "FROM")
                .map(|i| i.text())
                .unwrap_or_else(|| format!("FROM {}", base_ref));
            narrative.push(Section::DockerfileBase {
                description,
                message: base_msg.clone(),
            });
        } else if !base_msg.is_empty() {
            state.push_note(base_msg.clone());
        }

        let shell = match self.image.image_shell(&base_ref).await {
            Ok(shell) => shell,
            Err(e) => {
                tracing::warn!(error = %e, "could not determine image shell, assuming /bin/sh");
                "/bin/sh".to_string()
            }
        };

        let base_records = self.image.base_layer_records(&base_ref).await?;
        let base_layer_count = base_records.len();

        if longform {
            narrative.push(Section::BaseLayersHeading);
        }

        for record in &base_records {
            let cached = {
                let cache = ctx.cache.lock();
                cache
                    .get(&record.layer_id)
                    .map(|p| p.to_vec())
                    .or_else(|| (!record.packages.is_empty()).then(|| record.packages.clone()))
            };

            match cached {
                Some(packages) => {
                    tracing::info!(layer = %record.layer_id, "Adding packages from cache");
                    let notes = confirm_packages(state, &packages);
                    if longform {
                        narrative.push(Section::BaseLayer {
                            layer_id: record.layer_id.clone(),
                            path: LayerPath::CacheHit { packages, notes },
                        });
                    }
                }
                None => {
                    tracing::info!(
                        layer = %record.layer_id,
                        "Nothing in cache. Invoking from command library"
                    );
                    let packages = self.base_packages(&base_ref, &shell).await;
                    if packages.is_empty() {
                        state.push_note(no_packages_note(&record.layer_id));
                        if longform {
                            narrative.push(Section::BaseLayer {
                                layer_id: record.layer_id.clone(),
                                path: LayerPath::Library {
                                    packages: Vec::new(),
                                    notes: Vec::new(),
                                },
                            });
                        }
                    } else {
                        ctx.cache.lock().put(&record.layer_id, packages.clone());
                        let notes = confirm_packages(state, &packages);
                        if longform {
                            narrative.push(Section::BaseLayer {
                                layer_id: record.layer_id.clone(),
                                path: LayerPath::Library { packages, notes },
                            });
                        }
                    }
                }
            }
        }

        ctx.cache.lock().save()?;

        if longform {
            narrative.push(Section::CurrentImageHeading);
        }

        let (build_ok, build_msg) = self.image.build_status().await;
        if build_ok {
            let tag = self.image.image_tag();
            let resolved = self
                .resolve_run_layers(ctx, &tag, &shell, base_layer_count, longform, narrative, state)
                .await;

            // Teardown on every exit path out of the build-dependent
            // branch, including mid-resolution failures.
            if let Err(e) = self.runtime.remove_container().await {
                tracing::warn!(error = %e, "container removal failed");
            }
            if let Err(e) = self.runtime.remove_image(&tag).await {
                tracing::warn!(error = %e, "image removal failed");
            }

            resolved?;
            ctx.cache.lock().save()?;
        } else {
            tracing::warn!(message = %build_msg, "image build failed, falling back to Dockerfile parsing");
            state.push_note(build_failure_note(&build_msg));

            let parsed = self.library.dockerfile_packages(&ctx.instructions);
            for name in &parsed.recognized {
                state.add_unconfirmed(name);
            }
            for command in &parsed.unrecognized {
                state.add_unrecognized(command);
            }

            if longform {
                narrative.push(Section::BuildFallback {
                    build_fail_msg: build_msg,
                    recognized: parsed.recognized,
                    unrecognized: parsed.unrecognized,
                });
            }
        }

        Ok(())
    }

    /// Resolve packages for each RUN instruction that maps to a layer of
    /// the built image. Runs with the analysis container held; the caller
    /// guarantees teardown.
    #[allow(clippy::too_many_arguments)]
    async fn resolve_run_layers(
        &self,
        ctx: &AnalysisContext,
        tag: &str,
        shell: &str,
        base_layer_count: usize,
        longform: bool,
        narrative: &mut LongformReport,
        state: &mut ClassificationState,
    ) -> Result<()> {
        self.runtime.start_container(tag).await?;

        let history = self.image.layer_history(tag).await?;
        let alignment = align(&history, &ctx.instructions, base_layer_count)?;
        let engine = PackageConfirmationEngine::new(self.library, self.config.command_timeout);

        for aligned in &alignment.pairs {
            let cached = ctx.cache.lock().get(&aligned.layer_id).map(|p| p.to_vec());

            match cached {
                Some(packages) => {
                    tracing::info!(layer = %aligned.layer_id, "Adding packages from cache");
                    let notes = confirm_packages(state, &packages);
                    if longform {
                        narrative.push(Section::Run {
                            instruction: aligned.instruction.text(),
                            outcome: RunOutcome::Resolved {
                                from_cache: true,
                                packages,
                                notes,
                            },
                        });
                    }
                }
                None => match engine.resolve(&aligned.instruction, &aligned.layer_id, shell).await
                {
                    Resolution::Record(record) => {
                        ctx.cache.lock().put(&record.layer_id, record.packages.clone());
                        let notes = confirm_packages(state, &record.packages);
                        if longform {
                            narrative.push(Section::Run {
                                instruction: aligned.instruction.text(),
                                outcome: RunOutcome::Resolved {
                                    from_cache: false,
                                    packages: record.packages,
                                    notes,
                                },
                            });
                        }
                    }
                    Resolution::NoPackages { layer_id } => {
                        state.push_note(no_packages_note(&layer_id));
                        if longform {
                            narrative.push(Section::Run {
                                instruction: aligned.instruction.text(),
                                outcome: RunOutcome::NoPackages { layer_id },
                            });
                        }
                    }
                },
            }
        }

        for instruction in &alignment.unmatched {
            state.push_note(no_packages_note(UNATTRIBUTED_LAYER));
            if longform {
                narrative.push(Section::Run {
                    instruction: instruction.text(),
                    outcome: RunOutcome::Unattributed,
                });
            }
        }

        Ok(())
    }

    /// Base-image package listing from the command library, degraded to
    /// empty on error or timeout.
    async fn base_packages(&self, base_ref: &str, shell: &str) -> Vec<Package> {
        match tokio::time::timeout(
            self.config.command_timeout,
            self.library.base_image_packages(base_ref, shell),
        )
        .await
        {
            Ok(Ok(packages)) => packages,
            Ok(Err(e)) => {
                tracing::warn!(image = base_ref, error = %e, "base image lookup failed");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(image = base_ref, "base image lookup timed out");
                Vec::new()
            }
        }
    }
}

/// Confirm each package and collect its completeness notes.
///
/// Returns the notes generated for this package list, in order, for
/// interleaving into the long-form narrative; the same notes are recorded
/// (deduplicated) in the classification state.
fn confirm_packages(state: &mut ClassificationState, packages: &[Package]) -> Vec<String> {
    let mut notes = Vec::new();
    for package in packages {
        for note in missing_field_notes(package) {
            if !notes.contains(&note) {
                notes.push(note.clone());
            }
            state.push_note(note);
        }
        state.add_confirmed(package.clone());
    }
    notes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DockerfilePackages, LayerHistoryEntry, LayerRecord};
    use async_trait::async_trait;
    use layerlens_core::error::LensError;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct FakeImage {
        base_ref: String,
        base_msg: String,
        base_records: Vec<LayerRecord>,
        history: Vec<LayerHistoryEntry>,
        build: (bool, String),
        fail_history: bool,
    }

    impl Default for FakeImage {
        fn default() -> Self {
            Self {
                base_ref: "debian:buster".to_string(),
                base_msg: String::new(),
                base_records: vec![LayerRecord::new("sha256:baselayer0")],
                history: Vec::new(),
                build: (true, String::new()),
                fail_history: false,
            }
        }
    }

    #[async_trait]
    impl ImageSource for FakeImage {
        async fn dockerfile_base(&self) -> layerlens_core::Result<(String, String)> {
            Ok((self.base_ref.clone(), self.base_msg.clone()))
        }

        async fn base_layer_records(
            &self,
            _image_ref: &str,
        ) -> layerlens_core::Result<Vec<LayerRecord>> {
            Ok(self.base_records.clone())
        }

        async fn image_shell(&self, _image_ref: &str) -> layerlens_core::Result<String> {
            Ok("/bin/bash".to_string())
        }

        fn image_tag(&self) -> String {
            "analysis:latest".to_string()
        }

        async fn layer_history(
            &self,
            _tag: &str,
        ) -> layerlens_core::Result<Vec<LayerHistoryEntry>> {
            if self.fail_history {
                return Err(LensError::ImageError("history unavailable".to_string()));
            }
            Ok(self.history.clone())
        }

        async fn build_status(&self) -> (bool, String) {
            self.build.clone()
        }
    }

    #[derive(Default)]
    struct CountingLibrary {
        run_names: Vec<String>,
        base_packages: Vec<Package>,
        resolve_calls: AtomicUsize,
        base_calls: AtomicUsize,
    }

    #[async_trait]
    impl CommandLibrary for CountingLibrary {
        async fn resolve_packages(
            &self,
            _instruction: &Instruction,
            _shell: &str,
        ) -> layerlens_core::Result<Vec<String>> {
            self.resolve_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.run_names.clone())
        }

        async fn enrich_packages(
            &self,
            names: &[String],
            _shell: &str,
        ) -> layerlens_core::Result<Vec<Package>> {
            Ok(names.iter().map(|n| Package::bare(n)).collect())
        }

        async fn base_image_packages(
            &self,
            _image_ref: &str,
            _shell: &str,
        ) -> layerlens_core::Result<Vec<Package>> {
            self.base_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.base_packages.clone())
        }

        fn dockerfile_packages(&self, instructions: &[Instruction]) -> DockerfilePackages {
            crate::rules::dockerfile_packages(instructions)
        }
    }

    #[derive(Default)]
    struct FakeRuntime {
        started: AtomicBool,
        container_removed: AtomicBool,
        image_removed: AtomicBool,
    }

    #[async_trait]
    impl ContainerRuntime for FakeRuntime {
        async fn start_container(&self, _tag: &str) -> layerlens_core::Result<()> {
            self.started.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn remove_container(&self) -> layerlens_core::Result<()> {
            self.container_removed.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn remove_image(&self, _tag: &str) -> layerlens_core::Result<()> {
            self.image_removed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn test_config(tmp: &TempDir) -> AnalysisConfig {
        AnalysisConfig {
            report_file: tmp.path().join("report.txt"),
            cache_file: tmp.path().join("cache.json"),
            command_timeout: std::time::Duration::from_secs(5),
            image_tag: "analysis:latest".to_string(),
        }
    }

    fn bash() -> Package {
        Package {
            name: "bash".to_string(),
            version: Some("5.0".to_string()),
            license: Some("GPL".to_string()),
            source_url: Some("https://www.gnu.org/software/bash/".to_string()),
        }
    }

    fn instructions() -> Vec<Instruction> {
        vec![
            Instruction::new("FROM", "debian:buster", 1),
            Instruction::new("RUN", "apt-get install -y curl", 2),
        ]
    }

    #[tokio::test]
    async fn test_scenario_a_cached_base_packages() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);

        let mut cache = LayerCache::load(&config.cache_file).unwrap();
        cache.put("sha256:baselayer0", vec![bash()]);

        let image = FakeImage {
            build: (false, "no build requested".to_string()),
            ..Default::default()
        };
        let library = CountingLibrary::default();
        let runtime = FakeRuntime::default();
        let analyzer = Analyzer::new(&config, &image, &library, &runtime);

        let ctx = AnalysisContext::new(vec![], cache);
        let run = analyzer.execute_summary(&ctx).await.unwrap();

        assert!(run.text.contains(
            "Confirmed sources:\n\tbash\n\t\turl: https://www.gnu.org/software/bash/\n\t\tversion: 5.0\n\t\tlicense: GPL\n"
        ));
        // complete package: no completeness notes about bash
        assert!(!run.text.contains("for package bash"));
        // cache hit skipped extraction entirely
        assert_eq!(library.base_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cache_roundtrip_skips_library() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);

        let image = FakeImage {
            build: (false, "skipped".to_string()),
            ..Default::default()
        };
        let library = CountingLibrary {
            base_packages: vec![bash()],
            ..Default::default()
        };
        let runtime = FakeRuntime::default();
        let analyzer = Analyzer::new(&config, &image, &library, &runtime);

        // First run resolves via the library and persists the record.
        let ctx = AnalysisContext::load(&config, vec![]).unwrap();
        analyzer.execute_summary(&ctx).await.unwrap();
        assert_eq!(library.base_calls.load(Ordering::SeqCst), 1);

        // Second run over a freshly loaded context hits the cache.
        let ctx = AnalysisContext::load(&config, vec![]).unwrap();
        let run = analyzer.execute_summary(&ctx).await.unwrap();
        assert_eq!(library.base_calls.load(Ordering::SeqCst), 1);
        assert_eq!(run.state.confirmed(), [bash()]);
    }

    #[tokio::test]
    async fn test_run_layer_resolution_and_cache_write() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);

        let image = FakeImage {
            history: vec![
                LayerHistoryEntry {
                    created_by: "base".to_string(),
                    layer_id: "sha256:baselayer0".to_string(),
                },
                LayerHistoryEntry {
                    created_by: "/bin/sh -c apt-get install -y curl".to_string(),
                    layer_id: "sha256:runlayer1".to_string(),
                },
            ],
            ..Default::default()
        };
        let library = CountingLibrary {
            run_names: vec!["curl".to_string()],
            ..Default::default()
        };
        let runtime = FakeRuntime::default();
        let analyzer = Analyzer::new(&config, &image, &library, &runtime);

        let ctx = AnalysisContext::load(&config, instructions()).unwrap();
        let run = analyzer.execute(&ctx).await.unwrap();

        assert!(run.text.contains("RUN apt-get install -y curl\n"));
        assert!(run.text.contains("\tcurl\n"));
        // name-only enrichment generates all three completeness notes
        assert!(run.text.contains("No version for package curl."));
        assert!(run.text.contains("No license for package curl."));
        assert!(run.text.contains("No source url for package curl."));

        // resolution was written back to the cache
        assert_eq!(
            ctx.cache().lock().get("sha256:runlayer1").unwrap(),
            [Package::bare("curl")]
        );
        // and persisted for the next run
        let reloaded = LayerCache::load(&config.cache_file).unwrap();
        assert!(reloaded.get("sha256:runlayer1").is_some());

        assert!(runtime.started.load(Ordering::SeqCst));
        assert!(runtime.container_removed.load(Ordering::SeqCst));
        assert!(runtime.image_removed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_summary_mode_also_resolves_run_layers() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);

        let image = FakeImage {
            history: vec![
                LayerHistoryEntry {
                    created_by: "base".to_string(),
                    layer_id: "sha256:baselayer0".to_string(),
                },
                LayerHistoryEntry {
                    created_by: "/bin/sh -c apt-get install -y curl".to_string(),
                    layer_id: "sha256:runlayer1".to_string(),
                },
            ],
            ..Default::default()
        };
        let library = CountingLibrary {
            run_names: vec!["curl".to_string()],
            ..Default::default()
        };
        let runtime = FakeRuntime::default();
        let analyzer = Analyzer::new(&config, &image, &library, &runtime);

        let ctx = AnalysisContext::load(&config, instructions()).unwrap();
        let run = analyzer.execute_summary(&ctx).await.unwrap();

        // run-layer packages aggregate into the summary buckets
        assert_eq!(run.state.confirmed(), [Package::bare("curl")]);
        assert!(run.text.contains("Confirmed sources:\n\tcurl\n"));
        assert!(runtime.container_removed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_scenario_b_unmatched_run_is_unattributed() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);

        let image = FakeImage {
            history: vec![LayerHistoryEntry {
                created_by: "base".to_string(),
                layer_id: "sha256:baselayer0".to_string(),
            }],
            ..Default::default()
        };
        let library = CountingLibrary::default();
        let runtime = FakeRuntime::default();
        let analyzer = Analyzer::new(&config, &image, &library, &runtime);

        let ctx = AnalysisContext::load(&config, instructions()).unwrap();
        let run = analyzer.execute(&ctx).await.unwrap();

        assert!(run.text.contains("RUN apt-get install -y curl\n"));
        assert!(run
            .text
            .contains("Unable to recover packages for layer unknown."));
        assert!(run.text.contains("Consider entering them manually"));
    }

    #[tokio::test]
    async fn test_scenario_c_build_failure_fallback() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);

        let image = FakeImage {
            build: (false, "context deadline exceeded".to_string()),
            ..Default::default()
        };
        let library = CountingLibrary::default();
        let runtime = FakeRuntime::default();
        let analyzer = Analyzer::new(&config, &image, &library, &runtime);

        let dockerfile = vec![
            Instruction::new("FROM", "debian:buster", 1),
            Instruction::new("RUN", "apt-get install -y curl wget", 2),
            Instruction::new("RUN", "mkdir -p /app", 3),
        ];
        let ctx = AnalysisContext::load(&config, dockerfile).unwrap();
        let run = analyzer.execute(&ctx).await.unwrap();

        assert!(run
            .text
            .contains("Docker build failed: context deadline exceeded\n"));
        assert!(run.text.contains("Packages from parsing Dockerfile RUN commands:\n curl wget\n"));
        assert!(run.text.contains("Unrecognized RUN commands in Dockerfile:\nmkdir -p /app\n"));

        // no container was ever started, nothing to tear down
        assert!(!runtime.started.load(Ordering::SeqCst));

        assert_eq!(run.state.unconfirmed(), ["curl", "wget"]);
        assert_eq!(run.state.unrecognized(), ["mkdir -p /app"]);
    }

    #[tokio::test]
    async fn test_summary_build_failure_populates_buckets() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);

        let image = FakeImage {
            build: (false, "context deadline exceeded".to_string()),
            ..Default::default()
        };
        let library = CountingLibrary::default();
        let runtime = FakeRuntime::default();
        let analyzer = Analyzer::new(&config, &image, &library, &runtime);

        let dockerfile = vec![
            Instruction::new("FROM", "debian:buster", 1),
            Instruction::new("RUN", "apt-get install -y curl", 2),
        ];
        let ctx = AnalysisContext::load(&config, dockerfile).unwrap();
        let run = analyzer.execute_summary(&ctx).await.unwrap();

        assert!(run.text.contains("Unconfirmed sources:\ncurl\n"));
        assert!(run
            .text
            .contains("Docker build failed: context deadline exceeded\n"));
    }

    #[tokio::test]
    async fn test_teardown_runs_on_structural_failure() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);

        let image = FakeImage {
            fail_history: true,
            ..Default::default()
        };
        let library = CountingLibrary::default();
        let runtime = FakeRuntime::default();
        let analyzer = Analyzer::new(&config, &image, &library, &runtime);

        let ctx = AnalysisContext::load(&config, instructions()).unwrap();
        let err = analyzer.execute(&ctx).await.unwrap_err();
        assert!(matches!(err, LensError::ImageError(_)));

        // teardown still ran
        assert!(runtime.container_removed.load(Ordering::SeqCst));
        assert!(runtime.image_removed.load(Ordering::SeqCst));

        // the partial report was still written
        let partial = std::fs::read_to_string(&config.report_file).unwrap();
        assert!(partial.contains("Base image layers:"));
    }

    #[tokio::test]
    async fn test_insufficient_history_is_structural() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);

        let image = FakeImage {
            base_records: vec![
                LayerRecord::new("sha256:base0"),
                LayerRecord::new("sha256:base1"),
            ],
            history: vec![LayerHistoryEntry {
                created_by: "only one".to_string(),
                layer_id: "sha256:x".to_string(),
            }],
            ..Default::default()
        };
        let library = CountingLibrary::default();
        let runtime = FakeRuntime::default();
        let analyzer = Analyzer::new(&config, &image, &library, &runtime);

        let ctx = AnalysisContext::load(&config, instructions()).unwrap();
        let err = analyzer.execute(&ctx).await.unwrap_err();
        assert!(matches!(err, LensError::InsufficientHistory { .. }));
        assert!(runtime.container_removed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_no_packages_for_base_layer_is_noted() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);

        let image = FakeImage {
            build: (false, "skipped".to_string()),
            ..Default::default()
        };
        let library = CountingLibrary::default(); // no base packages known
        let runtime = FakeRuntime::default();
        let analyzer = Analyzer::new(&config, &image, &library, &runtime);

        let ctx = AnalysisContext::load(&config, vec![]).unwrap();
        let run = analyzer.execute_summary(&ctx).await.unwrap();

        assert!(run
            .text
            .contains("Unable to recover packages for layer sha256:baselayer0."));
        // nothing resolved, nothing cached
        assert!(ctx.cache().lock().is_empty());
    }

    #[tokio::test]
    async fn test_base_message_becomes_summary_note() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);

        let image = FakeImage {
            base_msg: "Base image debian has no explicit tag, assuming latest.".to_string(),
            build: (false, "skipped".to_string()),
            ..Default::default()
        };
        let library = CountingLibrary::default();
        let runtime = FakeRuntime::default();
        let analyzer = Analyzer::new(&config, &image, &library, &runtime);

        let ctx = AnalysisContext::load(&config, vec![]).unwrap();
        let run = analyzer.execute_summary(&ctx).await.unwrap();
        assert!(run.text.contains("assuming latest."));
    }

    #[tokio::test]
    async fn test_report_written_matches_returned_text() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);

        let image = FakeImage {
            build: (false, "skipped".to_string()),
            ..Default::default()
        };
        let library = CountingLibrary::default();
        let runtime = FakeRuntime::default();
        let analyzer = Analyzer::new(&config, &image, &library, &runtime);

        let ctx = AnalysisContext::load(&config, vec![]).unwrap();
        let run = analyzer.execute(&ctx).await.unwrap();

        let on_disk = std::fs::read_to_string(&config.report_file).unwrap();
        assert_eq!(on_disk, run.text);
    }
}
