//! Built-in command knowledge.
//!
//! A rule table for the package-manager invocations commonly found in
//! Dockerfile RUN lines. This is the default [`CommandLibrary`]
//! implementation; richer knowledge bases plug in behind the same trait.

use async_trait::async_trait;
use layerlens_core::error::Result;

use crate::model::{DockerfilePackages, Instruction, Package};
use crate::provider::CommandLibrary;

/// Package managers and the subcommand that installs packages.
const INSTALL_RULES: &[(&str, &str)] = &[
    ("apt-get", "install"),
    ("apt", "install"),
    ("apk", "add"),
    ("yum", "install"),
    ("dnf", "install"),
    ("microdnf", "install"),
    ("zypper", "install"),
    ("pip", "install"),
    ("pip3", "install"),
];

/// Package-manager housekeeping that installs nothing but is still a
/// recognized command.
const HOUSEKEEPING_RULES: &[(&str, &str)] = &[
    ("apt-get", "update"),
    ("apt-get", "clean"),
    ("apt-get", "autoremove"),
    ("apt", "update"),
    ("apk", "update"),
    ("yum", "clean"),
    ("dnf", "clean"),
    ("pip", "uninstall"),
];

/// Flags whose following token is a value, not a package name.
const VALUE_FLAGS: &[&str] = &["-r", "--requirement", "-t", "--target", "-c", "--constraint"];

/// Split a RUN argument into its constituent shell commands.
pub fn split_shell_commands(argument: &str) -> Vec<String> {
    argument
        .split("&&")
        .flat_map(|part| part.split(';'))
        .map(|cmd| cmd.trim().to_string())
        .filter(|cmd| !cmd.is_empty())
        .collect()
}

/// Package names installed by a single shell command, or `None` when no
/// rule recognizes the command. `Some(vec![])` means recognized
/// housekeeping that installs nothing.
pub fn packages_for_command(command: &str) -> Option<Vec<String>> {
    let tokens: Vec<&str> = command
        .split_whitespace()
        // env assignments and sudo prefix the actual command
        .skip_while(|t| t.contains('=') || *t == "sudo")
        .collect();

    let manager = *tokens.first()?;

    if let Some(sub_idx) = find_subcommand(&tokens, manager, INSTALL_RULES) {
        return Some(collect_names(&tokens[sub_idx + 1..]));
    }
    if find_subcommand(&tokens, manager, HOUSEKEEPING_RULES).is_some() {
        return Some(Vec::new());
    }
    None
}

/// Index of the rule subcommand for `manager`, if the command matches.
fn find_subcommand(tokens: &[&str], manager: &str, rules: &[(&str, &str)]) -> Option<usize> {
    let subcommands: Vec<&str> = rules
        .iter()
        .filter(|(m, _)| *m == manager)
        .map(|(_, s)| *s)
        .collect();
    if subcommands.is_empty() {
        return None;
    }
    tokens
        .iter()
        .position(|t| subcommands.contains(t))
        .filter(|idx| *idx > 0)
}

/// Package names from the tokens following the install subcommand,
/// skipping flags and their values, stripped of version pins.
fn collect_names(tokens: &[&str]) -> Vec<String> {
    let mut names = Vec::new();
    let mut skip_next = false;
    for token in tokens {
        if skip_next {
            skip_next = false;
            continue;
        }
        if VALUE_FLAGS.contains(token) {
            skip_next = true;
            continue;
        }
        if token.starts_with('-') {
            continue;
        }
        names.push(strip_version_pin(token));
    }
    names
}

/// `curl=7.88.1` (apt/apk) and `flask==2.3` (pip) pin versions in the
/// name token.
fn strip_version_pin(token: &str) -> String {
    match token.find('=') {
        Some(pos) => token[..pos].to_string(),
        None => token.to_string(),
    }
}

/// Classify every RUN command in `instructions` without extraction.
pub fn dockerfile_packages(instructions: &[Instruction]) -> DockerfilePackages {
    let mut result = DockerfilePackages::default();
    for instruction in instructions.iter().filter(|i| i.is_run()) {
        for command in split_shell_commands(&instruction.argument) {
            match packages_for_command(&command) {
                Some(names) => result.recognized.extend(names),
                None => result.unrecognized.push(command),
            }
        }
    }
    result
}

/// Shell used by images of a known base distribution.
pub fn shell_for_base(image_ref: &str) -> &'static str {
    let name = image_ref.split(':').next().unwrap_or(image_ref);
    match name.rsplit('/').next().unwrap_or(name) {
        "debian" | "ubuntu" | "fedora" | "centos" | "rockylinux" | "almalinux" => "/bin/bash",
        _ => "/bin/sh",
    }
}

/// The built-in rule table exposed as a [`CommandLibrary`].
///
/// Enrichment is name-only: without an external snippet mechanism there
/// is no version/license/source-url source, so resolved packages carry
/// just their name and the pipeline notes the missing fields.
#[derive(Debug, Default)]
pub struct RuleLibrary;

#[async_trait]
impl CommandLibrary for RuleLibrary {
    async fn resolve_packages(
        &self,
        instruction: &Instruction,
        _shell: &str,
    ) -> Result<Vec<String>> {
        if !instruction.is_run() {
            return Ok(Vec::new());
        }
        let names = split_shell_commands(&instruction.argument)
            .iter()
            .filter_map(|cmd| packages_for_command(cmd))
            .flatten()
            .collect();
        Ok(names)
    }

    async fn enrich_packages(&self, names: &[String], _shell: &str) -> Result<Vec<Package>> {
        Ok(names.iter().map(|n| Package::bare(n)).collect())
    }

    async fn base_image_packages(&self, image_ref: &str, _shell: &str) -> Result<Vec<Package>> {
        tracing::debug!(image = image_ref, "no base image listing in rule table");
        Ok(Vec::new())
    }

    fn dockerfile_packages(&self, instructions: &[Instruction]) -> DockerfilePackages {
        dockerfile_packages(instructions)
    }
}
