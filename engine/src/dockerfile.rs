//! Dockerfile instruction scanner.
//!
//! Produces the flat `{kind, argument, source_line}` records the pipeline
//! consumes. Handles line continuations (`\`) and comments; keywords are
//! case-insensitive. Unknown keywords are kept — provenance analysis only
//! treats FROM and RUN specially and must not reject a Dockerfile the
//! builder accepted.

use std::path::Path;

use layerlens_core::error::{LensError, Result};

use crate::model::Instruction;

/// Load and scan a Dockerfile from `path`.
pub fn load_instructions(path: &Path) -> Result<Vec<Instruction>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        LensError::DockerfileError(format!("failed to read {}: {}", path.display(), e))
    })?;
    parse_instructions(&content)
}

/// Scan Dockerfile text into an ordered instruction list.
pub fn parse_instructions(content: &str) -> Result<Vec<Instruction>> {
    let mut instructions = Vec::new();

    for (start_line, line) in join_continuation_lines(content) {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (keyword, rest) = split_first_word(trimmed);
        instructions.push(Instruction::new(keyword, rest, start_line));
    }

    if instructions.is_empty() {
        return Err(LensError::DockerfileError(
            "Dockerfile is empty or contains no instructions".to_string(),
        ));
    }

    Ok(instructions)
}

/// The base image reference named by the first FROM instruction, with a
/// message describing anything worth surfacing in the report.
pub fn base_image(instructions: &[Instruction]) -> Result<(String, String)> {
    let from = instructions
        .iter()
        .find(|i| i.kind == "FROM")
        .ok_or_else(|| {
            LensError::DockerfileError("Dockerfile has no FROM instruction".to_string())
        })?;

    let image = from
        .argument
        .split_whitespace()
        .next()
        .unwrap_or(&from.argument)
        .to_string();

    let message = if image.contains(':') {
        String::new()
    } else {
        format!("Base image {} has no explicit tag, assuming latest.", image)
    };

    Ok((image, message))
}

/// Join lines ending with `\` into single logical lines, keeping the
/// physical line each logical line starts on (1-based).
fn join_continuation_lines(content: &str) -> Vec<(usize, String)> {
    let mut logical_lines = Vec::new();
    let mut current = String::new();
    let mut start_line = 0;

    for (idx, line) in content.lines().enumerate() {
        if current.is_empty() {
            start_line = idx + 1;
        }
        if line.ends_with('\\') {
            current.push_str(line[..line.len() - 1].trim_end());
            current.push(' ');
        } else {
            current.push_str(line);
            logical_lines.push((start_line, current.clone()));
            current.clear();
        }
    }

    if !current.is_empty() {
        logical_lines.push((start_line, current));
    }

    logical_lines
}

/// Split a string into the first word and the rest.
fn split_first_word(s: &str) -> (&str, &str) {
    let s = s.trim();
    match s.find(char::is_whitespace) {
        Some(pos) => (&s[..pos], s[pos..].trim_start()),
        None => (s, ""),
    }
}
