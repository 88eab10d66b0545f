//! Aligns Dockerfile instructions with an image's layer history.
//!
//! Build metadata may wrap or annotate the original command, so matching
//! is substring-based rather than exact. Matching is first-fit and
//! order-preserving: each history entry is consumed by at most one RUN
//! instruction.

use layerlens_core::error::{LensError, Result};

use crate::model::{Instruction, LayerHistoryEntry};

/// A RUN instruction bound to the layer it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedRun {
    pub instruction: Instruction,
    pub layer_id: String,
}

/// Outcome of aligning instructions against a layer history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alignment {
    /// RUN instructions bound to a layer, in Dockerfile order.
    pub pairs: Vec<AlignedRun>,
    /// RUN instructions no history entry matched. Reported as
    /// unattributed, never fatal.
    pub unmatched: Vec<Instruction>,
}

/// Align `instructions` with `history` after dropping the leading
/// `base_layer_count` entries that belong to the base image.
///
/// Fails only when the history is shorter than the declared base layer
/// count; a RUN instruction without a match is a coverage gap, not an
/// error.
pub fn align(
    history: &[LayerHistoryEntry],
    instructions: &[Instruction],
    base_layer_count: usize,
) -> Result<Alignment> {
    if base_layer_count > history.len() {
        return Err(LensError::InsufficientHistory {
            base_layers: base_layer_count,
            history_len: history.len(),
        });
    }

    let remaining = &history[base_layer_count..];
    let mut consumed = vec![false; remaining.len()];
    let mut alignment = Alignment::default();

    for instruction in instructions.iter().filter(|i| i.is_run()) {
        let found = remaining.iter().enumerate().find(|(idx, entry)| {
            !consumed[*idx] && entry.created_by.contains(&instruction.argument)
        });

        match found {
            Some((idx, entry)) => {
                consumed[idx] = true;
                alignment.pairs.push(AlignedRun {
                    instruction: instruction.clone(),
                    layer_id: entry.layer_id.clone(),
                });
            }
            None => {
                tracing::debug!(
                    line = instruction.source_line,
                    command = %instruction.argument,
                    "no history entry matched RUN instruction"
                );
                alignment.unmatched.push(instruction.clone());
            }
        }
    }

    Ok(alignment)
}
