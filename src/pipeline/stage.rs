//! Pipeline state machine
//!
//! A run moves strictly forward through the stages below. Only
//! `BinauralGenerated` may be skipped; nothing ever moves backwards.

use std::fmt;

use crate::error::{Result, SubliminalError};

/// Number of progress steps reported per run
pub const STEP_COUNT: u32 = 8;

/// States of a mix run, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PipelineStage {
    Loaded,
    Modulated,
    TrackNormalized,
    VolumeAdjusted,
    Aligned,
    BinauralGenerated,
    Mixed,
    FinalNormalized,
    Exported,
}

impl PipelineStage {
    /// Progress step (1-based) whose work produces this state
    pub fn step(&self) -> u32 {
        match self {
            PipelineStage::Loaded => 1,
            PipelineStage::Modulated | PipelineStage::TrackNormalized => 2,
            PipelineStage::VolumeAdjusted => 3,
            PipelineStage::Aligned => 4,
            PipelineStage::BinauralGenerated => 5,
            PipelineStage::Mixed => 6,
            PipelineStage::FinalNormalized => 7,
            PipelineStage::Exported => 8,
        }
    }

    /// Whether a run may pass over this state
    pub fn is_optional(&self) -> bool {
        matches!(self, PipelineStage::BinauralGenerated)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Loaded => "LOADED",
            PipelineStage::Modulated => "MODULATED",
            PipelineStage::TrackNormalized => "TRACK_NORMALIZED",
            PipelineStage::VolumeAdjusted => "VOLUME_ADJUSTED",
            PipelineStage::Aligned => "ALIGNED",
            PipelineStage::BinauralGenerated => "BINAURAL_GENERATED",
            PipelineStage::Mixed => "MIXED",
            PipelineStage::FinalNormalized => "FINAL_NORMALIZED",
            PipelineStage::Exported => "EXPORTED",
        };
        f.write_str(name)
    }
}

const ORDER: [PipelineStage; 9] = [
    PipelineStage::Loaded,
    PipelineStage::Modulated,
    PipelineStage::TrackNormalized,
    PipelineStage::VolumeAdjusted,
    PipelineStage::Aligned,
    PipelineStage::BinauralGenerated,
    PipelineStage::Mixed,
    PipelineStage::FinalNormalized,
    PipelineStage::Exported,
];

/// Records the states a run has reached and refuses illegal transitions
#[derive(Debug, Clone, Default)]
pub struct StageTracker {
    visited: Vec<PipelineStage>,
}

impl StageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state, `None` before anything has loaded
    pub fn current(&self) -> Option<PipelineStage> {
        self.visited.last().copied()
    }

    /// Every state reached so far, in order
    pub fn visited(&self) -> &[PipelineStage] {
        &self.visited
    }

    /// Move to `next`
    ///
    /// # Errors
    /// * `Processing` - if `next` is not ahead of the current state, or if a
    ///   mandatory state would be skipped
    pub fn advance(&mut self, next: PipelineStage) -> Result<()> {
        let from = self.current().map(position).map_or(0, |p| p + 1);
        let to = position(next);

        if to < from {
            return Err(SubliminalError::processing(format!(
                "Illegal stage transition {} -> {}",
                self.current().map_or_else(|| "START".to_string(), |s| s.to_string()),
                next
            )));
        }

        if let Some(skipped) = ORDER[from..to].iter().find(|s| !s.is_optional()) {
            return Err(SubliminalError::processing(format!(
                "Stage {} cannot be skipped on the way to {}",
                skipped, next
            )));
        }

        self.visited.push(next);
        Ok(())
    }
}

fn position(stage: PipelineStage) -> usize {
    ORDER
        .iter()
        .position(|s| *s == stage)
        .unwrap_or(ORDER.len())
}
