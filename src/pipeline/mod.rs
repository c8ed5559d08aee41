//! Mix orchestration: stage sequencing, progress reporting and failure mapping

pub mod mix;
pub mod progress;
pub mod stage;

pub use mix::{MixPipeline, MixResult};
pub use progress::{NoProgress, ProgressEvent, ProgressObserver, RecordingProgress};
pub use stage::{PipelineStage, StageTracker, STEP_COUNT};
