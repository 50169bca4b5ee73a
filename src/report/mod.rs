//! Experiment report: the generated narrative and the static discussion

mod discussion;
mod narrative;

pub use discussion::DISCUSSION;
pub use narrative::{generate_narrative, ExperimentOutputs, FileStats, Narrative};
