use std::fmt;

use serde::Serialize;

/// Progress of an experiment run
///
/// Stages only move forward, one step at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    AwaitingUpload,
    Saved,
    Faded,
    TempoShifted,
    PodcastSimulated,
    Combined,
    Narrated,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::AwaitingUpload,
        Stage::Saved,
        Stage::Faded,
        Stage::TempoShifted,
        Stage::PodcastSimulated,
        Stage::Combined,
        Stage::Narrated,
    ];

    /// The following stage; `None` once narrated
    pub fn next(self) -> Option<Stage> {
        let index = Self::ALL.iter().position(|&s| s == self)?;
        Self::ALL.get(index + 1).copied()
    }

    pub fn is_terminal(self) -> bool {
        self == Stage::Narrated
    }

    /// Header shown when the stage's output is emitted
    pub fn title(self) -> &'static str {
        match self {
            Stage::AwaitingUpload => "Upload two audio files to start the experiment",
            Stage::Saved => "Original audio",
            Stage::Faded => "1. Fade in/out",
            Stage::TempoShifted => "2. Tempo change",
            Stage::PodcastSimulated => "3. Podcast simulation (intro and outro)",
            Stage::Combined => "4. Fade + tempo combined",
            Stage::Narrated => "Experiment narrative",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::AwaitingUpload => "awaiting_upload",
            Stage::Saved => "saved",
            Stage::Faded => "faded",
            Stage::TempoShifted => "tempo_shifted",
            Stage::PodcastSimulated => "podcast_simulated",
            Stage::Combined => "combined",
            Stage::Narrated => "narrated",
        };
        f.write_str(name)
    }
}
