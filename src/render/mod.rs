//! Waveform plots and the surfaces experiment output is shown on

pub mod surface;
pub mod waveform;

pub use surface::{Block, MarkdownSurface, MemorySurface, Surface};
pub use waveform::{WaveformPlot, MAX_PLOT_POINTS};
