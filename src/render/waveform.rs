//! Waveform plots
//!
//! A [`WaveformPlot`] is a self-contained description of one chart: the
//! mono min/max envelope of a signal over sample index plus a title.
//! Nothing is drawn until [`WaveformPlot::to_svg`] is called.

use std::fs;
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use serde::Serialize;

use crate::engine::{import_audio, AudioBuffer};
use crate::error::{AuralabError, Result};

/// Upper bound on envelope points per plot
pub const MAX_PLOT_POINTS: usize = 2000;

const PLOT_SIZE: (u32, u32) = (1000, 300);

/// Envelope plot of one signal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaveformPlot {
    pub title: String,
    /// File the signal was decoded from, if any
    pub source: Option<PathBuf>,
    pub sample_rate: u32,
    /// Frames in the plotted signal
    pub num_samples: usize,
    /// Sample index at the start of each bucket
    pub positions: Vec<usize>,
    /// Per-bucket minimum of the mono mix
    pub min: Vec<f32>,
    /// Per-bucket maximum of the mono mix
    pub max: Vec<f32>,
}

impl WaveformPlot {
    /// Bucket the mono mix of `buffer` into at most [`MAX_PLOT_POINTS`] points
    pub fn from_buffer(buffer: &AudioBuffer, title: impl Into<String>) -> Self {
        let mono = buffer.to_mono();
        let num_samples = mono.len();
        let buckets = num_samples.min(MAX_PLOT_POINTS);

        let mut positions = Vec::with_capacity(buckets);
        let mut min = Vec::with_capacity(buckets);
        let mut max = Vec::with_capacity(buckets);

        let per_bucket = num_samples as f64 / buckets.max(1) as f64;
        for i in 0..buckets {
            let start = (i as f64 * per_bucket) as usize;
            let end = (((i + 1) as f64 * per_bucket) as usize)
                .min(num_samples)
                .max(start + 1);

            let bucket = &mono[start..end];
            positions.push(start);
            min.push(bucket.iter().copied().fold(f32::INFINITY, f32::min));
            max.push(bucket.iter().copied().fold(f32::NEG_INFINITY, f32::max));
        }

        Self {
            title: title.into(),
            source: None,
            sample_rate: buffer.sample_rate,
            num_samples,
            positions,
            min,
            max,
        }
    }

    /// Decode `path` and build its plot
    pub fn from_file(path: &Path, title: impl Into<String>) -> Result<Self> {
        let buffer = import_audio(path)?;
        let mut plot = Self::from_buffer(&buffer, title);
        plot.source = Some(path.to_path_buf());
        Ok(plot)
    }

    /// Number of envelope points
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Largest absolute value in the envelope, at least 1.0
    fn y_extent(&self) -> f32 {
        self.min
            .iter()
            .chain(self.max.iter())
            .map(|v| v.abs())
            .fold(1.0_f32, f32::max)
    }

    /// Render the plot as an SVG document
    pub fn to_svg(&self) -> Result<String> {
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, PLOT_SIZE).into_drawing_area();
            root.fill(&WHITE).map_err(render_error)?;

            let x_end = self.num_samples.max(1) as f32;
            let y_extent = self.y_extent() * 1.1;

            let mut chart = ChartBuilder::on(&root)
                .margin(10)
                .caption(&self.title, ("sans-serif", 20))
                .x_label_area_size(35)
                .y_label_area_size(50)
                .build_cartesian_2d(0f32..x_end, -y_extent..y_extent)
                .map_err(render_error)?;

            chart
                .configure_mesh()
                .x_desc("Sample")
                .y_desc("Amplitude")
                .draw()
                .map_err(render_error)?;

            chart
                .draw_series(LineSeries::new(
                    self.positions
                        .iter()
                        .zip(&self.max)
                        .map(|(&x, &y)| (x as f32, y)),
                    &BLUE,
                ))
                .map_err(render_error)?;

            chart
                .draw_series(LineSeries::new(
                    self.positions
                        .iter()
                        .zip(&self.min)
                        .map(|(&x, &y)| (x as f32, y)),
                    &BLUE,
                ))
                .map_err(render_error)?;

            root.present().map_err(render_error)?;
        }
        Ok(svg)
    }

    /// Render and write the SVG to `path`
    pub fn save_svg(&self, path: &Path) -> Result<()> {
        let svg = self.to_svg()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, svg).map_err(|e| AuralabError::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

fn render_error<E: std::fmt::Display>(e: E) -> AuralabError {
    AuralabError::Render {
        reason: e.to_string(),
    }
}
