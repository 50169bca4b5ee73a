//! Display surfaces
//!
//! The experiment never draws or prints anything itself. It hands headers,
//! audio references, plots and Markdown to a [`Surface`], which decides how
//! to present them.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;

use super::waveform::WaveformPlot;
use crate::error::{AuralabError, Result};

/// Sink for experiment output, in emission order
pub trait Surface {
    fn header(&mut self, text: &str) -> Result<()>;

    fn subheader(&mut self, text: &str) -> Result<()>;

    /// Reference to an audio file the reader can play
    fn audio(&mut self, path: &Path) -> Result<()>;

    fn plot(&mut self, plot: &WaveformPlot) -> Result<()>;

    fn markdown(&mut self, text: &str) -> Result<()>;
}

/// One recorded emission
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Block {
    Header(String),
    Subheader(String),
    Audio(PathBuf),
    /// Title of the plot
    Plot(String),
    Markdown(String),
}

/// Records emissions in memory
#[derive(Debug, Default)]
pub struct MemorySurface {
    pub blocks: Vec<Block>,
    pub plots: Vec<WaveformPlot>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headers(&self) -> Vec<&str> {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                Block::Header(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn audio_paths(&self) -> Vec<&Path> {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                Block::Audio(path) => Some(path.as_path()),
                _ => None,
            })
            .collect()
    }
}

impl Surface for MemorySurface {
    fn header(&mut self, text: &str) -> Result<()> {
        self.blocks.push(Block::Header(text.to_string()));
        Ok(())
    }

    fn subheader(&mut self, text: &str) -> Result<()> {
        self.blocks.push(Block::Subheader(text.to_string()));
        Ok(())
    }

    fn audio(&mut self, path: &Path) -> Result<()> {
        self.blocks.push(Block::Audio(path.to_path_buf()));
        Ok(())
    }

    fn plot(&mut self, plot: &WaveformPlot) -> Result<()> {
        self.blocks.push(Block::Plot(plot.title.clone()));
        self.plots.push(plot.clone());
        Ok(())
    }

    fn markdown(&mut self, text: &str) -> Result<()> {
        self.blocks.push(Block::Markdown(text.to_string()));
        Ok(())
    }
}

/// Writes a Markdown report with one SVG file per plot
///
/// Plots are written as they arrive; `report.md` only once
/// [`MarkdownSurface::finish`] is called.
#[derive(Debug)]
pub struct MarkdownSurface {
    out_dir: PathBuf,
    lines: Vec<String>,
    plot_count: usize,
    link_audio: bool,
}

impl MarkdownSurface {
    pub const REPORT_FILE: &'static str = "report.md";

    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            lines: Vec::new(),
            plot_count: 0,
            link_audio: true,
        }
    }

    /// Name audio files without linking them, for runs whose derived audio
    /// is deleted once the report is rendered
    pub fn without_audio_links(mut self) -> Self {
        self.link_audio = false;
        self
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Markdown accumulated so far
    pub fn contents(&self) -> String {
        self.lines.join("\n\n") + "\n"
    }

    /// Write `report.md` and return its path
    pub fn finish(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.out_dir)?;
        let path = self.out_dir.join(Self::REPORT_FILE);
        fs::write(&path, self.contents()).map_err(|e| AuralabError::FileWrite {
            path: path.clone(),
            source: e,
        })?;
        info!("Report written to {}", path.display());
        Ok(path)
    }

    /// Link target for `path`, relative to the report when possible
    fn link(&self, path: &Path) -> String {
        path.strip_prefix(&self.out_dir)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

/// Lower-case file-name-safe form of a title
fn slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.trim_matches('_').to_string()
}

impl Surface for MarkdownSurface {
    fn header(&mut self, text: &str) -> Result<()> {
        self.lines.push(format!("## {}", text));
        Ok(())
    }

    fn subheader(&mut self, text: &str) -> Result<()> {
        self.lines.push(format!("### {}", text));
        Ok(())
    }

    fn audio(&mut self, path: &Path) -> Result<()> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let line = if self.link_audio {
            format!("[audio: {}]({})", name, self.link(path))
        } else {
            format!("audio: `{}` (removed after the run)", name)
        };
        self.lines.push(line);
        Ok(())
    }

    fn plot(&mut self, plot: &WaveformPlot) -> Result<()> {
        self.plot_count += 1;
        let file = format!("{:02}_{}.svg", self.plot_count, slug(&plot.title));
        let path = self.out_dir.join(&file);
        plot.save_svg(&path)?;
        debug!("Plot '{}' written to {}", plot.title, path.display());

        self.lines.push(format!("![{}]({})", plot.title, file));
        Ok(())
    }

    fn markdown(&mut self, text: &str) -> Result<()> {
        self.lines.push(text.trim_end().to_string());
        Ok(())
    }
}
