//! Work Directory Storage
//!
//! Persists uploaded audio under unique names, derives output paths for
//! effect results and keeps track of every derived file so it can be
//! removed once the report has been rendered.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use uuid::Uuid;
use walkdir::WalkDir;

use crate::engine::{export_audio, AudioBuffer, ExportFormat};
use crate::error::{AuralabError, Result};

/// Extension given to uploads whose name doesn't carry one
const DEFAULT_UPLOAD_EXTENSION: &str = "mp3";

/// Extension of every derived file
pub const DERIVED_EXTENSION: &str = "wav";

/// One uploaded file held in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// Name the file was uploaded under
    pub name: String,
    /// Raw file contents
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a file from disk as an upload
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| AuralabError::FileNotFound {
            path: path.display().to_string(),
            source: Some(e),
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self { name, bytes })
    }

    /// Lower-case extension of the upload name, `mp3` when absent
    pub fn extension(&self) -> String {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_else(|| DEFAULT_UPLOAD_EXTENSION.to_string())
    }
}

/// An upload after it has been written to the work directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedUpload {
    /// Where the bytes were written
    pub path: PathBuf,
    /// Name the file was uploaded under
    pub original_name: String,
    /// SHA-256 of the bytes, lower-case hex
    pub checksum: String,
    /// File size in bytes
    pub size_bytes: u64,
}

/// What happens to derived audio once a run is finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Leave every file in the work directory
    #[default]
    Keep,
    /// Delete derived audio files; uploads and rendered reports stay
    DiscardAudio,
}

/// Work directory for one experiment run
///
/// Dropping a `Storage` whose policy is [`RetentionPolicy::DiscardAudio`]
/// deletes the tracked files even if [`Storage::finish`] was never called.
#[derive(Debug)]
pub struct Storage {
    work_dir: PathBuf,
    export_format: ExportFormat,
    retention: RetentionPolicy,
    derived: Vec<PathBuf>,
    finished: bool,
    scratch: Option<TempDir>,
}

impl Storage {
    /// Storage rooted at `work_dir`; the directory is created on first write
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            export_format: ExportFormat::default(),
            retention: RetentionPolicy::Keep,
            derived: Vec::new(),
            finished: false,
            scratch: None,
        }
    }

    /// Storage in a fresh temporary directory, removed when dropped
    pub fn scratch() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("auralab-").tempdir()?;
        let mut storage = Self::new(dir.path());
        storage.scratch = Some(dir);
        Ok(storage)
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_export_format(mut self, format: ExportFormat) -> Self {
        self.export_format = format;
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn export_format(&self) -> ExportFormat {
        self.export_format
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    /// Derived files written so far, in write order
    pub fn derived_files(&self) -> &[PathBuf] {
        &self.derived
    }

    fn ensure_work_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.work_dir).map_err(|e| AuralabError::FileWrite {
            path: self.work_dir.clone(),
            source: e,
        })
    }

    /// Write an upload verbatim to `<work_dir>/<uuid>.<ext>`
    ///
    /// The content is not inspected; bad audio only surfaces when an
    /// effect tries to decode it.
    pub fn save_upload(&mut self, upload: &Upload) -> Result<SavedUpload> {
        self.ensure_work_dir()?;

        let path = self
            .work_dir
            .join(format!("{}.{}", Uuid::new_v4(), upload.extension()));

        fs::write(&path, &upload.bytes).map_err(|e| AuralabError::FileWrite {
            path: path.clone(),
            source: e,
        })?;

        let checksum = format!("{:x}", Sha256::digest(&upload.bytes));
        info!(
            "Saved upload '{}' to {} (sha256 {})",
            upload.name,
            path.display(),
            checksum
        );

        Ok(SavedUpload {
            path,
            original_name: upload.name.clone(),
            checksum,
            size_bytes: upload.bytes.len() as u64,
        })
    }

    /// `<src dir>/<src stem><suffix>.wav`
    pub fn derived_path(src: &Path, suffix: &str) -> PathBuf {
        let stem = src
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        src.with_file_name(format!("{}{}.{}", stem, suffix, DERIVED_EXTENSION))
    }

    /// `<work_dir>/<stem>_<unique id>.wav`
    pub fn unique_path(&self, stem: &str) -> PathBuf {
        self.work_dir.join(format!(
            "{}_{}.{}",
            stem,
            Uuid::new_v4().simple(),
            DERIVED_EXTENSION
        ))
    }

    /// Export `buffer` to `path` and track the file as derived
    ///
    /// A path already written through this storage is refused, so a derived
    /// file is never rewritten within a run.
    pub fn write_audio(&mut self, path: &Path, buffer: &AudioBuffer) -> Result<()> {
        if self.derived.iter().any(|p| p == path) {
            return Err(AuralabError::invalid_parameter(
                "path",
                format!("{} was already written in this run", path.display()),
            ));
        }
        self.ensure_work_dir()?;
        export_audio(buffer, path, self.export_format)?;
        self.track(path);
        Ok(())
    }

    /// Export `buffer` next to `src` with `suffix` appended to the stem
    pub fn write_derived(
        &mut self,
        src: &Path,
        suffix: &str,
        buffer: &AudioBuffer,
    ) -> Result<PathBuf> {
        let path = Self::derived_path(src, suffix);
        self.write_audio(&path, buffer)?;
        Ok(path)
    }

    /// Register a file for cleanup
    pub fn track(&mut self, path: &Path) {
        if !self.derived.iter().any(|p| p == path) {
            debug!("Tracking derived file {}", path.display());
            self.derived.push(path.to_path_buf());
        }
    }

    /// Apply the retention policy; returns the number of files deleted
    pub fn finish(&mut self) -> Result<usize> {
        self.finished = true;
        match self.retention {
            RetentionPolicy::Keep => Ok(0),
            RetentionPolicy::DiscardAudio => self.remove_derived(),
        }
    }

    fn remove_derived(&mut self) -> Result<usize> {
        let mut removed = 0;
        for path in self.derived.drain(..) {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(AuralabError::Io(e)),
            }
        }
        info!("Removed {} derived files", removed);
        Ok(removed)
    }
}

impl Drop for Storage {
    fn drop(&mut self) {
        if !self.finished && self.retention == RetentionPolicy::DiscardAudio {
            if let Err(e) = self.remove_derived() {
                warn!("Failed to clean up derived files: {}", e);
            }
        }
    }
}

/// Delete every regular file directly inside `dir`; returns how many went
///
/// A missing directory counts as already clean.
pub fn purge_dir(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let files: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.path().to_path_buf())
        .collect();

    for file in &files {
        fs::remove_file(file)?;
    }

    info!("Purged {} files from {}", files.len(), dir.display());
    Ok(files.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::generate_test_tone;
    use tempfile::tempdir;

    #[test]
    fn test_upload_extension() {
        assert_eq!(Upload::new("song.MP3", vec![]).extension(), "mp3");
        assert_eq!(Upload::new("take.wav", vec![]).extension(), "wav");
        assert_eq!(Upload::new("noext", vec![]).extension(), "mp3");
    }

    #[test]
    fn test_save_upload_writes_verbatim_and_creates_dir() {
        let dir = tempdir().unwrap();
        let work_dir = dir.path().join("uploads");
        let mut storage = Storage::new(&work_dir);

        let saved = storage
            .save_upload(&Upload::new("a.mp3", b"not even audio".to_vec()))
            .unwrap();

        assert!(saved.path.starts_with(&work_dir));
        assert_eq!(saved.path.extension().unwrap(), "mp3");
        assert_eq!(fs::read(&saved.path).unwrap(), b"not even audio");
        assert_eq!(saved.size_bytes, 14);
        assert_eq!(saved.checksum.len(), 64);
        // Uploads are not derived files
        assert!(storage.derived_files().is_empty());
    }

    #[test]
    fn test_save_upload_names_are_unique() {
        let dir = tempdir().unwrap();
        let mut storage = Storage::new(dir.path());
        let upload = Upload::new("same.mp3", vec![1, 2, 3]);

        let first = storage.save_upload(&upload).unwrap();
        let second = storage.save_upload(&upload).unwrap();
        assert_ne!(first.path, second.path);
        assert_eq!(first.checksum, second.checksum);
    }

    #[test]
    fn test_save_upload_propagates_fs_errors() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();

        // Work dir path runs through a regular file
        let mut storage = Storage::new(blocker.join("uploads"));
        let result = storage.save_upload(&Upload::new("a.mp3", vec![0]));
        assert!(matches!(result, Err(AuralabError::FileWrite { .. })));
    }

    #[test]
    fn test_derived_path() {
        let path = Storage::derived_path(Path::new("/tmp/work/abc.mp3"), "_fade");
        assert_eq!(path, PathBuf::from("/tmp/work/abc_fade.wav"));

        let chained = Storage::derived_path(&path, "_12x");
        assert_eq!(chained, PathBuf::from("/tmp/work/abc_fade_12x.wav"));
    }

    #[test]
    fn test_unique_path() {
        let storage = Storage::new("/tmp/work");
        let a = storage.unique_path("podcast_intro_fade");
        let b = storage.unique_path("podcast_intro_fade");

        assert_ne!(a, b);
        assert!(a
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("podcast_intro_fade_"));
        assert_eq!(a.extension().unwrap(), "wav");
    }

    #[test]
    fn test_finish_keep_leaves_files() {
        let dir = tempdir().unwrap();
        let mut storage = Storage::new(dir.path());
        let path = storage.unique_path("tone");
        storage
            .write_audio(&path, &generate_test_tone(440.0, 0.1, 8000))
            .unwrap();

        assert_eq!(storage.finish().unwrap(), 0);
        assert!(path.exists());
    }

    #[test]
    fn test_finish_discard_removes_derived_only() {
        let dir = tempdir().unwrap();
        let mut storage = Storage::new(dir.path()).with_retention(RetentionPolicy::DiscardAudio);

        let upload = storage
            .save_upload(&Upload::new("a.wav", vec![0; 8]))
            .unwrap();
        let derived = storage
            .write_derived(&upload.path, "_fade", &generate_test_tone(440.0, 0.1, 8000))
            .unwrap();
        assert!(derived.exists());

        assert_eq!(storage.finish().unwrap(), 1);
        assert!(!derived.exists());
        assert!(upload.path.exists());
    }

    #[test]
    fn test_derived_file_is_never_rewritten() {
        let dir = tempdir().unwrap();
        let mut storage = Storage::new(dir.path());
        let src = dir.path().join("take.wav");

        let first = storage
            .write_derived(&src, "_15x", &generate_test_tone(440.0, 0.2, 8000))
            .unwrap();
        let before = fs::read(&first).unwrap();

        let result = storage.write_derived(&src, "_15x", &generate_test_tone(880.0, 0.1, 8000));
        assert!(matches!(
            result,
            Err(AuralabError::InvalidParameter { .. })
        ));
        assert_eq!(fs::read(&first).unwrap(), before);
        assert_eq!(storage.derived_files().len(), 1);
    }

    #[test]
    fn test_drop_applies_discard_policy() {
        let dir = tempdir().unwrap();
        let path = {
            let mut storage =
                Storage::new(dir.path()).with_retention(RetentionPolicy::DiscardAudio);
            let path = storage.unique_path("tone");
            storage
                .write_audio(&path, &generate_test_tone(440.0, 0.1, 8000))
                .unwrap();
            assert!(path.exists());
            path
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_scratch_dir_is_removed() {
        let work_dir = {
            let storage = Storage::scratch().unwrap();
            assert!(storage.work_dir().exists());
            storage.work_dir().to_path_buf()
        };
        assert!(!work_dir.exists());
    }

    #[test]
    fn test_purge_dir() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.wav"), b"a").unwrap();
        fs::write(dir.path().join("b.svg"), b"b").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        assert_eq!(purge_dir(dir.path()).unwrap(), 2);
        assert!(dir.path().join("nested").exists());
        assert_eq!(purge_dir(&dir.path().join("missing")).unwrap(), 0);
    }
}
