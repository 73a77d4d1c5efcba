//! Output artifact commit protocol
//!
//! Each group owns four files in the destination directory:
//!
//! | File                     | Role                                  |
//! |--------------------------|---------------------------------------|
//! | `<g>.<ext>`              | committed artifact (terminal state)   |
//! | `<g>.<ext>.tmp`          | active write target                   |
//! | `<g>.<ext>.tmp.old`      | previous temp file awaiting replay    |
//! | `<g>.progress.json`      | progress checkpoint                   |
//!
//! The rename of the temp file to its final name is the single commit point.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

use super::PipelineError;

/// File names used by one group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupPaths {
    pub final_path: PathBuf,
    pub tmp_path: PathBuf,
    pub old_path: PathBuf,
    pub progress_path: PathBuf,
}

impl GroupPaths {
    pub fn new(destination: &Path, group_idx: usize, extension: &str) -> Self {
        let artifact = format!("{}.{}", group_idx, extension.trim_start_matches('.'));
        Self {
            final_path: destination.join(&artifact),
            tmp_path: destination.join(format!("{}.tmp", artifact)),
            old_path: destination.join(format!("{}.tmp.old", artifact)),
            progress_path: destination.join(format!("{}.progress.json", group_idx)),
        }
    }
}

/// State of a group's output at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    /// Nothing written yet
    Absent,
    /// A previous run left a temp or staged file behind
    Recovering,
    /// The final artifact exists; the group is done
    Committed,
}

/// Streaming zstd writer for the temp artifact
pub struct OutputWriter {
    encoder: zstd::stream::write::Encoder<'static, BufWriter<File>>,
    lines: u64,
    bytes: u64,
}

impl OutputWriter {
    fn create(path: &Path, compression_level: i32) -> io::Result<Self> {
        let file = File::create(path)?;
        let encoder = zstd::stream::write::Encoder::new(BufWriter::new(file), compression_level)?;
        Ok(Self {
            encoder,
            lines: 0,
            bytes: 0,
        })
    }

    /// Append one line; the newline is added here
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.encoder.write_all(line.as_bytes())?;
        self.encoder.write_all(b"\n")?;
        self.lines += 1;
        self.bytes += line.len() as u64 + 1;
        Ok(())
    }

    /// Append bytes that already end with a newline
    pub fn write_raw_line(&mut self, line: &[u8]) -> io::Result<()> {
        self.encoder.write_all(line)?;
        self.lines += 1;
        self.bytes += line.len() as u64;
        Ok(())
    }

    /// Push everything written so far to the file as complete zstd blocks
    pub fn flush(&mut self) -> io::Result<()> {
        self.encoder.flush()
    }

    /// Lines written so far
    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Uncompressed bytes written so far
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Close the zstd frame and sync the file
    fn finish(self) -> io::Result<()> {
        let buffered = self.encoder.finish()?;
        let file = buffered.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()
    }
}

/// Temp → old → final state machine for one group
pub struct OutputCommit {
    paths: GroupPaths,
}

impl OutputCommit {
    pub fn new(paths: GroupPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &GroupPaths {
        &self.paths
    }

    pub fn state(&self) -> OutputState {
        if self.paths.final_path.exists() {
            OutputState::Committed
        } else if self.paths.tmp_path.exists() || self.paths.old_path.exists() {
            OutputState::Recovering
        } else {
            OutputState::Absent
        }
    }

    /// Stage any leftover temp file as `.tmp.old` and open a fresh temp target.
    ///
    /// When both files exist, a previous replay was interrupted: the staged
    /// file still holds everything and the temp file is a partial copy of it.
    pub fn begin(&self, compression_level: i32) -> Result<OutputWriter, PipelineError> {
        if self.paths.tmp_path.exists() {
            if self.paths.old_path.exists() {
                warn!(
                    "Both {} and {} exist, discarding the partial replay",
                    self.paths.tmp_path.display(),
                    self.paths.old_path.display()
                );
                fs::remove_file(&self.paths.tmp_path)?;
            } else {
                fs::rename(&self.paths.tmp_path, &self.paths.old_path)?;
            }
        }
        Ok(OutputWriter::create(&self.paths.tmp_path, compression_level)?)
    }

    /// Close the temp file without committing it
    pub fn suspend(&self, writer: OutputWriter) -> Result<(), PipelineError> {
        writer.finish()?;
        Ok(())
    }

    /// Close the temp file and atomically rename it to the final artifact
    pub fn commit(&self, writer: OutputWriter) -> Result<(), PipelineError> {
        writer.finish()?;
        fs::rename(&self.paths.tmp_path, &self.paths.final_path)?;
        Ok(())
    }
}
