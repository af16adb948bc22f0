use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output path {0:?} is not a directory")]
    NotADirectory(PathBuf),
    #[error("cannot create output directory {path:?}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Creates `dir` (and parents) unless it already exists as a directory.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(PersistError::NotADirectory(dir.to_path_buf())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(dir).map_err(|source| PersistError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })
        }
        Err(err) => Err(err.into()),
    }
}

/// Stores downloaded stems under one output directory.
pub struct StemWriter {
    dir: PathBuf,
}

impl StemWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Opens a staging file next to `{dir}/{file_name}`; nothing is visible there until commit.
    pub fn begin(&self, file_name: &str) -> Result<StagedStem, PersistError> {
        ensure_output_dir(&self.dir)?;
        Ok(StagedStem {
            tmp: NamedTempFile::new_in(&self.dir)?,
            target: self.dir.join(file_name),
            written: 0,
        })
    }

    /// Stores a complete stem in one go.
    pub fn write(&self, file_name: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        let mut staged = self.begin(file_name)?;
        staged.append(content)?;
        staged.commit()
    }
}

/// A stem being received chunk by chunk. Dropping it without `commit` discards the data.
pub struct StagedStem {
    tmp: NamedTempFile,
    target: PathBuf,
    written: u64,
}

impl StagedStem {
    pub fn append(&mut self, chunk: &[u8]) -> Result<(), PersistError> {
        self.tmp.write_all(chunk)?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flushes and renames into place, replacing an earlier download of the same stem.
    pub fn commit(mut self) -> Result<PathBuf, PersistError> {
        self.tmp.flush()?;
        self.tmp.as_file().sync_all()?;
        self.tmp
            .persist(&self.target)
            .map_err(|err| PersistError::Io(err.error))?;
        Ok(self.target)
    }
}
