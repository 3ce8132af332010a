use std::path::PathBuf;
use thiserror::Error;

/// Per-file failure. The pipeline records it and moves on to the next file.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid UTF-8", path.display())]
    NonUtf8 { path: PathBuf },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not inside view root {}", path.display(), root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("failed to clean {}: {source}", path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CompileError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            CompileError::Read { path, .. }
            | CompileError::NonUtf8 { path }
            | CompileError::Write { path, .. }
            | CompileError::OutsideRoot { path, .. }
            | CompileError::Cleanup { path, .. } => path,
        }
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;
