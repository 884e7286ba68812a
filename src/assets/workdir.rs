//! Per-render scoped working directories.
//!
//! A [`WorkDir`] is created fresh for every render and removed when dropped,
//! on success and on every error path alike. Everything a render produces
//! (markup, stylesheet, QR codes, staged cover) lives inside it.

use std::fs;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use tempfile::TempDir;
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;

/// Directory name prefix, handy when inspecting a work root.
pub const PREFIX: &str = "framey-";

/// A scoped temporary directory owned by one render.
#[derive(Debug)]
pub struct WorkDir {
    dir: TempDir,
}

impl WorkDir {
    /// Create a fresh directory under `root`, or the system temp dir.
    pub fn create(root: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(PREFIX);
        let dir = match root {
            Some(root) => {
                fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        debug!(path = %dir.path().display(), "Created work dir");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of a file inside the directory.
    pub fn join(&self, file_name: &str) -> PathBuf {
        self.dir.path().join(file_name)
    }

    /// A unique file name such as `qr-3f2a….png`.
    pub fn unique_name(&self, prefix: &str, extension: &str) -> String {
        format!("{prefix}-{}.{extension}", Uuid::new_v4().simple())
    }

    /// Copy every file to `dest` so a render can be inspected after the
    /// directory itself is gone.
    pub fn persist_copy(&self, dest: &Path) -> Result<()> {
        fs::create_dir_all(dest)?;
        for entry in fs::read_dir(self.path())? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                fs::copy(entry.path(), dest.join(entry.file_name()))?;
            }
        }
        debug!(dest = %dest.display(), "Persisted work dir copy");
        Ok(())
    }
}

/// A file staged inside a [`WorkDir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedAsset {
    /// Name relative to the work dir (what templates reference)
    pub file_name: String,
    /// Absolute path
    pub path: PathBuf,
}

impl StagedAsset {
    pub fn new(workdir: &WorkDir, file_name: String) -> Self {
        let path = workdir.join(&file_name);
        Self { file_name, path }
    }

    /// Decode the staged file, sniffing the format from its contents.
    pub fn load(&self) -> Result<DynamicImage> {
        Ok(image::ImageReader::open(&self.path)?
            .with_guessed_format()?
            .decode()?)
    }

    pub fn size_bytes(&self) -> Result<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }
}
