use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::debug;

/// A title resource loaded from disk.
pub struct ResourceFile {
    path: PathBuf,
    bytes: Vec<u8>,
}

impl ResourceFile {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let bytes = fs::read(&path).with_context(|| format!("failed to read resource {}", path.display()))?;
        debug!("loaded {} bytes from {}", bytes.len(), path.display());

        Ok(Self { path, bytes })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Writes to `target`, or back over the file it was loaded from.
    ///
    /// The bytes go to a temp file in the destination directory first and
    /// are renamed into place once complete.
    pub fn save(&self, target: Option<&Path>) -> Result<PathBuf> {
        let target = target.unwrap_or(&self.path);
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp = NamedTempFile::new_in(dir)
            .with_context(|| format!("failed to create a temp file in {}", dir.display()))?;
        temp.write_all(&self.bytes)?;
        temp.persist(target)
            .with_context(|| format!("failed to write resource {}", target.display()))?;

        debug!("saved {} bytes to {}", self.bytes.len(), target.display());
        Ok(target.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_in_place_and_elsewhere() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("title.bin");
        fs::write(&path, [1u8, 2, 3]).unwrap();

        let mut resource = ResourceFile::open(&path).unwrap();
        assert_eq!(resource.bytes(), &[1, 2, 3]);
        resource.bytes_mut()[1] = 9;

        let copy = dir.path().join("copy.bin");
        resource.save(Some(&copy)).unwrap();
        assert_eq!(fs::read(&copy).unwrap(), vec![1, 9, 3]);
        assert_eq!(fs::read(&path).unwrap(), vec![1, 2, 3]);

        assert_eq!(resource.save(None).unwrap(), path);
        assert_eq!(fs::read(&path).unwrap(), vec![1, 9, 3]);
    }

    #[test]
    fn missing_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let error = ResourceFile::open(dir.path().join("nope.bin")).err().unwrap();
        assert!(format!("{error:#}").contains("nope.bin"));
    }
}
