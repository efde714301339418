use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Read a whole file.
pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::io("read", path, e))
}

/// Write `data` to `path` via a temporary file in the same directory and a
/// rename, so a failed write never leaves a truncated `path` behind.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    stage(path, data)?.commit()
}

/// Write several files together: every file is staged before any target is
/// replaced, and targets are renamed into place in the given order.
///
/// A failure while staging leaves every target untouched. A failed rename
/// stops before the later targets.
pub fn write_all_atomic(files: &[(&Path, &[u8])]) -> Result<()> {
    let staged = files
        .iter()
        .map(|&(path, data)| stage(path, data))
        .collect::<Result<Vec<_>>>()?;
    for file in staged {
        file.commit()?;
    }
    Ok(())
}

/// A fully written temporary file waiting to be renamed onto its target.
struct Staged<'a> {
    tmp: NamedTempFile,
    target: &'a Path,
}

impl Staged<'_> {
    fn commit(self) -> Result<()> {
        self.tmp
            .persist(self.target)
            .map_err(|e| Error::io("rename into", self.target, e.error))?;
        Ok(())
    }
}

fn stage<'a>(path: &'a Path, data: &[u8]) -> Result<Staged<'a>> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp =
        NamedTempFile::new_in(dir).map_err(|e| Error::io("create temp file in", dir, e))?;
    tmp.write_all(data)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| Error::io("write", tmp.path(), e))?;
    Ok(Staged { tmp, target: path })
}
