//! Archive extraction with resource caps
//!
//! This module unpacks downloaded distribution archives into a destination
//! directory under two safety constraints:
//! - Path traversal ("zip-slip") entries are skipped, never written
//! - A per-entry size cap skips oversized entries; a global cap aborts the
//!   whole extraction
//!
//! Zip and tar+gzip containers sit behind one entry point, selected by the
//! registry's declared [`ArchiveKind`] rather than by file extension.

mod tar;
mod zip;

use std::io::{Read, Write};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during archive extraction
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Zip error: {0}")]
    Zip(#[from] ::zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Extraction exceeds total size cap of {limit} bytes")]
    TotalSizeExceeded { limit: u64 },
}

/// Result type for archive operations
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Container format of a downloaded archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
}

/// Size caps applied during extraction
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Maximum size of a single extracted file; larger entries are skipped
    pub max_entry_bytes: u64,

    /// Maximum total extracted bytes; exceeding this aborts the extraction
    pub max_total_bytes: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_entry_bytes: 8 * 1024 * 1024,
            max_total_bytes: 512 * 1024 * 1024,
        }
    }
}

/// What an extraction actually did
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtractReport {
    pub files_written: u64,
    pub entries_skipped: u64,
    pub bytes_written: u64,
}

/// Extracts an in-memory archive into `dest`, applying `limits`
///
/// Traversal entries and oversized individual entries are skipped and
/// counted in the report; blowing the total cap is an error and leaves a
/// partial extraction behind, which the caller is expected to discard with
/// its temp directory.
pub fn extract(
    bytes: &[u8],
    kind: ArchiveKind,
    dest: &Path,
    limits: &Limits,
) -> ArchiveResult<ExtractReport> {
    std::fs::create_dir_all(dest)?;
    match kind {
        ArchiveKind::Zip => zip::extract_zip(bytes, dest, limits),
        ArchiveKind::TarGz => tar::extract_tar_gz(bytes, dest, limits),
    }
}

/// Joins an archive entry name onto the destination root, rejecting escapes
///
/// Returns `None` for absolute names and names with `..` segments, so the
/// resolved path always stays inside `root`.
pub(crate) fn safe_join(root: &Path, name: &str) -> Option<PathBuf> {
    let mut clean = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if clean.as_os_str().is_empty() {
        return None;
    }
    Some(root.join(clean))
}

/// Copies at most `limit` bytes, returning the number written
pub(crate) fn copy_limited<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    limit: u64,
) -> std::io::Result<u64> {
    let mut total = 0u64;
    let mut buf = [0u8; 8192];

    loop {
        let remaining = limit.saturating_sub(total);
        if remaining == 0 {
            break;
        }
        let to_read = buf.len().min(remaining as usize);
        let n = reader.read(&mut buf[..to_read])?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_join_accepts_nested_paths() {
        let root = Path::new("/tmp/dest");
        assert_eq!(
            safe_join(root, "pkg/src/lib.go"),
            Some(root.join("pkg/src/lib.go"))
        );
    }

    #[test]
    fn safe_join_strips_curdir() {
        let root = Path::new("/tmp/dest");
        assert_eq!(safe_join(root, "./a/./b"), Some(root.join("a/b")));
    }

    #[test]
    fn safe_join_rejects_parent_segments() {
        let root = Path::new("/tmp/dest");
        assert_eq!(safe_join(root, "../evil.txt"), None);
        assert_eq!(safe_join(root, "a/../../evil.txt"), None);
    }

    #[test]
    fn safe_join_rejects_absolute_paths() {
        let root = Path::new("/tmp/dest");
        assert_eq!(safe_join(root, "/etc/passwd"), None);
    }

    #[test]
    fn safe_join_rejects_empty_names() {
        let root = Path::new("/tmp/dest");
        assert_eq!(safe_join(root, ""), None);
        assert_eq!(safe_join(root, "."), None);
    }

    #[test]
    fn copy_limited_stops_at_limit() {
        let data = vec![7u8; 100];
        let mut out = Vec::new();
        let written = copy_limited(&mut data.as_slice(), &mut out, 42).unwrap();
        assert_eq!(written, 42);
        assert_eq!(out.len(), 42);
    }
}
