//! Zip archive backend

use crate::archive::{copy_limited, safe_join, ArchiveError, ArchiveResult, ExtractReport, Limits};
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use zip::ZipArchive;

pub(crate) fn extract_zip(bytes: &[u8], dest: &Path, limits: &Limits) -> ArchiveResult<ExtractReport> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut report = ExtractReport::default();
    let mut total = 0u64;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();

        let Some(path) = safe_join(dest, &name) else {
            tracing::debug!("Skipping traversal entry {:?}", name);
            report.entries_skipped += 1;
            continue;
        };

        if entry.is_dir() {
            std::fs::create_dir_all(&path)?;
            continue;
        }

        if entry.size() > limits.max_entry_bytes {
            tracing::debug!(
                "Skipping oversized entry {:?} ({} bytes)",
                name,
                entry.size()
            );
            report.entries_skipped += 1;
            continue;
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Stream with a cap rather than trusting the declared size; a
        // crafted header can understate it.
        let mut file = File::create(&path)?;
        let written = copy_limited(&mut entry, &mut file, limits.max_entry_bytes)?;

        total = total.saturating_add(written);
        if total > limits.max_total_bytes {
            return Err(ArchiveError::TotalSizeExceeded {
                limit: limits.max_total_bytes,
            });
        }

        report.files_written += 1;
        report.bytes_written += written;
    }

    Ok(report)
}
