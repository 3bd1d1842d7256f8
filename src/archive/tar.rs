//! Tar+gzip archive backend

use crate::archive::{copy_limited, safe_join, ArchiveError, ArchiveResult, ExtractReport, Limits};
use flate2::read::GzDecoder;
use std::fs::File;
use std::path::Path;
use tar::{Archive, EntryType};

pub(crate) fn extract_tar_gz(
    bytes: &[u8],
    dest: &Path,
    limits: &Limits,
) -> ArchiveResult<ExtractReport> {
    let decoder = GzDecoder::new(bytes);
    let mut archive = Archive::new(decoder);
    let mut report = ExtractReport::default();
    let mut total = 0u64;

    for entry in archive.entries()? {
        let mut entry = entry?;
        let name = entry.path()?.to_string_lossy().into_owned();

        let Some(path) = safe_join(dest, &name) else {
            tracing::debug!("Skipping traversal entry {:?}", name);
            report.entries_skipped += 1;
            continue;
        };

        match entry.header().entry_type() {
            EntryType::Directory => {
                std::fs::create_dir_all(&path)?;
            }
            EntryType::Regular => {
                let size = entry.header().size()?;
                if size > limits.max_entry_bytes {
                    tracing::debug!("Skipping oversized entry {:?} ({} bytes)", name, size);
                    report.entries_skipped += 1;
                    continue;
                }

                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }

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
            // Symlinks, devices and other special entries are never
            // materialized from untrusted archives.
            _ => {
                report.entries_skipped += 1;
            }
        }
    }

    Ok(report)
}
