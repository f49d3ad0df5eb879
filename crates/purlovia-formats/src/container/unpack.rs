//! File and directory unpacking

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info};
use walkdir::WalkDir;

use super::error::{ContainerError, ContainerResult};
use super::{ContainerSummary, decode};

const COMPRESSED_SUFFIX: &str = "z";
const SIZE_SIDECAR_SUFFIX: &str = "uncompressed_size";
const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// Counts of files handled by [`unpack_directory`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UnpackReport {
    /// Containers decoded
    pub decoded: usize,
    /// Plain files copied
    pub copied: usize,
    /// Size side files ignored
    pub skipped: usize,
}

/// Decode the container at `src` into `dst`.
///
/// Output goes to a temporary file in the destination directory which is
/// renamed over `dst` only after every chunk has been verified.
pub fn unpack_file(src: &Path, dst: &Path) -> ContainerResult<ContainerSummary> {
    let mut input = BufReader::new(File::open(src)?);

    let parent = match dst.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut staging = NamedTempFile::new_in(parent)?;
    let summary = {
        let mut output = BufWriter::with_capacity(WRITE_BUFFER_SIZE, staging.as_file_mut());
        let summary = decode(&mut input, &mut output)?;
        output.flush()?;
        summary
    };
    staging
        .persist(dst)
        .map_err(|e| ContainerError::Io(e.error))?;

    debug!(
        src = %src.display(),
        dst = %dst.display(),
        bytes = summary.uncompressed_size,
        "Unpacked container"
    );
    Ok(summary)
}

/// Unpack a downloaded mod tree from `src` into `dst`.
///
/// Files with a `.z` suffix are decoded to the same relative path without the
/// suffix, `.uncompressed_size` side files are skipped and anything else is
/// copied unchanged. Existing files in `dst` are overwritten.
pub fn unpack_directory(src: &Path, dst: &Path) -> ContainerResult<UnpackReport> {
    let mut report = UnpackReport::default();

    for entry in WalkDir::new(src) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };

        let suffix = relative
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
        match suffix.as_deref() {
            Some(COMPRESSED_SUFFIX) => {
                unpack_file(entry.path(), &dst.join(relative.with_extension("")))?;
                report.decoded += 1;
            }
            Some(SIZE_SIDECAR_SUFFIX) => report.skipped += 1,
            _ => {
                let target = dst.join(relative);
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(entry.path(), &target)?;
                report.copied += 1;
            }
        }
    }

    info!(
        src = %src.display(),
        decoded = report.decoded,
        copied = report.copied,
        skipped = report.skipped,
        "Unpacked mod directory"
    );
    Ok(report)
}
