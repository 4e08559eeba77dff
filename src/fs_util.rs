use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;

use crate::error::TaxLookupError;

/// Extracts the named top-level members of a `.tar.gz` into `target_dir`.
///
/// Every member must be present; other entries are skipped. Files are
/// written through a temp file so a failed run never leaves a truncated dump.
pub fn extract_tar_gz_members(
    archive_path: &Path,
    members: &[&str],
    target_dir: &Path,
) -> Result<Vec<PathBuf>, TaxLookupError> {
    let file = fs::File::open(archive_path).map_err(|err| {
        TaxLookupError::Filesystem(format!("open archive {}: {err}", archive_path.display()))
    })?;
    let mut archive = Archive::new(GzDecoder::new(file));
    fs::create_dir_all(target_dir).map_err(|err| TaxLookupError::Filesystem(err.to_string()))?;

    let mut extracted: Vec<(&str, PathBuf)> = Vec::with_capacity(members.len());
    let entries = archive
        .entries()
        .map_err(|err| TaxLookupError::Filesystem(format!("read tar archive: {err}")))?;
    for entry in entries {
        let mut entry =
            entry.map_err(|err| TaxLookupError::Filesystem(format!("read tar entry: {err}")))?;
        let path = entry
            .path()
            .map_err(|err| TaxLookupError::Filesystem(format!("read tar entry path: {err}")))?
            .into_owned();
        let path = path.strip_prefix(".").unwrap_or(path.as_path());
        let Some(member) = members
            .iter()
            .copied()
            .find(|member| Path::new(member) == path)
        else {
            continue;
        };
        if extracted.iter().any(|(done, _)| *done == member) {
            continue;
        }
        let destination = target_dir.join(member);
        write_atomic_from(&mut entry, &destination)?;
        extracted.push((member, destination));
    }

    for member in members {
        if !extracted.iter().any(|(done, _)| done == member) {
            return Err(TaxLookupError::MissingArchiveMember(member.to_string()));
        }
    }
    Ok(extracted.into_iter().map(|(_, path)| path).collect())
}

/// Streams `reader` into `destination` via a sibling temp file and a rename.
pub fn write_atomic_from<R: io::Read>(
    reader: &mut R,
    destination: &Path,
) -> Result<u64, TaxLookupError> {
    let parent = destination
        .parent()
        .ok_or_else(|| TaxLookupError::Filesystem("invalid destination path".to_string()))?;
    fs::create_dir_all(parent).map_err(|err| TaxLookupError::Filesystem(err.to_string()))?;
    let mut temp = tempfile::Builder::new()
        .prefix("kira-tax")
        .tempfile_in(parent)
        .map_err(|err| TaxLookupError::Filesystem(err.to_string()))?;
    let written = io::copy(reader, temp.as_file_mut()).map_err(|err| {
        TaxLookupError::Filesystem(format!("write {}: {err}", destination.display()))
    })?;
    temp.persist(destination)
        .map_err(|err| TaxLookupError::Filesystem(err.to_string()))?;
    Ok(written)
}

pub fn remove_file_if_exists(path: &Path) -> Result<bool, TaxLookupError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(TaxLookupError::Filesystem(format!(
            "remove {}: {err}",
            path.display()
        ))),
    }
}
