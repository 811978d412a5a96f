//! Archive extraction.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;
use tracing::info;

use crate::deps::DepsError;

/// Unpack an archive into `dest`, dropping the archive's top-level directory.
///
/// Supports:
/// - `.tar.gz` / `.tgz`
/// - `.tar`
/// - `.zip`
///
/// Entries that would land outside `dest` are skipped.
pub fn unpack_archive(archive_path: &Path, dest: &Path) -> Result<(), DepsError> {
  let name = archive_path
    .file_name()
    .and_then(|n| n.to_str())
    .ok_or_else(|| DepsError::UnsupportedArchive(archive_path.display().to_string()))?;

  fs::create_dir_all(dest).map_err(DepsError::Stage)?;

  let extract_error = |message: String| DepsError::Extract {
    path: archive_path.to_path_buf(),
    message,
  };

  let count = if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
    let file = File::open(archive_path).map_err(DepsError::Stage)?;
    unpack_tar(GzDecoder::new(BufReader::new(file)), dest).map_err(|e| extract_error(e.to_string()))?
  } else if name.ends_with(".tar") {
    let file = File::open(archive_path).map_err(DepsError::Stage)?;
    unpack_tar(BufReader::new(file), dest).map_err(|e| extract_error(e.to_string()))?
  } else if name.ends_with(".zip") {
    unpack_zip(archive_path, dest).map_err(|e| extract_error(e.to_string()))?
  } else {
    return Err(DepsError::UnsupportedArchive(name.to_string()));
  };

  if count == 0 {
    return Err(extract_error("archive contains no entries".to_string()));
  }

  info!(path = %dest.display(), entries = count, "unpacked archive");
  Ok(())
}

/// Strip the first component and reject anything that is not a plain name.
fn strip_top_level(path: &Path) -> Option<PathBuf> {
  let stripped: PathBuf = path.components().skip(1).collect();
  if stripped.as_os_str().is_empty() {
    return None;
  }
  stripped
    .components()
    .all(|c| matches!(c, Component::Normal(_)))
    .then_some(stripped)
}

fn unpack_tar<R: Read>(reader: R, dest: &Path) -> io::Result<usize> {
  let mut archive = Archive::new(reader);
  let mut count = 0;

  for entry in archive.entries()? {
    let mut entry = entry?;
    let path = entry.path()?.into_owned();

    let Some(stripped) = strip_top_level(&path) else {
      continue;
    };

    let dest_path = dest.join(&stripped);

    if let Some(parent) = dest_path.parent() {
      fs::create_dir_all(parent)?;
    }

    entry.unpack(&dest_path)?;
    count += 1;
  }

  Ok(count)
}

fn unpack_zip(archive_path: &Path, dest: &Path) -> io::Result<usize> {
  let file = File::open(archive_path)?;
  let mut archive = zip::ZipArchive::new(BufReader::new(file)).map_err(io::Error::other)?;
  let mut count = 0;

  for i in 0..archive.len() {
    let mut file = archive.by_index(i).map_err(io::Error::other)?;

    let Some(path) = file.enclosed_name() else {
      continue;
    };
    let Some(stripped) = strip_top_level(&path) else {
      continue;
    };

    let dest_path = dest.join(&stripped);

    if file.is_dir() {
      fs::create_dir_all(&dest_path)?;
    } else {
      if let Some(parent) = dest_path.parent() {
        fs::create_dir_all(parent)?;
      }

      let mut outfile = File::create(&dest_path)?;
      io::copy(&mut file, &mut outfile)?;

      #[cfg(unix)]
      {
        use std::os::unix::fs::PermissionsExt;
        if let Some(mode) = file.unix_mode() {
          fs::set_permissions(&dest_path, fs::Permissions::from_mode(mode))?;
        }
      }
    }
    count += 1;
  }

  Ok(count)
}
