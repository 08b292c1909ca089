//! Archive extraction module
//!
//! Remote ios builds arrive as gzip-tar archives of an `.app` directory.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Errors raised while unpacking an archive.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Reading the archive or writing an entry failed (includes corrupt gzip/tar
    /// data and entries that would be written through a symlink out of the
    /// destination).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// An entry would land outside the destination directory.
    #[error("Invalid path in archive: {0}")]
    UnsafePath(String),
}

/// Extract a tar.gz archive into `dest_dir`, returning the relative paths unpacked.
pub fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    let file = File::open(archive_path)?;
    let reader = BufReader::new(file);
    let gz_decoder = flate2::read::GzDecoder::new(reader);

    extract_tar(gz_decoder, dest_dir)
}

/// Extract a tar stream from a reader
fn extract_tar<R: Read>(reader: R, dest_dir: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    fs::create_dir_all(dest_dir)?;

    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(true);
    let mut extracted = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let relative_path = sanitize(&entry.path()?)?;
        if relative_path.as_os_str().is_empty() {
            continue;
        }

        // unpack_in refuses to write through a symlink that leads out of dest_dir.
        if !entry.unpack_in(dest_dir)? {
            return Err(ExtractError::UnsafePath(relative_path.display().to_string()));
        }

        extracted.push(relative_path);
    }

    Ok(extracted)
}

/// Strip `.` components and reject anything that could escape the destination.
fn sanitize(path: &Path) -> Result<PathBuf, ExtractError> {
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ExtractError::UnsafePath(path.display().to_string()));
            }
        }
    }
    Ok(clean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{tgz, tree};

    #[test]
    fn test_extracts_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("build.app.tgz");
        std::fs::write(
            &archive,
            tgz(&[
                ("build.h.app/Info.plist", b"plist"),
                ("build.h.app/Frameworks/lib.dylib", b"dylib"),
            ]),
        )
        .unwrap();

        let out = dir.path().join("out");
        let files = extract_tar_gz(&archive, &out).unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(
            tree(&out.join("build.h.app")),
            vec![
                ("Frameworks/lib.dylib".to_string(), b"dylib".to_vec()),
                ("Info.plist".to_string(), b"plist".to_vec()),
            ]
        );
    }

    #[test]
    fn test_corrupt_archive_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bad.tgz");
        std::fs::write(&archive, b"definitely not gzip").unwrap();

        assert!(extract_tar_gz(&archive, &dir.path().join("out")).is_err());
    }

    #[test]
    fn test_sanitize_rejects_escapes() {
        assert!(sanitize(Path::new("../etc/passwd")).is_err());
        assert!(sanitize(Path::new("/etc/passwd")).is_err());
        assert_eq!(
            sanitize(Path::new("./build.app/Info.plist")).unwrap(),
            PathBuf::from("build.app/Info.plist")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_cannot_redirect_writes_outside() {
        let dir = tempfile::tempdir().unwrap();
        let outside = dir.path().join("outside");
        std::fs::create_dir_all(&outside).unwrap();

        let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let mut link = tar::Header::new_gnu();
        link.set_entry_type(tar::EntryType::Symlink);
        link.set_size(0);
        link.set_mode(0o777);
        builder
            .append_link(&mut link, "build.h.app/link", &outside)
            .unwrap();
        let mut file = tar::Header::new_gnu();
        file.set_size(5);
        file.set_mode(0o644);
        file.set_cksum();
        builder
            .append_data(&mut file, "build.h.app/link/pwned", &b"pwned"[..])
            .unwrap();
        let bytes = builder.into_inner().unwrap().finish().unwrap();

        let archive = dir.path().join("evil.tgz");
        std::fs::write(&archive, bytes).unwrap();

        let result = extract_tar_gz(&archive, &dir.path().join("out"));
        assert!(result.is_err());
        assert!(!outside.join("pwned").exists());
    }
}
