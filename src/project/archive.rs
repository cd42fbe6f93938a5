//! Zipping a project's source directory for upload

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf, StripPrefixError};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Failed to write archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Failed to walk project directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("I/O error while archiving: {0}")]
    Io(#[from] io::Error),

    #[error("Unexpected path outside the source directory: {0}")]
    StripPrefix(#[from] StripPrefixError),

    #[error("File {0} contains non-unicode symbols in its path")]
    NonUnicodePath(PathBuf),
}

/// A finished zip in a temporary file, deleted on drop
#[derive(Debug)]
pub struct ProjectArchive {
    file: NamedTempFile,
    pub files: usize,
    pub bytes: u64,
}

impl ProjectArchive {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

const IGNORED_DIRS: &[&str] = &["node_modules"];
const IGNORED_EXTENSIONS: &[&str] = &["log"];

/// Whether a file or directory name is left out of uploads
pub fn should_ignore(name: &str, is_dir: bool) -> bool {
    if name.starts_with('.') || (is_dir && IGNORED_DIRS.contains(&name)) {
        return true;
    }
    !is_dir
        && Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| IGNORED_EXTENSIONS.iter().any(|i| ext.eq_ignore_ascii_case(i)))
}

fn walk_source_directory(dir: &Path) -> impl Iterator<Item = Result<DirEntry, walkdir::Error>> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || entry
                    .file_name()
                    .to_str()
                    .map(|name| !should_ignore(name, entry.file_type().is_dir()))
                    .unwrap_or(true)
        })
}

/// Archive path of `path` relative to `root`, always `/`-separated
fn archive_name(root: &Path, path: &Path) -> Result<String, ArchiveError> {
    let relative = path.strip_prefix(root)?;
    let parts = relative
        .components()
        .map(|c| {
            c.as_os_str()
                .to_str()
                .ok_or_else(|| ArchiveError::NonUnicodePath(path.to_path_buf()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(parts.join("/"))
}

/// Zip the contents of `src_dir` into a temporary `.zip` file
pub fn build_archive(src_dir: &Path) -> Result<ProjectArchive, ArchiveError> {
    let mut temp = tempfile::Builder::new()
        .prefix("hubctl-")
        .suffix(".zip")
        .tempfile()?;
    debug!("Compressing build files to '{}'", temp.path().display());

    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut files = 0;
    {
        let mut writer = ZipWriter::new(temp.as_file_mut());
        let mut entries = walk_source_directory(src_dir);

        while let Some(entry) = entries.next().transpose()? {
            let name = archive_name(src_dir, entry.path())?;
            if name.is_empty() {
                continue;
            }

            if entry.file_type().is_dir() {
                writer.add_directory(name, options)?;
            } else if entry.file_type().is_file() {
                writer.start_file(name, options)?;
                io::copy(&mut File::open(entry.path())?, &mut writer)?;
                files += 1;
            }
        }

        writer.finish()?;
    }

    let bytes = temp.as_file().metadata()?.len();
    debug!("Project files compressed: {} files, {} bytes", files, bytes);

    Ok(ProjectArchive {
        file: temp,
        files,
        bytes,
    })
}
