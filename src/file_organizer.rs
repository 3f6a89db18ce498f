/// File relocation primitives.
///
/// This module lists the plain files of a directory, moves a file into a
/// rule's destination folder (creating the folder on demand) and hoists the
/// files of immediate subdirectories into their parent. Moves never
/// overwrite an existing file.
use chrono::{DateTime, Local};
use log::{debug, error};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A snapshot of one plain file in the directory being organized.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// The file name, without any directory component.
    pub name: String,
    /// The full path to the file.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: DateTime<Local>,
}

impl FileEntry {
    /// Builds an entry from a path by reading its metadata.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let metadata = fs::metadata(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        // UNIX_EPOCH keeps unreadable mtimes out of every age range.
        let modified: DateTime<Local> = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH).into();
        Ok(Self {
            name,
            path: path.to_path_buf(),
            size: metadata.len(),
            modified,
        })
    }

    /// The file's suffix including the dot (`.pdf`), if any.
    ///
    /// Dotfiles such as `.bashrc` have no suffix.
    pub fn suffix(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
    }
}

/// Represents a single completed move.
#[derive(Debug, Clone)]
pub struct Operation {
    /// The path of the file before the move.
    pub original_path: PathBuf,
    /// The path of the file after the move.
    pub new_path: PathBuf,
    /// The destination folder, relative to the organized directory.
    pub folder: String,
}

/// Errors that can occur during file organization operations.
#[derive(Debug)]
pub enum OrganizeError {
    /// The target is missing or not a directory.
    InvalidDirectory { path: PathBuf },
    /// Failed to create a destination directory.
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to move a file to its destination.
    MoveFailed {
        source: PathBuf,
        destination: PathBuf,
        source_error: std::io::Error,
    },
    /// Failed to list a directory.
    EnumerationFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for OrganizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDirectory { path } => {
                write!(f, "{} is not a valid directory", path.display())
            }
            Self::DirectoryCreationFailed { path, source } => {
                write!(
                    f,
                    "Failed to create directory {}: {}",
                    path.display(),
                    source
                )
            }
            Self::MoveFailed {
                source,
                destination,
                source_error,
            } => {
                write!(
                    f,
                    "Failed to move {} to {}: {}",
                    source.display(),
                    destination.display(),
                    source_error
                )
            }
            Self::EnumerationFailed { path, source } => {
                write!(f, "Failed to list {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for OrganizeError {}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Moves files around inside the directory being organized.
pub struct FileOrganizer;

impl FileOrganizer {
    /// Lists the plain files directly inside `dir`, sorted by name.
    ///
    /// Entries whose metadata cannot be read are skipped.
    pub fn list_files(dir: &Path) -> OrganizeResult<Vec<FileEntry>> {
        let entries = fs::read_dir(dir).map_err(|e| OrganizeError::EnumerationFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let mut files: Vec<FileEntry> = entries
            .flatten()
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| FileEntry::from_path(&entry.path()).ok())
            .collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Moves `file_path` into `base_path/folder`, creating the folder and any
    /// missing parents first.
    ///
    /// # Errors
    ///
    /// Returns `MoveFailed` if the destination already exists or the rename
    /// fails, and `DirectoryCreationFailed` if the folder cannot be created.
    pub fn move_into(base_path: &Path, file_path: &Path, folder: &str) -> OrganizeResult<Operation> {
        let folder_path = base_path.join(folder);

        if !folder_path.is_dir() {
            fs::create_dir_all(&folder_path).map_err(|e| {
                OrganizeError::DirectoryCreationFailed {
                    path: folder_path.clone(),
                    source: e,
                }
            })?;
        }

        let file_name = file_path.file_name().ok_or_else(|| OrganizeError::MoveFailed {
            source: file_path.to_path_buf(),
            destination: folder_path.clone(),
            source_error: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "file has no name component",
            ),
        })?;

        let destination_path = folder_path.join(file_name);
        Self::rename_no_clobber(file_path, &destination_path)?;
        debug!(
            "Moved {} -> {}",
            file_path.display(),
            destination_path.display()
        );

        Ok(Operation {
            original_path: file_path.to_path_buf(),
            new_path: destination_path,
            folder: folder.to_string(),
        })
    }

    /// Hoists every plain file of each immediate subdirectory of `base_path`
    /// into `base_path`. Deeper levels are left alone.
    ///
    /// Per-file failures are logged and collected, never fatal.
    pub fn flatten_subdirectories(
        base_path: &Path,
    ) -> OrganizeResult<(Vec<Operation>, Vec<OrganizeError>)> {
        let entries = fs::read_dir(base_path).map_err(|e| OrganizeError::EnumerationFailed {
            path: base_path.to_path_buf(),
            source: e,
        })?;

        let mut subdirs: Vec<PathBuf> = entries
            .flatten()
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .map(|entry| entry.path())
            .collect();
        subdirs.sort();

        let mut moved = Vec::new();
        let mut failures = Vec::new();

        for subdir in subdirs {
            let files = match Self::list_files(&subdir) {
                Ok(files) => files,
                Err(e) => {
                    error!("{}", e);
                    failures.push(e);
                    continue;
                }
            };

            for file in files {
                let destination = base_path.join(&file.name);
                match Self::rename_no_clobber(&file.path, &destination) {
                    Ok(()) => moved.push(Operation {
                        original_path: file.path,
                        new_path: destination,
                        folder: String::new(),
                    }),
                    Err(e) => {
                        error!("Error moving file {}: {}", file.name, e);
                        failures.push(e);
                    }
                }
            }
        }

        Ok((moved, failures))
    }

    fn rename_no_clobber(source: &Path, destination: &Path) -> OrganizeResult<()> {
        if destination.exists() {
            return Err(OrganizeError::MoveFailed {
                source: source.to_path_buf(),
                destination: destination.to_path_buf(),
                source_error: std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "destination already exists",
                ),
            });
        }

        fs::rename(source, destination).map_err(|e| OrganizeError::MoveFailed {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            source_error: e,
        })
    }
}
