/*!
 * Staging directory for per-host captures.
 *
 * Layout under the base directory:
 *
 * ```text
 * <base>/ssh/<host>     filtered non-empty lines of a successful host
 * <base>/<host>         captured error text of a failed host
 * <base>/.capture/      in-flight stdout/stderr of running transports
 * ```
 *
 * `StagingArea` is a scoped guard: when it is dropped, on every exit path,
 * it removes what it owns (`ssh/`, `.capture/` and the host files written
 * this run) and then the base directory if nothing else is left in it.
 * Entries it did not write are never touched.
 */

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::{AuditError, Result};

const SUCCESS_DIR: &str = "ssh";
const CAPTURE_DIR: &str = ".capture";

/// Scoped staging directory
#[derive(Debug)]
pub struct StagingArea {
    root: PathBuf,
    removed: bool,
    // Failure files written directly under `root`
    persisted: Mutex<Vec<PathBuf>>,
    // Keeps a fallback directory alive; its own drop is a no-op once removed
    _fallback: Option<TempDir>,
}

impl StagingArea {
    /// Create the staging layout under `root`. Existing directories are reused.
    pub fn create(root: &Path) -> Result<Self> {
        if root.parent().is_none() {
            return Err(AuditError::Config(format!(
                "refusing to use {} as a staging directory",
                root.display()
            )));
        }
        Self::create_layout(root)?;
        debug!(path = %root.display(), "staging directory ready");
        Ok(Self {
            root: root.to_path_buf(),
            removed: false,
            persisted: Mutex::new(Vec::new()),
            _fallback: None,
        })
    }

    /// Create the staging layout under `root`, falling back to a private
    /// temporary directory when `root` cannot be used.
    ///
    /// The second element carries a diagnostic describing the fallback.
    pub fn create_or_fallback(root: &Path) -> Result<(Self, Option<String>)> {
        match Self::create(root) {
            Ok(area) => Ok((area, None)),
            Err(AuditError::Staging { path, source }) => {
                let fallback = tempfile::Builder::new()
                    .prefix("uidaudit-")
                    .tempdir()
                    .map_err(|source| AuditError::Staging {
                        path: std::env::temp_dir(),
                        source,
                    })?;
                Self::create_layout(fallback.path())?;
                let diagnostic = format!(
                    "cannot use staging directory {} ({}); using {} instead",
                    path.display(),
                    source,
                    fallback.path().display()
                );
                warn!("{}", diagnostic);
                Ok((
                    Self {
                        root: fallback.path().to_path_buf(),
                        removed: false,
                        persisted: Mutex::new(Vec::new()),
                        _fallback: Some(fallback),
                    },
                    Some(diagnostic),
                ))
            }
            Err(other) => Err(other),
        }
    }

    fn create_layout(root: &Path) -> Result<()> {
        for dir in [root.join(SUCCESS_DIR), root.join(CAPTURE_DIR)] {
            fs::create_dir_all(&dir).map_err(|source| AuditError::Staging { path: dir, source })?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn capture_dir(&self) -> PathBuf {
        self.root.join(CAPTURE_DIR)
    }

    /// Persist the filtered lines of a successful host
    pub fn persist_success(&self, host: &str, lines: &[String]) -> io::Result<()> {
        let mut contents = lines.join("\n");
        if !contents.is_empty() {
            contents.push('\n');
        }
        fs::write(self.root.join(SUCCESS_DIR).join(file_name_for(host)), contents)
    }

    /// Persist the error text of a failed host
    pub fn persist_failure(&self, host: &str, error: &str) -> io::Result<()> {
        let path = self.root.join(file_name_for(host));
        fs::write(&path, error)?;
        self.persisted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path);
        Ok(())
    }

    /// Hosts with a staged success capture, sorted by file name
    pub fn staged_successes(&self) -> io::Result<Vec<String>> {
        list_files(&self.root.join(SUCCESS_DIR))
    }

    /// Hosts with a staged failure, sorted by file name
    pub fn staged_failures(&self) -> io::Result<Vec<String>> {
        list_files(&self.root)
    }

    /// Remove the staging layout now, reporting any failure.
    ///
    /// Entries this run did not create are left in place and reported as a
    /// `Staging` error.
    pub fn remove(mut self) -> Result<()> {
        self.removed = true;
        self.remove_owned()
    }

    fn remove_owned(&self) -> Result<()> {
        for dir in [self.root.join(SUCCESS_DIR), self.root.join(CAPTURE_DIR)] {
            remove_files_in(&dir)?;
            // A non-empty directory is reported below with the base
            let _ = fs::remove_dir(&dir);
        }

        let persisted = std::mem::take(
            &mut *self
                .persisted
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for path in persisted {
            remove_file(&path)?;
        }

        match fs::remove_dir(&self.root) {
            Ok(()) => {
                debug!(path = %self.root.display(), "staging directory removed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => {
                let source = match fs::read_dir(&self.root) {
                    Ok(entries) => io::Error::other(format!(
                        "left in place, {} entries were not written by uidaudit",
                        entries.count()
                    )),
                    Err(_) => source,
                };
                Err(AuditError::Staging {
                    path: self.root.clone(),
                    source,
                })
            }
        }
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if let Err(e) = self.remove_owned() {
            warn!("{}", e);
        }
    }
}

/// Remove the plain files directly inside `dir`; subdirectories are kept
fn remove_files_in(dir: &Path) -> Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(source) => {
            return Err(AuditError::Staging {
                path: dir.to_path_buf(),
                source,
            })
        }
    };
    for entry in entries {
        let entry = entry.map_err(|source| AuditError::Staging {
            path: dir.to_path_buf(),
            source,
        })?;
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if !is_dir {
            remove_file(&entry.path())?;
        }
    }
    Ok(())
}

fn remove_file(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(AuditError::Staging {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn list_files(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// File name used for a host inside the staging directory
pub fn file_name_for(host: &str) -> String {
    let name: String = host
        .chars()
        .filter(|c| *c != '"')
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    match name.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => name,
    }
}
