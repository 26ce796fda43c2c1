use crate::error::LocateError;
use std::env;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use walkdir::WalkDir;

/// A validated path to the saga_cmd executable.
///
/// Construction checks that the path exists, points to a regular file
/// and carries an executable bit (on Unix). The path is immutable once
/// validated; a [`crate::Saga`] owns exactly one `SagaCmd` and shares
/// it with every library and tool derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SagaCmd {
  path: PathBuf,
}

impl SagaCmd {
  /// Validates `path` as the saga_cmd executable.
  pub fn new(path: impl Into<PathBuf>) -> Result<Self, LocateError> {
    let path = path.into();
    if !path.exists() {
      return Err(LocateError::PathDoesNotExist(path));
    }
    if !path.is_file() {
      return Err(LocateError::NotAFile(path));
    }
    check_executable(&path)?;
    Ok(Self { path })
  }

  /// Searches well-known installation directories (and `PATH`) for a
  /// saga_cmd executable.
  ///
  /// The directory list mirrors the stock SAGA GIS installers per
  /// platform. The first candidate that validates wins.
  pub fn locate() -> Result<Self, LocateError> {
    if let Some(found) = search_path_env() {
      tracing::debug!(path = %found.display(), "Found saga_cmd on PATH");
      return Self::new(found);
    }
    for dir in SEARCH_DIRS {
      let dir = Path::new(dir);
      if !dir.is_dir() {
        continue;
      }
      let hit = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .find(|entry| {
          entry.file_type().is_file() && entry.file_name() == EXECUTABLE_NAME
        });
      if let Some(entry) = hit {
        if let Ok(cmd) = Self::new(entry.path()) {
          tracing::debug!(path = %cmd.path.display(), "Found saga_cmd");
          return Ok(cmd);
        }
      }
    }
    Err(LocateError::NotFound)
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl AsRef<Path> for SagaCmd {
  fn as_ref(&self) -> &Path {
    &self.path
  }
}

impl fmt::Display for SagaCmd {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.path.display())
  }
}

#[cfg(windows)]
const EXECUTABLE_NAME: &str = "saga_cmd.exe";
#[cfg(not(windows))]
const EXECUTABLE_NAME: &str = "saga_cmd";

#[cfg(target_os = "windows")]
const SEARCH_DIRS: &[&str] = &[
  "C:/Program Files/SAGA-GIS",
  "C:/Program Files (x86)/SAGA-GIS",
  "C:/SAGA-GIS",
  "C:/OSGeo4W",
  "C:/OSGeo4W64",
];
#[cfg(target_os = "macos")]
const SEARCH_DIRS: &[&str] = &[
  "/Applications/SAGA.app/Contents/MacOS",
  "/usr/local/bin",
  "/Applications/QGIS.app/Contents/MacOS/bin",
];
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const SEARCH_DIRS: &[&str] = &["/usr"];

fn search_path_env() -> Option<PathBuf> {
  let path_var = env::var_os("PATH")?;
  env::split_paths(&path_var)
    .map(|dir| dir.join(EXECUTABLE_NAME))
    .find(|candidate| SagaCmd::new(candidate.clone()).is_ok())
}

/// Checks that the file at `path` can be executed.
#[cfg(unix)]
pub fn check_executable(path: &Path) -> Result<(), LocateError> {
  use std::os::unix::fs::PermissionsExt;

  let metadata = path.metadata().map_err(|source| LocateError::Metadata {
    path: path.to_path_buf(),
    source,
  })?;
  if metadata.permissions().mode() & 0o111 == 0 {
    return Err(LocateError::NotExecutable(path.to_path_buf()));
  }
  Ok(())
}

/// Checks that the file at `path` can be executed.
///
/// Windows has no executable bit; a regular file is accepted as-is.
#[cfg(not(unix))]
pub fn check_executable(_path: &Path) -> Result<(), LocateError> {
  Ok(())
}
