use crate::command::CommandOutput;
use crate::error::ExecutionError;
use crate::saga::Tool;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::OnceLock;

/// The captured outcome of a program- or library-level invocation.
///
/// Construction fails with [`ExecutionError::Stderr`] when the process
/// wrote a non-empty (after trimming) stderr and the caller did not
/// opt to ignore it.
#[derive(Debug)]
pub struct Output {
  pub stdout: String,
  /// Trimmed stderr text, present only when non-empty and ignored.
  pub stderr: Option<String>,
  pub status: ExitStatus,
}

impl Output {
  pub(crate) fn from_raw(
    target: &str,
    raw: CommandOutput,
    ignore_stderr: bool,
  ) -> Result<Self, ExecutionError> {
    let trimmed = raw.stderr.trim();
    if !trimmed.is_empty() && !ignore_stderr {
      return Err(ExecutionError::Stderr {
        target: target.to_string(),
        stderr: trimmed.to_string(),
      });
    }
    let stderr = (!trimmed.is_empty()).then(|| trimmed.to_string());
    Ok(Self {
      stdout: raw.stdout,
      stderr,
      status: raw.status,
    })
  }
}

/// Classification of an output file by its extension, against the
/// format sets probed from the program itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileKind {
  Raster,
  Vector,
  /// Unrecognized extension, or the format caches were never
  /// populated.
  Other,
}

/// One declared parameter whose value names an existing file.
#[derive(Debug, Clone, Serialize)]
pub struct OutputFile {
  pub parameter: String,
  pub path: PathBuf,
  pub kind: FileKind,
}

/// The captured outcome of a tool invocation.
///
/// On top of [`Output`]'s contract, associates the producing [`Tool`]
/// and classifies the parameters that point at files on disk. The file
/// listing is computed lazily and cached on first access.
#[derive(Debug)]
pub struct ToolOutput {
  tool: Tool,
  pub stdout: String,
  /// Trimmed stderr text, present only when non-empty and ignored.
  pub stderr: Option<String>,
  pub status: ExitStatus,
  files: OnceLock<Vec<OutputFile>>,
}

impl ToolOutput {
  pub(crate) fn new(
    tool: Tool,
    raw: CommandOutput,
    ignore_stderr: bool,
  ) -> Result<Self, ExecutionError> {
    let base = Output::from_raw(&tool.to_string(), raw, ignore_stderr)?;
    Ok(Self {
      tool,
      stdout: base.stdout,
      stderr: base.stderr,
      status: base.status,
      files: OnceLock::new(),
    })
  }

  /// The tool that produced this output, with its resolved parameters.
  pub fn tool(&self) -> &Tool {
    &self.tool
  }

  /// Every declared parameter whose resolved value names an existing
  /// regular file, in parameter order.
  pub fn files(&self) -> &[OutputFile] {
    self.files.get_or_init(|| collect_files(&self.tool))
  }

  /// The resolved path of one parameter, when it names an existing
  /// file.
  pub fn file(&self, parameter: &str) -> Option<&Path> {
    self
      .files()
      .iter()
      .find(|file| file.parameter == parameter)
      .map(|file| file.path.as_path())
  }

  pub fn rasters(&self) -> Vec<&OutputFile> {
    self.of_kind(FileKind::Raster)
  }

  pub fn vectors(&self) -> Vec<&OutputFile> {
    self.of_kind(FileKind::Vector)
  }

  fn of_kind(&self, kind: FileKind) -> Vec<&OutputFile> {
    self
      .files()
      .iter()
      .filter(|file| file.kind == kind)
      .collect()
  }
}

fn collect_files(tool: &Tool) -> Vec<OutputFile> {
  let saga = tool.saga();
  let rasters = saga.cached_raster_formats();
  let vectors = saga.cached_vector_formats();

  tool
    .parameters()
    .iter()
    .filter_map(|(name, value)| {
      let path = Path::new(value);
      if !path.is_file() {
        return None;
      }
      Some(OutputFile {
        parameter: name.to_string(),
        path: path.to_path_buf(),
        kind: classify(path, rasters, vectors),
      })
    })
    .collect()
}

fn classify(
  path: &Path,
  rasters: Option<&BTreeSet<String>>,
  vectors: Option<&BTreeSet<String>>,
) -> FileKind {
  let Some(extension) = path.extension().map(|ext| ext.to_string_lossy()) else {
    return FileKind::Other;
  };
  if rasters.is_some_and(|formats| formats.contains(extension.as_ref())) {
    FileKind::Raster
  } else if vectors.is_some_and(|formats| formats.contains(extension.as_ref())) {
    FileKind::Vector
  } else {
    FileKind::Other
  }
}
