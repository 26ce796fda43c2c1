use crate::command::Command;
use crate::command::CommandOutput;
use crate::command::ConsoleProgress;
use crate::command::ProgressSink;
use crate::error::ExecutionError;
use crate::error::FlagError;
use crate::error::SagaError;
use crate::flag::Flag;
use crate::formats;
use crate::formats::FormatKind;
use crate::formats::SagaVersion;
use crate::locate::SagaCmd;
use crate::output::Output;
use crate::output::ToolOutput;
use crate::parameters::ParameterValue;
use crate::parameters::Parameters;
use std::collections::BTreeSet;
use std::fmt;
use std::io;
use std::ops::Div;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use tempfile::TempDir;
use tokio::sync::OnceCell;

/// State shared between a [`Saga`] and every library and tool derived
/// from it: the validated executable, the lazily created scratch
/// directory and the write-once probe caches.
#[derive(Debug)]
struct SagaInner {
  cmd: SagaCmd,
  temp_dir: Mutex<Option<TempDir>>,
  version: OnceCell<Option<SagaVersion>>,
  raster_formats: OnceCell<BTreeSet<String>>,
  vector_formats: OnceCell<BTreeSet<String>>,
}

/// The SAGA GIS main program.
///
/// The root of the target hierarchy. Cloning a `Saga` produces another
/// handle onto the same executable, temp directory and probe caches;
/// only the flag is per-handle (children copy it at construction).
///
/// ```no_run
/// use sagacmd::{ExecOptions, Saga};
///
/// # async fn run() -> Result<(), sagacmd::SagaError> {
/// let saga = Saga::new("/usr/local/bin/saga_cmd")?;
/// let mut slope = &saga / "ta_morphometry" / "0";
/// slope
///   .set("elevation", "dem.tif")?
///   .set("slope", "temp.sdat")?;
/// let output = slope.execute(&ExecOptions::default()).await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Saga {
  inner: Arc<SagaInner>,
  flag: Flag,
}

impl Saga {
  /// Validates `path` and builds the program handle around it.
  pub fn new(path: impl Into<PathBuf>) -> Result<Self, SagaError> {
    Ok(Self::from_cmd(SagaCmd::new(path)?))
  }

  /// Searches the system for saga_cmd and builds the program handle.
  pub fn locate() -> Result<Self, SagaError> {
    Ok(Self::from_cmd(SagaCmd::locate()?))
  }

  pub fn from_cmd(cmd: SagaCmd) -> Self {
    Self {
      inner: Arc::new(SagaInner {
        cmd,
        temp_dir: Mutex::new(None),
        version: OnceCell::new(),
        raster_formats: OnceCell::new(),
        vector_formats: OnceCell::new(),
      }),
      flag: Flag::none(),
    }
  }

  pub fn cmd(&self) -> &SagaCmd {
    &self.inner.cmd
  }

  pub fn path(&self) -> &Path {
    self.inner.cmd.path()
  }

  pub fn flag(&self) -> &Flag {
    &self.flag
  }

  pub fn set_flag(&mut self, flag: impl Into<Flag>) {
    self.flag = flag.into();
  }

  pub fn clear_flag(&mut self) -> Result<(), FlagError> {
    self.flag.clear()
  }

  /// Descends into a library by name.
  pub fn library(&self, name: impl Into<String>) -> Library {
    Library::new(self.clone(), name.into())
  }

  /// Descends straight into a tool.
  pub fn tool(&self, library: impl Into<String>, tool: impl Into<String>) -> Tool {
    self.library(library).tool(tool)
  }

  /// The program-level command: `[path, flag?]`.
  pub fn command(&self) -> Command {
    Command::new([self.path().display().to_string(), self.flag.to_string()])
  }

  /// Runs the program-level command (used for `--help`/`--version`
  /// style flags).
  pub async fn execute(&self, ignore_stderr: bool) -> Result<Output, SagaError> {
    let raw = self.command().execute().await?;
    Ok(Output::from_raw(&self.to_string(), raw, ignore_stderr)?)
  }

  /// The detected SAGA version, probed once per program and cached.
  pub async fn version(&self) -> Option<SagaVersion> {
    *self
      .inner
      .version
      .get_or_init(|| formats::probe_version(self))
      .await
  }

  /// The raster extensions SAGA can read, probed once per program and
  /// cached. Empty when the probe was skipped or failed.
  pub async fn raster_formats(&self) -> &BTreeSet<String> {
    self
      .inner
      .raster_formats
      .get_or_init(|| formats::probe_formats(self, FormatKind::Raster))
      .await
  }

  /// The vector extensions SAGA can read, probed once per program and
  /// cached. Empty when the probe was skipped or failed.
  pub async fn vector_formats(&self) -> &BTreeSet<String> {
    self
      .inner
      .vector_formats
      .get_or_init(|| formats::probe_formats(self, FormatKind::Vector))
      .await
  }

  pub(crate) fn cached_raster_formats(&self) -> Option<&BTreeSet<String>> {
    self.inner.raster_formats.get()
  }

  pub(crate) fn cached_vector_formats(&self) -> Option<&BTreeSet<String>> {
    self.inner.vector_formats.get()
  }

  pub(crate) fn formats_probed(&self) -> bool {
    self.inner.raster_formats.get().is_some() || self.inner.vector_formats.get().is_some()
  }

  /// The program's private scratch directory, created on first use.
  ///
  /// Temp-placeholder parameter values are rewritten to paths inside
  /// this directory.
  pub fn temp_dir(&self) -> io::Result<PathBuf> {
    let mut guard = self.lock_temp_dir();
    if let Some(dir) = guard.as_ref() {
      if dir.path().exists() {
        return Ok(dir.path().to_path_buf());
      }
      // Deleted out from under us; start over.
      *guard = None;
    }
    let dir = TempDir::new()?;
    let path = dir.path().to_path_buf();
    tracing::debug!(path = %path.display(), "Created scratch directory");
    *guard = Some(dir);
    Ok(path)
  }

  /// The files currently inside the scratch directory.
  pub fn temp_files(&self) -> io::Result<Vec<PathBuf>> {
    let guard = self.lock_temp_dir();
    let Some(dir) = guard.as_ref() else {
      return Ok(Vec::new());
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir.path())? {
      files.push(entry?.path());
    }
    files.sort();
    Ok(files)
  }

  /// Deletes the scratch directory and everything in it, returning the
  /// removed files.
  ///
  /// Must not be called while an invocation of this program is still
  /// pending; a later temp-placeholder assignment recreates the
  /// directory.
  pub fn temp_dir_cleanup(&self) -> io::Result<Vec<PathBuf>> {
    let taken = self.lock_temp_dir().take();
    let Some(dir) = taken else {
      return Ok(Vec::new());
    };
    let mut removed = Vec::new();
    for entry in std::fs::read_dir(dir.path())? {
      removed.push(entry?.path());
    }
    removed.sort();
    dir.close()?;
    for file in &removed {
      tracing::info!(file = %file.display(), "Removed scratch file");
    }
    Ok(removed)
  }

  fn lock_temp_dir(&self) -> std::sync::MutexGuard<'_, Option<TempDir>> {
    self
      .inner
      .temp_dir
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
  }
}

impl fmt::Display for Saga {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.path().display())
  }
}

/// A SAGA GIS tool library, e.g. `ta_morphometry`.
///
/// Holds a handle on its [`Saga`] and a copy of the flag the program
/// carried when the library was derived.
#[derive(Debug, Clone)]
pub struct Library {
  saga: Saga,
  name: String,
  flag: Flag,
}

impl Library {
  fn new(saga: Saga, name: String) -> Self {
    let flag = saga.flag().clone();
    Self { saga, name, flag }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn saga(&self) -> &Saga {
    &self.saga
  }

  pub fn flag(&self) -> &Flag {
    &self.flag
  }

  pub fn set_flag(&mut self, flag: impl Into<Flag>) {
    self.flag = flag.into();
  }

  pub fn clear_flag(&mut self) -> Result<(), FlagError> {
    self.flag.clear()
  }

  /// Descends into a tool by name.
  pub fn tool(&self, name: impl Into<String>) -> Tool {
    Tool::new(self.clone(), name.into())
  }

  /// The library-level command: `[path, flag?, library]`.
  pub fn command(&self) -> Command {
    Command::new([
      self.saga.path().display().to_string(),
      self.flag.to_string(),
      self.name.clone(),
    ])
  }

  /// Runs the library-level command (used for library help listings).
  pub async fn execute(&self, ignore_stderr: bool) -> Result<Output, SagaError> {
    let raw = self.command().execute().await?;
    Ok(Output::from_raw(&self.name, raw, ignore_stderr)?)
  }
}

impl fmt::Display for Library {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.name)
  }
}

/// Options for executing a [`Tool`] or [`crate::Pipeline`].
#[derive(Debug, Clone)]
pub struct ExecOptions {
  /// Print a header before each invocation and stream progress lines
  /// while it runs.
  pub verbose: bool,
  /// Treat a non-empty stderr as ordinary output instead of failing.
  pub ignore_stderr: bool,
  /// Probe the program's supported formats (once, cached) alongside
  /// the invocation so output files can be classified.
  pub infer_formats: bool,
}

impl Default for ExecOptions {
  fn default() -> Self {
    Self {
      verbose: false,
      ignore_stderr: false,
      infer_formats: true,
    }
  }
}

/// A SAGA GIS tool, e.g. tool `0` of `ta_morphometry`.
///
/// Owns the parameters of its invocation. Parameter values resolved at
/// insertion (temp placeholders, inferred extensions) can be read back
/// with [`Tool::parameter`], which is how later pipeline stages wire
/// themselves to the outputs of earlier ones.
#[derive(Debug, Clone)]
pub struct Tool {
  library: Library,
  name: String,
  flag: Flag,
  parameters: Parameters,
}

impl Tool {
  fn new(library: Library, name: String) -> Self {
    let flag = library.flag().clone();
    Self {
      library,
      name,
      flag,
      parameters: Parameters::new(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn library(&self) -> &Library {
    &self.library
  }

  pub fn saga(&self) -> &Saga {
    self.library.saga()
  }

  pub fn flag(&self) -> &Flag {
    &self.flag
  }

  pub fn set_flag(&mut self, flag: impl Into<Flag>) {
    self.flag = flag.into();
  }

  pub fn clear_flag(&mut self) -> Result<(), FlagError> {
    self.flag.clear()
  }

  /// Sets one parameter, applying the temp-placeholder and extension
  /// rules, and returns `self` for chaining.
  pub fn set(
    &mut self,
    name: &str,
    value: impl Into<ParameterValue>,
  ) -> Result<&mut Self, SagaError> {
    let saga = self.library.saga().clone();
    self.parameters.insert(name, value.into(), &saga)?;
    Ok(self)
  }

  /// Drops every parameter, ahead of a fresh parameterization.
  pub fn reset(&mut self) -> &mut Self {
    self.parameters = Parameters::new();
    self
  }

  /// The resolved value of a parameter (post temp substitution), or
  /// `None` when it was never set.
  pub fn parameter(&self, name: &str) -> Option<&str> {
    self.parameters.get(name)
  }

  pub fn parameters(&self) -> &Parameters {
    &self.parameters
  }

  /// The tool-level command:
  /// `[path, flag?, library, tool, ...parameters]`.
  pub fn command(&self) -> Command {
    let mut tokens = vec![
      self.saga().path().display().to_string(),
      self.flag.to_string(),
      self.library.name().to_string(),
      self.name.clone(),
    ];
    tokens.extend(self.parameters.formatted());
    Command::new(tokens)
  }

  /// The header printed before a verbose invocation.
  pub fn verbose_header(&self) -> String {
    format!(
      "{}\n{} / {}\n    {}\n",
      "-".repeat(25),
      self.library,
      self,
      self.parameters
    )
  }

  /// Runs the tool, echoing verbose progress to the console.
  pub async fn execute(&self, options: &ExecOptions) -> Result<ToolOutput, SagaError> {
    let mut console = ConsoleProgress;
    self.execute_with_progress(options, &mut console).await
  }

  /// Runs the tool, forwarding verbose progress to `sink`.
  ///
  /// When `infer_formats` is set and the format caches are still cold,
  /// the two format probes run concurrently with the invocation itself
  /// and their results are cached for the program's lifetime.
  pub async fn execute_with_progress(
    &self,
    options: &ExecOptions,
    sink: &mut (dyn ProgressSink + Send),
  ) -> Result<ToolOutput, SagaError> {
    if options.verbose {
      println!("{}", self.verbose_header());
    }

    let saga = self.saga();
    let raw = if options.infer_formats && !saga.formats_probed() {
      let (raw, _, _) = tokio::join!(
        self.run_command(options.verbose, sink),
        saga.raster_formats(),
        saga.vector_formats(),
      );
      raw?
    } else {
      self.run_command(options.verbose, sink).await?
    };

    Ok(ToolOutput::new(self.clone(), raw, options.ignore_stderr)?)
  }

  async fn run_command(
    &self,
    verbose: bool,
    sink: &mut (dyn ProgressSink + Send),
  ) -> Result<CommandOutput, ExecutionError> {
    let command = self.command();
    if verbose {
      command.execute_streaming(sink).await
    } else {
      command.execute().await
    }
  }
}

impl fmt::Display for Tool {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.name)
  }
}

impl Div<&str> for &Saga {
  type Output = Library;

  fn div(self, name: &str) -> Library {
    self.library(name)
  }
}

impl Div<Library> for &Saga {
  type Output = Library;

  /// An already-built library passes through unchanged.
  fn div(self, library: Library) -> Library {
    library
  }
}

impl Div<&str> for Library {
  type Output = Tool;

  fn div(self, name: &str) -> Tool {
    self.tool(name)
  }
}

impl Div<&str> for &Library {
  type Output = Tool;

  fn div(self, name: &str) -> Tool {
    self.tool(name)
  }
}

impl Div<Tool> for Library {
  type Output = Tool;

  /// An already-built tool passes through unchanged.
  fn div(self, tool: Tool) -> Tool {
    tool
  }
}
