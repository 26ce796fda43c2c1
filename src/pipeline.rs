use crate::error::SagaError;
use crate::output::ToolOutput;
use crate::saga::ExecOptions;
use crate::saga::Tool;
use std::fmt;
use std::ops::BitOr;
use std::ops::Index;

/// An ordered chain of tool invocations.
///
/// Built with the `|` operator between tools; never empty. Each stage
/// keeps the parameters it was bound with, so a later stage can read
/// an earlier stage's resolved value through [`Tool::parameter`] while
/// it is being wired up:
///
/// ```no_run
/// use sagacmd::{ExecOptions, Saga};
///
/// # async fn run() -> Result<(), sagacmd::SagaError> {
/// let saga = Saga::locate()?;
/// let preprocessor = &saga / "ta_preprocessor";
///
/// let mut route_detection = &preprocessor / "Sink Drainage Route Detection";
/// route_detection
///   .set("elevation", "dem.tif")?
///   .set("sinkroute", "temp.sdat")?;
///
/// let mut sink_removal = &preprocessor / "Sink Removal";
/// let sinkroute = route_detection.parameter("sinkroute").unwrap_or_default().to_string();
/// sink_removal
///   .set("dem", "dem.tif")?
///   .set("sinkroute", sinkroute)?
///   .set("dem_preproc", "dem_preprocessed.tif")?;
///
/// let outputs = (route_detection | sink_removal)
///   .execute(&ExecOptions { verbose: true, ..Default::default() })
///   .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
  tools: Vec<Tool>,
}

impl Pipeline {
  /// Seeds a pipeline with its first stage.
  pub fn new(tool: Tool) -> Self {
    Self { tools: vec![tool] }
  }

  /// Appends a stage, returning the pipeline for further chaining.
  pub fn append(mut self, tool: Tool) -> Self {
    self.tools.push(tool);
    self
  }

  pub fn tools(&self) -> &[Tool] {
    &self.tools
  }

  pub fn len(&self) -> usize {
    self.tools.len()
  }

  /// A pipeline is never empty; this exists for completeness.
  pub fn is_empty(&self) -> bool {
    self.tools.is_empty()
  }

  /// Runs every stage strictly in sequence, collecting one output per
  /// stage.
  ///
  /// A stage is fully complete (process exited, streams drained)
  /// before the next begins, since later stages typically read files
  /// the earlier ones wrote. A stderr in any stage aborts the whole
  /// pipeline immediately; outputs from prior stages are dropped and
  /// files already written stay on disk.
  pub async fn execute(&self, options: &ExecOptions) -> Result<Vec<ToolOutput>, SagaError> {
    let mut outputs = Vec::with_capacity(self.tools.len());
    for tool in &self.tools {
      outputs.push(tool.execute(options).await?);
    }
    Ok(outputs)
  }
}

impl fmt::Display for Pipeline {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for tool in &self.tools {
      f.write_str(&tool.verbose_header())?;
    }
    Ok(())
  }
}

impl Index<usize> for Pipeline {
  type Output = Tool;

  fn index(&self, index: usize) -> &Tool {
    &self.tools[index]
  }
}

impl BitOr<Tool> for Pipeline {
  type Output = Pipeline;

  fn bitor(self, tool: Tool) -> Pipeline {
    self.append(tool)
  }
}

impl BitOr<Tool> for Tool {
  type Output = Pipeline;

  fn bitor(self, tool: Tool) -> Pipeline {
    Pipeline::new(self).append(tool)
  }
}
