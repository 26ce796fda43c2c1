// Copyright 2025 The sagacmd developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # sagacmd
//!
//! `sagacmd` builds, runs and chains SAGA GIS command-line invocations
//! from Rust. It takes a validated path to the `saga_cmd` executable,
//! lets you descend into libraries and tools, formats their parameters
//! the way SAGA expects them, spawns the child processes and captures
//! their output — including the resolution of file dependencies
//! between chained tools.
//!
//! ```no_run
//! use sagacmd::{ExecOptions, Saga};
//!
//! # async fn run() -> Result<(), sagacmd::SagaError> {
//! let saga = Saga::locate()?;
//! let mut shade = &saga / "ta_lighting" / "0";
//! shade
//!   .set("elevation", "dem.tif")?
//!   .set("shade", "temp.tif")?
//!   .set("method", 2)?;
//! let output = shade.execute(&ExecOptions::default()).await?;
//! for file in output.rasters() {
//!   println!("{} -> {}", file.parameter, file.path.display());
//! }
//! saga.temp_dir_cleanup()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Modules
//!
//! * [`saga`]: The target hierarchy — [`Saga`] (the program),
//!   [`Library`] and [`Tool`] — with the `/` descend operator and the
//!   per-target flag.
//! * [`parameters`]: The ordered `-NAME=value` parameter set, temp
//!   placeholder substitution and extension inference.
//! * [`command`]: Assembled argument vectors, child-process spawning,
//!   output capture and verbose progress streaming.
//! * [`pipeline`]: Chaining tools with `|` into a strictly sequential
//!   [`Pipeline`].
//! * [`output`]: Captured results and the raster/vector classification
//!   of output files.
//! * [`formats`]: The cached version and format probes.
//! * [`locate`]: Validating and searching for the `saga_cmd`
//!   executable.
//! * [`error`]: The custom error types for the library.
//! * [`logging`]: Provides the `setup_tracing` utility.

pub mod command;
pub mod error;
pub mod flag;
pub mod formats;
pub mod locate;
pub mod logging;
pub mod output;
pub mod parameters;
pub mod pipeline;
pub mod saga;

pub use crate::command::Command;
pub use crate::command::ConsoleProgress;
pub use crate::command::LineEnd;
pub use crate::command::ProgressSink;
pub use crate::error::ExecutionError;
pub use crate::error::FlagError;
pub use crate::error::LocateError;
pub use crate::error::SagaError;
pub use crate::flag::Flag;
pub use crate::formats::SagaVersion;
pub use crate::locate::SagaCmd;
pub use crate::output::FileKind;
pub use crate::output::Output;
pub use crate::output::OutputFile;
pub use crate::output::ToolOutput;
pub use crate::parameters::ParameterValue;
pub use crate::parameters::Parameters;
pub use crate::pipeline::Pipeline;
pub use crate::saga::ExecOptions;
pub use crate::saga::Library;
pub use crate::saga::Saga;
pub use crate::saga::Tool;
