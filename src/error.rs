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
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error enum for the sagacmd library.
#[derive(Error, Debug)]
pub enum SagaError {
  #[error("could not locate or validate the saga_cmd executable")]
  Locate(#[from] LocateError),

  #[error("execution failed")]
  Execution(#[from] ExecutionError),

  #[error("flag error")]
  Flag(#[from] FlagError),

  #[error("I/O error: {0}")]
  Io(#[from] io::Error),
}

/// Errors related to finding and validating saga_cmd (src/locate.rs).
#[derive(Error, Debug)]
pub enum LocateError {
  #[error("the path {0} does not exist")]
  PathDoesNotExist(PathBuf),

  #[error("the path {0} does not point to a regular file")]
  NotAFile(PathBuf),

  #[error("the file at {0} is not executable")]
  NotExecutable(PathBuf),

  #[error("could not find a saga_cmd executable on this system")]
  NotFound,

  #[error("failed to read metadata for {path}")]
  Metadata {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Errors related to spawning child processes and capturing their
/// output (src/command.rs, src/output.rs).
#[derive(Error, Debug)]
pub enum ExecutionError {
  #[error("cannot execute an empty command")]
  Empty,

  #[error("failed to spawn `{command}`")]
  Spawn {
    command: String,
    #[source]
    source: io::Error,
  },

  #[error("failed to capture the output pipes of `{command}`")]
  Pipe { command: String },

  #[error("failed to read the output of `{command}`")]
  ReadOutput {
    command: String,
    #[source]
    source: io::Error,
  },

  #[error("failed to wait for `{command}`")]
  Wait {
    command: String,
    #[source]
    source: io::Error,
  },

  #[error(
    "a stderr was detected after executing '{target}':\n{stderr}\nSet `ignore_stderr` to suppress this error."
  )]
  Stderr { target: String, stderr: String },
}

/// Errors related to the global flag of a target (src/flag.rs).
#[derive(Error, Debug)]
pub enum FlagError {
  #[error("no flag is currently set")]
  NotSet,
}

/// Errors related to the version and format probes (src/formats.rs).
///
/// These never escape the library; probe failures degrade to "unknown"
/// and are logged as warnings.
#[derive(Error, Debug)]
pub enum ProbeError {
  #[error("the SAGA version could not be determined")]
  UnknownVersion,

  #[error("the installed SAGA version does not support format listing (requires 4.0.0 or newer)")]
  UnsupportedVersion,

  #[error("failed to create a scratch file for the format listing")]
  Scratch(#[source] io::Error),

  #[error("execution of the format listing tool failed")]
  Listing(#[from] ExecutionError),

  #[error("failed to read the format listing at {path}")]
  ReadListing {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("the format listing at {path} held no extension table")]
  EmptyListing { path: PathBuf },
}
