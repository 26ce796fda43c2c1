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
use crate::error::ExecutionError;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::process::ExitStatus;
use std::process::Stdio;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::BufReader;
use tokio::process::Child;
use tokio::process::Command as ProcessCommand;

/// One fully assembled saga_cmd invocation.
///
/// An ordered sequence of non-empty string tokens, passed to the child
/// process as a literal argument vector. There is no shell involved,
/// so no quoting or metacharacter interpretation applies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
  args: Vec<String>,
}

impl Command {
  /// Assembles a command, dropping empty tokens.
  pub fn new<I, S>(tokens: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      args: tokens
        .into_iter()
        .map(Into::into)
        .filter(|token| !token.is_empty())
        .collect(),
    }
  }

  pub fn args(&self) -> &[String] {
    &self.args
  }

  /// Runs the command to completion, capturing stdout and stderr.
  pub async fn execute(&self) -> Result<CommandOutput, ExecutionError> {
    let mut child = self.spawn()?;
    let (stdout, stderr) = self.take_pipes(&mut child)?;

    let (stdout, stderr, status) =
      tokio::join!(drain(stdout), drain(stderr), child.wait());
    Ok(CommandOutput {
      stdout: stdout.map_err(|source| self.read_error(source))?,
      stderr: stderr.map_err(|source| self.read_error(source))?,
      status: status.map_err(|source| ExecutionError::Wait {
        command: self.to_string(),
        source,
      })?,
    })
  }

  /// Runs the command to completion while forwarding progress lines to
  /// `sink`.
  ///
  /// Stdout is read line by line as the process runs. Lines containing
  /// a `%` are handed to the sink together with the line ending that
  /// distinguishes in-place progress updates from terminal status
  /// lines; all other lines are suppressed. Streaming never alters the
  /// captured output.
  pub async fn execute_streaming(
    &self,
    sink: &mut (dyn ProgressSink + Send),
  ) -> Result<CommandOutput, ExecutionError> {
    let mut child = self.spawn()?;
    let (stdout, stderr) = self.take_pipes(&mut child)?;

    let stream = async {
      let mut captured = String::new();
      let mut lines = BufReader::new(stdout).lines();
      while let Some(line) = lines.next_line().await? {
        captured.push_str(&line);
        captured.push('\n');
        let line = line.trim();
        if line.contains('%') {
          sink.progress(line, progress_end(line));
        }
      }
      Ok::<String, std::io::Error>(captured)
    };

    let (stdout, stderr, status) = tokio::join!(stream, drain(stderr), child.wait());
    Ok(CommandOutput {
      stdout: stdout.map_err(|source| self.read_error(source))?,
      stderr: stderr.map_err(|source| self.read_error(source))?,
      status: status.map_err(|source| ExecutionError::Wait {
        command: self.to_string(),
        source,
      })?,
    })
  }

  fn spawn(&self) -> Result<Child, ExecutionError> {
    let (program, rest) = self.args.split_first().ok_or(ExecutionError::Empty)?;
    let mut command = ProcessCommand::new(program);
    command
      .args(rest)
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true);
    tracing::debug!(cmd = ?command, "Spawning saga_cmd");
    command.spawn().map_err(|source| ExecutionError::Spawn {
      command: self.to_string(),
      source,
    })
  }

  fn take_pipes(
    &self,
    child: &mut Child,
  ) -> Result<(tokio::process::ChildStdout, tokio::process::ChildStderr), ExecutionError> {
    let stdout = child.stdout.take().ok_or_else(|| ExecutionError::Pipe {
      command: self.to_string(),
    })?;
    let stderr = child.stderr.take().ok_or_else(|| ExecutionError::Pipe {
      command: self.to_string(),
    })?;
    Ok((stdout, stderr))
  }

  fn read_error(&self, source: std::io::Error) -> ExecutionError {
    ExecutionError::ReadOutput {
      command: self.to_string(),
      source,
    }
  }
}

impl fmt::Display for Command {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let quoted: Vec<String> = self.args.iter().map(|arg| format!("\"{arg}\"")).collect();
    f.write_str(&quoted.join(" "))
  }
}

/// The captured streams and exit status of one completed invocation.
#[derive(Debug)]
pub struct CommandOutput {
  pub stdout: String,
  pub stderr: String,
  pub status: ExitStatus,
}

/// How a forwarded progress line should be terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnd {
  /// Overwrite the previous update in place.
  CarriageReturn,
  /// The line is a terminal status line; keep it.
  Newline,
}

/// Picks the ending for a progress line.
///
/// `100` or any alphabetic character marks a terminal status line;
/// everything else is an in-place percentage update.
pub fn progress_end(line: &str) -> LineEnd {
  if line.contains("100") || line.chars().any(char::is_alphabetic) {
    LineEnd::Newline
  } else {
    LineEnd::CarriageReturn
  }
}

/// Receives the qualifying progress lines of a verbose execution.
pub trait ProgressSink {
  fn progress(&mut self, line: &str, end: LineEnd);
}

/// Echoes progress to the console the way saga_cmd renders it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
  fn progress(&mut self, line: &str, end: LineEnd) {
    match end {
      LineEnd::CarriageReturn => print!("{line}\r"),
      LineEnd::Newline => println!("{line}"),
    }
    let _ = std::io::stdout().flush();
  }
}

async fn drain<R>(reader: R) -> std::io::Result<String>
where
  R: AsyncRead + Unpin,
{
  let mut reader = reader;
  let mut buffer = Vec::new();
  reader.read_to_end(&mut buffer).await?;
  Ok(String::from_utf8_lossy(&buffer).into_owned())
}
