use crate::command::Command;
use crate::error::ExecutionError;
use crate::error::ProbeError;
use crate::saga::Saga;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::sync::LazyLock;

/// A SAGA GIS version triple, parsed from the `--version` banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SagaVersion {
  pub major: u32,
  pub minor: u32,
  pub patch: u32,
}

impl SagaVersion {
  pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
    Self {
      major,
      minor,
      patch,
    }
  }

  /// Extracts the first `major.minor.patch` triple found in `text`.
  pub fn find_in(text: &str) -> Option<Self> {
    static VERSION: LazyLock<Regex> =
      LazyLock::new(|| Regex::new(r"(\d+)\.(\d+)\.(\d+)").expect("valid regex"));

    let captures = VERSION.captures(text)?;
    let part = |index: usize| captures.get(index)?.as_str().parse().ok();
    Some(Self {
      major: part(1)?,
      minor: part(2)?,
      patch: part(3)?,
    })
  }
}

impl fmt::Display for SagaVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
  }
}

/// Which half of the format listing a probe requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FormatKind {
  Raster,
  Vector,
}

/// The format listing tool (`io_gdal` tool 10) exists since SAGA 4.
const FORMAT_PROBE_MIN: SagaVersion = SagaVersion::new(4, 0, 0);

/// Native SAGA grid extensions the GDAL listing does not report.
const NATIVE_RASTER_EXTENSIONS: [&str; 3] = ["sdat", "sgrd", "sg-grd-z"];

/// Runs `saga_cmd --version` and parses the banner.
///
/// A missing match is a soft failure: the version stays unknown and
/// format probing is skipped.
pub(crate) async fn probe_version(saga: &Saga) -> Option<SagaVersion> {
  let command = Command::new([saga.path().display().to_string(), "--version".to_string()]);
  match command.execute().await {
    Ok(raw) => match SagaVersion::find_in(&raw.stdout) {
      Some(version) => {
        tracing::debug!(%version, "Detected SAGA version");
        Some(version)
      }
      None => {
        tracing::warn!(
          stdout = %raw.stdout.trim(),
          "Could not parse a SAGA version out of the banner"
        );
        None
      }
    },
    Err(error) => {
      tracing::warn!(error = %error, "Version probe failed");
      None
    }
  }
}

/// Fetches one format set, degrading to empty on any probe failure.
pub(crate) async fn probe_formats(saga: &Saga, kind: FormatKind) -> BTreeSet<String> {
  match fetch_formats(saga, kind).await {
    Ok(extensions) => extensions,
    Err(error) => {
      tracing::warn!(
        error = %error,
        ?kind,
        "Format probe failed; affected files will be reported as generic"
      );
      BTreeSet::new()
    }
  }
}

/// Asks the well-known `io_gdal` listing tool (tool 10) to write the
/// supported formats to a scratch file and parses the extensions out
/// of it.
///
/// The command is assembled directly rather than through
/// [`crate::Tool::execute`] so the probe path cannot re-enter itself.
async fn fetch_formats(saga: &Saga, kind: FormatKind) -> Result<BTreeSet<String>, ProbeError> {
  let version = saga.version().await.ok_or(ProbeError::UnknownVersion)?;
  if version < FORMAT_PROBE_MIN {
    return Err(ProbeError::UnsupportedVersion);
  }

  let scratch = tempfile::NamedTempFile::new().map_err(ProbeError::Scratch)?;
  let type_token = match kind {
    FormatKind::Raster => "0",
    FormatKind::Vector => "1",
  };
  let command = Command::new([
    saga.path().display().to_string(),
    "io_gdal".to_string(),
    "10".to_string(),
    format!("-FORMATS={}", scratch.path().display()),
    format!("-TYPE={type_token}"),
    "-ACCESS=2".to_string(),
    "-RECOGNIZED=1".to_string(),
  ]);

  let raw = command.execute().await.map_err(ProbeError::Listing)?;
  let stderr = raw.stderr.trim();
  if !stderr.is_empty() {
    return Err(ProbeError::Listing(ExecutionError::Stderr {
      target: "io_gdal / 10".to_string(),
      stderr: stderr.to_string(),
    }));
  }

  let content =
    fs::read_to_string(scratch.path()).map_err(|source| ProbeError::ReadListing {
      path: scratch.path().to_path_buf(),
      source,
    })?;
  let mut extensions =
    parse_format_listing(&content).ok_or_else(|| ProbeError::EmptyListing {
      path: scratch.path().to_path_buf(),
    })?;

  if kind == FormatKind::Raster {
    extensions.extend(NATIVE_RASTER_EXTENSIONS.iter().map(ToString::to_string));
  }
  Ok(extensions)
}

/// Pulls the extension tokens out of a format listing.
///
/// The listing is tab-delimited; the extensions sit in the third
/// column of the last row as dot-prefixed tokens.
fn parse_format_listing(content: &str) -> Option<BTreeSet<String>> {
  static EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.(\w+)").expect("valid regex"));

  let last_row = content.lines().filter(|line| !line.trim().is_empty()).next_back()?;
  let third_column = last_row.split('\t').nth(2)?;
  Some(
    EXTENSION
      .captures_iter(third_column)
      .map(|captures| captures[1].to_string())
      .collect(),
  )
}
