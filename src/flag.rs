use crate::error::FlagError;
use std::fmt;

/// A single optional modifier token passed to saga_cmd ahead of the
/// library name, e.g. `--help`, `--version` or `--cores=8`.
///
/// The token is normalized to carry a `--` prefix when it does not
/// already have one. An unset flag renders as the empty string and is
/// dropped from the assembled command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flag(Option<String>);

impl Flag {
  /// An unset flag.
  pub const fn none() -> Self {
    Self(None)
  }

  pub fn is_set(&self) -> bool {
    self.0.is_some()
  }

  /// The normalized token, if set.
  pub fn as_token(&self) -> Option<&str> {
    self.0.as_deref()
  }

  /// Replaces the flag, normalizing the `--` prefix.
  pub fn set(&mut self, flag: impl AsRef<str>) {
    self.0 = Some(normalize(flag.as_ref()));
  }

  /// Clears the flag. Clearing a flag that was never set is caller
  /// misuse and fails with [`FlagError::NotSet`].
  pub fn clear(&mut self) -> Result<(), FlagError> {
    match self.0.take() {
      Some(_) => Ok(()),
      None => Err(FlagError::NotSet),
    }
  }
}

fn normalize(flag: &str) -> String {
  if flag.starts_with("--") {
    flag.to_string()
  } else {
    format!("--{flag}")
  }
}

impl From<&str> for Flag {
  fn from(flag: &str) -> Self {
    Self(Some(normalize(flag)))
  }
}

impl From<String> for Flag {
  fn from(flag: String) -> Self {
    Self::from(flag.as_str())
  }
}

impl From<Option<&str>> for Flag {
  fn from(flag: Option<&str>) -> Self {
    flag.map_or_else(Self::none, Self::from)
  }
}

impl fmt::Display for Flag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_token().unwrap_or(""))
  }
}

impl PartialEq<str> for Flag {
  fn eq(&self, other: &str) -> bool {
    self.as_token().unwrap_or("") == other
  }
}

impl PartialEq<&str> for Flag {
  fn eq(&self, other: &&str) -> bool {
    self == *other
  }
}
