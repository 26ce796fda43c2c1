use crate::error::SagaError;
use crate::saga::Saga;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// A tool parameter value, coerced to the string SAGA receives.
///
/// Anything SAGA accepts on the command line converts into one: string
/// slices, owned strings, paths, numbers and booleans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterValue(String);

impl ParameterValue {
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl From<&str> for ParameterValue {
  fn from(value: &str) -> Self {
    Self(value.to_string())
  }
}

impl From<String> for ParameterValue {
  fn from(value: String) -> Self {
    Self(value)
  }
}

impl From<&String> for ParameterValue {
  fn from(value: &String) -> Self {
    Self(value.clone())
  }
}

impl From<&Path> for ParameterValue {
  fn from(value: &Path) -> Self {
    Self(value.display().to_string())
  }
}

impl From<PathBuf> for ParameterValue {
  fn from(value: PathBuf) -> Self {
    Self::from(value.as_path())
  }
}

impl From<&PathBuf> for ParameterValue {
  fn from(value: &PathBuf) -> Self {
    Self::from(value.as_path())
  }
}

impl From<bool> for ParameterValue {
  fn from(value: bool) -> Self {
    Self(value.to_string())
  }
}

macro_rules! parameter_value_from_number {
  ($($ty:ty),*) => {
    $(
      impl From<$ty> for ParameterValue {
        fn from(value: $ty) -> Self {
          Self(value.to_string())
        }
      }
    )*
  };
}

parameter_value_from_number!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl fmt::Display for ParameterValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// The parameters of a SAGA GIS tool invocation.
///
/// An ordered name/value mapping. Values are coerced to strings at
/// insertion time and formatted as `-NAME=value` tokens, with the name
/// upper-cased, in insertion order:
///
/// ```text
/// -ELEVATION=path/to/raster -GRID=path/to/grid -METHOD=0
/// ```
///
/// Two path rules apply at insertion:
///
/// * a value whose file stem is exactly `temp` and which does not name
///   an existing file is rewritten to a unique path inside the owning
///   program's temporary directory, named `{parameter}_{unix}{suffix}`;
/// * a value naming an existing file without an extension gets one
///   inferred from sibling files sharing the same stem.
#[derive(Debug, Clone, Default)]
pub struct Parameters {
  entries: Vec<(String, String)>,
}

impl Parameters {
  pub fn new() -> Self {
    Self::default()
  }

  /// The resolved value of a parameter, as it will appear on the
  /// command line.
  pub fn get(&self, name: &str) -> Option<&str> {
    self
      .entries
      .iter()
      .find(|(key, _)| key == name)
      .map(|(_, value)| value.as_str())
  }

  /// One `-NAME=value` token per entry, in insertion order.
  pub fn formatted(&self) -> Vec<String> {
    self
      .entries
      .iter()
      .map(|(name, value)| format!("-{}={}", name.to_uppercase(), value))
      .collect()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self
      .entries
      .iter()
      .map(|(name, value)| (name.as_str(), value.as_str()))
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Inserts a parameter, replacing an existing entry with the same
  /// name in place. Value rules (temp substitution, extension
  /// inference) are applied once, here, and never re-evaluated.
  pub(crate) fn insert(
    &mut self,
    name: &str,
    value: ParameterValue,
    saga: &Saga,
  ) -> Result<(), SagaError> {
    let resolved = resolve_value(name, value.0, saga)?;
    match self.entries.iter_mut().find(|(key, _)| key == name) {
      Some(entry) => entry.1 = resolved,
      None => self.entries.push((name.to_string(), resolved)),
    }
    Ok(())
  }
}

impl fmt::Display for Parameters {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.formatted().join(" "))
  }
}

fn resolve_value(name: &str, raw: String, saga: &Saga) -> Result<String, SagaError> {
  let path = Path::new(&raw);
  let exists = path.exists();
  let is_temp = path.file_stem().is_some_and(|stem| stem == "temp");

  if is_temp && !exists {
    let suffix = path
      .extension()
      .map(|ext| format!(".{}", ext.to_string_lossy()))
      .unwrap_or_default();
    let unix = SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .map(|elapsed| elapsed.as_secs())
      .unwrap_or_default();
    let generated = saga.temp_dir()?.join(format!("{name}_{unix}{suffix}"));
    return Ok(generated.display().to_string());
  }

  if exists && path.extension().is_none() {
    if let Some(extension) = infer_extension(path)? {
      return Ok(path.with_extension(extension).display().to_string());
    }
  }

  Ok(raw)
}

/// Attempts to infer the extension of an extensionless file.
///
/// SAGA GIS may write output under several related extensions for one
/// logical name, so the siblings sharing the stem decide: exactly one
/// of `.shp`/`.sdat` present picks that one, otherwise the largest
/// sibling on disk does. No matching sibling leaves the value as-is.
fn infer_extension(path: &Path) -> io::Result<Option<String>> {
  let stem = match path.file_stem() {
    Some(stem) => stem.to_os_string(),
    None => return Ok(None),
  };
  let parent = match path.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent,
    _ => Path::new("."),
  };

  let mut siblings: Vec<PathBuf> = Vec::new();
  for entry in fs::read_dir(parent)? {
    let sibling = entry?.path();
    if sibling.is_file() && sibling.file_stem().is_some_and(|s| s == stem.as_os_str()) {
      siblings.push(sibling);
    }
  }
  if siblings.is_empty() {
    return Ok(None);
  }

  let has_extension = |wanted: &str| {
    siblings
      .iter()
      .any(|sibling| sibling.extension().is_some_and(|ext| ext == wanted))
  };
  let has_shp = has_extension("shp");
  let has_sdat = has_extension("sdat");
  if has_shp && !has_sdat {
    return Ok(Some("shp".to_string()));
  }
  if has_sdat && !has_shp {
    return Ok(Some("sdat".to_string()));
  }

  let mut largest: Option<(u64, &PathBuf)> = None;
  for sibling in &siblings {
    let size = sibling.metadata()?.len();
    if largest.is_none_or(|(best, _)| size >= best) {
      largest = Some((size, sibling));
    }
  }
  Ok(
    largest
      .and_then(|(_, sibling)| sibling.extension())
      .map(|ext| ext.to_string_lossy().to_string()),
  )
}
