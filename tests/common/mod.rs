#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::path::PathBuf;

/// Writes an executable stand-in for saga_cmd into `dir`.
pub fn fake_saga(dir: &Path, body: &str) -> PathBuf {
  let path = dir.join("saga_cmd");
  fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write fake saga_cmd");
  let mut permissions = fs::metadata(&path).expect("stat fake saga_cmd").permissions();
  permissions.set_mode(0o755);
  fs::set_permissions(&path, permissions).expect("chmod fake saga_cmd");
  path
}

/// A stand-in that exits silently no matter how it is invoked.
pub fn silent_saga(dir: &Path) -> PathBuf {
  fake_saga(dir, "exit 0")
}
