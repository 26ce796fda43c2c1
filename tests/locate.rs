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
#![cfg(unix)]

mod common;

use common::silent_saga;
use sagacmd::LocateError;
use sagacmd::SagaCmd;
use std::fs;
use tempfile::tempdir;

#[test]
fn missing_path_is_rejected() {
  let temp = tempdir().unwrap();
  let missing = temp.path().join("nope");
  assert!(matches!(
    SagaCmd::new(&missing),
    Err(LocateError::PathDoesNotExist(path)) if path == missing
  ));
}

#[test]
fn directory_is_rejected() {
  let temp = tempdir().unwrap();
  assert!(matches!(
    SagaCmd::new(temp.path()),
    Err(LocateError::NotAFile(_))
  ));
}

#[test]
fn non_executable_file_is_rejected() {
  let temp = tempdir().unwrap();
  let plain = temp.path().join("saga_cmd");
  fs::write(&plain, b"not a binary").unwrap();
  assert!(matches!(
    SagaCmd::new(&plain),
    Err(LocateError::NotExecutable(path)) if path == plain
  ));
}

#[test]
fn executable_is_accepted() {
  let temp = tempdir().unwrap();
  let exe = silent_saga(temp.path());
  let cmd = SagaCmd::new(&exe).unwrap();
  assert_eq!(cmd.path(), exe);
}
