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

use common::fake_saga;
use common::silent_saga;
use sagacmd::ExecOptions;
use sagacmd::ExecutionError;
use sagacmd::FileKind;
use sagacmd::LineEnd;
use sagacmd::ProgressSink;
use sagacmd::Saga;
use sagacmd::SagaError;
use sagacmd::SagaVersion;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// No console noise, no probes: just the invocation under test.
fn quiet() -> ExecOptions {
  ExecOptions {
    verbose: false,
    ignore_stderr: false,
    infer_formats: false,
  }
}

#[tokio::test]
async fn captures_stdout() {
  let temp = tempdir().unwrap();
  let exe = fake_saga(temp.path(), r#"echo "hello from saga""#);
  let saga = Saga::new(exe).unwrap();

  let output = saga.execute(true).await.unwrap();
  assert!(output.stdout.contains("hello from saga"));
  assert!(output.status.success());
}

#[tokio::test]
async fn stderr_fails_tool_execution() {
  let temp = tempdir().unwrap();
  let exe = fake_saga(temp.path(), r#"echo "boom" >&2"#);
  let saga = Saga::new(exe).unwrap();

  let tool = &saga / "ta_morphometry" / "0";
  let error = tool.execute(&quiet()).await.unwrap_err();
  match error {
    SagaError::Execution(ExecutionError::Stderr { target, stderr }) => {
      assert_eq!(target, "0");
      assert_eq!(stderr, "boom");
    }
    other => panic!("unexpected error: {other}"),
  }
}

#[tokio::test]
async fn ignored_stderr_is_retained() {
  let temp = tempdir().unwrap();
  let exe = fake_saga(temp.path(), r#"echo "boom" >&2"#);
  let saga = Saga::new(exe).unwrap();

  let tool = &saga / "ta_morphometry" / "0";
  let options = ExecOptions {
    ignore_stderr: true,
    ..quiet()
  };
  let output = tool.execute(&options).await.unwrap();
  assert_eq!(output.stderr.as_deref(), Some("boom"));
}

#[tokio::test]
async fn whitespace_only_stderr_is_not_an_error() {
  let temp = tempdir().unwrap();
  let exe = fake_saga(temp.path(), r#"printf '   \n' >&2"#);
  let saga = Saga::new(exe).unwrap();

  let tool = &saga / "ta_morphometry" / "0";
  let output = tool.execute(&quiet()).await.unwrap();
  assert_eq!(output.stderr, None);
}

#[tokio::test]
async fn files_lists_only_existing_parameters() {
  let temp = tempdir().unwrap();
  let saga = Saga::new(silent_saga(temp.path())).unwrap();

  let data = tempdir().unwrap();
  let result = data.path().join("out.xyz");
  fs::write(&result, b"data").unwrap();

  let mut tool = &saga / "ta_morphometry" / "0";
  tool
    .set("result", &result)
    .unwrap()
    .set("missing", data.path().join("nope.tif"))
    .unwrap()
    .set("method", 1)
    .unwrap();

  let output = tool.execute(&quiet()).await.unwrap();
  let files = output.files();
  assert_eq!(files.len(), 1);
  assert_eq!(files[0].parameter, "result");
  // Formats were never probed, so the file stays generic.
  assert_eq!(files[0].kind, FileKind::Other);
  assert_eq!(output.file("result"), Some(result.as_path()));
  assert_eq!(output.file("missing"), None);
}

const PROBING_SAGA: &str = r#"
if [ "$1" = "--version" ]; then
  echo "SAGA Version: 9.3.1"
  exit 0
fi
if [ "$1" = "io_gdal" ]; then
  out=""
  kind=""
  for a in "$@"; do
    case "$a" in
      -FORMATS=*) out="${a#-FORMATS=}";;
      -TYPE=*) kind="${a#-TYPE=}";;
    esac
  done
  if [ "$kind" = "0" ]; then
    printf 'Name\tAccess\tExtensions\nGeoTIFF\trw\t.tif .tiff\n' > "$out"
  else
    printf 'Name\tAccess\tExtensions\nShapefile\trw\t.shp\n' > "$out"
  fi
  exit 0
fi
echo ok
"#;

#[tokio::test]
async fn format_probes_classify_output_files() {
  let temp = tempdir().unwrap();
  let saga = Saga::new(fake_saga(temp.path(), PROBING_SAGA)).unwrap();

  assert_eq!(saga.version().await, Some(SagaVersion::new(9, 3, 1)));

  let data = tempdir().unwrap();
  let raster = data.path().join("out.tif");
  let vector = data.path().join("out.shp");
  let other = data.path().join("out.xyz");
  for file in [&raster, &vector, &other] {
    fs::write(file, b"data").unwrap();
  }

  let mut tool = &saga / "ta_morphometry" / "0";
  tool
    .set("grid", &raster)
    .unwrap()
    .set("shapes", &vector)
    .unwrap()
    .set("table", &other)
    .unwrap();

  let options = ExecOptions {
    infer_formats: true,
    ..quiet()
  };
  let output = tool.execute(&options).await.unwrap();

  // The probes ran alongside the invocation and were cached.
  assert!(saga.raster_formats().await.contains("tif"));
  // Native SAGA grid extensions are always part of the raster set.
  assert!(saga.raster_formats().await.contains("sdat"));
  assert!(saga.vector_formats().await.contains("shp"));

  assert_eq!(output.files().len(), 3);
  assert_eq!(output.rasters().len(), 1);
  assert_eq!(output.rasters()[0].parameter, "grid");
  assert_eq!(output.vectors().len(), 1);
  assert_eq!(output.vectors()[0].parameter, "shapes");
  assert_eq!(output.file("table"), Some(other.as_path()));
}

#[tokio::test]
async fn unparsable_version_banner_degrades_to_unknown() {
  let temp = tempdir().unwrap();
  let exe = fake_saga(temp.path(), r#"echo "no version here""#);
  let saga = Saga::new(exe).unwrap();

  assert_eq!(saga.version().await, None);
  // Without a version the format probe is skipped.
  assert!(saga.raster_formats().await.is_empty());
}

const PIPELINE_SAGA: &str = r#"
log="$(dirname "$0")/invocations.log"
echo "$1 $2" >> "$log"
for a in "$@"; do
  case "$a" in
    -SINKROUTE=*) : > "${a#-SINKROUTE=}";;
    -DEM_PREPROC=*) : > "${a#-DEM_PREPROC=}";;
    -FLOW=*) : > "${a#-FLOW=}";;
  esac
done
echo ok
"#;

#[tokio::test]
async fn pipeline_runs_stages_in_order_and_wires_temp_paths() {
  let temp = tempdir().unwrap();
  let exe = fake_saga(temp.path(), PIPELINE_SAGA);
  let saga = Saga::new(&exe).unwrap();

  let data = tempdir().unwrap();
  let dem = data.path().join("dem.tif");
  fs::write(&dem, b"dem").unwrap();
  let flow = data.path().join("flow.tif");

  let mut route_detection = &saga / "ta_preprocessor" / "Sink Drainage Route Detection";
  route_detection
    .set("elevation", &dem)
    .unwrap()
    .set("sinkroute", "temp.sdat")
    .unwrap();

  let sinkroute = route_detection.parameter("sinkroute").unwrap().to_string();
  assert!(!Path::new(&sinkroute).exists());

  let mut sink_removal = &saga / "ta_preprocessor" / "Sink Removal";
  sink_removal
    .set("dem", &dem)
    .unwrap()
    .set("sinkroute", &sinkroute)
    .unwrap()
    .set("dem_preproc", "temp.sdat")
    .unwrap();
  let dem_preproc = sink_removal.parameter("dem_preproc").unwrap().to_string();

  // The wired value is embedded verbatim in the downstream command.
  assert!(
    sink_removal
      .command()
      .args()
      .contains(&format!("-SINKROUTE={sinkroute}"))
  );

  let mut flow_accumulation = &saga / "ta_hydrology" / "Flow Accumulation";
  flow_accumulation
    .set("dem", &dem_preproc)
    .unwrap()
    .set("flow", &flow)
    .unwrap();

  let pipe = route_detection | sink_removal | flow_accumulation;
  let outputs = pipe.execute(&quiet()).await.unwrap();
  assert_eq!(outputs.len(), 3);

  // Stage outputs were created at the generated scratch paths.
  assert!(Path::new(&sinkroute).is_file());
  assert!(Path::new(&dem_preproc).is_file());
  assert!(flow.is_file());
  assert_eq!(outputs[0].file("sinkroute"), Some(Path::new(&sinkroute)));

  // Strictly sequential: each stage logged before the next started.
  let log = fs::read_to_string(temp.path().join("invocations.log")).unwrap();
  let stages: Vec<&str> = log.lines().collect();
  assert_eq!(
    stages,
    [
      "ta_preprocessor Sink Drainage Route Detection",
      "ta_preprocessor Sink Removal",
      "ta_hydrology Flow Accumulation",
    ]
  );

  let removed = saga.temp_dir_cleanup().unwrap();
  assert_eq!(removed.len(), 2);
  assert!(!Path::new(&sinkroute).exists());
}

const FAILING_SAGA: &str = r#"
log="$(dirname "$0")/invocations.log"
echo "$2" >> "$log"
if [ "$2" = "bad" ]; then
  echo "stage failed" >&2
  exit 1
fi
echo ok
"#;

#[tokio::test]
async fn pipeline_aborts_on_first_failing_stage() {
  let temp = tempdir().unwrap();
  let exe = fake_saga(temp.path(), FAILING_SAGA);
  let saga = Saga::new(&exe).unwrap();

  let first = &saga / "lib" / "good";
  let second = &saga / "lib" / "bad";
  let third = &saga / "lib" / "never";

  let error = (first | second | third).execute(&quiet()).await.unwrap_err();
  match error {
    SagaError::Execution(ExecutionError::Stderr { target, stderr }) => {
      assert_eq!(target, "bad");
      assert_eq!(stderr, "stage failed");
    }
    other => panic!("unexpected error: {other}"),
  }

  let log = fs::read_to_string(temp.path().join("invocations.log")).unwrap();
  let stages: Vec<&str> = log.lines().collect();
  assert_eq!(stages, ["good", "bad"]);
}

const PROGRESS_SAGA: &str = r#"
echo "10%"
echo "50%"
echo "Saving 100%"
echo "all done"
"#;

#[derive(Default)]
struct Collected(Vec<(String, LineEnd)>);

impl ProgressSink for Collected {
  fn progress(&mut self, line: &str, end: LineEnd) {
    self.0.push((line.to_string(), end));
  }
}

#[tokio::test]
async fn verbose_streams_progress_without_touching_capture() {
  let temp = tempdir().unwrap();
  let exe = fake_saga(temp.path(), PROGRESS_SAGA);
  let saga = Saga::new(exe).unwrap();

  let tool = &saga / "ta_morphometry" / "0";
  let options = ExecOptions {
    verbose: true,
    ..quiet()
  };
  let mut sink = Collected::default();
  let output = tool
    .execute_with_progress(&options, &mut sink)
    .await
    .unwrap();

  assert_eq!(
    sink.0,
    [
      ("10%".to_string(), LineEnd::CarriageReturn),
      ("50%".to_string(), LineEnd::CarriageReturn),
      ("Saving 100%".to_string(), LineEnd::Newline),
    ]
  );
  // Lines without a percent sign are suppressed from the stream but
  // stay in the captured output.
  assert!(output.stdout.contains("all done"));
  assert!(output.stdout.contains("10%"));
}
