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

//! Derives a flow accumulation raster from a DEM by chaining three
//! preprocessing and hydrology tools into one pipeline.
//!
//! Usage: `flow_accumulation <dem> <flow-output> [saga_cmd]`

use anyhow::Context;
use anyhow::Result;
use sagacmd::ExecOptions;
use sagacmd::Saga;
use sagacmd::logging::setup_tracing;
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
  let _guard = setup_tracing();

  let usage = "usage: flow_accumulation <dem> <flow-output> [saga_cmd]";
  let mut args = env::args().skip(1);
  let dem = args.next().context(usage)?;
  let flow = args.next().context(usage)?;
  let saga = match args.next() {
    Some(path) => Saga::new(path)?,
    None => Saga::locate()?,
  };

  let preprocessor = &saga / "ta_preprocessor";
  let hydrology = &saga / "ta_hydrology";

  let mut route_detection = &preprocessor / "Sink Drainage Route Detection";
  route_detection
    .set("elevation", &dem)?
    .set("sinkroute", "temp.sdat")?;

  // Later stages read the resolved values of earlier ones.
  let sinkroute = route_detection
    .parameter("sinkroute")
    .context("sinkroute not bound")?
    .to_string();

  let mut sink_removal = &preprocessor / "Sink Removal";
  sink_removal
    .set("dem", &dem)?
    .set("sinkroute", sinkroute)?
    .set("dem_preproc", "temp.sdat")?;

  let dem_preproc = sink_removal
    .parameter("dem_preproc")
    .context("dem_preproc not bound")?
    .to_string();

  let mut flow_accumulation = &hydrology / "Flow Accumulation (Parallelizable)";
  flow_accumulation.set("dem", dem_preproc)?.set("flow", &flow)?;

  let pipe = route_detection | sink_removal | flow_accumulation;
  let options = ExecOptions {
    verbose: true,
    ..ExecOptions::default()
  };
  let outputs = pipe.execute(&options).await?;

  let last = outputs.last().context("pipeline produced no outputs")?;
  println!("{}", serde_json::to_string_pretty(last.files())?);

  for removed in saga.temp_dir_cleanup()? {
    println!("removed {}", removed.display());
  }
  Ok(())
}
