//! Watch a directory for CSV files and print the rows matching a filter.
//!
//! ```text
//! csv-filter <directory> <field>=<regex> [<field>=<regex> ...]
//! ```
//!
//! Pipeline: list directory → read file → parse CSV → map filter → stdout.
//! Files are removed once read. Engine and logging settings come from the
//! `WF_*` environment variables.

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::time::Duration;
use tracing::info;
use workflow_engine::{EngineConfig, Workflow};
use workflow_handlers::{
    ListDirectoryHandler, MapFilterHandler, ParseCsvHandler, ReadFileHandler, StdoutHandler,
};
use workflow_telemetry::{init_tracing, TelemetryConfig};

fn parse_args() -> Result<(String, HashMap<String, String>)> {
    let mut args = std::env::args().skip(1);
    let directory = args
        .next()
        .context("usage: csv-filter <directory> <field>=<regex> ...")?;

    let mut filters = HashMap::new();
    for arg in args {
        let Some((field, pattern)) = arg.split_once('=') else {
            bail!("filter {:?} is not of the form <field>=<regex>", arg);
        };
        filters.insert(field.to_string(), pattern.to_string());
    }
    Ok((directory, filters))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(&TelemetryConfig::from_env()).context("Failed to initialize tracing")?;
    let (directory, filters) = parse_args()?;

    let mut config = EngineConfig::from_env();
    config.drain_interval_ms.get_or_insert(500);
    let mut workflow = Workflow::new(config);

    let mut list = workflow.processor("listdir", &["found_files"]);
    list.set_handler(ListDirectoryHandler::new());
    list.configuration()
        .context("handler attached")?
        .set_property("path", directory.as_str())?;
    list.set_execution_interval(Duration::from_secs(1));

    let mut read = workflow.processor("readfile", &["file_data"]);
    read.set_handler(ReadFileHandler::new());
    read.configuration()
        .context("handler attached")?
        .set_property("remove_after", true)?;
    read.subscribe(&["found_files"])?;

    let mut parse = workflow.processor("csv", &["rows"]);
    parse.set_handler(ParseCsvHandler::new());
    parse.subscribe(&["file_data"])?;

    let mut filter = workflow.processor("mapfilter", &["matches"]);
    filter.set_handler(MapFilterHandler::new());
    let filter_cfg = filter.configuration().context("handler attached")?;
    filter_cfg.set_property("filters", filters)?;
    filter_cfg.set_property("strict", true)?;
    filter.subscribe(&["rows"])?;

    let mut print = workflow.processor("printer", &[]);
    print.set_handler(StdoutHandler::new());
    print.subscribe(&["matches"])?;

    for processor in [list, read, parse, filter, print] {
        workflow.add(processor);
    }
    workflow.start()?;
    info!(directory = %directory, "Watching for CSV files. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    workflow.shutdown().await;
    Ok(())
}
