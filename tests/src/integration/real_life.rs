//! # Directory Watcher Pipeline
//!
//! ```text
//! listdir ─found_files→ readfile ─file_data→ csv ─map_reduce→ mapfilter
//!     ─print_stdout→ printer (forward) ─printer_output→ recorder
//! ```
//!
//! Only rows whose `username` matches survive the filter.

#[cfg(test)]
mod tests {
    use crate::integration::support::{init_test_tracing, wait_until, Recorder};
    use serde_json::Value;
    use std::collections::HashMap;
    use std::fs;
    use std::time::Duration;
    use workflow_engine::{EngineConfig, Workflow};
    use workflow_handlers::{
        ListDirectoryHandler, MapFilterHandler, ParseCsvHandler, ReadFileHandler, StdoutHandler,
    };

    #[tokio::test]
    async fn test_csv_directory_pipeline() {
        init_test_tracing();
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("users.csv"),
            "username,email\nperbol,perbol@example.com\nsomeone,someone@example.com\n",
        )
        .unwrap();

        let config = EngineConfig {
            drain_interval_ms: Some(20),
            ..EngineConfig::default()
        };
        let mut workflow = Workflow::new(config);

        let mut listdir = workflow.processor("listdir", &["found_files"]);
        listdir.set_handler(ListDirectoryHandler::new());
        let cfg = listdir.configuration().unwrap();
        cfg.set_property("path", dir.path().to_string_lossy().into_owned())
            .unwrap();
        cfg.set_property("buffertime", 2_i64).unwrap();
        listdir.set_execution_interval(Duration::from_millis(50));

        let mut readfile = workflow.processor("readfile", &["file_data"]);
        readfile.set_handler(ReadFileHandler::new());
        readfile
            .configuration()
            .unwrap()
            .set_property("remove_after", false)
            .unwrap();
        readfile.subscribe(&["found_files"]).unwrap();

        let mut csv = workflow.processor("csvReader", &["map_reduce"]);
        csv.set_handler(ParseCsvHandler::new());
        csv.subscribe(&["file_data"]).unwrap();

        let mut mapfilter = workflow.processor("mapfilter", &["print_stdout"]);
        mapfilter.set_handler(MapFilterHandler::new());
        let filters: HashMap<String, String> =
            [("username".to_string(), "perbol".to_string())].into();
        let cfg = mapfilter.configuration().unwrap();
        cfg.set_property("filters", filters).unwrap();
        cfg.set_property("strict", true).unwrap();
        mapfilter.subscribe(&["map_reduce"]).unwrap();

        let mut printer = workflow.processor("printer", &["printer_output"]);
        printer.set_handler(StdoutHandler::new());
        printer
            .configuration()
            .unwrap()
            .set_property("forward", true)
            .unwrap();
        printer.subscribe(&["print_stdout"]).unwrap();

        let mut sink = workflow.processor("recorder", &[]);
        let (recorder, seen) = Recorder::new();
        sink.set_handler(recorder);
        sink.subscribe(&["printer_output"]).unwrap();

        for p in [listdir, readfile, csv, mapfilter, printer, sink] {
            workflow.add(p);
        }
        workflow.start().unwrap();

        assert!(wait_until(Duration::from_secs(5), || !seen.lock().is_empty()).await);
        // Later listings fall inside the buffertime window and add nothing.
        tokio::time::sleep(Duration::from_millis(200)).await;

        let seen = seen.lock().clone();
        assert_eq!(seen.len(), 1);
        let row: Value = serde_json::from_str(&seen[0]).unwrap();
        assert_eq!(row["username"], "perbol");
        assert_eq!(row["email"], "perbol@example.com");

        assert!(dir.path().join("users.csv").exists());
        workflow.shutdown().await;
    }
}
