//! File system handlers.
//!
//! `ListDirectoryHandler` runs on the execution interval and publishes the
//! paths of regular files it finds; `ReadFileHandler` turns a path into the
//! file's contents. Chained, they form a simple directory watcher.

use crate::error::HandlersError;
use crate::output::Output;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use workflow_bus::Payload;
use workflow_engine::{
    async_trait, Configuration, Handler, HandlerContext, HandlerError, PropertyError,
    PropertyKind,
};
use workflow_telemetry::MetricProvider;

/// Lists a directory and publishes each regular file's path.
///
/// Properties:
/// - `path` (string, required): directory to list.
/// - `buffertime` (int seconds, default 0): a path is published again only
///   after this many seconds; 0 publishes each path once.
///
/// An incoming payload, if any, only triggers a listing; its data is ignored.
pub struct ListDirectoryHandler {
    cfg: Configuration,
    path: PathBuf,
    buffer_time: Option<Duration>,
    /// Path -> when it was last published.
    seen: Mutex<HashMap<PathBuf, Instant>>,
    output: Output,
}

impl ListDirectoryHandler {
    #[must_use]
    pub fn new() -> Self {
        let cfg = Configuration::new();
        // Declared on a fresh configuration, cannot collide.
        let _ = cfg.add_property("path", "directory to list", PropertyKind::String, true);
        let _ = cfg.add_property_with_default(
            "buffertime",
            "seconds before an already published path is published again",
            0_i64,
            false,
        );
        Self {
            cfg,
            path: PathBuf::new(),
            buffer_time: None,
            seen: Mutex::new(HashMap::new()),
            output: Output::default(),
        }
    }

    /// Regular files in the directory, sorted for stable output.
    async fn list(&self) -> Result<Vec<PathBuf>, HandlerError> {
        let mut entries = tokio::fs::read_dir(&self.path).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Record `path` as published now unless it is still inside its window.
    fn claim(&self, path: &Path, now: Instant) -> bool {
        let mut seen = self.seen.lock();
        match (seen.get(path), self.buffer_time) {
            (Some(_), None) => false,
            (Some(last), Some(window)) if now.duration_since(*last) < window => false,
            _ => {
                seen.insert(path.to_path_buf(), now);
                true
            }
        }
    }

    /// Undo a claim whose publish failed so the next listing retries it.
    fn release(&self, path: &Path) {
        self.seen.lock().remove(path);
    }

    /// Forget paths that disappeared from the directory.
    fn forget_missing(&self, present: &[PathBuf]) {
        self.seen.lock().retain(|path, _| present.contains(path));
    }
}

impl Default for ListDirectoryHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Handler for ListDirectoryHandler {
    fn name(&self) -> &'static str {
        "list_directory"
    }

    async fn handle(
        &self,
        ctx: &HandlerContext,
        _payload: Option<Payload>,
        egress: &[String],
    ) -> Result<(), HandlerError> {
        let files = self.list().await?;
        self.forget_missing(&files);

        let source = self.path.to_string_lossy().into_owned();
        let now = Instant::now();
        for file in &files {
            if !self.claim(file, now) {
                continue;
            }
            let found = Payload::new(source.clone(), file.to_string_lossy().into_owned());
            if let Err(e) = self.output.emit(ctx, egress, &found) {
                self.release(file);
                return Err(e);
            }
        }
        debug!(directory = %source, files = files.len(), "Directory listed");
        Ok(())
    }

    fn configuration(&self) -> &Configuration {
        &self.cfg
    }

    fn validate_configuration(&mut self) -> Result<(), PropertyError> {
        self.cfg.validate()?;
        let path = self.cfg.get_string("path").unwrap_or_default();
        if path.is_empty() {
            return Err(PropertyError::InvalidValue {
                name: "path".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        let seconds = self.cfg.get_int("buffertime").unwrap_or(0);
        if seconds < 0 {
            return Err(PropertyError::InvalidValue {
                name: "buffertime".to_string(),
                reason: "must not be negative".to_string(),
            });
        }
        self.path = PathBuf::from(path);
        self.buffer_time = (seconds > 0).then(|| Duration::from_secs(seconds as u64));
        Ok(())
    }

    fn set_metric_provider(&mut self, provider: Arc<dyn MetricProvider>, label: &str) {
        self.output.attach(provider, label);
    }
}

/// Reads the file named by the payload and publishes its contents.
///
/// Properties:
/// - `remove_after` (bool, required): delete the file once read.
///
/// The published payload carries the file path as its source.
pub struct ReadFileHandler {
    cfg: Configuration,
    remove_after: bool,
    output: Output,
}

impl ReadFileHandler {
    #[must_use]
    pub fn new() -> Self {
        let cfg = Configuration::new();
        // Declared on a fresh configuration, cannot collide.
        let _ = cfg.add_property(
            "remove_after",
            "delete files after reading them",
            PropertyKind::Bool,
            true,
        );
        Self {
            cfg,
            remove_after: false,
            output: Output::default(),
        }
    }
}

impl Default for ReadFileHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Handler for ReadFileHandler {
    fn name(&self) -> &'static str {
        "read_file"
    }

    async fn handle(
        &self,
        ctx: &HandlerContext,
        payload: Option<Payload>,
        egress: &[String],
    ) -> Result<(), HandlerError> {
        let payload = payload.ok_or(HandlerError::IngressRequired)?;
        let path = payload.as_text().trim().to_string();

        let metadata = tokio::fs::metadata(&path).await?;
        if !metadata.is_file() {
            return Err(HandlersError::NotAFile { path }.into());
        }

        let contents = tokio::fs::read(&path).await?;
        self.output
            .emit(ctx, egress, &Payload::new(path.clone(), contents))?;

        if self.remove_after {
            tokio::fs::remove_file(&path).await?;
            info!(path = %path, "File removed after reading");
        }
        Ok(())
    }

    fn configuration(&self) -> &Configuration {
        &self.cfg
    }

    fn validate_configuration(&mut self) -> Result<(), PropertyError> {
        self.cfg.validate()?;
        self.remove_after = self.cfg.get_bool("remove_after").unwrap_or(false);
        Ok(())
    }

    fn set_metric_provider(&mut self, provider: Arc<dyn MetricProvider>, label: &str) {
        self.output.attach(provider, label);
    }
}
