//! Regex filtering of JSON map payloads.

use crate::error::HandlersError;
use crate::output::Output;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;
use workflow_bus::Payload;
use workflow_engine::{
    async_trait, Configuration, Handler, HandlerContext, HandlerError, PropertyError,
    PropertyKind,
};
use workflow_telemetry::MetricProvider;

/// Forwards flat JSON objects whose fields match configured regexes.
///
/// Properties:
/// - `filters` (string map, required): field name to regex.
/// - `strict` (bool, default false): every filter must match; otherwise
///   one matching filter is enough.
///
/// Only flat objects are accepted: an array or object value anywhere in
/// the payload rejects it with `NotJsonMap`, whether or not a filter names
/// that field. A missing field never matches. An empty filter set forwards
/// every flat object.
///
/// Unlike a strict string-map decode, numbers and booleans are matched
/// against their JSON text and `null` against the empty string, so
/// `{"age": 31}` can pass a `^3[0-9]$` filter.
pub struct MapFilterHandler {
    cfg: Configuration,
    filters: Vec<(String, Regex)>,
    strict: bool,
    output: Output,
}

impl MapFilterHandler {
    #[must_use]
    pub fn new() -> Self {
        let cfg = Configuration::new();
        // Declared on a fresh configuration, cannot collide.
        let _ = cfg.add_property(
            "filters",
            "field name to regular expression",
            PropertyKind::StringMap,
            true,
        );
        let _ = cfg.add_property_with_default(
            "strict",
            "require every filter to match",
            false,
            false,
        );
        Self {
            cfg,
            filters: Vec::new(),
            strict: false,
            output: Output::default(),
        }
    }

    /// The compiled pattern for `field`, if one is configured.
    #[must_use]
    pub fn filter_pattern(&self, field: &str) -> Option<&str> {
        self.filters
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, re)| re.as_str())
    }

    /// Whether the decoded object passes the filters.
    pub fn matches(&self, object: &Map<String, Value>) -> Result<bool, HandlersError> {
        if object
            .values()
            .any(|v| matches!(v, Value::Array(_) | Value::Object(_)))
        {
            return Err(HandlersError::NotJsonMap);
        }
        if self.filters.is_empty() {
            return Ok(true);
        }

        let mut hits = 0;
        for (field, re) in &self.filters {
            let hit = match object.get(field) {
                None => false,
                Some(Value::String(s)) => re.is_match(s),
                Some(Value::Null) => re.is_match(""),
                Some(v @ (Value::Bool(_) | Value::Number(_))) => re.is_match(&v.to_string()),
                // Rejected above.
                Some(Value::Array(_) | Value::Object(_)) => false,
            };
            if hit {
                hits += 1;
            } else if self.strict {
                return Ok(false);
            }
        }
        Ok(hits > 0)
    }
}

impl Default for MapFilterHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Handler for MapFilterHandler {
    fn name(&self) -> &'static str {
        "map_filter"
    }

    async fn handle(
        &self,
        ctx: &HandlerContext,
        payload: Option<Payload>,
        egress: &[String],
    ) -> Result<(), HandlerError> {
        let payload = payload.ok_or(HandlerError::IngressRequired)?;
        let object = match serde_json::from_slice::<Value>(payload.data()) {
            Ok(Value::Object(object)) => object,
            _ => return Err(HandlersError::NotJsonMap.into()),
        };

        if self.matches(&object)? {
            self.output.emit(ctx, egress, &payload)?;
        } else {
            debug!(processor_id = ctx.processor_id(), source = payload.source(), "Payload filtered out");
        }
        Ok(())
    }

    fn configuration(&self) -> &Configuration {
        &self.cfg
    }

    fn validate_configuration(&mut self) -> Result<(), PropertyError> {
        self.cfg.validate()?;

        let mut filters = Vec::new();
        for (field, pattern) in self.cfg.get_string_map("filters").unwrap_or_default() {
            let re = Regex::new(&pattern).map_err(|e| PropertyError::InvalidValue {
                name: "filters".to_string(),
                reason: format!("{}: {}", field, e),
            })?;
            filters.push((field, re));
        }
        filters.sort_by(|a, b| a.0.cmp(&b.0));

        self.filters = filters;
        self.strict = self.cfg.get_bool("strict").unwrap_or(false);
        Ok(())
    }

    fn set_metric_provider(&mut self, provider: Arc<dyn MetricProvider>, label: &str) {
        self.output.attach(provider, label);
    }
}
