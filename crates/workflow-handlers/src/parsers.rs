//! CSV parsing.

use crate::error::HandlersError;
use crate::output::Output;
use std::collections::BTreeMap;
use std::sync::Arc;
use workflow_bus::Payload;
use workflow_engine::{
    async_trait, Configuration, Handler, HandlerContext, HandlerError, PropertyError,
};
use workflow_telemetry::MetricProvider;

/// Parses CSV payloads into one JSON object per data row.
///
/// Properties:
/// - `delimiter` (string, default `,`): a single ASCII character.
/// - `headerlength` (int, default 1): number of leading header rows. Column
///   names come from the last of them; with 0, columns are named by index.
///
/// Each row is published as a JSON object with the incoming payload's source.
pub struct ParseCsvHandler {
    cfg: Configuration,
    delimiter: u8,
    header_length: usize,
    output: Output,
}

impl ParseCsvHandler {
    #[must_use]
    pub fn new() -> Self {
        let cfg = Configuration::new();
        // Declared on a fresh configuration, cannot collide.
        let _ = cfg.add_property_with_default("delimiter", "field delimiter", ",", false);
        let _ = cfg.add_property_with_default(
            "headerlength",
            "number of header rows before the data",
            1_i64,
            false,
        );
        Self {
            cfg,
            delimiter: b',',
            header_length: 1,
            output: Output::default(),
        }
    }

    /// Parse `data` into row maps keyed by column name.
    pub fn parse(&self, data: &[u8]) -> Result<Vec<BTreeMap<String, String>>, HandlersError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(data);

        let mut headers: Vec<String> = Vec::new();
        let mut rows = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record.map_err(|e| HandlersError::Csv {
                row: index + 1,
                reason: e.to_string(),
            })?;

            if index < self.header_length {
                headers = record.iter().map(|h| h.trim().to_string()).collect();
                continue;
            }

            let row: BTreeMap<String, String> = record
                .iter()
                .enumerate()
                .map(|(column, value)| {
                    let key = headers
                        .get(column)
                        .filter(|h| !h.is_empty())
                        .cloned()
                        .unwrap_or_else(|| column.to_string());
                    (key, value.to_string())
                })
                .collect();
            rows.push(row);
        }
        Ok(rows)
    }
}

impl Default for ParseCsvHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Handler for ParseCsvHandler {
    fn name(&self) -> &'static str {
        "parse_csv"
    }

    async fn handle(
        &self,
        ctx: &HandlerContext,
        payload: Option<Payload>,
        egress: &[String],
    ) -> Result<(), HandlerError> {
        let payload = payload.ok_or(HandlerError::IngressRequired)?;
        for row in self.parse(payload.data())? {
            let encoded = serde_json::to_vec(&row)?;
            self.output
                .emit(ctx, egress, &Payload::new(payload.source(), encoded))?;
        }
        Ok(())
    }

    fn configuration(&self) -> &Configuration {
        &self.cfg
    }

    fn validate_configuration(&mut self) -> Result<(), PropertyError> {
        self.cfg.validate()?;

        let delimiter = self.cfg.get_string("delimiter").unwrap_or_else(|| ",".to_string());
        self.delimiter = match delimiter.as_bytes() {
            [byte] if byte.is_ascii() => *byte,
            _ => {
                return Err(PropertyError::InvalidValue {
                    name: "delimiter".to_string(),
                    reason: format!("{:?} is not a single ASCII character", delimiter),
                })
            }
        };

        let header_length = self.cfg.get_int("headerlength").unwrap_or(1);
        self.header_length =
            usize::try_from(header_length).map_err(|_| PropertyError::InvalidValue {
                name: "headerlength".to_string(),
                reason: "must not be negative".to_string(),
            })?;
        Ok(())
    }

    fn set_metric_provider(&mut self, provider: Arc<dyn MetricProvider>, label: &str) {
        self.output.attach(provider, label);
    }
}
