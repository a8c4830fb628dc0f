//! Batch driver
//!
//! Runs one CSV file through the header mapper and normalizer, renders a
//! synthetic call per row, and paces through rows with a fixed delay while
//! reporting to a [`BatchObserver`].

use crate::call::{SyntheticCall, DEFAULT_CALL_NAME};
use crate::cancel::CancelHandle;
use crate::events::BatchObserver;
use crate::headers::{map_headers, ColumnMapping};
use crate::params::ParameterSet;
use crate::table::{Table, TableError};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Pause between rows unless configured otherwise
pub const DEFAULT_ROW_DELAY: Duration = Duration::from_secs(1);

/// Batch driver configuration
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Fixed pause between consecutive rows
    pub row_delay: Duration,

    /// Name rendered in front of each call's argument list
    pub call_name: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            row_delay: DEFAULT_ROW_DELAY,
            call_name: DEFAULT_CALL_NAME.to_string(),
        }
    }
}

impl BatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_row_delay(mut self, row_delay: Duration) -> Self {
        self.row_delay = row_delay;
        self
    }

    pub fn with_call_name(mut self, call_name: impl Into<String>) -> Self {
        self.call_name = call_name.into();
        self
    }
}

/// Stage a batch had reached when it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStage {
    Init,
    Validated,
    Mapped,
    RowProcessing,
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error(
        "csv_path must be an ABSOLUTE path (e.g., '/Users/you/vegan_queries.csv'). \
         Relative paths are not supported."
    )]
    RelativePath(String),

    #[error("Failed to read CSV: {0}")]
    Load(#[from] TableError),

    #[error("No headers found in CSV.")]
    NoHeaders,

    #[error("Batch cancelled after {completed} of {total} row(s).")]
    Cancelled { completed: usize, total: usize },
}

impl BatchError {
    pub fn stage(&self) -> BatchStage {
        match self {
            BatchError::RelativePath(_) => BatchStage::Init,
            BatchError::Load(_) => BatchStage::Validated,
            BatchError::NoHeaders => BatchStage::Mapped,
            BatchError::Cancelled { .. } => BatchStage::RowProcessing,
        }
    }

    /// Rows that finished before the failure.
    pub fn rows_completed(&self) -> Option<usize> {
        match self {
            BatchError::Cancelled { completed, .. } => Some(*completed),
            _ => None,
        }
    }
}

/// Returned after every row has been processed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub csv_path: String,
    pub headers: Vec<String>,
    pub selected_params: Vec<ColumnMapping>,
    pub rows_processed: usize,
}

/// Wire shape of a batch outcome: `{ok, summary}` or `{ok: false, message}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub ok: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<BatchSummary>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_processed: Option<usize>,
}

impl BatchReport {
    pub fn success(summary: BatchSummary) -> Self {
        Self {
            ok: true,
            summary: Some(summary),
            message: None,
            rows_processed: None,
        }
    }

    pub fn failure(error: &BatchError) -> Self {
        Self {
            ok: false,
            summary: None,
            message: Some(error.to_string()),
            rows_processed: error.rows_completed(),
        }
    }
}

impl From<Result<BatchSummary, BatchError>> for BatchReport {
    fn from(result: Result<BatchSummary, BatchError>) -> Self {
        match result {
            Ok(summary) => Self::success(summary),
            Err(error) => Self::failure(&error),
        }
    }
}

/// Drives CSV files through the recipes whitelist.
///
/// The driver holds only immutable configuration, so one instance can serve
/// any number of concurrent runs.
#[derive(Debug, Clone)]
pub struct BatchDriver {
    params: Arc<ParameterSet>,
    config: BatchConfig,
}

impl Default for BatchDriver {
    fn default() -> Self {
        Self::new(Arc::new(ParameterSet::recipes()), BatchConfig::default())
    }
}

impl BatchDriver {
    pub fn new(params: Arc<ParameterSet>, config: BatchConfig) -> Self {
        Self { params, config }
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Run the batch for the file at `csv_path`.
    #[instrument(skip(self, observer, cancel))]
    pub async fn run(
        &self,
        csv_path: &str,
        observer: &dyn BatchObserver,
        cancel: &CancelHandle,
    ) -> Result<BatchSummary, BatchError> {
        let path = Path::new(csv_path);
        if !path.is_absolute() {
            debug!("Rejecting relative csv_path");
            return Err(BatchError::RelativePath(csv_path.to_string()));
        }

        let table = Table::load(path).await?;
        if table.column_count() == 0 {
            return Err(BatchError::NoHeaders);
        }

        let mapping = map_headers(table.headers(), &self.params);
        debug!(
            selected = mapping.len(),
            columns = table.column_count(),
            "Mapped CSV headers"
        );

        let total = table.row_count();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        notify_info(
            observer,
            &format!("Preparing {} API request(s) from '{}'", total, file_name),
        )
        .await;

        for (index, row) in table.rows().iter().enumerate() {
            if cancel.is_cancelled() {
                info!(completed = index, total, "Batch cancelled");
                return Err(BatchError::Cancelled {
                    completed: index,
                    total,
                });
            }

            let current = index + 1;
            let call = SyntheticCall::from_row(self.config.call_name.as_str(), &mapping, row);
            let rendered = call.render();
            info!(row = current, total, call = %rendered, "Rendered request");

            notify_info(
                observer,
                &format!("Sent request {}/{}: {}", current, total, rendered),
            )
            .await;
            notify_progress(observer, current as u64, total as u64).await;

            if current < total {
                self.pause(cancel).await;
            }
        }

        if total == 0 {
            notify_progress(observer, 0, 1).await;
        }

        info!(rows_processed = total, "Batch complete");
        Ok(BatchSummary {
            csv_path: csv_path.to_string(),
            headers: table.headers().to_vec(),
            selected_params: mapping,
            rows_processed: total,
        })
    }

    async fn pause(&self, cancel: &CancelHandle) {
        if self.config.row_delay.is_zero() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(self.config.row_delay) => {}
            _ = cancel.cancelled() => {}
        }
    }
}

async fn notify_info(observer: &dyn BatchObserver, message: &str) {
    if let Err(e) = observer.on_info(message).await {
        warn!(error = %e, "Failed to deliver batch info event");
    }
}

async fn notify_progress(observer: &dyn BatchObserver, current: u64, total: u64) {
    if let Err(e) = observer.on_progress(current, total).await {
        warn!(error = %e, current, total, "Failed to deliver batch progress event");
    }
}
