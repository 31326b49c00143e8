use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::adapters::excel::render_workbook;
use crate::adapters::gateway::{GatewayError, RemoteData, TimeWindow};
use crate::adapters::pdf::render_document;
use crate::domain::export::{
    DateRange, DisplayClock, DocumentFormat, ExportOutcome, LogFamily, ReportTable, build_table,
};
use crate::domain::models::LogEntry;
use crate::domain::pipeline::{ListState, ordered};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to fetch report data: {0}")]
    Fetch(#[from] GatewayError),
    #[error("failed to build workbook: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),
    #[error("failed to build pdf: {0}")]
    Pdf(String),
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// What to export: a log family over a date range, viewed through a list state.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub family: LogFamily,
    pub range: DateRange,
    pub list_state: ListState,
}

impl ExportRequest {
    /// Unfiltered, default-sorted request.
    pub fn new(family: LogFamily, range: DateRange) -> Self {
        Self {
            family,
            range,
            list_state: ListState::for_view(&family.list_view()),
        }
    }
}

pub struct ReportService {
    remote: Arc<dyn RemoteData>,
    clock: DisplayClock,
    organization: String,
}

impl ReportService {
    pub fn new(remote: Arc<dyn RemoteData>, clock: DisplayClock, organization: &str) -> Self {
        Self {
            remote,
            clock,
            organization: organization.to_string(),
        }
    }

    /// Fetches a fresh snapshot once and emits every requested format from it.
    pub fn export(
        &self,
        request: &ExportRequest,
        formats: &[DocumentFormat],
        generated_at: DateTime<Utc>,
    ) -> Result<Vec<ExportOutcome>, ExportError> {
        let entries = self.fetch(request)?;
        let view = request.family.list_view();
        let rows = ordered(&view, &request.list_state, &entries);

        if rows.is_empty() {
            tracing::info!(
                family = request.family.as_str(),
                period = %request.range.period_label(),
                "no records in range; nothing exported"
            );
            return Ok(vec![ExportOutcome::NoRecords]);
        }

        let table = build_table(
            request.family,
            &rows,
            &request.range,
            &self.organization,
            &self.clock,
            generated_at,
        );

        formats
            .iter()
            .map(|format| self.render(request, &table, *format))
            .collect()
    }

    fn fetch(&self, request: &ExportRequest) -> Result<Vec<LogEntry>, ExportError> {
        let (start, end) = self.clock.bounds(&request.range);
        let window = TimeWindow { start, end };
        let entries = match request.family {
            LogFamily::Field => self.remote.field_logs(Some(window))?,
            LogFamily::Admin => self.remote.admin_logs(Some(window))?,
        };

        Ok(entries
            .into_iter()
            .filter(|entry| entry.occurred_at >= start && entry.occurred_at <= end)
            .collect())
    }

    fn render(
        &self,
        request: &ExportRequest,
        table: &ReportTable,
        format: DocumentFormat,
    ) -> Result<ExportOutcome, ExportError> {
        let bytes = match format {
            DocumentFormat::Xlsx => render_workbook(table)?,
            DocumentFormat::Pdf => {
                render_document(table).map_err(|error| ExportError::Pdf(error.to_string()))?
            }
        };
        let file_name = format!(
            "{}.{}",
            request.family.file_stem(&request.range),
            format.extension()
        );

        tracing::info!(
            file_name = %file_name,
            rows = table.rows.len(),
            bytes = bytes.len(),
            "report rendered"
        );
        Ok(ExportOutcome::Document { file_name, bytes })
    }
}

/// Writes a rendered document into `dir`, returning the written path.
pub fn write_document(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, ExportError> {
    let io_error = |path: &Path, source| ExportError::Io {
        path: path.display().to_string(),
        source,
    };

    std::fs::create_dir_all(dir).map_err(|source| io_error(dir, source))?;
    let path = dir.join(file_name);
    std::fs::write(&path, bytes).map_err(|source| io_error(&path, source))?;
    Ok(path)
}
