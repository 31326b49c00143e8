use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::domain::models::LogEntry;
use crate::domain::pipeline::ListView;
use crate::domain::views::{admin_log_view, direction_totals, field_log_view};

const DATE_FORMAT: &str = "%b %d, %Y";
const TIME_FORMAT: &str = "%I:%M %p";

/// Which log collection a report is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFamily {
    Field,
    Admin,
}

impl LogFamily {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "field" => Some(Self::Field),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Field => "field",
            Self::Admin => "admin",
        }
    }

    /// The list view whose filtered, sorted sequence feeds the export.
    pub fn list_view(self) -> ListView<LogEntry> {
        match self {
            Self::Field => field_log_view(),
            Self::Admin => admin_log_view(),
        }
    }

    pub fn template(self) -> &'static ExportTemplate {
        match self {
            Self::Field => &FIELD_TEMPLATE,
            Self::Admin => &ADMIN_TEMPLATE,
        }
    }

    /// File name without extension; the two families use different date styles.
    pub fn file_stem(self, range: &DateRange) -> String {
        match self {
            Self::Field => format!(
                "Truck_Logs_{}_to_{}",
                range.start.format("%Y-%m-%d"),
                range.end.format("%Y-%m-%d")
            ),
            Self::Admin => format!(
                "Admin_Truck_Logs_{}_to_{}",
                range.start.format("%b_%d_%Y"),
                range.end.format("%b_%d_%Y")
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Xlsx,
}

impl DocumentFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Xlsx => "xlsx",
        }
    }
}

/// Which documents one export run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatSelection {
    Pdf,
    Xlsx,
    Both,
}

impl FormatSelection {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "xlsx" | "excel" => Some(Self::Xlsx),
            "both" => Some(Self::Both),
            _ => None,
        }
    }

    pub fn formats(self) -> &'static [DocumentFormat] {
        match self {
            Self::Pdf => &[DocumentFormat::Pdf],
            Self::Xlsx => &[DocumentFormat::Xlsx],
            Self::Both => &[DocumentFormat::Pdf, DocumentFormat::Xlsx],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Column {
    pub label: &'static str,
    /// Excel width in characters.
    pub excel_width: f64,
    /// PDF width in millimetres.
    pub pdf_width_mm: f32,
}

const fn column(label: &'static str, excel_width: f64, pdf_width_mm: f32) -> Column {
    Column {
        label,
        excel_width,
        pdf_width_mm,
    }
}

pub struct ExportTemplate {
    pub family: LogFamily,
    pub title: &'static str,
    pub sheet_name: &'static str,
    pub columns: &'static [Column],
    row: fn(usize, &LogEntry, &DisplayClock) -> Vec<String>,
}

impl ExportTemplate {
    pub fn row(&self, index: usize, entry: &LogEntry, clock: &DisplayClock) -> Vec<String> {
        (self.row)(index, entry, clock)
    }
}

static FIELD_TEMPLATE: ExportTemplate = ExportTemplate {
    family: LogFamily::Field,
    title: "Truck Logs Report",
    sheet_name: "Truck Logs",
    columns: &[
        column("No.", 5.0, 10.0),
        column("Type", 8.0, 14.0),
        column("Plate Number", 15.0, 28.0),
        column("Brand", 15.0, 24.0),
        column("Company", 20.0, 36.0),
        column("Date", 15.0, 24.0),
        column("Time", 12.0, 18.0),
        column("Logged By", 20.0, 28.0),
    ],
    row: field_row,
};

static ADMIN_TEMPLATE: ExportTemplate = ExportTemplate {
    family: LogFamily::Admin,
    title: "Admin Truck Logs Report",
    sheet_name: "Admin Truck Logs",
    columns: &[
        column("Type", 10.0, 14.0),
        column("Proponent", 25.0, 32.0),
        column("Location", 20.0, 28.0),
        column("Truck Count", 12.0, 16.0),
        column("Remarks", 15.0, 20.0),
        column("Date", 15.0, 24.0),
        column("Time", 12.0, 18.0),
        column("Logged By", 20.0, 30.0),
    ],
    row: admin_row,
};

fn field_row(index: usize, entry: &LogEntry, clock: &DisplayClock) -> Vec<String> {
    vec![
        (index + 1).to_string(),
        entry.direction.as_str().to_string(),
        entry.plate_number().to_string(),
        entry.brand().to_string(),
        entry.site.name.clone(),
        clock.date(entry.occurred_at),
        clock.time(entry.occurred_at),
        entry.actor_name().to_string(),
    ]
}

fn admin_row(_index: usize, entry: &LogEntry, clock: &DisplayClock) -> Vec<String> {
    vec![
        entry.direction.as_str().to_string(),
        entry
            .site
            .proponent
            .clone()
            .unwrap_or_else(|| "N/A".to_string()),
        entry
            .site
            .location
            .clone()
            .unwrap_or_else(|| "N/A".to_string()),
        entry.truck_count.to_string(),
        entry
            .load_state
            .map_or("N/A", |state| state.label())
            .to_string(),
        clock.date(entry.occurred_at),
        clock.time(entry.occurred_at),
        entry.actor_name().to_string(),
    ]
}

/// Renders timestamps in the fixed display offset shared by both document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayClock {
    offset: FixedOffset,
}

impl DisplayClock {
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(|offset| Self { offset })
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn date(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.offset).format(DATE_FORMAT).to_string()
    }

    pub fn time(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.offset).format(TIME_FORMAT).to_string()
    }

    pub fn date_time(&self, at: DateTime<Utc>) -> String {
        format!("{} {}", self.date(at), self.time(at))
    }

    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.offset).date_naive()
    }

    /// Start of the first day through the last instant of the last day, in UTC.
    pub fn bounds(&self, range: &DateRange) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.local_to_utc(range.start, NaiveTime::MIN);
        let end_time = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
        let end = self.local_to_utc(range.end, end_time);
        (start, end)
    }

    fn local_to_utc(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        let naive = date.and_time(time);
        // fixed offsets never produce ambiguous or missing local times
        self.offset
            .from_local_datetime(&naive)
            .single()
            .map_or_else(|| naive.and_utc(), |local| local.with_timezone(&Utc))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangePreset {
    Today,
    Week,
    Month,
    Year,
}

impl RangePreset {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "today" => Some(Self::Today),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            "year" => Some(Self::Year),
            _ => None,
        }
    }

    /// Calendar range containing `today`; weeks start on Sunday.
    pub fn resolve(self, today: NaiveDate) -> DateRange {
        match self {
            Self::Today => DateRange {
                start: today,
                end: today,
            },
            Self::Week => {
                let back = u64::from(today.weekday().num_days_from_sunday());
                let start = today - Days::new(back);
                DateRange {
                    start,
                    end: start + Days::new(6),
                }
            }
            Self::Month => {
                let start = today.with_day(1).unwrap_or(today);
                let next_month = if today.month() == 12 {
                    NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(today.year(), today.month() + 1, 1)
                };
                let end = next_month.and_then(|first| first.pred_opt()).unwrap_or(today);
                DateRange { start, end }
            }
            Self::Year => DateRange {
                start: NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
                end: NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap_or(today),
            },
        }
    }
}

/// Inclusive range of display-local calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn custom(start: NaiveDate, end: NaiveDate) -> Self {
        if end < start {
            Self {
                start: end,
                end: start,
            }
        } else {
            Self { start, end }
        }
    }

    pub fn period_label(&self) -> String {
        format!(
            "{} - {}",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    pub total_records: usize,
    pub inbound: u64,
    pub outbound: u64,
    pub period: String,
    pub generated: String,
}

impl ReportSummary {
    pub fn headline(&self) -> String {
        format!(
            "Total Logs: {} | Trucks IN: {} | Trucks OUT: {}",
            self.total_records, self.inbound, self.outbound
        )
    }
}

/// A fully formatted report, ready for either document emitter.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    pub organization: String,
    pub title: &'static str,
    pub sheet_name: &'static str,
    pub columns: &'static [Column],
    pub rows: Vec<Vec<String>>,
    pub summary: ReportSummary,
}

pub fn build_table(
    family: LogFamily,
    entries: &[&LogEntry],
    range: &DateRange,
    organization: &str,
    clock: &DisplayClock,
    generated_at: DateTime<Utc>,
) -> ReportTable {
    let template = family.template();
    let totals = direction_totals(entries.iter().copied());

    ReportTable {
        organization: organization.to_string(),
        title: template.title,
        sheet_name: template.sheet_name,
        columns: template.columns,
        rows: entries
            .iter()
            .enumerate()
            .map(|(index, entry)| template.row(index, entry, clock))
            .collect(),
        summary: ReportSummary {
            total_records: totals.records,
            inbound: totals.inbound,
            outbound: totals.outbound,
            period: range.period_label(),
            generated: clock.date_time(generated_at),
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Document { file_name: String, bytes: Vec<u8> },
    /// Nothing matched the requested range; no document is produced.
    NoRecords,
}
