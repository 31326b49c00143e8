use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};

use crate::domain::export::ReportTable;

const HEADER_FILL: u32 = 0xE2E8F0;
const SUMMARY_SHEET: &str = "Summary";
const HEADER_ROW: u32 = 5;

/// Data sheet first, `Summary` second.
pub fn render_workbook(table: &ReportTable) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();

    let bold = Format::new().set_bold();
    let title = Format::new().set_bold().set_font_size(14);
    let header = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_border(FormatBorder::Thin)
        .set_align(FormatAlign::Center);
    let cell = Format::new().set_border(FormatBorder::Thin);

    let data = workbook.add_worksheet();
    data.set_name(table.sheet_name)?;
    write_heading(data, table, &title)?;

    for (col, column) in table.columns.iter().enumerate() {
        let col = col_index(col)?;
        data.set_column_width(col, column.excel_width)?;
        data.write_string_with_format(HEADER_ROW, col, column.label, &header)?;
    }

    for (offset, row) in table.rows.iter().enumerate() {
        let sheet_row = HEADER_ROW + 1 + row_index(offset)?;
        for (col, value) in row.iter().enumerate() {
            data.write_string_with_format(sheet_row, col_index(col)?, value, &cell)?;
        }
    }

    let summary = workbook.add_worksheet();
    summary.set_name(SUMMARY_SHEET)?;
    summary.set_column_width(0, 20)?;
    summary.set_column_width(1, 32)?;
    summary.write_string_with_format(0, 0, "Report Summary", &title)?;

    let lines: [(&str, String); 5] = [
        ("Total Records", table.summary.total_records.to_string()),
        ("Trucks IN", table.summary.inbound.to_string()),
        ("Trucks OUT", table.summary.outbound.to_string()),
        ("Period", table.summary.period.clone()),
        ("Generated", table.summary.generated.clone()),
    ];
    for (offset, (label, value)) in lines.iter().enumerate() {
        let row = 2 + row_index(offset)?;
        summary.write_string_with_format(row, 0, *label, &bold)?;
        summary.write_string(row, 1, value)?;
    }

    workbook.save_to_buffer()
}

fn write_heading(sheet: &mut Worksheet, table: &ReportTable, title: &Format) -> Result<(), XlsxError> {
    sheet.write_string_with_format(0, 0, &table.organization, title)?;
    sheet.write_string_with_format(1, 0, table.title, title)?;
    sheet.write_string(2, 0, format!("Period: {}", table.summary.period))?;
    sheet.write_string(3, 0, format!("Generated: {}", table.summary.generated))?;
    Ok(())
}

fn row_index(index: usize) -> Result<u32, XlsxError> {
    u32::try_from(index).map_err(|_| XlsxError::RowColumnLimitError)
}

fn col_index(index: usize) -> Result<u16, XlsxError> {
    u16::try_from(index).map_err(|_| XlsxError::RowColumnLimitError)
}
