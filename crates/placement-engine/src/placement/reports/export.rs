use chrono::{DateTime, Utc};
use rust_xlsxwriter::{DocProperties, Format, Workbook, XlsxError};
use serde::Serialize;
use serde_json::Value;

use super::domain::{ReportData, ReportRecord};

const SECTION_COLUMN: &str = "section";
const SHEET_NAME: &str = "Report";
const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Csv,
    Excel,
}

impl ExportFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "excel" | "xlsx" => Some(Self::Excel),
            _ => None,
        }
    }

    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Excel => "xlsx",
        }
    }

    pub fn content_type(self) -> String {
        match self {
            Self::Csv => mime::TEXT_CSV_UTF_8.to_string(),
            Self::Excel => XLSX_CONTENT_TYPE.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("csv export failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv buffer could not be flushed: {0}")]
    Io(#[from] std::io::Error),
    #[error("spreadsheet export failed: {0}")]
    Excel(#[from] XlsxError),
    #[error("report is too large for a spreadsheet ({0} exceeds the sheet limits)")]
    TooLarge(String),
}

/// Single cell of the flattened table.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Empty,
            Some(Value::String(text)) => Self::Text(text.clone()),
            Some(Value::Number(number)) => number.as_f64().map_or(Self::Empty, Self::Number),
            Some(Value::Bool(flag)) => Self::Text(flag.to_string()),
            Some(other) => Self::Text(other.to_string()),
        }
    }

    fn render(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Number(number) => number.to_string(),
            Self::Empty => String::new(),
        }
    }
}

/// Materialized sections flattened into one header row plus data rows.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularReport {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl TabularReport {
    /// Columns appear in first-seen order; a `section` column leads when there are several sections.
    pub fn from_data(data: &ReportData) -> Self {
        let tagged = data.sections.len() > 1;

        let mut columns: Vec<String> = Vec::new();
        if tagged {
            columns.push(SECTION_COLUMN.to_string());
        }
        for row in data.sections.iter().flat_map(|section| &section.rows) {
            for key in row.keys() {
                if !columns.iter().any(|column| column == key) {
                    columns.push(key.clone());
                }
            }
        }

        let mut rows = Vec::with_capacity(data.row_count());
        for section in &data.sections {
            for row in &section.rows {
                let cells = columns
                    .iter()
                    .enumerate()
                    .map(|(index, column)| {
                        if tagged && index == 0 {
                            Cell::Text(section.name.clone())
                        } else {
                            Cell::from_value(row.get(column))
                        }
                    })
                    .collect();
                rows.push(cells);
            }
        }

        Self { columns, rows }
    }

    pub fn to_csv(&self) -> Result<Vec<u8>, ExportError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(Cell::render))?;
        }
        writer
            .into_inner()
            .map_err(|err| ExportError::Io(err.into_error()))
    }

    /// `created` is stamped into the document properties in place of the wall clock, so the
    /// same table always serializes to the same bytes.
    pub fn to_xlsx(&self, created: DateTime<Utc>) -> Result<Vec<u8>, ExportError> {
        let mut workbook = Workbook::new();
        workbook.set_properties(&DocProperties::new().set_creation_datetime(&created));
        let header = Format::new().set_bold();
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME)?;

        for (index, column) in self.columns.iter().enumerate() {
            sheet.write_string_with_format(0, column_index(index)?, column, &header)?;
        }
        for (row_index, row) in self.rows.iter().enumerate() {
            let row_number = u32::try_from(row_index + 1)
                .map_err(|_| ExportError::TooLarge(format!("row {}", row_index + 1)))?;
            for (index, cell) in row.iter().enumerate() {
                let column = column_index(index)?;
                match cell {
                    Cell::Text(text) => {
                        sheet.write_string(row_number, column, text)?;
                    }
                    Cell::Number(number) => {
                        sheet.write_number(row_number, column, *number)?;
                    }
                    Cell::Empty => {}
                }
            }
        }

        Ok(workbook.save_to_buffer()?)
    }
}

fn column_index(index: usize) -> Result<u16, ExportError> {
    u16::try_from(index).map_err(|_| ExportError::TooLarge(format!("column {index}")))
}

/// Serialized export plus what a client needs to save it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedReport {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

impl ExportedReport {
    pub fn render(
        record: &ReportRecord,
        data: &ReportData,
        format: ExportFormat,
    ) -> Result<Self, ExportError> {
        let table = TabularReport::from_data(data);
        let bytes = match format {
            ExportFormat::Csv => table.to_csv()?,
            ExportFormat::Excel => {
                table.to_xlsx(record.completed_at.unwrap_or(record.created_at))?
            }
        };
        Ok(Self {
            bytes,
            filename: suggested_filename(record, format),
            content_type: format.content_type(),
        })
    }
}

/// `{type}_{id}.{ext}`, with anything outside `[A-Za-z0-9_-]` in the type replaced.
pub fn suggested_filename(record: &ReportRecord, format: ExportFormat) -> String {
    let stem: String = record
        .report_type
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    format!("{stem}_{}.{}", record.id, format.extension())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::super::domain::ReportSection;
    use super::*;
    use crate::store::into_document;

    fn data(sections: Vec<(&str, Vec<Value>)>) -> ReportData {
        ReportData {
            sections: sections
                .into_iter()
                .map(|(name, rows)| ReportSection {
                    name: name.to_string(),
                    rows: rows
                        .into_iter()
                        .map(|row| into_document(row).expect("object"))
                        .collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn single_section_keeps_declared_column_order() {
        let table = TabularReport::from_data(&data(vec![(
            "placement_summary",
            vec![json!({ "studentName": "Asha", "cgpa": 7.5, "package": null })],
        )]));

        assert_eq!(table.columns, vec!["studentName", "cgpa", "package"]);
        assert_eq!(
            table.rows[0],
            vec![Cell::Text("Asha".to_string()), Cell::Number(7.5), Cell::Empty]
        );
    }

    #[test]
    fn multiple_sections_gain_a_leading_section_column() {
        let table = TabularReport::from_data(&data(vec![
            ("distribution", vec![json!({ "range": "0-5 LPA", "count": 1 })]),
            ("offers", vec![json!({ "company": "Acme", "bucket": "0-5 LPA" })]),
        ]));

        assert_eq!(table.columns, vec!["section", "range", "count", "company", "bucket"]);
        assert_eq!(table.rows[1][0], Cell::Text("offers".to_string()));
        assert_eq!(table.rows[1][1], Cell::Empty);
    }

    #[test]
    fn csv_renders_header_and_quotes_commas() {
        let table = TabularReport::from_data(&data(vec![(
            "company_wise_recruitment",
            vec![json!({ "company": "Acme, Inc", "jobsPosted": 2 })],
        )]));
        let csv = String::from_utf8(table.to_csv().expect("csv")).expect("utf8");
        assert_eq!(csv, "company,jobsPosted\n\"Acme, Inc\",2\n");
    }

    #[test]
    fn xlsx_output_is_a_zip_container() {
        let table = TabularReport::from_data(&data(vec![(
            "branch_wise_statistics",
            vec![json!({ "branch": "CS", "placementPercentage": 0.0 })],
        )]));
        let bytes = table.to_xlsx(Utc::now()).expect("xlsx");
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn format_aliases_are_accepted() {
        assert_eq!(ExportFormat::parse("XLSX"), Some(ExportFormat::Excel));
        assert_eq!(ExportFormat::parse("excel"), Some(ExportFormat::Excel));
        assert_eq!(ExportFormat::parse("csv"), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::parse("pdf"), None);
    }
}
