//! Excelレポート生成
//!
//! - 照合プレビュー（`match` コマンド）
//! - 実行結果（`run --report`）

use crate::error::{PriceSyncError, Result};
use crate::pipeline::{ItemOutcome, OutcomeStatus, RunSummary};
use price_sync_common::MatchResult;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};
use std::path::Path;

/// レポートのセル値
enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<Option<&str>> for Cell {
    fn from(value: Option<&str>) -> Self {
        value.map(Cell::from).unwrap_or(Cell::Empty)
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map(Cell::Number).unwrap_or(Cell::Empty)
    }
}

fn report_error(e: XlsxError) -> PriceSyncError {
    PriceSyncError::Report(e.to_string())
}

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_font_color(Color::RGB(0x333333))
        .set_background_color(Color::RGB(0xF5F5F5))
        .set_align(FormatAlign::Center)
        .set_border(FormatBorder::Thin)
        .set_border_color(Color::RGB(0xAAAAAA))
}

/// ヘッダー行＋データ行の表を書き込む
fn write_table(
    worksheet: &mut Worksheet,
    headers: &[(&str, f64)],
    rows: &[Vec<Cell>],
) -> std::result::Result<(), XlsxError> {
    let header = header_format();
    let price = Format::new().set_num_format("0.00");

    for (col, (title, width)) in headers.iter().enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(0, col, *title, &header)?;
        worksheet.set_column_width(col, *width)?;
    }

    for (idx, cells) in rows.iter().enumerate() {
        let row = idx as u32 + 1;
        for (col, cell) in cells.iter().enumerate() {
            let col = col as u16;
            match cell {
                Cell::Text(text) => {
                    worksheet.write_string(row, col, text)?;
                }
                Cell::Number(value) => {
                    worksheet.write_number_with_format(row, col, *value, &price)?;
                }
                Cell::Empty => {}
            }
        }
    }

    worksheet.set_freeze_panes(1, 0)?;
    if !rows.is_empty() {
        worksheet.autofilter(0, 0, rows.len() as u32, headers.len() as u16 - 1)?;
    }
    Ok(())
}

const MATCH_HEADERS: &[(&str, f64)] = &[
    ("Row", 6.0),
    ("Item Name", 36.0),
    ("SKU", 14.0),
    ("Brand", 18.0),
    ("Status", 10.0),
    ("Confidence", 11.0),
    ("Matched SKU", 14.0),
    ("Matched Name", 36.0),
    ("Current Price", 13.0),
];

fn match_row(result: &MatchResult) -> Vec<Cell> {
    let item = &result.sheet_item;
    let record = result.inventory_record.as_ref();
    vec![
        Cell::Number(item.row as f64),
        Cell::from(item.name.as_str()),
        Cell::from(item.trimmed_sku()),
        Cell::from(item.brand.as_deref()),
        Cell::from(if result.is_match() { "MATCHED" } else { "NO MATCH" }),
        Cell::Number(result.confidence as f64),
        Cell::from(record.map(|r| r.sku.as_str())),
        Cell::from(record.map(|r| r.name.as_str())),
        Cell::from(record.map(|r| r.price)),
    ]
}

/// 照合プレビューのレポートを生成
pub fn generate_match_report(results: &[MatchResult], output_path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Matches").map_err(report_error)?;

    let rows: Vec<Vec<Cell>> = results.iter().map(match_row).collect();
    write_table(worksheet, MATCH_HEADERS, &rows).map_err(report_error)?;

    workbook.save(output_path).map_err(report_error)?;
    Ok(())
}

const OUTCOME_HEADERS: &[(&str, f64)] = &[
    ("Row", 6.0),
    ("Item Name", 36.0),
    ("SKU", 14.0),
    ("Status", 13.0),
    ("Confidence", 11.0),
    ("Matched SKU", 14.0),
    ("Old Price", 11.0),
    ("New Price", 11.0),
    ("Error", 13.0),
    ("Message", 48.0),
];

pub fn status_label(status: OutcomeStatus) -> &'static str {
    match status {
        OutcomeStatus::Updated => "UPDATED",
        OutcomeStatus::Unchanged => "UNCHANGED",
        OutcomeStatus::WouldUpdate => "WOULD UPDATE",
        OutcomeStatus::NoMatch => "NO MATCH",
        OutcomeStatus::Skipped => "SKIPPED",
        OutcomeStatus::Error => "ERROR",
    }
}

fn outcome_row(outcome: &ItemOutcome) -> Vec<Cell> {
    vec![
        Cell::Number(outcome.row as f64),
        Cell::from(outcome.name.as_str()),
        Cell::from(outcome.sku.as_deref()),
        Cell::from(status_label(outcome.status)),
        Cell::Number(outcome.confidence as f64),
        Cell::from(outcome.matched_sku.as_deref()),
        Cell::from(outcome.old_price),
        Cell::from(outcome.new_price),
        Cell::from(outcome.error_kind.as_deref()),
        Cell::from(outcome.message.as_deref()),
    ]
}

/// 実行結果のレポートを生成（Summary / Items の2シート）
pub fn generate_outcome_report(summary: &RunSummary, output_path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();

    let counters: [(&str, usize); 8] = [
        ("Total rows", summary.total_rows),
        ("Processed", summary.processed),
        ("Matched", summary.matched),
        ("Updated", summary.updated),
        ("Unchanged", summary.unchanged),
        ("Unmatched", summary.unmatched),
        ("Skipped", summary.skipped),
        ("Errored", summary.errored),
    ];
    let mut rows = vec![
        vec![Cell::from("Timestamp"), Cell::from(summary.timestamp.as_str())],
        vec![
            Cell::from("Dry run"),
            Cell::from(if summary.dry_run { "yes" } else { "no" }),
        ],
    ];
    rows.extend(
        counters
            .iter()
            .map(|(label, value)| vec![Cell::from(*label), Cell::Number(*value as f64)]),
    );

    let sheet = workbook.add_worksheet();
    sheet.set_name("Summary").map_err(report_error)?;
    write_table(sheet, &[("Metric", 16.0), ("Value", 28.0)], &rows).map_err(report_error)?;

    let items: Vec<Vec<Cell>> = summary.outcomes.iter().map(outcome_row).collect();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Items").map_err(report_error)?;
    write_table(sheet, OUTCOME_HEADERS, &items).map_err(report_error)?;

    workbook.save(output_path).map_err(report_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_label() {
        assert_eq!(status_label(OutcomeStatus::WouldUpdate), "WOULD UPDATE");
        assert_eq!(status_label(OutcomeStatus::NoMatch), "NO MATCH");
    }

    #[test]
    fn test_match_row_no_match() {
        let result = MatchResult::no_match(&price_sync_common::SheetItem::new("Red Widget"), 12);
        let row = match_row(&result);
        assert_eq!(row.len(), MATCH_HEADERS.len());
        assert!(matches!(row[4], Cell::Text(ref s) if s == "NO MATCH"));
        assert!(matches!(row[8], Cell::Empty));
    }
}
