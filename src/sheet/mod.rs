//! スプレッドシート読み込み
//!
//! - ローカルの .xlsx/.xls/.ods（calamine）
//! - ローカルの .csv
//! - CSVエクスポートURL（http/https）

pub mod columns;

pub use columns::ColumnMap;

use crate::error::{PriceSyncError, Result};
use calamine::{open_workbook_auto, Reader};
use price_sync_common::SheetItem;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// シートの取得元
#[derive(Debug, Clone, PartialEq)]
pub enum SheetSource {
    Local(PathBuf),
    Url(String),
}

impl std::str::FromStr for SheetSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("シートの指定が空です".to_string());
        }
        if s.starts_with("http://") || s.starts_with("https://") {
            Ok(SheetSource::Url(s.to_string()))
        } else {
            Ok(SheetSource::Local(PathBuf::from(s)))
        }
    }
}

impl std::fmt::Display for SheetSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetSource::Local(path) => write!(f, "{}", path.display()),
            SheetSource::Url(url) => write!(f, "{}", url),
        }
    }
}

/// CSVエクスポートURLの本文を取得
async fn fetch_csv(url: &str, timeout: Duration) -> Result<String> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| PriceSyncError::Unavailable(format!("シート取得エラー: {}", e)))?;
    let status = response.status();
    if !status.is_success() {
        return Err(PriceSyncError::from_status(status.as_u16(), url));
    }
    response
        .text()
        .await
        .map_err(|e| PriceSyncError::Unavailable(format!("シート取得エラー: {}", e)))
}

/// シートを読み込んで行の一覧を返す
///
/// * `worksheet` - ワークブックのシート名（省略時は先頭シート）
pub async fn load_sheet(source: &SheetSource, worksheet: Option<&str>) -> Result<Vec<SheetItem>> {
    let items = match source {
        SheetSource::Url(url) => {
            tracing::info!(url = %url, "CSVエクスポートを取得中");
            let body = fetch_csv(url, FETCH_TIMEOUT).await?;
            read_csv(body.as_bytes())?
        }
        SheetSource::Local(path) => {
            if !path.exists() {
                return Err(PriceSyncError::Sheet(format!(
                    "ファイルが見つかりません: {}",
                    path.display()
                )));
            }
            if is_csv(path) {
                read_csv(std::fs::File::open(path)?)?
            } else {
                read_workbook(path, worksheet)?
            }
        }
    };

    tracing::info!(rows = items.len(), source = %source, "シートを読み込みました");
    Ok(items)
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

/// 行データ（ヘッダー行を含む）をSheetItemに変換
fn parse_rows(mut rows: impl Iterator<Item = Vec<String>>) -> Vec<SheetItem> {
    let Some(first) = rows.next() else {
        return Vec::new();
    };

    let mut items = Vec::new();
    let map = match ColumnMap::from_headers(&first) {
        Some(map) => map,
        None => {
            // ヘッダーなし: 既定レイアウトで1行目からデータ
            let map = ColumnMap::default();
            items.extend(map.parse_row(&first, 1));
            map
        }
    };
    for (idx, cells) in rows.enumerate() {
        // ヘッダーを1行目として、データは2行目から
        items.extend(map.parse_row(&cells, idx + 2));
    }
    items
}

/// CSVを読み込む
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<SheetItem>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record.map_err(|e| PriceSyncError::Sheet(format!("CSV解析エラー: {}", e)))?;
        rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    Ok(parse_rows(rows.into_iter()))
}

/// ワークブック（xlsx/xls/ods）を読み込む
pub fn read_workbook(path: &Path, worksheet: Option<&str>) -> Result<Vec<SheetItem>> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| PriceSyncError::Sheet(format!("{}: {}", path.display(), e)))?;

    let sheet_name = match worksheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| PriceSyncError::Sheet(format!("シートがありません: {}", path.display())))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| PriceSyncError::Sheet(format!("シート '{}': {}", sheet_name, e)))?;

    let rows = range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<_>>());

    Ok(parse_rows(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_source_from_str() {
        assert_eq!(
            "https://example.com/export?format=csv".parse::<SheetSource>().unwrap(),
            SheetSource::Url("https://example.com/export?format=csv".to_string())
        );
        assert_eq!(
            "inventory.xlsx".parse::<SheetSource>().unwrap(),
            SheetSource::Local(PathBuf::from("inventory.xlsx"))
        );
        assert!("  ".parse::<SheetSource>().is_err());
    }

    #[test]
    fn test_read_csv_with_header() {
        let csv = "Item Name,SKU,Brand,Estimated Value,Processed\n\
                   Organic Honey 500g,HON-500,BeeCo,4.50,\n\
                   ,,,,\n\
                   Red Widget,,Acme,,yes\n";
        let items = read_csv(csv.as_bytes()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].row, 2);
        assert_eq!(items[0].sku.as_deref(), Some("HON-500"));
        assert_eq!(items[1].row, 4);
        assert!(items[1].processed);
    }

    #[test]
    fn test_read_csv_without_header() {
        let csv = "Red Widget,W-1,Acme\nBlue Gadget,G-1,Acme\n";
        let items = read_csv(csv.as_bytes()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].row, 1);
        assert_eq!(items[0].name, "Red Widget");
        assert_eq!(items[1].row, 2);
    }

    #[test]
    fn test_read_csv_reordered_columns() {
        let csv = "SKU,Manufacturer,Item Name\nHON-500,BeeCo,Honey Jar\n";
        let items = read_csv(csv.as_bytes()).unwrap();
        assert_eq!(items[0].name, "Honey Jar");
        assert_eq!(items[0].brand.as_deref(), Some("BeeCo"));
    }

    #[test]
    fn test_read_csv_empty() {
        assert!(read_csv("".as_bytes()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_csv_times_out() {
        // 接続は受け付けるが応答しないサーバー
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let url = format!("http://{}/export?format=csv", addr);
        let err = fetch_csv(&url, Duration::from_millis(200)).await.unwrap_err();
        assert!(matches!(err, PriceSyncError::Unavailable(_)));
    }
}
