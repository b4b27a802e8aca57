//! 列レイアウトの解決
//!
//! 18列固定レイアウトのうち、照合に使う列をヘッダー名で特定する。
//! ヘッダーが見つからない列は既定位置（A〜E列）にフォールバックする。

use price_sync_common::SheetItem;

/// シートの列数
pub const SHEET_COLUMNS: usize = 18;

const NAME_HEADERS: &[&str] = &["item name", "name", "product name", "item"];
const SKU_HEADERS: &[&str] = &["sku", "item sku"];
const BRAND_HEADERS: &[&str] = &["brand", "manufacturer", "vendor"];
const VALUE_HEADERS: &[&str] = &["estimated value", "est. value", "estimated price", "value"];
const QUANTITY_HEADERS: &[&str] = &["quantity", "qty"];
const BARCODE_HEADERS: &[&str] = &["barcode", "upc", "ean"];
const PROCESSED_HEADERS: &[&str] = &["processed", "status", "done"];

/// 照合に使う列の位置（0始まり）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub name: usize,
    pub sku: Option<usize>,
    pub brand: Option<usize>,
    pub estimated_value: Option<usize>,
    pub quantity: Option<usize>,
    pub barcode: Option<usize>,
    pub processed: Option<usize>,
}

impl Default for ColumnMap {
    /// 既定レイアウト: A=Item Name, B=SKU, C=Brand, D=Estimated Value, E=Processed
    fn default() -> Self {
        Self {
            name: 0,
            sku: Some(1),
            brand: Some(2),
            estimated_value: Some(3),
            quantity: None,
            barcode: None,
            processed: Some(4),
        }
    }
}

/// 候補名に一致する見出しの位置（固定レイアウトの範囲内のみ）
fn find_header(headers: &[String], candidates: &[&str]) -> Option<usize> {
    let normalized: Vec<String> = headers
        .iter()
        .take(SHEET_COLUMNS)
        .map(|h| h.trim().to_lowercase())
        .collect();
    candidates
        .iter()
        .find_map(|c| normalized.iter().position(|h| h == c))
}

impl ColumnMap {
    /// ヘッダー行から列位置を解決
    ///
    /// 名前列が見つからない場合はヘッダー行ではないとみなしNone
    pub fn from_headers(headers: &[String]) -> Option<Self> {
        let name = find_header(headers, NAME_HEADERS)?;

        Some(Self {
            name,
            sku: find_header(headers, SKU_HEADERS),
            brand: find_header(headers, BRAND_HEADERS),
            estimated_value: find_header(headers, VALUE_HEADERS),
            quantity: find_header(headers, QUANTITY_HEADERS),
            barcode: find_header(headers, BARCODE_HEADERS),
            processed: find_header(headers, PROCESSED_HEADERS),
        })
    }

    /// 1行分のセルをSheetItemに変換（全セル空ならNone）
    ///
    /// * `row` - シート上の行番号（ヘッダー行を1とする）
    pub fn parse_row(&self, cells: &[String], row: usize) -> Option<SheetItem> {
        if cells.iter().all(|c| c.trim().is_empty()) {
            return None;
        }

        let text = |idx: Option<usize>| {
            idx.and_then(|i| cells.get(i))
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
        };

        Some(SheetItem {
            row,
            name: text(Some(self.name)).unwrap_or_default(),
            sku: text(self.sku),
            brand: text(self.brand),
            estimated_value: text(self.estimated_value).and_then(|v| parse_number(&v)),
            quantity: text(self.quantity).and_then(|v| parse_number(&v)),
            barcode: text(self.barcode),
            processed: text(self.processed).map(|v| is_truthy(&v)).unwrap_or(false),
        })
    }
}

/// "$1,234.50" のような表記を数値に変換
pub fn parse_number(value: &str) -> Option<f64> {
    let cleaned: String = value
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' ' | '\u{a0}'))
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// 処理済みフラグの判定
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "yes" | "y" | "true" | "1" | "x" | "done" | "processed" | "updated" | "✓" | "✔"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_from_headers() {
        let headers = strings(&["Date", "Item Name", "Quantity", "Manufacturer", "SKU", "Processed"]);
        let map = ColumnMap::from_headers(&headers).unwrap();
        assert_eq!(map.name, 1);
        assert_eq!(map.quantity, Some(2));
        assert_eq!(map.brand, Some(3));
        assert_eq!(map.sku, Some(4));
        assert_eq!(map.processed, Some(5));
        assert_eq!(map.estimated_value, None);
    }

    #[test]
    fn test_from_headers_prefers_brand_over_manufacturer() {
        let headers = strings(&["Item Name", "Manufacturer", "Brand"]);
        let map = ColumnMap::from_headers(&headers).unwrap();
        assert_eq!(map.brand, Some(2));
    }

    #[test]
    fn test_from_headers_without_name() {
        let headers = strings(&["Red Widget", "W-1", "Acme"]);
        assert_eq!(ColumnMap::from_headers(&headers), None);
    }

    #[test]
    fn test_from_headers_ignores_columns_past_layout() {
        let mut headers = vec![String::new(); SHEET_COLUMNS];
        headers[0] = "Item Name".into();
        headers.push("SKU".into());
        let map = ColumnMap::from_headers(&headers).unwrap();
        assert_eq!(map.sku, None);
    }

    #[test]
    fn test_parse_row_default_layout() {
        let map = ColumnMap::default();
        let item = map
            .parse_row(&strings(&[" Honey Jar ", "HON-500", "BeeCo", "$4.50", "yes"]), 2)
            .unwrap();
        assert_eq!(item.row, 2);
        assert_eq!(item.name, "Honey Jar");
        assert_eq!(item.sku.as_deref(), Some("HON-500"));
        assert_eq!(item.estimated_value, Some(4.5));
        assert!(item.processed);
    }

    #[test]
    fn test_parse_row_short_row() {
        let map = ColumnMap::default();
        let item = map.parse_row(&strings(&["Red Widget"]), 3).unwrap();
        assert_eq!(item.sku, None);
        assert_eq!(item.brand, None);
        assert!(!item.processed);
    }

    #[test]
    fn test_parse_row_blank() {
        let map = ColumnMap::default();
        assert!(map.parse_row(&strings(&["", "  ", ""]), 4).is_none());
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("$1,234.50"), Some(1234.5));
        assert_eq!(parse_number("12"), Some(12.0));
        assert_eq!(parse_number("n/a"), None);
    }

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy("Yes"));
        assert!(is_truthy(" ✔ "));
        assert!(!is_truthy("no"));
        assert!(!is_truthy(""));
    }
}
