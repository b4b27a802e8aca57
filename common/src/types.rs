//! 価格同期の型定義
//!
//! CLIとテストで共有される型:
//! - SheetItem: スプレッドシートの1行
//! - InventoryRecord: 在庫APIの既存レコード
//! - PriceQuote: AIによる価格見積り
//! - MatchResult: 照合結果

use serde::{Deserialize, Serialize};

/// スプレッドシートの在庫行
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SheetItem {
    /// シート上の行番号（ヘッダー行を1とする）
    pub row: usize,
    pub name: String,
    pub sku: Option<String>,
    pub brand: Option<String>,
    pub estimated_value: Option<f64>,
    pub quantity: Option<f64>,
    pub barcode: Option<String>,
    /// 処理済みフラグ列
    pub processed: bool,
}

impl SheetItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// 前後の空白を除いたSKU（空ならNone）
    pub fn trimmed_sku(&self) -> Option<&str> {
        self.sku.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// 価格見積り用の説明文
    pub fn description(&self) -> String {
        let mut parts = vec![self.name.trim().to_string()];
        if let Some(brand) = self.brand.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
            parts.push(format!("brand {}", brand));
        }
        if let Some(sku) = self.trimmed_sku() {
            parts.push(format!("SKU {}", sku));
        }
        parts.join(", ")
    }
}

/// 在庫APIのレコード
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecord {
    /// 在庫API側の識別子（更新エンドポイントで使用）
    #[serde(default)]
    pub item_id: String,
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub price: f64,
}

/// 価格見積り
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    /// 価格候補の件数
    pub source_count: usize,
    pub average_price: f64,
    /// 0〜100
    pub confidence: u8,
    /// 元になった価格候補
    #[serde(default)]
    pub prices: Vec<f64>,
}

/// 照合結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub sheet_item: SheetItem,
    /// Noneは「一致なし」
    pub inventory_record: Option<InventoryRecord>,
    /// 0〜100
    pub confidence: u8,
}

impl MatchResult {
    pub fn no_match(item: &SheetItem, confidence: u8) -> Self {
        Self {
            sheet_item: item.clone(),
            inventory_record: None,
            confidence,
        }
    }

    pub fn is_match(&self) -> bool {
        self.inventory_record.is_some()
    }
}
