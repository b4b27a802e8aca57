//! 在庫ストアモジュール
//!
//! - [`ZohoInventory`]: Zoho Inventory REST API
//! - [`JsonInventory`]: JSONファイル（オフライン照合・テスト用）

pub mod token;
pub mod zoho;

pub use token::TokenManager;
pub use zoho::ZohoInventory;

use crate::error::{PriceSyncError, Result};
use price_sync_common::InventoryRecord;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// 在庫ストアの抽象
///
/// 失敗種別は RateLimited / NotFound / Unauthorized / Unavailable
#[allow(async_fn_in_trait)]
pub trait InventoryStore {
    /// 既存レコードを全件取得
    async fn list_records(&self) -> Result<Vec<InventoryRecord>>;

    /// 照合したレコードの価格を更新
    ///
    /// item_id で特定する。item_id が空の場合のみSKUで引く。
    async fn update_price(&self, record: &InventoryRecord, price: f64) -> Result<()>;
}

/// SKUの比較キー（前後空白除去・小文字化）
pub fn sku_key(sku: &str) -> String {
    sku.trim().to_lowercase()
}

/// 更新対象のレコード位置（item_id優先、空ならSKU）
fn locate(records: &[InventoryRecord], target: &InventoryRecord) -> Option<usize> {
    let item_id = target.item_id.trim();
    if !item_id.is_empty() {
        return records.iter().position(|r| r.item_id.trim() == item_id);
    }
    let key = sku_key(&target.sku);
    if key.is_empty() {
        return None;
    }
    records.iter().position(|r| sku_key(&r.sku) == key)
}

/// JSONファイルをバックエンドにした在庫ストア
///
/// ファイルはInventoryRecordの配列。パスなしで作るとメモリ上のみで動作する。
#[derive(Debug)]
pub struct JsonInventory {
    path: Option<PathBuf>,
    records: Mutex<Vec<InventoryRecord>>,
}

impl JsonInventory {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PriceSyncError::Config(format!(
                "在庫ファイルが見つかりません: {}",
                path.display()
            )));
        }
        let reader = BufReader::new(File::open(path)?);
        let records: Vec<InventoryRecord> = serde_json::from_reader(reader)?;
        tracing::info!(records = records.len(), path = %path.display(), "在庫ファイルを読み込みました");

        Ok(Self {
            path: Some(path.to_path_buf()),
            records: Mutex::new(records),
        })
    }

    pub fn from_records(records: Vec<InventoryRecord>) -> Self {
        Self {
            path: None,
            records: Mutex::new(records),
        }
    }

    /// 現在のレコードのコピー
    pub async fn snapshot(&self) -> Vec<InventoryRecord> {
        self.records.lock().await.clone()
    }
}

/// レコード一覧をJSONファイルに保存
pub fn save_records(records: &[InventoryRecord], path: &Path) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, records)?;
    Ok(())
}

impl InventoryStore for JsonInventory {
    async fn list_records(&self) -> Result<Vec<InventoryRecord>> {
        Ok(self.snapshot().await)
    }

    async fn update_price(&self, record: &InventoryRecord, price: f64) -> Result<()> {
        let mut records = self.records.lock().await;
        let index = locate(&records, record).ok_or_else(|| {
            PriceSyncError::NotFound(format!("item_id '{}' / SKU '{}'", record.item_id, record.sku))
        })?;
        records[index].price = price;

        if let Some(path) = &self.path {
            save_records(&records, path)?;
        }
        Ok(())
    }
}
