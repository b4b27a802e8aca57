//! 処理済み台帳
//!
//! 更新済み（または価格変更なし）の行を指紋で記録し、
//! 再実行時に同じ行をスキップする。

use crate::error::Result;
use price_sync_common::SheetItem;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

const LEDGER_FILE_NAME: &str = ".price-sync-ledger.json";

/// 台帳ファイルの構造
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ledger {
    /// バージョン（互換性チェック用）
    version: u32,
    /// 行の指紋 → 記録
    entries: HashMap<String, LedgerEntry>,
}

/// 台帳エントリ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    /// 反映済みの価格
    pub price: f64,
    pub processed_at: String,
}

impl Ledger {
    const CURRENT_VERSION: u32 = 1;

    /// 台帳ファイルのパス
    pub fn ledger_path(dir: &Path) -> PathBuf {
        dir.join(LEDGER_FILE_NAME)
    }

    /// 台帳を読み込み（存在しない・壊れている場合は空）
    pub fn load(dir: &Path) -> Self {
        let path = Self::ledger_path(dir);
        if !path.exists() {
            return Self::default();
        }

        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "台帳を開けません。空の台帳で続行します");
                return Self::default();
            }
        };

        match serde_json::from_reader::<_, Ledger>(BufReader::new(file)) {
            Ok(ledger) if ledger.version == Self::CURRENT_VERSION => ledger,
            Ok(ledger) => {
                tracing::warn!(found = ledger.version, "台帳バージョン不一致、再生成します");
                Self::default()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "台帳が壊れています。再生成します");
                Self::default()
            }
        }
    }

    /// 台帳を保存
    pub fn save(&self, dir: &Path) -> Result<()> {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
        let writer = BufWriter::new(File::create(Self::ledger_path(dir))?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// 台帳ファイルを削除（存在しなければ false）
    pub fn clear(dir: &Path) -> Result<bool> {
        let path = Self::ledger_path(dir);
        if path.exists() {
            std::fs::remove_file(path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn contains(&self, item: &SheetItem) -> bool {
        self.entries.contains_key(&fingerprint(item))
    }

    pub fn get(&self, item: &SheetItem) -> Option<&LedgerEntry> {
        self.entries.get(&fingerprint(item))
    }

    /// 処理済みとして記録
    pub fn mark(&mut self, item: &SheetItem, price: f64) {
        self.entries.insert(
            fingerprint(item),
            LedgerEntry {
                name: item.name.trim().to_string(),
                sku: item.trimmed_sku().map(str::to_string),
                price,
                processed_at: chrono::Utc::now().to_rfc3339(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            entries: HashMap::new(),
        }
    }
}

/// 行の指紋（正規化した 名前|SKU|ブランド のSHA-256）
///
/// 行番号は含めないため、行の並べ替えでは変わらない。
pub fn fingerprint(item: &SheetItem) -> String {
    let normalize = |s: Option<&str>| s.map(|v| v.trim().to_lowercase()).unwrap_or_default();
    let key = format!(
        "{}|{}|{}",
        normalize(Some(&item.name)),
        normalize(item.sku.as_deref()),
        normalize(item.brand.as_deref())
    );
    hex::encode(Sha256::digest(key.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_normalizes() {
        let mut a = SheetItem::new("Red Widget");
        a.brand = Some("Acme".into());
        let mut b = SheetItem::new("  red widget ");
        b.brand = Some("ACME".into());
        b.row = 42;
        assert_eq!(fingerprint(&a), fingerprint(&b));
        assert_eq!(fingerprint(&a).len(), 64);
    }

    #[test]
    fn test_fingerprint_differs_by_sku() {
        let mut a = SheetItem::new("Red Widget");
        a.sku = Some("W-1".into());
        let mut b = a.clone();
        b.sku = Some("W-2".into());
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_mark_and_contains() {
        let mut ledger = Ledger::default();
        let item = SheetItem::new("Honey Jar");
        assert!(!ledger.contains(&item));
        ledger.mark(&item, 4.5);
        assert!(ledger.contains(&item));
        assert_eq!(ledger.get(&item).unwrap().price, 4.5);
        assert_eq!(ledger.len(), 1);
    }
}
