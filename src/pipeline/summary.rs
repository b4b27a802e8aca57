//! 実行結果の集計

use crate::error::PriceSyncError;
use price_sync_common::{InventoryRecord, SheetItem};
use serde::{Deserialize, Serialize};

/// 1行分の処理結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// 価格を更新した
    Updated,
    /// 見積りが現在価格と同じ（更新なし）
    Unchanged,
    /// ドライラン（更新対象だが送信していない）
    WouldUpdate,
    NoMatch,
    /// 処理済みのためスキップ
    Skipped,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemOutcome {
    pub row: usize,
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    pub status: OutcomeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_sku: Option<String>,
    pub confidence: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ItemOutcome {
    fn base(item: &SheetItem, status: OutcomeStatus, confidence: u8) -> Self {
        Self {
            row: item.row,
            name: item.name.clone(),
            sku: item.trimmed_sku().map(str::to_string),
            status,
            matched_sku: None,
            confidence,
            old_price: None,
            new_price: None,
            error_kind: None,
            message: None,
        }
    }

    pub fn skipped(item: &SheetItem, reason: &str) -> Self {
        Self {
            message: Some(reason.to_string()),
            ..Self::base(item, OutcomeStatus::Skipped, 0)
        }
    }

    pub fn no_match(item: &SheetItem, confidence: u8) -> Self {
        Self::base(item, OutcomeStatus::NoMatch, confidence)
    }

    /// 照合済みの行の結果
    pub fn matched(
        item: &SheetItem,
        record: &InventoryRecord,
        confidence: u8,
        status: OutcomeStatus,
        new_price: f64,
    ) -> Self {
        Self {
            matched_sku: Some(record.sku.clone()),
            old_price: Some(record.price),
            new_price: Some(new_price),
            ..Self::base(item, status, confidence)
        }
    }

    pub fn error(
        item: &SheetItem,
        record: Option<&InventoryRecord>,
        confidence: u8,
        error: &PriceSyncError,
    ) -> Self {
        Self {
            matched_sku: record.map(|r| r.sku.clone()),
            old_price: record.map(|r| r.price),
            error_kind: Some(error.kind().to_string()),
            message: Some(error.to_string()),
            ..Self::base(item, OutcomeStatus::Error, confidence)
        }
    }
}

/// 実行全体の集計
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// RFC 3339
    pub timestamp: String,
    pub total_rows: usize,
    /// 照合まで進んだ行数
    pub processed: usize,
    pub matched: usize,
    pub updated: usize,
    pub errored: usize,
    pub skipped: usize,
    pub unmatched: usize,
    pub unchanged: usize,
    pub dry_run: bool,
    /// 中断理由（最後まで処理した場合は None）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
    pub outcomes: Vec<ItemOutcome>,
}

impl RunSummary {
    pub fn new(total_rows: usize, dry_run: bool) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            total_rows,
            processed: 0,
            matched: 0,
            updated: 0,
            errored: 0,
            skipped: 0,
            unmatched: 0,
            unchanged: 0,
            dry_run,
            aborted: None,
            outcomes: Vec::new(),
        }
    }

    /// 結果を追加してカウンタを進める
    pub fn record(&mut self, outcome: ItemOutcome) {
        match outcome.status {
            OutcomeStatus::Skipped => self.skipped += 1,
            OutcomeStatus::NoMatch => {
                self.processed += 1;
                self.unmatched += 1;
            }
            OutcomeStatus::Updated => {
                self.processed += 1;
                self.matched += 1;
                self.updated += 1;
            }
            OutcomeStatus::Unchanged => {
                self.processed += 1;
                self.matched += 1;
                self.unchanged += 1;
            }
            OutcomeStatus::WouldUpdate => {
                self.processed += 1;
                self.matched += 1;
            }
            OutcomeStatus::Error => {
                self.processed += 1;
                self.errored += 1;
                if outcome.matched_sku.is_some() {
                    self.matched += 1;
                }
            }
        }
        self.outcomes.push(outcome);
    }

    /// 指定状態の結果
    pub fn outcomes_with(&self, status: OutcomeStatus) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes.iter().filter(move |o| o.status == status)
    }
}
