//! 価格同期の実行
//!
//! 1. 在庫レコードを1回だけ取得
//! 2. 各行を順番に照合（処理済みの行はスキップ）
//! 3. 一致した行だけ価格を見積もり、現在価格と異なれば更新
//!
//! 認証エラーのみ実行全体を中断する。それ以外の失敗は行単位で記録して続行する。

pub mod ledger;
pub mod summary;

pub use ledger::{fingerprint, Ledger, LedgerEntry};
pub use summary::{ItemOutcome, OutcomeStatus, RunSummary};

use crate::error::{PriceSyncError, Result};
use crate::estimator::PriceEstimator;
use crate::inventory::InventoryStore;
use crate::retry::RetryPolicy;
use indicatif::{ProgressBar, ProgressStyle};
use price_sync_common::{find_best_match, InventoryRecord, MatchOptions, SheetItem};

/// 現在価格と同一とみなす差（1セント未満）
const PRICE_EPSILON: f64 = 0.005;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub match_options: MatchOptions,
    pub retry: RetryPolicy,
    /// 更新を送信しない
    pub dry_run: bool,
    /// 処理する行数の上限
    pub limit: Option<usize>,
    pub show_progress: bool,
}

/// 中断した実行
///
/// 中断までに記録した行の結果を `summary` に残す（`summary.aborted` に理由）。
#[derive(Debug, thiserror::Error)]
#[error("実行を中断しました: {error}")]
pub struct RunAborted {
    #[source]
    pub error: PriceSyncError,
    pub summary: Box<RunSummary>,
}

impl RunAborted {
    fn new(error: PriceSyncError, mut summary: RunSummary) -> Self {
        summary.aborted = Some(error.to_string());
        Self {
            error,
            summary: Box::new(summary),
        }
    }
}

fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar().template("[{bar:40.cyan/blue}] {pos}/{len} {msg}") {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// 在庫レコードを取得（再試行あり）
pub async fn load_inventory<S: InventoryStore>(store: &S, retry: &RetryPolicy) -> Result<Vec<InventoryRecord>> {
    let records = retry.run("list_records", || store.list_records()).await;
    retry.pause().await;
    records
}

/// シート全行を処理して集計を返す
///
/// 更新済み・価格変更なしの行は `ledger` に記録する（ドライランを除く）。
/// 在庫一覧の取得失敗・認証エラーで中断した場合は、それまでの記録を `ledger` に残し、
/// 途中までの集計を [`RunAborted`] で返す。
pub async fn run<E, S>(
    items: &[SheetItem],
    estimator: &E,
    store: &S,
    ledger: &mut Ledger,
    options: &RunOptions,
) -> std::result::Result<RunSummary, RunAborted>
where
    E: PriceEstimator,
    S: InventoryStore,
{
    let mut summary = RunSummary::new(items.len(), options.dry_run);
    let records = match load_inventory(store, &options.retry).await {
        Ok(records) => records,
        Err(e) => {
            tracing::error!(kind = e.kind(), error = %e, "在庫一覧を取得できません");
            return Err(RunAborted::new(e, summary));
        }
    };
    tracing::info!(rows = items.len(), records = records.len(), dry_run = options.dry_run, "価格同期を開始");

    let pb = progress_bar(items.len(), options.show_progress);

    for item in items {
        pb.inc(1);

        if item.processed {
            tracing::debug!(row = item.row, name = %item.name, "シートで処理済みのためスキップ");
            summary.record(ItemOutcome::skipped(item, "シートで処理済み"));
            continue;
        }
        if ledger.contains(item) {
            tracing::debug!(row = item.row, name = %item.name, "台帳に記録済みのためスキップ");
            summary.record(ItemOutcome::skipped(item, "台帳に記録済み"));
            continue;
        }
        if options.limit.is_some_and(|limit| summary.processed >= limit) {
            tracing::info!(limit = summary.processed, "処理上限に達しました");
            break;
        }

        pb.set_message(item.name.clone());
        let result = find_best_match(item, &records, &options.match_options);
        let Some(record) = result.inventory_record.as_ref() else {
            tracing::info!(row = item.row, name = %item.name, best = result.confidence, "一致なし");
            summary.record(ItemOutcome::no_match(item, result.confidence));
            continue;
        };

        match sync_item(item, record, result.confidence, estimator, store, options).await {
            Ok(outcome) => {
                if let (OutcomeStatus::Updated | OutcomeStatus::Unchanged, Some(price)) =
                    (outcome.status, outcome.new_price)
                {
                    ledger.mark(item, price);
                }
                summary.record(outcome);
            }
            Err(e) => {
                tracing::error!(
                    row = item.row,
                    name = %item.name,
                    sku = %record.sku,
                    kind = e.kind(),
                    error = %e,
                    "行の処理に失敗"
                );
                summary.record(ItemOutcome::error(item, Some(record), result.confidence, &e));
                if e.is_fatal() {
                    pb.abandon_with_message("認証エラーで中断");
                    return Err(RunAborted::new(e, summary));
                }
            }
        }
    }

    pb.finish_and_clear();
    tracing::info!(
        processed = summary.processed,
        matched = summary.matched,
        updated = summary.updated,
        unchanged = summary.unchanged,
        errored = summary.errored,
        skipped = summary.skipped,
        "価格同期が完了"
    );
    Ok(summary)
}

/// 一致した1行の見積りと更新
async fn sync_item<E, S>(
    item: &SheetItem,
    record: &InventoryRecord,
    confidence: u8,
    estimator: &E,
    store: &S,
    options: &RunOptions,
) -> Result<ItemOutcome>
where
    E: PriceEstimator,
    S: InventoryStore,
{
    let description = item.description();
    let quote = options
        .retry
        .run("estimate", || estimator.estimate(&description))
        .await;
    options.retry.pause().await;
    let quote = quote?;
    let new_price = quote.average_price;

    if (new_price - record.price).abs() < PRICE_EPSILON {
        tracing::info!(row = item.row, sku = %record.sku, price = new_price, "価格変更なし");
        return Ok(ItemOutcome::matched(item, record, confidence, OutcomeStatus::Unchanged, new_price));
    }

    if options.dry_run {
        tracing::info!(
            row = item.row,
            sku = %record.sku,
            old = record.price,
            new = new_price,
            "ドライラン: 更新をスキップ"
        );
        return Ok(ItemOutcome::matched(item, record, confidence, OutcomeStatus::WouldUpdate, new_price));
    }

    let updated = options
        .retry
        .run("update_price", || store.update_price(record, new_price))
        .await;
    options.retry.pause().await;
    updated?;

    tracing::info!(
        row = item.row,
        sku = %record.sku,
        old = record.price,
        new = new_price,
        sources = quote.source_count,
        "価格を更新"
    );
    Ok(ItemOutcome::matched(item, record, confidence, OutcomeStatus::Updated, new_price))
}
