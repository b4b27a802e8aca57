//! 在庫照合モジュール
//!
//! シート行1件に対して在庫レコード全件をスコアリングし、
//! 閾値以上で最もスコアの高いレコードを返す。
//!
//! ## スコアリング
//! 1. SKU完全一致（大文字小文字無視・前後空白除去）→ 信頼度100で即確定
//! 2. 名前の単語重複率（Jaccard係数）× name_weight
//!    + ブランド一致ボーナス × brand_weight
//! 3. 最高スコアが閾値未満なら一致なし
//! 4. 同点は入力順で先のレコードを採用

use crate::alias::BrandAliases;
use crate::types::{InventoryRecord, MatchResult, SheetItem};
use std::collections::HashSet;

/// 照合オプション
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOptions {
    /// 名前類似度の重み
    pub name_weight: f64,
    /// ブランド一致の重み
    pub brand_weight: f64,
    /// 一致とみなす最低スコア（0〜100）
    pub threshold: f64,
    /// ブランド比較前に適用するエイリアス
    pub brand_aliases: BrandAliases,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            name_weight: 0.7,
            brand_weight: 0.3,
            threshold: 30.0,
            brand_aliases: BrandAliases::default(),
        }
    }
}

/// 名前を小文字の単語集合に分割
fn tokenize(name: &str) -> HashSet<String> {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// 単語重複率（積集合 / 和集合）を 0.0〜1.0 で返す
pub fn word_overlap_ratio(a: &str, b: &str) -> f64 {
    let left = tokenize(a);
    let right = tokenize(b);

    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = left.intersection(&right).count();
    intersection as f64 / union as f64
}

fn brands_match(item: Option<&str>, record: Option<&str>, aliases: &BrandAliases) -> bool {
    match (item, record) {
        (Some(a), Some(b)) if !a.trim().is_empty() && !b.trim().is_empty() => {
            aliases.canonicalize(a).to_lowercase() == aliases.canonicalize(b).to_lowercase()
        }
        _ => false,
    }
}

/// 名前とブランドの合成スコア（0〜100）
fn combined_score(item: &SheetItem, record: &InventoryRecord, options: &MatchOptions) -> f64 {
    let name_score = word_overlap_ratio(&item.name, &record.name) * 100.0;
    let brand_score = if brands_match(
        item.brand.as_deref(),
        record.brand.as_deref(),
        &options.brand_aliases,
    ) {
        100.0
    } else {
        0.0
    };

    let score = options.name_weight * name_score + options.brand_weight * brand_score;
    if score.is_finite() {
        score.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// 閾値判定と整合するよう切り捨てで 0〜100 に収める
fn to_confidence(score: f64) -> u8 {
    score.floor().clamp(0.0, 100.0) as u8
}

/// シート行に最も一致する在庫レコードを探す
pub fn find_best_match(
    item: &SheetItem,
    records: &[InventoryRecord],
    options: &MatchOptions,
) -> MatchResult {
    // 名前のない行は照合しない
    if item.name.trim().is_empty() || records.is_empty() {
        return MatchResult::no_match(item, 0);
    }

    // SKU完全一致を最優先
    if let Some(sku) = item.trimmed_sku() {
        let sku = sku.to_lowercase();
        if let Some(record) = records.iter().find(|r| r.sku.trim().to_lowercase() == sku) {
            return MatchResult {
                sheet_item: item.clone(),
                inventory_record: Some(record.clone()),
                confidence: 100,
            };
        }
    }

    let mut best: Option<(&InventoryRecord, f64)> = None;
    for record in records {
        let score = combined_score(item, record, options);
        // 厳密な大小比較で同点は先勝ち
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((record, score));
        }
    }

    match best {
        // 報告する信頼度で判定（小数の閾値でも信頼度が閾値を下回らない）
        Some((record, score)) if f64::from(to_confidence(score)) >= options.threshold => MatchResult {
            sheet_item: item.clone(),
            inventory_record: Some(record.clone()),
            confidence: to_confidence(score),
        },
        Some((_, score)) => MatchResult::no_match(item, to_confidence(score)),
        None => MatchResult::no_match(item, 0),
    }
}

/// 全行を照合
pub fn match_all(
    items: &[SheetItem],
    records: &[InventoryRecord],
    options: &MatchOptions,
) -> Vec<MatchResult> {
    items
        .iter()
        .map(|item| find_best_match(item, records, options))
        .collect()
}
