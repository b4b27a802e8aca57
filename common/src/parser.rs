//! APIレスポンスパーサー
//!
//! AI補完APIのレスポンスからJSONを抽出し、
//! 価格見積り（PriceQuote）に変換する

use crate::error::{Error, Result};
use crate::types::PriceQuote;
use serde::Deserialize;

/// 有効な価格の下限
pub const MIN_PRICE: f64 = 0.01;
/// 有効な価格の上限
pub const MAX_PRICE: f64 = 50_000.0;

/// AIが返す見積りJSON
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QuoteResponse {
    pub prices: Vec<f64>,
    pub confidence: Option<f64>,
}

/// APIレスポンスからJSONオブジェクト部分を抽出
///
/// 抽出優先順位:
/// 1. ```json ... ``` ブロック
/// 2. 生の {...} オブジェクト
/// 3. エラー
///
/// # Examples
/// ```
/// use price_sync_common::extract_json_object;
///
/// let response = "Result: {\"prices\": [4.5]}";
/// let json = extract_json_object(response).unwrap();
/// assert_eq!(json, "{\"prices\": [4.5]}");
/// ```
pub fn extract_json_object(response: &str) -> Result<&str> {
    // ```json ... ``` ブロックを探す
    if let Some(start_marker) = response.find("```json") {
        let start = start_marker + 7; // "```json" の長さ
        if let Some(end_offset) = response[start..].find("```") {
            let end = start + end_offset;
            return Ok(response[start..end].trim());
        }
    }

    // 生の {...} を探す
    if let Some(start) = response.find('{') {
        if let Some(end) = response.rfind('}') {
            if end >= start {
                return Ok(&response[start..=end]);
            }
        }
    }

    Err(Error::Parse("JSONが見つかりません".into()))
}

/// 価格候補を集計して見積りにする
///
/// 範囲外・非有限の価格は除外。候補が残らなければ None。
pub fn summarize_prices(prices: &[f64], confidence: Option<f64>) -> Option<PriceQuote> {
    let valid: Vec<f64> = prices
        .iter()
        .copied()
        .filter(|p| p.is_finite() && (MIN_PRICE..=MAX_PRICE).contains(p))
        .collect();

    if valid.is_empty() {
        return None;
    }

    let average = valid.iter().sum::<f64>() / valid.len() as f64;
    let confidence = confidence
        .filter(|c| c.is_finite())
        .map(|c| c.round().clamp(0.0, 100.0) as u8)
        .unwrap_or(50);

    Some(PriceQuote {
        source_count: valid.len(),
        // セント単位に丸める
        average_price: (average * 100.0).round() / 100.0,
        confidence,
        prices: valid,
    })
}

/// 見積りJSONレスポンスをパース
///
/// # Returns
/// * `Ok(PriceQuote)` - パース成功
/// * `Err(Error::Parse)` - JSONが見つからない、または有効な価格がない
pub fn parse_quote_json(response: &str) -> Result<PriceQuote> {
    let json_str = extract_json_object(response)?;
    let parsed: QuoteResponse = serde_json::from_str(json_str.trim())
        .map_err(|e| Error::Parse(format!("見積りJSONパースエラー: {}", e)))?;

    summarize_prices(&parsed.prices, parsed.confidence)
        .ok_or_else(|| Error::Parse("有効な価格がありません".into()))
}
