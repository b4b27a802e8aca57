//! 価格見積りモジュール
//!
//! 品目の説明文から市場価格を見積もる。
//! 実装はOpenAI互換のchat-completions API（[`openai`]）。

pub mod openai;

pub use openai::OpenAiEstimator;

use crate::error::{PriceSyncError, Result};
use price_sync_common::{extract_json_object, parse_quote_json, summarize_prices, PriceQuote};
use regex::Regex;

/// 価格見積りの抽象
///
/// 失敗種別は RateLimited / Unavailable / Malformed / Unauthorized
#[allow(async_fn_in_trait)]
pub trait PriceEstimator {
    async fn estimate(&self, description: &str) -> Result<PriceQuote>;
}

/// AIレスポンスを見積りに変換
///
/// JSONがあればそれだけを使い、有効な価格がなければ Malformed。
/// JSONが含まれない場合のみ本文中の最初の数値を単一候補として扱う（信頼度50）。
pub fn parse_estimate_response(response: &str) -> Result<PriceQuote> {
    if extract_json_object(response).is_ok() {
        return parse_quote_json(response).map_err(|e| {
            PriceSyncError::Malformed(format!("{}: {}", e, truncate(response, 80)))
        });
    }

    tracing::debug!("JSONが含まれないため数値抽出にフォールバック");
    first_price_in_text(response)
        .and_then(|price| summarize_prices(&[price], None))
        .ok_or_else(|| {
            PriceSyncError::Malformed(format!(
                "有効な価格がありません: {}",
                truncate(response, 80)
            ))
        })
}

/// テキスト中の最初の数値（"$1,234.50" 形式を含む）
fn first_price_in_text(text: &str) -> Option<f64> {
    lazy_static::lazy_static! {
        static ref PRICE_RE: Regex =
            Regex::new(r"\$?\s*(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)").unwrap();
    }

    PRICE_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().replace(',', "").parse::<f64>().ok())
}

fn truncate(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_response() {
        let quote = parse_estimate_response("```json\n{\"prices\": [4.0, 5.0], \"confidence\": 80}\n```")
            .unwrap();
        assert_eq!(quote.source_count, 2);
        assert_eq!(quote.average_price, 4.5);
        assert_eq!(quote.confidence, 80);
    }

    #[test]
    fn test_fallback_to_first_number() {
        let quote = parse_estimate_response("The typical price is about $1,299.99 at most retailers.")
            .unwrap();
        assert_eq!(quote.source_count, 1);
        assert_eq!(quote.average_price, 1299.99);
        assert_eq!(quote.confidence, 50);
    }

    #[test]
    fn test_no_price_is_malformed() {
        let err = parse_estimate_response("I could not find this item.").unwrap_err();
        assert!(matches!(err, PriceSyncError::Malformed(_)));
    }

    #[test]
    fn test_out_of_range_fallback_is_malformed() {
        let err = parse_estimate_response("roughly 900000 dollars").unwrap_err();
        assert!(matches!(err, PriceSyncError::Malformed(_)));
    }

    #[test]
    fn test_empty_prices_json_is_malformed() {
        // 数値（confidence）を含んでいても価格として拾わない
        let err = parse_estimate_response(r#"{"prices": [], "confidence": 10}"#).unwrap_err();
        assert!(matches!(err, PriceSyncError::Malformed(_)));
    }

    #[test]
    fn test_out_of_range_json_is_malformed() {
        let response = "Honey Jar 500g\n```json\n{\"prices\": [0.0, 90000], \"confidence\": 40}\n```";
        let err = parse_estimate_response(response).unwrap_err();
        assert!(matches!(err, PriceSyncError::Malformed(_)));
    }

    #[test]
    fn test_broken_json_is_malformed() {
        let err = parse_estimate_response(r#"Price: {"prices": [12.5,}"#).unwrap_err();
        assert!(matches!(err, PriceSyncError::Malformed(_)));
    }

    #[test]
    fn test_first_price_in_text() {
        assert_eq!(first_price_in_text("costs 12.5"), Some(12.5));
        assert_eq!(first_price_in_text("$ 2,000"), Some(2000.0));
        assert_eq!(first_price_in_text("none"), None);
    }
}
