//! プロンプト生成モジュール
//!
//! 価格見積り用のシステムプロンプトとユーザープロンプトを生成する

/// 価格調査アシスタント用のシステムプロンプト
pub const PRICE_SYSTEM_PROMPT: &str = "You are a price research assistant. \
Estimate the current market price in USD for the product described by the user. \
Respond with JSON only, no prose.";

/// 価格見積りプロンプト生成
///
/// # Arguments
/// * `description` - 見積り対象の説明（`SheetItem::description`）
///
/// # Returns
/// ユーザーメッセージとして送るプロンプト文字列
pub fn build_price_prompt(description: &str) -> String {
    format!(
        r#"Find the current average market price for: {description}

## Output format (strictly this JSON object)
{{
  "prices": [list of up to 5 observed prices in USD as numbers],
  "confidence": number from 0 to 100
}}

## Notes
- Prices are per single unit, without currency symbols
- If you cannot find any price, return an empty "prices" list
- Output the JSON object only"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SheetItem;

    #[test]
    fn test_build_price_prompt() {
        let item = SheetItem {
            name: "Red Widget".to_string(),
            brand: Some("Acme".to_string()),
            ..Default::default()
        };
        let prompt = build_price_prompt(&item.description());
        assert!(prompt.contains("for: Red Widget, brand Acme"));
        assert!(prompt.contains("\"prices\""));
        assert!(prompt.contains("\"confidence\""));
    }
}
