//! ブランド名エイリアスモジュール
//!
//! メーカー・ブランド名の表記ゆれを正規化する。
//! 照合時のブランド比較の前に適用する。

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// ブランドエイリアス定義（小文字のパターン → 正規名）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrandAliases {
    #[serde(default)]
    pub brand: HashMap<String, String>,
}

impl BrandAliases {
    /// 組み込みプリセットを取得
    pub fn from_preset(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "lab" | "scientific" => Some(Self::lab_preset()),
            "none" => Some(Self::default()),
            _ => None,
        }
    }

    /// JSONファイルから読み込み
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// JSON文字列から読み込み
    pub fn from_json(json: &str) -> Result<Self> {
        let parsed: Self = serde_json::from_str(json)?;
        if parsed.brand.keys().any(|k| k.trim().is_empty()) {
            return Err(Error::Config("空のエイリアスパターンがあります".into()));
        }
        // パターンは小文字で保持
        Ok(Self {
            brand: parsed
                .brand
                .into_iter()
                .map(|(k, v)| (k.trim().to_lowercase(), v))
                .collect(),
        })
    }

    /// 理化学系サプライヤー用プリセット
    fn lab_preset() -> Self {
        let mut config = Self::default();
        let pairs = [
            ("thermo fisher", "Thermo Fisher Scientific"),
            ("thermo", "Thermo Fisher Scientific"),
            ("fisher scientific", "Thermo Fisher Scientific"),
            ("fisher", "Thermo Fisher Scientific"),
            ("vwr", "Avantor"),
            ("avantor", "Avantor"),
            ("milliporesigma", "MilliporeSigma"),
            ("sigma-aldrich", "MilliporeSigma"),
            ("sigma", "MilliporeSigma"),
            ("corning", "Corning"),
            ("falcon", "Corning"),
            ("costar", "Corning"),
            ("eppendorf", "Eppendorf"),
            ("greiner", "Greiner Bio-One"),
            ("usa scientific", "USA Scientific"),
            ("qiagen", "QIAGEN"),
            ("neb", "NEB"),
            ("new england biolabs", "NEB"),
            ("promega", "Promega"),
            ("bd", "BD Biosciences"),
            ("becton dickinson", "BD Biosciences"),
            ("cytiva", "Cytiva"),
            ("ge healthcare", "Cytiva"),
        ];
        for (pattern, canonical) in pairs {
            config.brand.insert(pattern.into(), canonical.into());
        }
        config
    }

    pub fn is_empty(&self) -> bool {
        self.brand.is_empty()
    }

    /// ブランド名を正規化（完全一致優先、次に語単位の部分一致で最長マッチ）
    pub fn canonicalize(&self, value: &str) -> String {
        let key = value.trim().to_lowercase();
        if key.is_empty() || self.brand.is_empty() {
            return value.trim().to_string();
        }

        if let Some(canonical) = self.brand.get(&key) {
            return canonical.clone();
        }

        let words: Vec<&str> = key.split_whitespace().collect();
        let mut best: Option<(&str, &str)> = None;
        for (pattern, canonical) in &self.brand {
            let pattern_words: Vec<&str> = pattern.split_whitespace().collect();
            if contains_phrase(&words, &pattern_words)
                && best.map_or(true, |(p, _)| pattern.len() > p.len())
            {
                best = Some((pattern.as_str(), canonical.as_str()));
            }
        }

        match best {
            Some((_, canonical)) => canonical.to_string(),
            None => value.trim().to_string(),
        }
    }

    /// 設定をマージ（後から追加した設定が優先）
    pub fn merge(&mut self, other: &BrandAliases) {
        self.brand.extend(other.brand.clone());
    }
}

/// 語の並びとしてフレーズを含むか
fn contains_phrase(words: &[&str], phrase: &[&str]) -> bool {
    !phrase.is_empty()
        && phrase.len() <= words.len()
        && words.windows(phrase.len()).any(|w| w == phrase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lab_preset() {
        let aliases = BrandAliases::from_preset("lab").unwrap();
        assert_eq!(aliases.brand.get("vwr"), Some(&"Avantor".to_string()));
        assert!(BrandAliases::from_preset("unknown").is_none());
    }

    #[test]
    fn test_canonicalize_exact_match() {
        let aliases = BrandAliases::lab_preset();
        assert_eq!(aliases.canonicalize("  Falcon "), "Corning");
        assert_eq!(aliases.canonicalize("VWR"), "Avantor");
    }

    #[test]
    fn test_canonicalize_phrase_match_longest() {
        let aliases = BrandAliases::lab_preset();
        // "thermo fisher" が "thermo" より優先される
        assert_eq!(aliases.canonicalize("Thermo Fisher Inc"), "Thermo Fisher Scientific");
        // 語の一部には一致しない
        assert_eq!(aliases.canonicalize("Abduction Labs"), "Abduction Labs");
    }

    #[test]
    fn test_canonicalize_without_aliases() {
        let aliases = BrandAliases::default();
        assert_eq!(aliases.canonicalize(" BeeCo "), "BeeCo");
    }

    #[test]
    fn test_from_json_lowercases_patterns() {
        let aliases = BrandAliases::from_json(r#"{"brand": {"Bee Co": "BeeCo"}}"#).unwrap();
        assert_eq!(aliases.canonicalize("bee co"), "BeeCo");
    }

    #[test]
    fn test_from_json_rejects_blank_pattern() {
        let result = BrandAliases::from_json(r#"{"brand": {" ": "X"}}"#);
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
