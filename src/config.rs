//! 環境変数からの設定読み込み
//!
//! 認証情報は環境変数（`.env` 可）からのみ読み込む。設定ファイルは持たない。

use crate::error::{PriceSyncError, Result};

pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_OPENAI_MODEL: &str = "OPENAI_MODEL";
pub const ENV_OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
pub const ENV_ZOHO_TOKEN: &str = "ZOHO_TOKEN";
pub const ENV_ZOHO_ORG_ID: &str = "ZOHO_ORG_ID";
pub const ENV_ZOHO_REFRESH_TOKEN: &str = "ZOHO_REFRESH_TOKEN";
pub const ENV_ZOHO_CLIENT_ID: &str = "ZOHO_CLIENT_ID";
pub const ENV_ZOHO_CLIENT_SECRET: &str = "ZOHO_CLIENT_SECRET";
pub const ENV_ZOHO_API_BASE: &str = "ZOHO_API_BASE";
pub const ENV_ZOHO_ACCOUNTS_URL: &str = "ZOHO_ACCOUNTS_URL";

const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_ZOHO_API_BASE: &str = "https://www.zohoapis.com/inventory/v1";
const DEFAULT_ZOHO_ACCOUNTS_URL: &str = "https://accounts.zoho.com/oauth/v2/token";

/// リフレッシュトークンによるアクセストークン取得用の認証情報
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshCredentials {
    pub refresh_token: String,
    pub client_id: String,
    pub client_secret: String,
}

/// 価格見積りAPIの設定
#[derive(Debug, Clone, PartialEq)]
pub struct EstimatorSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

/// 在庫APIの設定
#[derive(Debug, Clone, PartialEq)]
pub struct InventorySettings {
    pub org_id: String,
    pub token: Option<String>,
    pub refresh: Option<RefreshCredentials>,
    pub api_base: String,
    pub accounts_url: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub zoho_token: Option<String>,
    pub zoho_org_id: Option<String>,
    pub zoho_refresh: Option<RefreshCredentials>,
    pub zoho_api_base: String,
    pub zoho_accounts_url: String,
}

impl Config {
    /// `.env` を読み込んだ上でプロセス環境から設定を構築
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意の参照関数から設定を構築（空文字は未設定扱い）
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let zoho_refresh = match (
            get(ENV_ZOHO_REFRESH_TOKEN),
            get(ENV_ZOHO_CLIENT_ID),
            get(ENV_ZOHO_CLIENT_SECRET),
        ) {
            (Some(refresh_token), Some(client_id), Some(client_secret)) => Some(RefreshCredentials {
                refresh_token,
                client_id,
                client_secret,
            }),
            _ => None,
        };

        Self {
            openai_api_key: get(ENV_OPENAI_API_KEY),
            openai_model: get(ENV_OPENAI_MODEL).unwrap_or_else(|| DEFAULT_OPENAI_MODEL.into()),
            openai_base_url: get(ENV_OPENAI_BASE_URL)
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.into()),
            zoho_token: get(ENV_ZOHO_TOKEN),
            zoho_org_id: get(ENV_ZOHO_ORG_ID),
            zoho_refresh,
            zoho_api_base: get(ENV_ZOHO_API_BASE).unwrap_or_else(|| DEFAULT_ZOHO_API_BASE.into()),
            zoho_accounts_url: get(ENV_ZOHO_ACCOUNTS_URL)
                .unwrap_or_else(|| DEFAULT_ZOHO_ACCOUNTS_URL.into()),
        }
    }

    fn missing_estimator(&self) -> Vec<String> {
        if self.openai_api_key.is_none() {
            vec![ENV_OPENAI_API_KEY.to_string()]
        } else {
            Vec::new()
        }
    }

    fn missing_inventory(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.zoho_token.is_none() && self.zoho_refresh.is_none() {
            missing.push(ENV_ZOHO_TOKEN.to_string());
        }
        if self.zoho_org_id.is_none() {
            missing.push(ENV_ZOHO_ORG_ID.to_string());
        }
        missing
    }

    /// 一括実行に必要な認証情報がすべて揃っているか検証
    pub fn validate_for_run(&self) -> Result<()> {
        let mut missing = self.missing_estimator();
        missing.extend(self.missing_inventory());
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PriceSyncError::MissingEnv(missing))
        }
    }

    pub fn estimator_settings(&self) -> Result<EstimatorSettings> {
        match &self.openai_api_key {
            Some(api_key) => Ok(EstimatorSettings {
                api_key: api_key.clone(),
                model: self.openai_model.clone(),
                base_url: self.openai_base_url.trim_end_matches('/').to_string(),
            }),
            None => Err(PriceSyncError::MissingEnv(self.missing_estimator())),
        }
    }

    pub fn inventory_settings(&self) -> Result<InventorySettings> {
        let missing = self.missing_inventory();
        if !missing.is_empty() {
            return Err(PriceSyncError::MissingEnv(missing));
        }
        Ok(InventorySettings {
            org_id: self.zoho_org_id.clone().unwrap_or_default(),
            token: self.zoho_token.clone(),
            refresh: self.zoho_refresh.clone(),
            api_base: self.zoho_api_base.trim_end_matches('/').to_string(),
            accounts_url: self.zoho_accounts_url.clone(),
        })
    }
}

/// 表示用に秘密値をマスク
pub fn mask_secret(value: Option<&str>) -> String {
    match value {
        None => "未設定".to_string(),
        Some(v) if v.chars().count() <= 4 => "****".to_string(),
        Some(v) => {
            let tail: String = v.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
            format!("****{}", tail)
        }
    }
}
