use thiserror::Error;

#[derive(Error, Debug)]
pub enum PriceSyncError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("環境変数が設定されていません: {}。`.env` またはシェルで設定してください", .0.join(", "))]
    MissingEnv(Vec<String>),

    #[error("レート制限: {0}")]
    RateLimited(String),

    #[error("サービス利用不可: {0}")]
    Unavailable(String),

    #[error("レスポンスが不正: {0}")]
    Malformed(String),

    #[error("レコードが見つかりません: {0}")]
    NotFound(String),

    #[error("認証エラー: {0}")]
    Unauthorized(String),

    #[error("スプレッドシート読み込みエラー: {0}")]
    Sheet(String),

    #[error("レポート生成エラー: {0}")]
    Report(String),

    #[error("HTTPエラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] price_sync_common::Error),
}

impl PriceSyncError {
    /// HTTPステータスを失敗種別に分類
    pub fn from_status(status: u16, context: impl Into<String>) -> Self {
        let context = context.into();
        match status {
            401 | 403 => PriceSyncError::Unauthorized(format!("HTTP {}: {}", status, context)),
            404 => PriceSyncError::NotFound(format!("HTTP {}: {}", status, context)),
            429 => PriceSyncError::RateLimited(format!("HTTP {}: {}", status, context)),
            _ => PriceSyncError::Unavailable(format!("HTTP {}: {}", status, context)),
        }
    }

    /// 再試行で回復しうるか（レート制限のみ）
    pub fn is_retryable(&self) -> bool {
        matches!(self, PriceSyncError::RateLimited(_))
    }

    /// 実行全体を中断すべきか
    pub fn is_fatal(&self) -> bool {
        matches!(self, PriceSyncError::Unauthorized(_))
    }

    /// 結果ファイル・ログ用の短い種別名
    pub fn kind(&self) -> &'static str {
        match self {
            PriceSyncError::RateLimited(_) => "rate_limited",
            PriceSyncError::Unavailable(_) | PriceSyncError::Http(_) => "unavailable",
            PriceSyncError::Malformed(_) | PriceSyncError::JsonParse(_) => "malformed",
            PriceSyncError::NotFound(_) => "not_found",
            PriceSyncError::Unauthorized(_) => "unauthorized",
            _ => "other",
        }
    }
}

pub type Result<T> = std::result::Result<T, PriceSyncError>;
