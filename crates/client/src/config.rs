//! # クライアント設定
//!
//! ハンドラの既定値（接続先URL・User-Agent・タイムアウト・サブユーザーID）と、
//! 1回の呼び出しごとに確定する送信先 [`RequestTarget`]。
//!
//! 送信先はハンドラのフィールドを書き換えずに呼び出し単位で渡す。
//! 同じハンドラを共有する同時呼び出しが互いの送信先を変えることはない。

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// TUPU認識APIのルートURL
pub const ROOT_API_URL: &str = "http://api.open.tuputech.com/v3/recognition/";

/// `User-Agent` ヘッダの既定値
pub const DEFAULT_USER_AGENT: &str = "tupu-client/1.0";

/// `Timeout` ヘッダの既定値（秒）
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// ローカル期限に上乗せする猶予（秒）
const DEADLINE_GRACE_SECS: u64 = 5;

/// ハンドラの既定設定。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// 接続先URL（末尾にシークレットIDが付加される）
    pub api_url: String,
    /// `User-Agent` ヘッダ
    pub user_agent: String,
    /// サーバー側タイムアウト（秒）
    pub timeout_secs: u64,
    /// サブユーザー統計・課金用のID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    /// 1リクエストあたりのデータ数上限（`None` = 無制限）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: ROOT_API_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            uid: None,
            max_items: None,
        }
    }
}

impl ClientConfig {
    /// 接続先URLのみ指定した既定設定
    pub fn with_api_url(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Self::default()
        }
    }

    /// 既定の送信先
    pub fn target(&self) -> RequestTarget {
        RequestTarget::new(self.api_url.clone(), self.timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// 送信先
// ---------------------------------------------------------------------------

/// 1回の呼び出しの送信先とタイムアウト。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    /// ベースURL
    pub url: String,
    /// サーバー側タイムアウト（秒）
    pub timeout_secs: u64,
}

impl RequestTarget {
    /// 送信先を作成する。
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            url: url.into(),
            timeout_secs,
        }
    }

    /// URLを差し替えた送信先を返す。
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// タイムアウトを差し替えた送信先を返す。0は無視する。
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        if timeout_secs != 0 {
            self.timeout_secs = timeout_secs;
        }
        self
    }

    /// ベースURLにパスを連結した送信先を返す。
    pub fn join(&self, path: &str) -> Self {
        Self {
            url: format!("{}{path}", self.url),
            timeout_secs: self.timeout_secs,
        }
    }

    /// `{url}{secret_id}`
    pub fn endpoint(&self, secret_id: &str) -> String {
        format!("{}{secret_id}", self.url)
    }

    /// `Timeout` ヘッダの値
    pub fn timeout_header(&self) -> String {
        self.timeout_secs.to_string()
    }

    /// クライアント側の送信期限。サーバー側タイムアウトに猶予を加えた値。
    pub fn local_deadline(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.saturating_add(DEADLINE_GRACE_SECS))
    }
}
