use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// 認証コラボレータから受け取る資格情報。中身は解釈しない。
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    value: String,
    /// 失効時刻（UNIX秒）。Noneなら失効しない。
    expires_at: Option<u64>,
}

impl AuthToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: u64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Option<u64> {
        self.expires_at
    }

    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(unix_now())
    }
}

// トークン本体はログに出さない
impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// 認証状態の読み取り専用ビュー。セッションは認証状態を変更しない。
pub trait AuthContext: Send + Sync {
    /// 有効なトークン。未ログインまたは失効済みならNone。
    fn token(&self) -> Option<AuthToken>;

    fn is_logged_in(&self) -> bool {
        self.token().is_some()
    }
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
