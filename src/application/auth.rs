use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use crate::domain::model::auth::{unix_now, AuthContext, AuthToken};

/// プロセス内で保持する認証状態。login/logoutはインターフェース層だけが呼ぶ。
#[derive(Debug, Default)]
pub struct SessionAuth {
    token: RwLock<Option<AuthToken>>,
    ttl: Option<Duration>,
}

impl SessionAuth {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            token: RwLock::new(None),
            ttl,
        }
    }

    /// 生のトークン文字列を受け取り、TTLがあれば失効時刻を付与して保持する。
    pub fn login(&self, token: AuthToken) {
        let token = match (token.expires_at(), self.ttl) {
            (None, Some(ttl)) => token.with_expiry(unix_now().saturating_add(ttl.as_secs())),
            _ => token,
        };
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
        tracing::info!("logged in");
    }

    pub fn logout(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
        tracing::info!("logged out");
    }
}

impl AuthContext for SessionAuth {
    fn token(&self) -> Option<AuthToken> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .filter(|t| !t.is_expired())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_then_logout() {
        let auth = SessionAuth::new(None);
        assert!(!auth.is_logged_in());

        auth.login(AuthToken::new("jwt"));
        assert_eq!(auth.token().map(|t| t.as_str().to_string()), Some("jwt".into()));

        auth.logout();
        assert!(auth.token().is_none());
    }

    #[test]
    fn ttl_stamps_expiry() {
        let auth = SessionAuth::new(Some(Duration::from_secs(60)));
        auth.login(AuthToken::new("jwt"));
        let exp = auth.token().and_then(|t| t.expires_at()).unwrap();
        assert!(exp > unix_now());
    }

    #[test]
    fn expired_token_reads_as_logged_out() {
        let auth = SessionAuth::new(None);
        auth.login(AuthToken::new("jwt").with_expiry(1));
        assert!(!auth.is_logged_in());
    }
}
