use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::infra::{google_books, graphql};

pub const DEFAULT_CACHE_DIR: &str = ".book-search";

/// 環境変数から読み込む実行時設定。
#[derive(Debug, Clone)]
pub struct Config {
    pub catalog_url: String,
    pub graphql_url: String,
    /// 保存済みIDキャッシュの置き場所（端末単位）
    pub cache_dir: PathBuf,
    pub request_timeout: Duration,
    /// 起動時にログイン済みとして扱うトークン
    pub token: Option<String>,
    /// トークンの有効期間。0なら失効しない。
    pub token_ttl: Option<Duration>,
}

impl Config {
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 任意の参照関数から読み込む（テスト用に環境変数を差し替えられる）。
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let timeout_secs: u64 = try_load(&lookup, "BOOK_SEARCH_TIMEOUT_SECS", 10);
        let ttl_secs: u64 = try_load(&lookup, "BOOK_SEARCH_TOKEN_TTL_SECS", 7200);

        Self {
            catalog_url: try_load(
                &lookup,
                "BOOK_SEARCH_CATALOG_URL",
                google_books::DEFAULT_ENDPOINT.to_string(),
            ),
            graphql_url: try_load(
                &lookup,
                "BOOK_SEARCH_GRAPHQL_URL",
                graphql::DEFAULT_ENDPOINT.to_string(),
            ),
            cache_dir: try_load(
                &lookup,
                "BOOK_SEARCH_CACHE_DIR",
                PathBuf::from(DEFAULT_CACHE_DIR),
            ),
            request_timeout: Duration::from_secs(timeout_secs),
            token: lookup("BOOK_SEARCH_TOKEN").filter(|t| !t.is_empty()),
            token_ttl: (ttl_secs > 0).then(|| Duration::from_secs(ttl_secs)),
        }
    }
}

fn try_load<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
    T::Err: Display,
{
    match lookup(key) {
        None => {
            info!("{key} not set, using default: {default:?}");
            default
        }
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value '{raw}': {e}, using default: {default:?}");
            default
        }),
    }
}
