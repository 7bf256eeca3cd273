use std::future::Future;

use super::model::auth::AuthToken;
use super::model::book::{BookSummary, RawBookRecord, UserLibrary};
use super::model::id::BookId;

/// 書籍カタログ検索の抽象。Infra層が実装する。
pub trait BookCatalog: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn search(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<RawBookRecord>, Self::Error>> + Send;
}

/// ユーザーアカウントへの書籍永続化の抽象。
pub trait BookPersistence: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn save_book(
        &self,
        book: &BookSummary,
        token: &AuthToken,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    fn remove_book(
        &self,
        id: &BookId,
        token: &AuthToken,
    ) -> impl Future<Output = Result<UserLibrary, Self::Error>> + Send;

    fn saved_books(
        &self,
        token: &AuthToken,
    ) -> impl Future<Output = Result<UserLibrary, Self::Error>> + Send;
}

/// ログイン処理の抽象。
pub trait AuthGateway: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn login(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthToken, Self::Error>> + Send;
}

/// 保存済みIDのローカル永続キャッシュ。端末単位でアカウントは区別しない。
pub trait SavedIdCache: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn load(&self) -> Result<Vec<BookId>, Self::Error>;

    /// 既存内容を丸ごと置き換える。
    fn store(&self, ids: &[BookId]) -> Result<(), Self::Error>;

    /// 指定IDを取り除く。取り除いた場合 true。
    fn remove(&self, id: &BookId) -> Result<bool, Self::Error> {
        let mut ids = self.load()?;
        let before = ids.len();
        ids.retain(|x| x != id);
        if ids.len() == before {
            return Ok(false);
        }
        self.store(&ids)?;
        Ok(true)
    }
}
