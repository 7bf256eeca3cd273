use crate::domain::error::DomainError;
use crate::domain::model::auth::AuthContext;
use crate::domain::model::book::UserLibrary;
use crate::domain::model::id::BookId;
use crate::domain::repository::{BookPersistence, SavedIdCache};

use super::error::AppError;

/// 保存済み書籍ページのユースケース。
/// 検索セッションとは別ページで、削除はリモートとキャッシュの両方に反映する。
pub struct LibraryService<P, S> {
    persistence: P,
    cache: S,
}

impl<P: BookPersistence, S: SavedIdCache> LibraryService<P, S> {
    pub fn new(persistence: P, cache: S) -> Self {
        Self { persistence, cache }
    }

    /// ログインユーザーの保存済み書籍を取得する。
    pub async fn load(&self, auth: &dyn AuthContext) -> Result<UserLibrary, AppError> {
        let token = auth.token().ok_or(DomainError::NotAuthenticated)?;
        self.persistence.saved_books(&token).await.map_err(|e| {
            tracing::warn!(error = %e, "loading saved books failed");
            AppError::Remote(Box::new(e))
        })
    }

    /// リモートから削除し、成功したらキャッシュからもIDを取り除く。
    pub async fn remove_book(
        &self,
        id: &BookId,
        auth: &dyn AuthContext,
    ) -> Result<UserLibrary, AppError> {
        let token = auth.token().ok_or(DomainError::NotAuthenticated)?;
        let library = self
            .persistence
            .remove_book(id, &token)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, book_id = %id, "removing book failed");
                AppError::Remote(Box::new(e))
            })?;

        match self.cache.remove(id) {
            Ok(removed) => tracing::debug!(book_id = %id, removed, "cache updated after removal"),
            Err(e) => {
                tracing::warn!(error = %e, book_id = %id, "removing id from cache failed");
                return Err(AppError::Cache(Box::new(e)));
            }
        }
        Ok(library)
    }
}
