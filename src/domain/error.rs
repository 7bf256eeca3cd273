use super::model::id::BookId;

/// 前提条件違反。いずれも状態を変更せずに操作を中断する。
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("search query is empty")]
    EmptyQuery,

    #[error("not logged in: a valid token is required to save books")]
    NotAuthenticated,

    #[error("book not in current results: {0}")]
    BookNotInResults(BookId),
}
