use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::error::DomainError;
use crate::domain::model::auth::AuthContext;
use crate::domain::model::book::BookSummary;
use crate::domain::model::id::BookId;
use crate::domain::model::saved::SavedIdSet;
use crate::domain::repository::{BookCatalog, BookPersistence, SavedIdCache};

use super::error::AppError;
use super::view::{ResultCard, SaveAffordance, SearchView};

/// 検索の適用結果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// 結果セットを置き換えた
    Applied { count: usize },
    /// 後から発行された検索があるため破棄した
    Superseded,
}

/// 保存の結果。`newly_saved` は集合に新規追加されたかどうか。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOutcome {
    pub newly_saved: bool,
}

#[derive(Debug, Default)]
struct SessionState {
    query: String,
    results: Vec<BookSummary>,
    saved: SavedIdSet,
    /// 最後に発行した検索の世代番号
    issued: u64,
    save_error: Option<String>,
}

/// 検索結果・保存済みID・ローカルキャッシュを突き合わせるセッション。
///
/// open → search/save → close のライフサイクルで使う。
/// close せずにdropされた場合もキャッシュへの書き出しを試みる。
pub struct SearchSession<C, P, S: SavedIdCache> {
    catalog: C,
    persistence: P,
    cache: S,
    state: Mutex<SessionState>,
    closed: bool,
}

impl<C, P, S> SearchSession<C, P, S>
where
    C: BookCatalog,
    P: BookPersistence,
    S: SavedIdCache,
{
    /// キャッシュから保存済みIDを読み込んでセッションを開く。
    /// 読み込みに失敗した場合は空集合から始める。
    pub fn open(catalog: C, persistence: P, cache: S) -> Self {
        let saved = match cache.load() {
            Ok(ids) => SavedIdSet::from_ids(ids),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read saved-id cache, starting empty");
                SavedIdSet::new()
            }
        };
        tracing::debug!(saved = saved.len(), "search session opened");

        Self {
            catalog,
            persistence,
            cache,
            state: Mutex::new(SessionState {
                saved,
                ..SessionState::default()
            }),
            closed: false,
        }
    }

    pub fn set_query(&self, text: impl Into<String>) {
        self.state().query = text.into();
    }

    pub fn query(&self) -> String {
        self.state().query.clone()
    }

    /// クエリを設定してから検索する。空の入力ではクエリを書き換えない。
    pub async fn search_for(&self, text: impl Into<String>) -> Result<SearchOutcome, AppError> {
        let text = text.into();
        if text.is_empty() {
            tracing::debug!("empty submission, query kept");
            return Err(DomainError::EmptyQuery.into());
        }
        self.set_query(text);
        self.search().await
    }

    /// 現在のクエリで検索し、最新の検索であれば結果セットを置き換えてクエリをクリアする。
    /// 失敗時は結果セットもクエリも変更しない。
    pub async fn search(&self) -> Result<SearchOutcome, AppError> {
        let (query, generation) = {
            let mut state = self.state();
            if state.query.is_empty() {
                tracing::debug!("empty query, search skipped");
                return Err(DomainError::EmptyQuery.into());
            }
            state.issued += 1;
            (state.query.clone(), state.issued)
        };

        let records = self.catalog.search(&query).await.map_err(|e| {
            tracing::warn!(error = %e, query = %query, "book search failed");
            AppError::Remote(Box::new(e))
        })?;
        let books: Vec<BookSummary> = records.into_iter().map(BookSummary::from).collect();

        let mut state = self.state();
        if generation != state.issued {
            tracing::debug!(
                generation,
                latest = state.issued,
                "discarding superseded search result"
            );
            return Ok(SearchOutcome::Superseded);
        }
        let count = books.len();
        state.results = books;
        state.query.clear();
        tracing::debug!(count, query = %query, "search results applied");
        Ok(SearchOutcome::Applied { count })
    }

    /// 現在の結果セットにある書籍をユーザーのアカウントに保存する。
    pub async fn save(
        &self,
        id: &BookId,
        auth: &dyn AuthContext,
    ) -> Result<SaveOutcome, AppError> {
        let book = {
            let state = self.state();
            state.results.iter().find(|b| b.id() == id).cloned()
        };
        let Some(book) = book else {
            tracing::debug!(book_id = %id, "save skipped: book not in current results");
            return Err(DomainError::BookNotInResults(id.clone()).into());
        };
        let Some(token) = auth.token() else {
            tracing::debug!(book_id = %id, "save skipped: not logged in");
            return Err(DomainError::NotAuthenticated.into());
        };

        if let Err(e) = self.persistence.save_book(&book, &token).await {
            tracing::warn!(error = %e, book_id = %id, "saving book failed");
            self.state().save_error = Some(e.to_string());
            return Err(AppError::Remote(Box::new(e)));
        }

        let mut state = self.state();
        let newly_saved = state.saved.insert(id.clone());
        state.save_error = None;
        tracing::info!(book_id = %id, newly_saved, "book saved");
        Ok(SaveOutcome { newly_saved })
    }

    pub fn is_saved(&self, id: &BookId) -> bool {
        self.state().saved.contains(id)
    }

    pub fn saved_ids(&self) -> Vec<BookId> {
        self.state().saved.as_slice().to_vec()
    }

    pub fn results(&self) -> Vec<BookSummary> {
        self.state().results.clone()
    }

    pub fn save_error(&self) -> Option<String> {
        self.state().save_error.clone()
    }

    pub fn dismiss_error(&self) {
        self.state().save_error = None;
    }

    /// 表示用モデルを組み立てる。保存ボタンはログイン時のみ。
    pub fn view(&self, auth: &dyn AuthContext) -> SearchView {
        let logged_in = auth.is_logged_in();
        let state = self.state();
        let cards = state
            .results
            .iter()
            .map(|book| ResultCard {
                book: book.clone(),
                save: logged_in.then(|| SaveAffordance::for_state(state.saved.contains(book.id()))),
            })
            .collect();

        SearchView {
            query: state.query.clone(),
            cards,
            error: state.save_error.clone(),
        }
    }

    /// セッションを閉じ、保存済みIDをキャッシュに書き出す。
    pub fn close(mut self) -> Result<(), AppError> {
        let result = self.flush();
        self.closed = true;
        result
    }
}

impl<C, P, S: SavedIdCache> SearchSession<C, P, S> {
    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 保存済みIDでキャッシュを上書きする。
    pub fn flush(&self) -> Result<(), AppError> {
        let ids = self.state().saved.as_slice().to_vec();
        self.cache
            .store(&ids)
            .map_err(|e| AppError::Cache(Box::new(e)))?;
        tracing::debug!(count = ids.len(), "saved ids flushed to cache");
        Ok(())
    }
}

impl<C, P, S: SavedIdCache> Drop for SearchSession<C, P, S> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.flush() {
            tracing::warn!(error = %e, "flushing saved ids on drop failed");
        }
    }
}
