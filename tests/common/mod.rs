//! Shared test harness for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use book_search_mcp::application::session::SearchSession;
use book_search_mcp::domain::model::auth::{AuthContext, AuthToken};
use book_search_mcp::domain::model::book::{BookSummary, RawBookRecord, UserLibrary};
use book_search_mcp::domain::model::id::BookId;
use book_search_mcp::domain::repository::{BookCatalog, BookPersistence, SavedIdCache};

#[derive(Debug, thiserror::Error)]
#[error("fake collaborator failure: {0}")]
pub struct FakeError(pub String);

// =============================================================================
// FakeCatalog — クエリごとに応答を台本化した検索コラボレータ
// =============================================================================

#[derive(Clone)]
enum Scripted {
    Ok(Vec<RawBookRecord>, Duration),
    Err(String),
}

#[derive(Clone, Default)]
pub struct FakeCatalog {
    responses: Arc<Mutex<HashMap<String, Scripted>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, query: &str, records: Vec<RawBookRecord>) -> Self {
        self.delayed(query, records, Duration::ZERO)
    }

    pub fn delayed(self, query: &str, records: Vec<RawBookRecord>, delay: Duration) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(query.to_string(), Scripted::Ok(records, delay));
        self
    }

    pub fn failing(self, query: &str, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(query.to_string(), Scripted::Err(message.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl BookCatalog for FakeCatalog {
    type Error = FakeError;

    async fn search(&self, query: &str) -> Result<Vec<RawBookRecord>, Self::Error> {
        let scripted = {
            self.calls.lock().unwrap().push(query.to_string());
            self.responses.lock().unwrap().get(query).cloned()
        };
        match scripted {
            None => Ok(Vec::new()),
            Some(Scripted::Ok(records, delay)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(records)
            }
            Some(Scripted::Err(message)) => Err(FakeError(message)),
        }
    }
}

// =============================================================================
// FakePersistence — アカウント側の保存先
// =============================================================================

#[derive(Clone, Default)]
pub struct FakePersistence {
    books: Arc<Mutex<Vec<BookSummary>>>,
    save_calls: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
}

impl FakePersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn stored_ids(&self) -> Vec<BookId> {
        self.books
            .lock()
            .unwrap()
            .iter()
            .map(|b| b.id().clone())
            .collect()
    }

    fn library(&self) -> UserLibrary {
        UserLibrary {
            username: "reader".to_string(),
            books: self.books.lock().unwrap().clone(),
        }
    }

    fn check(&self) -> Result<(), FakeError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(FakeError("something went wrong!".to_string()));
        }
        Ok(())
    }
}

impl BookPersistence for FakePersistence {
    type Error = FakeError;

    async fn save_book(&self, book: &BookSummary, _token: &AuthToken) -> Result<(), Self::Error> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let mut books = self.books.lock().unwrap();
        if !books.iter().any(|b| b.id() == book.id()) {
            books.push(book.clone());
        }
        Ok(())
    }

    async fn remove_book(&self, id: &BookId, _token: &AuthToken) -> Result<UserLibrary, Self::Error> {
        self.check()?;
        self.books.lock().unwrap().retain(|b| b.id() != id);
        Ok(self.library())
    }

    async fn saved_books(&self, _token: &AuthToken) -> Result<UserLibrary, Self::Error> {
        self.check()?;
        Ok(self.library())
    }
}

// =============================================================================
// InMemoryCache — ファイルI/O不要のキャッシュ
// =============================================================================

#[derive(Clone, Default)]
pub struct InMemoryCache {
    ids: Arc<Mutex<Vec<BookId>>>,
    broken: Arc<AtomicBool>,
    stores: Arc<AtomicUsize>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(ids: &[&str]) -> Self {
        let cache = Self::new();
        cache.overwrite(ids);
        cache
    }

    /// 読み込みが常に失敗するキャッシュ。
    pub fn broken() -> Self {
        let cache = Self::new();
        cache.broken.store(true, Ordering::SeqCst);
        cache
    }

    /// セッション外からの書き込みを模す。
    pub fn overwrite(&self, ids: &[&str]) {
        *self.ids.lock().unwrap() = ids.iter().map(|s| BookId::from(*s)).collect();
    }

    pub fn contents(&self) -> Vec<String> {
        self.ids
            .lock()
            .unwrap()
            .iter()
            .map(|id| id.to_string())
            .collect()
    }

    pub fn store_count(&self) -> usize {
        self.stores.load(Ordering::SeqCst)
    }
}

impl SavedIdCache for InMemoryCache {
    type Error = FakeError;

    fn load(&self) -> Result<Vec<BookId>, Self::Error> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(FakeError("unreadable cache".to_string()));
        }
        Ok(self.ids.lock().unwrap().clone())
    }

    fn store(&self, ids: &[BookId]) -> Result<(), Self::Error> {
        self.stores.fetch_add(1, Ordering::SeqCst);
        *self.ids.lock().unwrap() = ids.to_vec();
        Ok(())
    }
}

// =============================================================================
// StaticAuth
// =============================================================================

pub struct StaticAuth(pub Option<AuthToken>);

impl StaticAuth {
    pub fn logged_in() -> Self {
        Self(Some(AuthToken::new("test-jwt")))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }

    pub fn expired() -> Self {
        Self(Some(AuthToken::new("old-jwt").with_expiry(1)))
    }
}

impl AuthContext for StaticAuth {
    fn token(&self) -> Option<AuthToken> {
        self.0.clone().filter(|t| !t.is_expired())
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub type TestSession = SearchSession<FakeCatalog, FakePersistence, InMemoryCache>;

pub fn open_session(
    catalog: &FakeCatalog,
    persistence: &FakePersistence,
    cache: &InMemoryCache,
) -> TestSession {
    SearchSession::open(catalog.clone(), persistence.clone(), cache.clone())
}

pub fn record(id: &str, title: &str) -> RawBookRecord {
    RawBookRecord {
        id: id.to_string(),
        title: Some(title.to_string()),
        authors: Some(vec!["Some Author".to_string()]),
        description: None,
        thumbnail: Some(format!("http://books.example/{id}.jpg")),
    }
}

/// 著者なし・画像なしの "Hobbit" レコード。
pub fn hobbit_record() -> RawBookRecord {
    RawBookRecord {
        id: "b1".to_string(),
        title: Some("The Hobbit".to_string()),
        authors: Some(vec![]),
        description: Some("A tale".to_string()),
        thumbnail: None,
    }
}

pub fn ids(session: &TestSession) -> Vec<String> {
    session.saved_ids().iter().map(|id| id.to_string()).collect()
}
