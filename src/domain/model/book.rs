use super::id::BookId;

/// 著者情報がない場合に差し込む表示用エントリ。
pub const NO_AUTHOR: &str = "No author to display";

/// 検索コラボレータが返す1件分の生レコード。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawBookRecord {
    pub id: String,
    pub title: Option<String>,
    pub authors: Option<Vec<String>>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
}

/// 正規化済みの検索結果1件。構築後は不変。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookSummary {
    id: BookId,
    title: String,
    authors: Vec<String>,
    description: Option<String>,
    cover_image_url: String,
}

impl BookSummary {
    /// 著者が空なら `NO_AUTHOR` を補う。カバーURLがなければ空文字列。
    pub fn new(
        id: BookId,
        title: impl Into<String>,
        authors: Vec<String>,
        description: Option<String>,
        cover_image_url: Option<String>,
    ) -> Self {
        let authors = if authors.is_empty() {
            vec![NO_AUTHOR.to_string()]
        } else {
            authors
        };
        Self {
            id,
            title: title.into(),
            authors,
            description,
            cover_image_url: cover_image_url.unwrap_or_default(),
        }
    }

    pub fn id(&self) -> &BookId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn cover_image_url(&self) -> &str {
        &self.cover_image_url
    }

    pub fn has_cover(&self) -> bool {
        !self.cover_image_url.is_empty()
    }
}

impl From<RawBookRecord> for BookSummary {
    fn from(raw: RawBookRecord) -> Self {
        Self::new(
            BookId::from(raw.id),
            raw.title.unwrap_or_default(),
            raw.authors.unwrap_or_default(),
            raw.description,
            raw.thumbnail,
        )
    }
}

/// ログインユーザーのサーバー側保存済み書籍一覧。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserLibrary {
    pub username: String,
    pub books: Vec<BookSummary>,
}

impl UserLibrary {
    pub fn contains(&self, id: &BookId) -> bool {
        self.books.iter().any(|b| b.id() == id)
    }
}
