//! GraphQL client for the account API: save/remove books, `me`, and login.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::model::auth::AuthToken;
use crate::domain::model::book::{BookSummary, RawBookRecord, UserLibrary};
use crate::domain::model::id::BookId;
use crate::domain::repository::{AuthGateway, BookPersistence};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:3001/graphql";

const USER_FIELDS: &str =
    "_id username email bookCount savedBooks { bookId authors description title image }";

pub fn save_book_mutation() -> String {
    format!(
        "mutation saveBook($input: BookInput!) {{ saveBook(input: $input) {{ {USER_FIELDS} }} }}"
    )
}

pub fn remove_book_mutation() -> String {
    format!(
        "mutation removeBook($bookId: ID!) {{ removeBook(bookId: $bookId) {{ {USER_FIELDS} }} }}"
    )
}

pub fn me_query() -> String {
    format!("query me {{ me {{ {USER_FIELDS} }} }}")
}

pub const LOGIN_MUTATION: &str = "mutation login($email: String!, $password: String!) { \
    login(email: $email, password: $password) { token user { _id username } } }";

#[derive(Debug, thiserror::Error)]
pub enum GraphqlError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("GraphQL endpoint returned status {0}")]
    Status(u16),
    #[error("GraphQL error: {0}")]
    Api(String),
    #[error("malformed GraphQL response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("GraphQL response has no data")]
    MissingData,
}

/// `BookInput` 入力型。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookInput {
    pub book_id: String,
    pub authors: Vec<String>,
    pub description: Option<String>,
    pub title: String,
    pub image: String,
}

impl From<&BookSummary> for BookInput {
    fn from(book: &BookSummary) -> Self {
        Self {
            book_id: book.id().to_string(),
            authors: book.authors().to_vec(),
            description: book.description().map(str::to_string),
            title: book.title().to_string(),
            image: book.cover_image_url().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorEntry {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SavedBookDto {
    book_id: String,
    title: Option<String>,
    authors: Option<Vec<String>>,
    description: Option<String>,
    image: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDto {
    username: String,
    #[serde(default)]
    saved_books: Vec<SavedBookDto>,
}

impl From<UserDto> for UserLibrary {
    fn from(user: UserDto) -> Self {
        let books = user
            .saved_books
            .into_iter()
            .map(|b| {
                BookSummary::from(RawBookRecord {
                    id: b.book_id,
                    title: b.title,
                    authors: b.authors,
                    description: b.description,
                    thumbnail: b.image,
                })
            })
            .collect();
        UserLibrary {
            username: user.username,
            books,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveBookData {
    save_book: UserDto,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoveBookData {
    remove_book: UserDto,
}

#[derive(Debug, Deserialize)]
struct MeData {
    me: UserDto,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    login: LoginPayload,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    token: String,
}

/// `{ data, errors }` 形式のレスポンスを解釈する。errorsがあれば失敗扱い。
fn decode_response<T: DeserializeOwned>(body: &str) -> Result<T, GraphqlError> {
    let resp: GraphqlResponse<T> = serde_json::from_str(body)?;
    if !resp.errors.is_empty() {
        let messages: Vec<String> = resp.errors.into_iter().map(|e| e.message).collect();
        return Err(GraphqlError::Api(messages.join("; ")));
    }
    resp.data.ok_or(GraphqlError::MissingData)
}

/// アカウントAPIへのGraphQLクライアント。
#[derive(Debug, Clone)]
pub struct GraphqlClient {
    http: reqwest::Client,
    endpoint: String,
}

impl GraphqlClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, GraphqlError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
        token: Option<&AuthToken>,
    ) -> Result<T, GraphqlError> {
        let mut request = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "query": query, "variables": variables }));
        if let Some(token) = token {
            request = request.bearer_auth(token.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        let decoded = decode_response::<T>(&body);
        if status.is_success() {
            return decoded;
        }
        // 4xxでもerrors本文が載っていればそのメッセージを優先
        match decoded {
            Err(e @ GraphqlError::Api(_)) => Err(e),
            _ => Err(GraphqlError::Status(status.as_u16())),
        }
    }
}

pub fn save_book_variables(book: &BookSummary) -> serde_json::Value {
    json!({ "input": BookInput::from(book) })
}

impl BookPersistence for GraphqlClient {
    type Error = GraphqlError;

    async fn save_book(&self, book: &BookSummary, token: &AuthToken) -> Result<(), Self::Error> {
        let _: SaveBookData = self
            .execute(&save_book_mutation(), save_book_variables(book), Some(token))
            .await?;
        Ok(())
    }

    async fn remove_book(
        &self,
        id: &BookId,
        token: &AuthToken,
    ) -> Result<UserLibrary, Self::Error> {
        let data: RemoveBookData = self
            .execute(&remove_book_mutation(), json!({ "bookId": id }), Some(token))
            .await?;
        Ok(data.remove_book.into())
    }

    async fn saved_books(&self, token: &AuthToken) -> Result<UserLibrary, Self::Error> {
        let data: MeData = self.execute(&me_query(), json!({}), Some(token)).await?;
        Ok(data.me.into())
    }
}

impl AuthGateway for GraphqlClient {
    type Error = GraphqlError;

    async fn login(&self, email: &str, password: &str) -> Result<AuthToken, Self::Error> {
        let data: LoginData = self
            .execute(
                LOGIN_MUTATION,
                json!({ "email": email, "password": password }),
                None,
            )
            .await?;
        Ok(AuthToken::new(data.login.token))
    }
}
