pub mod google_books;
pub mod graphql;
pub mod json_store;
