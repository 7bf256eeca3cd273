pub mod auth;
pub mod error;
pub mod library;
pub mod session;
pub mod view;
