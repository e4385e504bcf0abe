//! Folio - blog and article platform over a flat JSON file
//!
//! This crate provides a unified API for the Folio server and its storage.
//!
//! # Example
//!
//! ```ignore
//! use folio::{router, AppState, Config, LogMailer};
//!
//! let state = AppState::from_config(Config::load(), Arc::new(LogMailer)).await?;
//! axum::serve(listener, router(Arc::new(state))).await?;
//! ```

// Re-export server types
pub use folio_server::mail::{LogMailer, Mailer};
pub use folio_server::{router, AppState, Config};

// Re-export core types that external applications may need
pub use folio_core::errors::FolioError;
pub use folio_core::models::{Article, Database, User, UserProfile};
pub use folio_core::tokens::TokenService;
pub use folio_core::{FolioResult, JsonStore};
