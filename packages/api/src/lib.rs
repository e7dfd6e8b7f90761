//! # API crate: the notes Auth Gateway
//!
//! A small axum service sitting in front of the hosted Session Store. It trusts
//! the store for identity, issues its own short-lived application tokens, and
//! serves per-user notes CRUD guarded by them.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`auth`] | HS256 application tokens ([`TokenKeys`], [`Claims`]) and the [`Authenticated`] bearer extractor |
//! | [`error`] | [`ApiError`] and its mapping onto HTTP statuses and `{"error": ...}` bodies |
//! | [`models`] | Request and response bodies |
//! | [`settings`] | Layered configuration (`config.toml`, `APP_*`, deployment variables) |
//! | [`state`] | [`AppState`]: store handle and token keys shared by every handler |
//!
//! ## Routes
//!
//! | Method | Path | Guard | Result |
//! |--------|------|-------|--------|
//! | `POST` | `/api/login` | none | `{token}` for a valid store token, 401 otherwise |
//! | `POST` | `/api/notes` | bearer | the inserted row |
//! | `GET` | `/api/notes` | bearer | the caller's notes, newest first |
//! | `DELETE` | `/api/notes/{id}` | bearer | `{message}`; succeeds even if no row matched |
//! | `GET` | `/api/me` | bearer | the caller's `users` row |
//! | `GET` | `/api/auth/google` | none | redirect to the store's Google sign-in |
//!
//! Missing bearer tokens get 401, invalid ones 403; neither reaches the store.

pub mod auth;
pub mod error;
pub mod models;
pub mod settings;
pub mod state;

mod application;
mod routes;

pub use application::{router, serve};
pub use auth::{Authenticated, Claims, TokenKeys};
pub use error::ApiError;
pub use settings::Settings;
pub use state::AppState;
