//! # Login payloads
//!
//! The login exchange is a single round trip: the client posts the access token
//! it got from the Session Store and receives an application token.
//!
//! ## [`LoginRequest`]
//!
//! `{"supabaseToken": "..."}`. The field is optional on the wire; a missing token
//! is treated like an invalid one.
//!
//! ## [`LoginResponse`]
//!
//! `{"token": "..."}`, an HS256 token valid for the configured lifetime.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/login`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LoginRequest {
    #[serde(rename = "supabaseToken", default)]
    pub supabase_token: Option<String>,
}

impl LoginRequest {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            supabase_token: Some(token.into()),
        }
    }
}

/// Answer of `POST /api/login`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoginResponse {
    pub token: String,
}
