//! Request and response bodies of the gateway.

mod note;
mod user;

pub use note::{CreateNoteRequest, ErrorResponse, MessageResponse};
pub use user::{LoginRequest, LoginResponse};
