//! Application tokens and the bearer extractor guarding the notes routes.

mod extract;
mod token;

pub use extract::Authenticated;
pub use token::{Claims, TokenKeys};
