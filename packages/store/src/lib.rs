pub mod config;
pub mod error;
pub mod models;
pub mod postgrest;
pub mod repo;

mod hosted;
pub use hosted::HostedStore;

mod memory;
pub use memory::MemoryStore;

pub use config::StoreConfig;
pub use error::StoreError;
pub use models::{AuthUser, NewNote, Note, Session, SignupDetails, UserProfile};
pub use repo::{ensure_user, profile_for, OAuthProvider, OnConflict, SessionStore};
