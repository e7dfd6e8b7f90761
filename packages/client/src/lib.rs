//! # Client application
//!
//! Page models of the notes app, independent of any rendering layer. Each page
//! talks to the Session Store through [`store::SessionStore`] and reports its
//! auth state to the shared [`SessionObserver`].
//!
//! | Module | Page / role |
//! |--------|-------------|
//! | [`sign_in`] | Sign-in (`/`) and sign-up (`/signup`): email OTP and Google flows |
//! | [`dashboard`] | `/dashboard`: profile card, note list, add/delete, sign-out |
//! | [`session`] | Auth state machine and the redirect rule |
//! | [`route`] | Page paths |
//! | [`gateway`] | HTTP client for the Auth Gateway's `/api/*` routes |

pub mod dashboard;
pub mod error;
pub mod gateway;
pub mod route;
pub mod session;
pub mod sign_in;

pub use dashboard::{Dashboard, LoadOutcome};
pub use error::ClientError;
pub use gateway::GatewayClient;
pub use route::Route;
pub use session::{redirect_for, AuthEvent, SessionObserver, SessionState};
pub use sign_in::{complete_oauth, FlowKind, FlowStep, OtpFlow, SignedIn, SignupForm};

#[cfg(test)]
mod tests;
