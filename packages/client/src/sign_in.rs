//! # Sign-in and sign-up flows
//!
//! Both auth pages run the same small state machine:
//!
//! ```text
//! Form ──send code──▶ OtpSent ──verify──▶ Verified
//!                       │  ▲
//!                       └──┘ resend
//! ```
//!
//! Validation problems and store errors leave the step unchanged and set a
//! user-facing message; nothing is retried automatically. A successful
//! verification ensures the `users` row before the session observer reports the
//! user as signed in.
//!
//! Google sign-in only builds the hosted authorize URL; when the browser comes
//! back with a session, [`complete_oauth`] finishes the job.

use std::sync::Arc;

use chrono::NaiveDate;
use store::{ensure_user, OAuthProvider, Session, SessionStore, SignupDetails, UserProfile};
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::session::{AuthEvent, SessionObserver};

/// Which page the flow belongs to. Only changes wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    Login,
    Signup,
}

/// Step of an OTP flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStep {
    Form,
    OtpSent,
    Verified,
}

/// Fields of the signup form, as typed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignupForm {
    pub name: String,
    /// `YYYY-MM-DD`
    pub dob: String,
    pub email: String,
}

impl SignupForm {
    pub fn new(name: &str, dob: &str, email: &str) -> Self {
        Self {
            name: name.to_string(),
            dob: dob.to_string(),
            email: email.to_string(),
        }
    }
}

/// Result of a successful verification.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedIn {
    pub session: Session,
    pub profile: UserProfile,
}

/// One OTP sign-in or sign-up attempt.
pub struct OtpFlow {
    store: Arc<dyn SessionStore>,
    observer: SessionObserver,
    kind: FlowKind,
    step: FlowStep,
    email: String,
    details: Option<SignupDetails>,
    message: Option<String>,
}

impl OtpFlow {
    pub fn login(store: Arc<dyn SessionStore>, observer: SessionObserver) -> Self {
        Self::new(store, observer, FlowKind::Login)
    }

    pub fn signup(store: Arc<dyn SessionStore>, observer: SessionObserver) -> Self {
        Self::new(store, observer, FlowKind::Signup)
    }

    fn new(store: Arc<dyn SessionStore>, observer: SessionObserver, kind: FlowKind) -> Self {
        Self {
            store,
            observer,
            kind,
            step: FlowStep::Form,
            email: String::new(),
            details: None,
            message: None,
        }
    }

    pub fn kind(&self) -> FlowKind {
        self.kind
    }

    pub fn step(&self) -> FlowStep {
        self.step
    }

    /// Message to show under the form.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    fn invalid(&mut self, message: &str) -> ClientError {
        self.message = Some(message.to_string());
        ClientError::Validation(message.to_string())
    }

    fn failed(&mut self, err: ClientError) -> ClientError {
        self.message = Some(err.to_string());
        err
    }

    /// Email a code for signing in.
    pub async fn send_login_code(&mut self, email: &str) -> Result<(), ClientError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(self.invalid("Please enter your email first."));
        }
        self.send_code(email, None).await
    }

    /// Validate the signup form and email a code.
    pub async fn send_signup_code(&mut self, form: &SignupForm) -> Result<(), ClientError> {
        let name = form.name.trim();
        let email = form.email.trim();
        let dob = form.dob.trim();
        if name.is_empty() || email.is_empty() || dob.is_empty() {
            return Err(self.invalid("Please fill all fields."));
        }
        let Ok(dob) = NaiveDate::parse_from_str(dob, "%Y-%m-%d") else {
            return Err(self.invalid("Please enter a valid date of birth."));
        };
        let details = SignupDetails {
            name: name.to_string(),
            dob: Some(dob),
        };
        self.send_code(email, Some(details)).await
    }

    async fn send_code(
        &mut self,
        email: &str,
        details: Option<SignupDetails>,
    ) -> Result<(), ClientError> {
        if let Err(e) = self.store.send_otp(email, true).await {
            warn!(error = %e, "failed to send one-time code");
            return Err(self.failed(e.into()));
        }
        debug!(%email, "one-time code sent");
        self.email = email.to_string();
        self.details = details;
        self.step = FlowStep::OtpSent;
        self.message = Some(
            match self.kind {
                FlowKind::Login => "A 6-digit OTP has been sent to your email.",
                FlowKind::Signup => "OTP sent to your email.",
            }
            .to_string(),
        );
        Ok(())
    }

    /// Send the code again to the same address.
    pub async fn resend(&mut self) -> Result<(), ClientError> {
        if self.step != FlowStep::OtpSent {
            return Err(self.invalid("Please enter your email first."));
        }
        let email = self.email.clone();
        let details = self.details.clone();
        self.send_code(&email, details).await
    }

    /// Exchange the emailed code for a session and ensure the `users` row.
    pub async fn verify(&mut self, code: &str) -> Result<SignedIn, ClientError> {
        if self.step != FlowStep::OtpSent {
            return Err(self.invalid("Please request an OTP first."));
        }
        let code = code.trim();
        if code.is_empty() {
            return Err(self.invalid("Please enter the OTP."));
        }

        self.observer.apply(AuthEvent::SignInStarted);

        let session = match self.store.verify_otp(&self.email, code).await {
            Ok(session) => session,
            Err(e) => {
                self.observer.apply(AuthEvent::SignInFailed);
                return Err(self.failed(e.into()));
            }
        };

        let profile = match ensure_user(
            self.store.as_ref(),
            &session.access_token,
            &session.user,
            self.details.as_ref(),
        )
        .await
        {
            Ok(profile) => profile,
            Err(e) => {
                self.observer.apply(AuthEvent::SignInFailed);
                return Err(self.failed(e.into()));
            }
        };

        self.observer.apply(AuthEvent::SignedIn(session.clone()));
        self.step = FlowStep::Verified;
        self.message = Some(
            match self.kind {
                FlowKind::Login => "Login successful! Redirecting...",
                FlowKind::Signup => "Signup successful! Redirecting...",
            }
            .to_string(),
        );
        Ok(SignedIn { session, profile })
    }

    /// Hosted Google sign-in URL; the browser comes back to `redirect_to`.
    pub fn google_sign_in(&mut self, redirect_to: &str) -> Result<String, ClientError> {
        self.store
            .authorize_url(OAuthProvider::Google, redirect_to)
            .map_err(|e| {
                let prefix = match self.kind {
                    FlowKind::Login => "Google Sign-In failed",
                    FlowKind::Signup => "Google Sign-Up failed",
                };
                self.message = Some(format!("{prefix}: {e}"));
                ClientError::Store(e)
            })
    }
}

/// Finish an OAuth sign-in once the browser is back with a session.
pub async fn complete_oauth(
    store: &dyn SessionStore,
    observer: &SessionObserver,
    session: Session,
) -> Result<UserProfile, ClientError> {
    observer.apply(AuthEvent::SignInStarted);
    match ensure_user(store, &session.access_token, &session.user, None).await {
        Ok(profile) => {
            observer.apply(AuthEvent::SignedIn(session));
            Ok(profile)
        }
        Err(e) => {
            observer.apply(AuthEvent::SignInFailed);
            Err(e.into())
        }
    }
}
