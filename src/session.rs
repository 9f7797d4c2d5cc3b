//! Session Gate
//!
//! Decides per view whether a credential is required, and owns every write
//! to the credential store: sign-in stores it, rejection and logout clear it.

use std::sync::Arc;

use crate::commands::Backend;
use crate::credential::{Credential, CredentialStore};
use crate::error::{ApiError, ClientError, CredentialError};
use crate::models::{LoginRequest, SignupRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    Signup,
    Dashboard,
    Leaderboard,
    Track,
}

impl View {
    pub fn is_protected(self) -> bool {
        matches!(self, View::Dashboard | View::Leaderboard)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Protected views carry the credential to use
    Allow(Option<Credential>),
    Deny { redirect: View },
}

#[derive(Clone)]
pub struct SessionGate {
    store: Arc<dyn CredentialStore>,
}

impl SessionGate {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Admit `view` without touching the network. A stored credential is
    /// assumed valid until a request made with it is rejected.
    pub fn admit(&self, view: View) -> Admission {
        if !view.is_protected() {
            return Admission::Allow(None);
        }
        match self.store.load() {
            Some(credential) => Admission::Allow(Some(credential)),
            None => {
                tracing::info!("No credential for {:?}, redirecting to login", view);
                Admission::Deny {
                    redirect: View::Login,
                }
            }
        }
    }

    pub fn credential(&self) -> Option<Credential> {
        self.store.load()
    }

    pub async fn sign_in(
        &self,
        backend: &dyn Backend,
        email: &str,
        password: &str,
    ) -> Result<(), ClientError> {
        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };

        let token = backend
            .authenticate(&request)
            .await
            .map_err(|e| rejection(&e, "Login failed", "An error occurred during login"))?;
        let credential =
            Credential::new(token).ok_or_else(|| ClientError::Rejected("Login failed".to_string()))?;

        self.store.save(&credential)?;
        tracing::info!("Signed in as {}", request.email);
        Ok(())
    }

    /// Registration does not sign the user in
    pub async fn register(
        &self,
        backend: &dyn Backend,
        signup: &SignupRequest,
    ) -> Result<(), ClientError> {
        backend.register(signup).await.map_err(|e| {
            rejection(&e, "Registration failed", "An error occurred during registration")
        })?;
        tracing::info!("Registered {}", signup.email);
        Ok(())
    }

    /// Clear the credential; used for logout and for every rejection
    pub fn revoke(&self) -> Result<(), CredentialError> {
        self.store.clear()?;
        tracing::info!("Credential cleared");
        Ok(())
    }

    /// Revoke after a rejection and hand back the view to redirect to
    pub fn reject(&self) -> View {
        if let Err(e) = self.revoke() {
            tracing::error!("Failed to clear rejected credential: {}", e);
        }
        View::Login
    }
}

fn rejection(error: &ApiError, fallback: &str, transport: &str) -> ClientError {
    let text = match error {
        ApiError::Status { message, .. } if !message.is_empty() => message.clone(),
        ApiError::Transport(_) => transport.to_string(),
        _ => fallback.to_string(),
    };
    tracing::warn!("{}: {}", fallback, error);
    ClientError::Rejected(text)
}
