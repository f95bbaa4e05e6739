use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::data::AuthService;
use crate::model::{AuthResponse, UserProfile};
use crate::session::{self, Epoch};

/// Exchanges credentials for a signed-in session.
pub struct AuthFlow {
    service: Arc<dyn AuthService>,
    session: Arc<session::Manager>,
}

impl AuthFlow {
    pub fn new(service: Arc<dyn AuthService>, session: Arc<session::Manager>) -> Self {
        Self { service, session }
    }

    pub fn login(&self, email: &str, password: &str) -> Result<(UserProfile, Epoch)> {
        let email = email.trim();
        anyhow::ensure!(!email.is_empty(), "auth: email is required");
        anyhow::ensure!(!password.is_empty(), "auth: password is required");
        let response = self
            .service
            .login(email, password)
            .with_context(|| format!("auth: login failed for {email}"))?;
        self.establish(response)
    }

    pub fn register(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<(UserProfile, Epoch)> {
        let email = email.trim();
        anyhow::ensure!(!email.is_empty(), "auth: email is required");
        anyhow::ensure!(password.len() >= 6, "auth: password must be at least 6 characters");
        let response = self
            .service
            .register(email, password, full_name.trim())
            .context("auth: registration failed")?;
        self.establish(response)
    }

    /// Signs in with the init data a Telegram mini-app receives on launch.
    pub fn telegram(&self, init_data: &str) -> Result<(UserProfile, Epoch)> {
        anyhow::ensure!(!init_data.trim().is_empty(), "auth: telegram init data is empty");
        let response = self
            .service
            .telegram(init_data)
            .context("auth: telegram sign-in failed")?;
        self.establish(response)
    }

    pub fn logout(&self) -> Result<Epoch> {
        self.session.sign_out().context("auth: failed to clear session")
    }

    fn establish(&self, response: AuthResponse) -> Result<(UserProfile, Epoch)> {
        let profile = response.profile.clone();
        let epoch = self
            .session
            .sign_in(response)
            .context("auth: failed to persist session")?;
        info!(user = %profile.id, role = profile.role.as_str(), "session established");
        Ok((profile, epoch))
    }
}
