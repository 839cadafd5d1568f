use crate::{
    api::{self, AppState, GatePolicy, PathMatching},
    identity::IdentityClient,
    session::{CookieConfig, CookieSameSite},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub identity_url: String,
    pub anon_key: SecretString,
    pub service_key: SecretString,
    pub reset_redirect_url: String,
    pub secure_cookies: bool,
    pub same_site: CookieSameSite,
    pub login_path: String,
    pub landing_path: String,
    pub gate_matching: PathMatching,
    pub allowed_origin: Option<String>,
}

impl Args {
    /// Build the shared application state from the parsed arguments.
    /// # Errors
    /// Returns an error if the identity service URL is invalid.
    pub fn state(self) -> Result<AppState> {
        let identity = IdentityClient::new(&self.identity_url, self.anon_key, self.service_key)
            .with_context(|| format!("Invalid identity service URL: {}", self.identity_url))?;

        let cookies = CookieConfig::new(self.secure_cookies).with_same_site(self.same_site);
        let gate =
            GatePolicy::new(self.login_path, self.landing_path).with_matching(self.gate_matching);

        Ok(AppState::new(
            identity,
            cookies,
            gate,
            self.reset_redirect_url,
        ))
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let port = args.port;
    let allowed_origin = args.allowed_origin.clone();

    let state = args.state()?;
    debug!("Application state: {:?}", state);

    api::new(port, Arc::new(state), allowed_origin.as_deref()).await
}
