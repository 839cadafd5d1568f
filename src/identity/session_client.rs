use super::{
    client::{IdentityClient, User},
    cookies::CookieStore,
    error::IdentityError,
};
use crate::session::{
    ACCESS_COOKIE_NAME, CookieConfig, Identity, REFRESH_COOKIE_NAME, Session, TokenPair,
    unix_now,
};
use secrecy::SecretString;
use tracing::{debug, warn};

/// Identity client bound to the cookies of one request.
///
/// Built per request by the factory methods on the application state and
/// dropped with it. Which store backs it decides whether refreshed or cleared
/// sessions reach the browser.
#[derive(Debug)]
pub struct SessionClient<'a, C> {
    client: &'a IdentityClient,
    cookies: &'a CookieConfig,
    store: C,
}

impl<'a, C: CookieStore> SessionClient<'a, C> {
    #[must_use]
    pub fn new(client: &'a IdentityClient, cookies: &'a CookieConfig, store: C) -> Self {
        Self {
            client,
            cookies,
            store,
        }
    }

    #[must_use]
    pub fn identity_client(&self) -> &'a IdentityClient {
        self.client
    }

    #[must_use]
    pub fn store(&self) -> &C {
        &self.store
    }

    /// Hand back the cookie store, with any writes made through this client.
    #[must_use]
    pub fn into_store(self) -> C {
        self.store
    }

    /// Session from the current cookies. Missing either cookie means no session.
    #[must_use]
    pub fn session(&self) -> Option<Session> {
        Session::from_parts(
            self.store.get(ACCESS_COOKIE_NAME),
            self.store.get(REFRESH_COOKIE_NAME),
        )
    }

    /// Write both session cookies.
    pub fn store_session(&mut self, pair: &TokenPair) {
        for cookie in self.cookies.session_cookies(pair, unix_now()) {
            self.store.set(cookie);
        }
    }

    pub fn clear_session(&mut self) {
        for cookie in self.cookies.clear_session_cookies() {
            self.store.set(cookie);
        }
    }

    /// Resolve the signed-in user, refreshing the session once when the
    /// access token is rejected.
    ///
    /// # Errors
    /// Returns [`IdentityError::MissingSession`] without cookies, or the
    /// provider error when neither token is accepted.
    pub async fn user(&mut self) -> Result<User, IdentityError> {
        self.authenticate().await.map(|(user, _)| user)
    }

    /// The signed-in user plus the role stored on their profile row.
    ///
    /// A failed role lookup leaves `role` empty instead of failing the request.
    /// # Errors
    /// Same as [`Self::user`].
    pub async fn identity(&mut self) -> Result<Identity, IdentityError> {
        let (user, access_token) = self.authenticate().await?;

        let role = match self.client.fetch_role(&access_token, &user.id).await {
            Ok(role) => role,
            Err(err) => {
                warn!(user_id = %user.id, "failed to fetch profile role: {err}");
                None
            }
        };

        Ok(Identity {
            id: user.id,
            email: user.email,
            role,
        })
    }

    /// Sign in with email and password and store the new session.
    /// # Errors
    /// Returns the provider error when the credentials are rejected.
    pub async fn sign_in_with_password(
        &mut self,
        email: &str,
        password: &SecretString,
    ) -> Result<(), IdentityError> {
        let pair = self.client.sign_in_with_password(email, password).await?;
        self.store_session(&pair);
        Ok(())
    }

    /// # Errors
    /// Returns an error without a session or when the provider refuses the change.
    pub async fn update_password(&mut self, password: &SecretString) -> Result<(), IdentityError> {
        let (_, access_token) = self.authenticate().await?;
        self.client.update_password(&access_token, password).await
    }

    /// Revoke the session upstream and clear the cookies.
    ///
    /// Cookies are cleared even when the provider call fails.
    /// # Errors
    /// Returns the provider error, after clearing.
    pub async fn sign_out(&mut self) -> Result<(), IdentityError> {
        let result = match self.session() {
            Some(session) => self.client.sign_out(session.access_token()).await,
            None => Ok(()),
        };
        self.clear_session();
        result
    }

    async fn authenticate(&mut self) -> Result<(User, SecretString), IdentityError> {
        let session = self.session().ok_or(IdentityError::MissingSession)?;

        match self.client.get_user(session.access_token()).await {
            Ok(user) => Ok((user, session.access_token().clone())),
            Err(err) if err.is_rejection() => {
                debug!("access token rejected, refreshing session");
                let pair = match self.client.refresh_session(session.refresh_token()).await {
                    Ok(pair) => pair,
                    Err(refresh_err) => {
                        if refresh_err.is_rejection() {
                            debug!("refresh token rejected, clearing session");
                            self.clear_session();
                        }
                        return Err(refresh_err);
                    }
                };
                self.store_session(&pair);
                let user = self.client.get_user(&pair.access_token).await?;
                Ok((user, pair.access_token))
            }
            Err(err) => Err(err),
        }
    }
}
