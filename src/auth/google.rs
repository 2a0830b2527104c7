//! Google sign-in: authorization-code flow with PKCE.
//!
//! [`GoogleOAuth::authorize_url`] builds the consent URL and a fresh CSRF
//! state + PKCE verifier; the handler stores both. On callback
//! [`GoogleOAuth::fetch_profile`] exchanges the code and reads the userinfo
//! endpoint, yielding a [`GoogleProfile`] for the account logic in
//! [`super::services`].

use anyhow::Context;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;

use crate::config::GoogleConfig;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// What the account logic needs from Google's userinfo response.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    #[serde(rename = "id")]
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub verified_email: bool,
    pub name: Option<String>,
}

type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

/// Authorization URL plus the values that must survive until the callback.
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
    pub pkce_verifier: String,
}

pub struct GoogleOAuth {
    client: ConfiguredClient,
    http: reqwest::Client,
}

impl GoogleOAuth {
    pub fn new(config: &GoogleConfig) -> anyhow::Result<Self> {
        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_uri(AuthUrl::new(AUTH_URL.to_string())?)
            .set_token_uri(TokenUrl::new(TOKEN_URL.to_string())?)
            .set_redirect_uri(
                RedirectUrl::new(config.redirect_url.clone()).context("GOOGLE_REDIRECT_URL")?,
            );

        // Token endpoint must not follow redirects.
        let http = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self { client, http })
    }

    pub fn authorize_url(&self) -> AuthorizationRequest {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (url, csrf_state) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .add_scope(Scope::new("profile".to_string()))
            .set_pkce_challenge(pkce_challenge)
            .url();

        AuthorizationRequest {
            url: url.to_string(),
            state: csrf_state.secret().clone(),
            pkce_verifier: pkce_verifier.secret().clone(),
        }
    }

    pub async fn fetch_profile(
        &self,
        code: &str,
        pkce_verifier: String,
    ) -> anyhow::Result<GoogleProfile> {
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
            .request_async(&self.http)
            .await
            .context("google token exchange")?;

        let profile = self
            .http
            .get(USERINFO_URL)
            .bearer_auth(token.access_token().secret())
            .send()
            .await
            .context("google userinfo request")?
            .error_for_status()
            .context("google userinfo status")?
            .json::<GoogleProfile>()
            .await
            .context("google userinfo body")?;

        Ok(profile)
    }
}
