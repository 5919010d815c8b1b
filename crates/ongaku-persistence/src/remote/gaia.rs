use std::{
    fs,
    path::PathBuf,
    sync::{Mutex, PoisonError, RwLock},
};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use reqwest::{StatusCode, Url, header::CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{Level, debug, info, instrument};

use ongaku_paths::fs_utils;

use super::provider::{IdentityProvider, UserProfile};
use crate::{config::RemoteStrategyConfig, error::ProviderError};

/// Sesión contra un hub Gaia: dónde leer, dónde escribir y con qué token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaiaSession {
    pub username: Option<String>,
    pub hub_url: String,
    pub gaia_address: String,
    pub gaia_token: String,
    pub read_url_prefix: String,
}

/// Payload del token `authResponse` que llega en el callback del sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(default)]
    pub username: Option<String>,
    pub hub_url: String,
    pub gaia_address: String,
    pub gaia_token: String,
    #[serde(default)]
    pub read_url_prefix: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HubInfo {
    read_url_prefix: String,
}

/// Decodifica el segmento de payload (base64url, JSON) de un token `header.payload.signature`.
pub fn decode_auth_response(token: &str) -> Result<AuthResponse, ProviderError> {
    let payload = token
        .split('.')
        .nth(1)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ProviderError::InvalidAuthResponse("token has no payload segment".into()))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| ProviderError::InvalidAuthResponse(e.to_string()))?;

    serde_json::from_slice(&bytes).map_err(|e| ProviderError::InvalidAuthResponse(e.to_string()))
}

/// Proveedor sobre un hub de almacenamiento Gaia vía HTTP.
#[derive(Debug)]
pub struct GaiaHubProvider {
    client: reqwest::Client,
    auth_url: String,
    redirect_uri: String,
    app_origin: String,
    session_file: PathBuf,
    session: RwLock<Option<GaiaSession>>,
    pending: Mutex<Option<String>>,
}

impl GaiaHubProvider {
    /// Carga la sesión guardada, si la hay.
    pub fn new(config: &RemoteStrategyConfig) -> Result<Self, ProviderError> {
        Self::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(
        config: &RemoteStrategyConfig,
        client: reqwest::Client,
    ) -> Result<Self, ProviderError> {
        let session = if config.session_file.exists() {
            let data = fs::read(&config.session_file)?;
            let session: GaiaSession = serde_json::from_slice(&data)?;
            debug!(address = %session.gaia_address, "Sesión Gaia restaurada");
            Some(session)
        } else {
            None
        };

        Ok(GaiaHubProvider {
            client,
            auth_url: config.auth_url.clone(),
            redirect_uri: config.redirect_uri().to_string(),
            app_origin: config.app_origin.clone(),
            session_file: config.session_file.clone(),
            session: RwLock::new(session),
            pending: Mutex::new(None),
        })
    }

    /// Entrega el `authResponse` recibido en el callback; deja el sign-in pendiente.
    pub fn set_pending_auth_response(&self, token: impl Into<String>) {
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.into());
    }

    pub fn session(&self) -> Option<GaiaSession> {
        self.session.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn require_session(&self) -> Result<GaiaSession, ProviderError> {
        self.session().ok_or(ProviderError::NotSignedIn)
    }

    /// Prefijo de lectura de `address`. `hub_info` da el prefijo común del hub, sin
    /// la dirección del usuario.
    async fn read_url_prefix(&self, hub_url: &str, address: &str) -> Result<String, ProviderError> {
        let url = format!("{}/hub_info", hub_url.trim_end_matches('/'));
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        let hub_prefix = response.json::<HubInfo>().await?.read_url_prefix;
        Ok(format!("{}/{}/", hub_prefix.trim_end_matches('/'), address))
    }

    fn persist_session(&self, session: &GaiaSession) -> Result<(), ProviderError> {
        let data = serde_json::to_vec_pretty(session)?;
        fs_utils::write_atomic(&self.session_file, &data)?;
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for GaiaHubProvider {
    fn is_user_signed_in(&self) -> bool {
        self.session.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    fn is_sign_in_pending(&self) -> bool {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    #[instrument(level = Level::DEBUG, skip_all, err)]
    async fn handle_pending_sign_in(&self) -> Result<UserProfile, ProviderError> {
        let token = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(ProviderError::NoPendingSignIn)?;

        let auth = decode_auth_response(&token)?;
        let read_url_prefix = match auth.read_url_prefix {
            Some(prefix) => prefix,
            None => self.read_url_prefix(&auth.hub_url, &auth.gaia_address).await?,
        };

        let session = GaiaSession {
            username: auth.username,
            hub_url: auth.hub_url,
            gaia_address: auth.gaia_address,
            gaia_token: auth.gaia_token,
            read_url_prefix,
        };
        self.persist_session(&session)?;
        info!(address = %session.gaia_address, "Sign-in Gaia completado");

        let profile = UserProfile {
            username: session.username.clone(),
        };
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
        Ok(profile)
    }

    fn redirect_to_sign_in(&self) -> Result<String, ProviderError> {
        let url = Url::parse_with_params(
            &self.auth_url,
            &[
                ("redirect_uri", self.redirect_uri.as_str()),
                ("app_origin", self.app_origin.as_str()),
            ],
        )
        .map_err(|e| ProviderError::Url(e.to_string()))?;
        Ok(url.into())
    }

    fn sign_user_out(&self) -> Result<(), ProviderError> {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = None;
        if self.session_file.exists() {
            fs::remove_file(&self.session_file)?;
        }
        Ok(())
    }

    #[instrument(level = Level::DEBUG, skip(self), err)]
    async fn get_file(&self, name: &str) -> Result<Option<String>, ProviderError> {
        let session = self.require_session()?;
        let url = format!("{}{}", session.read_url_prefix, name);

        let response = self.client.get(&url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Ok(Some(response.text().await?)),
            s => Err(ProviderError::Status {
                status: s.as_u16(),
                url,
            }),
        }
    }

    #[instrument(level = Level::DEBUG, skip(self, contents), fields(bytes = contents.len()), err)]
    async fn put_file(&self, name: &str, contents: String) -> Result<(), ProviderError> {
        let session = self.require_session()?;
        let url = format!(
            "{}/store/{}/{}",
            session.hub_url.trim_end_matches('/'),
            session.gaia_address,
            name
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&session.gaia_token)
            .header(CONTENT_TYPE, "application/json")
            .body(contents)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Status {
                status: response.status().as_u16(),
                url,
            });
        }
        Ok(())
    }

    fn load_user_data(&self) -> Option<UserProfile> {
        self.session().map(|s| UserProfile { username: s.username })
    }
}
