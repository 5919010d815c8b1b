mod gaia;
mod provider;

use std::sync::Arc;

use async_trait::async_trait;
use ongaku_core::Dataset;
use tracing::{Level, debug, error, info, instrument};

pub use gaia::{AuthResponse, GaiaHubProvider, GaiaSession, decode_auth_response};
pub use provider::{IdentityProvider, UserProfile};

#[cfg(test)]
pub(crate) use provider::testing;

use crate::{
    config::RemoteStrategyConfig,
    error::{AuthProcessError, IdentityError, PersistenceError},
    preferences::PreferencesStore,
    selector::AuthMethod,
    traits::{PersistenceStrategy, SignInOutcome, SignInProcess, StrategyKind, UserData},
};

/// Backend sobre el almacenamiento de ficheros de un proveedor de identidad externo.
///
/// Todo el dataset vive en un único documento con nombre fijo, así que `store_data`
/// es una sola escritura: o se aplica entero o no se aplica. Es una diferencia real
/// con `LocalStrategy` y se mantiene.
pub struct RemoteStrategy {
    config: RemoteStrategyConfig,
    provider: Arc<dyn IdentityProvider>,
    preferences: Arc<PreferencesStore>,
}

impl RemoteStrategy {
    pub fn new(
        config: RemoteStrategyConfig,
        provider: Arc<dyn IdentityProvider>,
        preferences: Arc<PreferencesStore>,
    ) -> Self {
        RemoteStrategy {
            config,
            provider,
            preferences,
        }
    }
}

#[async_trait]
impl PersistenceStrategy for RemoteStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Remote
    }

    fn is_signed_in(&self) -> bool {
        self.provider.is_user_signed_in()
    }

    fn is_signing_in(&self) -> bool {
        self.provider.is_sign_in_pending()
    }

    #[instrument(level = Level::DEBUG, skip_all, err)]
    async fn handle_sign_in_process(&self) -> Result<SignInProcess, AuthProcessError> {
        if !self.provider.is_sign_in_pending() {
            return Ok(SignInProcess::NotApplicable);
        }

        match self.provider.handle_pending_sign_in().await {
            Ok(profile) => {
                self.preferences
                    .set_auth_method(Some(AuthMethod::Blockstack.as_str()))?;
                info!(user = ?profile.username, "Sign-in remoto completado");
                Ok(SignInProcess::Reload {
                    location: self.config.app_origin.clone(),
                })
            }
            Err(e) => {
                error!("Failed to authenticate: {}", e);
                Err(AuthProcessError::Provider(e))
            }
        }
    }

    fn sign_in(&self) -> Result<SignInOutcome, IdentityError> {
        let url = self.provider.redirect_to_sign_in()?;
        Ok(SignInOutcome::Redirect { url })
    }

    /// Si el proveedor no puede olvidar la sesión el error se propaga: la sesión
    /// seguiría viva en el próximo arranque.
    fn sign_out(&self) -> Result<(), IdentityError> {
        self.provider.sign_user_out()?;
        info!("Sesión remota cerrada");
        Ok(())
    }

    #[instrument(level = Level::DEBUG, skip_all, fields(file = %self.config.file_name), err)]
    async fn get_data(&self) -> Result<Dataset, PersistenceError> {
        let document = self.provider.get_file(&self.config.file_name).await?;
        // Un documento vacío cuenta como inexistente.
        let document = document.as_deref().filter(|d| !d.trim().is_empty());
        if document.is_none() {
            debug!("El documento remoto no existe o está vacío; se usa un dataset vacío");
        }

        Ok(Dataset::from_json(document.unwrap_or("{}"))?)
    }

    #[instrument(level = Level::DEBUG, skip_all, fields(file = %self.config.file_name), err)]
    async fn store_data(&self, data: &Dataset) -> Result<(), PersistenceError> {
        let document = data.to_json()?;
        self.provider.put_file(&self.config.file_name, document).await?;
        Ok(())
    }

    fn user_data(&self) -> UserData {
        match self.provider.load_user_data().and_then(|p| p.username) {
            Some(name) if !name.is_empty() => UserData { display_name: name },
            _ => UserData::anonymous(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use ongaku_core::{Favourite, Source, Track};
    use serde_json::json;
    use tempfile::{TempDir, tempdir};
    use super::testing::MemoryProvider;
    use crate::error::ProviderError;

    fn strategy(provider: MemoryProvider) -> (TempDir, Arc<MemoryProvider>, Arc<PreferencesStore>, RemoteStrategy) {
        let tmp = tempdir().unwrap();
        let prefs = Arc::new(PreferencesStore::open(tmp.path().join("preferences.toml")).unwrap());
        let provider = Arc::new(provider);
        let mut config = RemoteStrategyConfig::with_session_file(tmp.path().join("session.json"));
        config.app_origin = "https://ongaku.example".into();
        let remote = RemoteStrategy::new(config, provider.clone(), prefs.clone());
        (tmp, provider, prefs, remote)
    }

    fn dataset(tracks: usize) -> Dataset {
        Dataset {
            favourites: vec![Favourite {
                artist: "Nujabes".into(),
                title: "Aruarian Dance".into(),
            }],
            settings: Some(json!({ "volume": 5 }).as_object().unwrap().clone()),
            sources: vec![Source {
                id: "dropbox".into(),
                data: json!({ "token": "t" }),
                enabled: false,
                service: "Dropbox".into(),
            }],
            tracks: (0..tracks)
                .map(|i| Track {
                    id: i.to_string(),
                    path: format!("/{i}.mp3"),
                    source_id: "dropbox".into(),
                    tags: json!({ "title": i }),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn missing_document_loads_as_empty_defaults() {
        let (_tmp, _provider, _prefs, remote) = strategy(MemoryProvider::default());
        assert_eq!(remote.get_data().await.unwrap(), Dataset::default());
    }

    #[tokio::test]
    async fn empty_document_loads_like_a_missing_one() {
        let (_tmp, provider, _prefs, remote) = strategy(MemoryProvider::default());

        for blank in ["", "  \n"] {
            provider
                .files
                .lock()
                .unwrap()
                .insert("ongaku-ryoho.json".into(), blank.into());
            assert_eq!(remote.get_data().await.unwrap(), Dataset::default());
        }
    }

    #[tokio::test]
    async fn store_then_get_round_trips_in_one_document() {
        let (_tmp, provider, _prefs, remote) = strategy(MemoryProvider::default());
        let data = dataset(2500);

        remote.store_data(&data).await.unwrap();
        assert_eq!(provider.files.lock().unwrap().len(), 1);
        assert!(provider.files.lock().unwrap().contains_key("ongaku-ryoho.json"));

        let loaded = remote.get_data().await.unwrap();
        assert_eq!(loaded, data);
        assert_eq!(serde_json::to_value(&loaded.settings).unwrap(), json!({ "volume": 5 }));
    }

    #[tokio::test]
    async fn partial_document_gets_the_same_defaulting_as_local() {
        let (_tmp, provider, _prefs, remote) = strategy(MemoryProvider::default());
        provider
            .files
            .lock()
            .unwrap()
            .insert("ongaku-ryoho.json".into(), r#"{"tracks": null, "favourites": []}"#.into());

        assert_eq!(remote.get_data().await.unwrap(), Dataset::default());
    }

    #[tokio::test]
    async fn io_failures_surface_as_persistence_errors() {
        let (_tmp, provider, _prefs, remote) = strategy(MemoryProvider::default());
        provider.fail_io.store(true, Ordering::SeqCst);

        assert!(matches!(remote.get_data().await, Err(PersistenceError::Provider(_))));
        assert!(matches!(
            remote.store_data(&dataset(1)).await,
            Err(PersistenceError::Provider(_))
        ));
    }

    #[tokio::test]
    async fn successful_sign_in_records_selection_and_reloads_origin() {
        let (_tmp, _provider, prefs, remote) =
            strategy(MemoryProvider::with_pending_sign_in(Some("alice.id")));

        assert!(remote.is_signing_in());
        let outcome = remote.handle_sign_in_process().await.unwrap();

        assert_eq!(
            outcome,
            SignInProcess::Reload {
                location: "https://ongaku.example".into()
            }
        );
        assert_eq!(prefs.auth_method().as_deref(), Some("BLOCKSTACK"));
        assert!(remote.is_signed_in());
        assert_eq!(remote.user_data().display_name, "alice.id");
    }

    #[tokio::test]
    async fn failed_sign_in_leaves_selection_untouched() {
        let provider = MemoryProvider::with_pending_sign_in(Some("alice.id"));
        provider.fail_sign_in.store(true, Ordering::SeqCst);
        let (_tmp, _provider, prefs, remote) = strategy(provider);
        prefs.set_auth_method(Some("LOCAL")).unwrap();

        assert!(matches!(
            remote.handle_sign_in_process().await,
            Err(AuthProcessError::Provider(_))
        ));
        assert_eq!(prefs.auth_method().as_deref(), Some("LOCAL"));
        assert!(!remote.is_signed_in());
    }

    #[tokio::test]
    async fn nothing_pending_is_not_applicable() {
        let (_tmp, _provider, prefs, remote) = strategy(MemoryProvider::default());

        assert_eq!(remote.handle_sign_in_process().await.unwrap(), SignInProcess::NotApplicable);
        assert_eq!(prefs.auth_method(), None);
    }

    #[tokio::test]
    async fn sign_in_redirects_and_user_defaults_to_anonymous() {
        let (_tmp, provider, _prefs, remote) = strategy(MemoryProvider::default());

        assert_eq!(
            remote.sign_in().unwrap(),
            SignInOutcome::Redirect {
                url: "memory://auth".into()
            }
        );
        assert_eq!(remote.user_data(), UserData::anonymous());

        *provider.profile.lock().unwrap() = Some(UserProfile { username: None });
        assert_eq!(remote.user_data(), UserData::anonymous());

        remote.sign_out().unwrap();
        assert!(provider.load_user_data().is_none());
    }

    #[tokio::test]
    async fn provider_failures_surface_from_sign_in_and_sign_out() {
        let provider = MemoryProvider::default();
        *provider.profile.lock().unwrap() = Some(UserProfile {
            username: Some("alice.id".into()),
        });
        provider.fail_identity.store(true, Ordering::SeqCst);
        let (_tmp, provider, _prefs, remote) = strategy(provider);

        assert!(matches!(remote.sign_in(), Err(IdentityError::Provider(ProviderError::Url(_)))));
        assert!(matches!(remote.sign_out(), Err(IdentityError::Provider(ProviderError::Io(_)))));
        // La sesión sigue viva: quien llama sabe que el sign-out no se completó
        assert!(remote.is_signed_in());

        provider.fail_identity.store(false, Ordering::SeqCst);
        remote.sign_out().unwrap();
        assert!(!remote.is_signed_in());
    }
}
