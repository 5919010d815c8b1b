use std::{fmt, str::FromStr, sync::Arc};

use tracing::{Level, info, instrument, warn};

use crate::{
    config::PersistenceConfig,
    error::{PreferencesError, UnknownAuthMethod},
    fallback::FallbackStrategy,
    local::LocalStrategy,
    preferences::PreferencesStore,
    remote::{IdentityProvider, RemoteStrategy},
    traits::PersistenceStrategy,
};

/// Métodos seleccionables. El nombre persistido es el de `as_str`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMethod {
    Local,
    Blockstack,
}

impl AuthMethod {
    pub const ALL: [AuthMethod; 2] = [AuthMethod::Local, AuthMethod::Blockstack];

    pub fn as_str(self) -> &'static str {
        match self {
            AuthMethod::Local => "LOCAL",
            AuthMethod::Blockstack => "BLOCKSTACK",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMethod {
    type Err = UnknownAuthMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuthMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownAuthMethod(s.to_string()))
    }
}

/// Recuerda qué backend está activo y devuelve su instancia.
///
/// Cada backend se crea una sola vez, así que el store local abierto se reutiliza
/// entre llamadas. Cambiar de método no migra datos: cada backend ve lo que su
/// propio almacenamiento contenga.
pub struct StrategySelector {
    preferences: Arc<PreferencesStore>,
    fallback: Arc<FallbackStrategy>,
    local: Arc<LocalStrategy>,
    remote: Arc<RemoteStrategy>,
}

impl StrategySelector {
    pub fn new(
        config: &PersistenceConfig,
        provider: Arc<dyn IdentityProvider>,
    ) -> Result<Self, PreferencesError> {
        let preferences = Arc::new(PreferencesStore::open(&config.preferences_file)?);
        let local = LocalStrategy::new(config.local.clone(), preferences.clone());
        let remote = RemoteStrategy::new(config.remote.clone(), provider, preferences.clone());
        Ok(Self::with_parts(preferences, local, remote))
    }

    pub fn with_parts(
        preferences: Arc<PreferencesStore>,
        local: LocalStrategy,
        remote: RemoteStrategy,
    ) -> Self {
        StrategySelector {
            preferences,
            fallback: Arc::new(FallbackStrategy),
            local: Arc::new(local),
            remote: Arc::new(remote),
        }
    }

    pub fn preferences(&self) -> &Arc<PreferencesStore> {
        &self.preferences
    }

    /// Método persistido, si es uno conocido.
    pub fn active_method(&self) -> Option<AuthMethod> {
        let stored = self.preferences.auth_method()?;
        match stored.parse() {
            Ok(method) => Some(method),
            Err(e) => {
                warn!("Se ignora el método persistido: {}", e);
                None
            }
        }
    }

    pub fn strategy(&self, method: AuthMethod) -> Arc<dyn PersistenceStrategy> {
        match method {
            AuthMethod::Local => self.local.clone() as Arc<dyn PersistenceStrategy>,
            AuthMethod::Blockstack => self.remote.clone() as Arc<dyn PersistenceStrategy>,
        }
    }

    /// El backend activo, o `FallbackStrategy` si no hay selección válida.
    pub fn resolve_active(&self) -> Arc<dyn PersistenceStrategy> {
        match self.active_method() {
            Some(method) => self.strategy(method),
            None => self.fallback.clone() as Arc<dyn PersistenceStrategy>,
        }
    }

    #[instrument(level = Level::DEBUG, skip(self), err)]
    pub fn select(&self, method: AuthMethod) -> Result<Arc<dyn PersistenceStrategy>, PreferencesError> {
        self.preferences.set_auth_method(Some(method.as_str()))?;
        info!(%method, "Método de autenticación seleccionado");
        Ok(self.strategy(method))
    }

    #[instrument(level = Level::DEBUG, skip(self), err)]
    pub fn deselect(&self) -> Result<(), PreferencesError> {
        self.preferences.set_auth_method(None)?;
        info!("Método de autenticación eliminado");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{remote::testing::MemoryProvider, traits::StrategyKind};
    use ongaku_core::{Dataset, Favourite};
    use tempfile::{TempDir, tempdir};

    fn selector() -> (TempDir, StrategySelector) {
        let tmp = tempdir().unwrap();
        let config = PersistenceConfig::rooted_at(tmp.path());
        let selector = StrategySelector::new(&config, Arc::new(MemoryProvider::default())).unwrap();
        (tmp, selector)
    }

    #[test]
    fn method_names_parse_and_print() {
        for method in AuthMethod::ALL {
            assert_eq!(method.to_string().parse::<AuthMethod>().unwrap(), method);
        }
        assert_eq!("local".parse::<AuthMethod>(), Err(UnknownAuthMethod("local".into())));
    }

    #[tokio::test]
    async fn nothing_selected_resolves_to_fallback() {
        let (_tmp, selector) = selector();

        let active = selector.resolve_active();
        assert_eq!(active.kind(), StrategyKind::Fallback);
        assert!(!active.is_signed_in());
        active.store_data(&Dataset::default()).await.unwrap();
        assert_eq!(active.get_data().await.unwrap(), Dataset::default());
    }

    #[test]
    fn select_then_deselect() {
        let (_tmp, selector) = selector();

        assert_eq!(selector.select(AuthMethod::Local).unwrap().kind(), StrategyKind::Local);
        assert_eq!(selector.resolve_active().kind(), StrategyKind::Local);
        assert_eq!(selector.active_method(), Some(AuthMethod::Local));

        selector.deselect().unwrap();
        assert_eq!(selector.resolve_active().kind(), StrategyKind::Fallback);

        assert_eq!(selector.select(AuthMethod::Blockstack).unwrap().kind(), StrategyKind::Remote);
    }

    #[test]
    fn selection_survives_a_new_selector() {
        let tmp = tempdir().unwrap();
        let config = PersistenceConfig::rooted_at(tmp.path());

        let first = StrategySelector::new(&config, Arc::new(MemoryProvider::default())).unwrap();
        let _ = first.select(AuthMethod::Blockstack).unwrap();

        let second = StrategySelector::new(&config, Arc::new(MemoryProvider::default())).unwrap();
        assert_eq!(second.resolve_active().kind(), StrategyKind::Remote);
    }

    #[test]
    fn unknown_stored_value_falls_back() {
        let (_tmp, selector) = selector();
        selector.preferences().set_auth_method(Some("DROPBOX")).unwrap();

        assert_eq!(selector.active_method(), None);
        assert_eq!(selector.resolve_active().kind(), StrategyKind::Fallback);
    }

    #[tokio::test]
    async fn switching_backends_does_not_migrate_data() {
        let (_tmp, selector) = selector();
        let data = Dataset {
            favourites: vec![Favourite {
                artist: "Cornelius".into(),
                title: "Star Fruits Surf Rider".into(),
            }],
            ..Default::default()
        };

        selector.select(AuthMethod::Local).unwrap().store_data(&data).await.unwrap();

        let remote = selector.select(AuthMethod::Blockstack).unwrap();
        assert_eq!(remote.get_data().await.unwrap(), Dataset::default());

        let local = selector.select(AuthMethod::Local).unwrap();
        assert_eq!(local.get_data().await.unwrap(), data);
    }

    #[tokio::test]
    async fn resolved_local_instance_is_reused() {
        let (_tmp, selector) = selector();
        let a = selector.select(AuthMethod::Local).unwrap();
        let b = selector.resolve_active();

        let data = Dataset {
            settings: Some(serde_json::Map::new()),
            ..Default::default()
        };
        a.store_data(&data).await.unwrap();
        assert_eq!(b.get_data().await.unwrap(), data);
    }
}
