use std::path::{Path, PathBuf};

use config::{Config, File, FileFormat};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use ongaku_paths::{PATHS, fs_utils};

use crate::error::ConfigError;

/// Nombre del store local; lleva la versión del esquema.
pub const LOCAL_STORE_NAME: &str = "ongaku-ryoho-v1_0_2";
/// Nombre estable del documento remoto, independiente de la versión.
pub const REMOTE_FILE_NAME: &str = "ongaku-ryoho.json";
/// Tamaño de lote al leer la tabla de pistas.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

const DEFAULT_AUTH_URL: &str = "https://browser.blockstack.org/auth";
const DEFAULT_APP_ORIGIN: &str = "http://localhost:8080";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(setter(into))]
pub struct PersistenceConfig {
    /// Fichero TOML con el método activo y el flag de sesión anónima.
    pub preferences_file: PathBuf,
    pub local: LocalStrategyConfig,
    pub remote: RemoteStrategyConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(setter(into))]
pub struct LocalStrategyConfig {
    pub store_dir: PathBuf,
    #[serde(default = "default_store_name")]
    #[builder(default = "default_store_name()")]
    pub store_name: String,
    #[serde(default = "default_batch_size")]
    #[builder(default = "default_batch_size()")]
    pub batch_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(setter(into))]
pub struct RemoteStrategyConfig {
    #[serde(default = "default_file_name")]
    #[builder(default = "default_file_name()")]
    pub file_name: String,
    /// Destino de la recarga tras completar un sign-in.
    #[serde(default = "default_app_origin")]
    #[builder(default = "default_app_origin()")]
    pub app_origin: String,
    #[serde(default = "default_auth_url")]
    #[builder(default = "default_auth_url()")]
    pub auth_url: String,
    /// Si falta, se usa `app_origin`.
    #[serde(default)]
    #[builder(default, setter(into, strip_option))]
    pub redirect_uri: Option<String>,
    pub session_file: PathBuf,
}

fn default_store_name() -> String {
    LOCAL_STORE_NAME.to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_file_name() -> String {
    REMOTE_FILE_NAME.to_string()
}

fn default_app_origin() -> String {
    DEFAULT_APP_ORIGIN.to_string()
}

fn default_auth_url() -> String {
    DEFAULT_AUTH_URL.to_string()
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        PersistenceConfig {
            preferences_file: PATHS.preferences_file.clone(),
            local: LocalStrategyConfig::in_dir(&PATHS.stores_dir),
            remote: RemoteStrategyConfig::with_session_file(&PATHS.session_file),
        }
    }
}

impl PersistenceConfig {
    /// Todo bajo `base` (modo portable y tests), sin tocar las rutas globales.
    pub fn rooted_at(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        PersistenceConfig {
            preferences_file: base.join("config").join("preferences.toml"),
            local: LocalStrategyConfig::in_dir(base.join("data").join("stores")),
            remote: RemoteStrategyConfig::with_session_file(base.join("data").join("session.json")),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_string_lossy().into_owned();
        let cfg = Config::builder()
            .add_source(File::new(&path, FileFormat::Toml))
            .build()
            .map_err(ConfigError::Parse)?;
        let pc = cfg
            .try_deserialize::<PersistenceConfig>()
            .map_err(ConfigError::Parse)?;
        Ok(pc)
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let toml_str = toml::to_string(self)?;
        fs_utils::write_atomic(path.as_ref(), toml_str.as_bytes())?;
        Ok(())
    }
}

impl LocalStrategyConfig {
    pub fn in_dir(store_dir: impl Into<PathBuf>) -> Self {
        LocalStrategyConfig {
            store_dir: store_dir.into(),
            store_name: default_store_name(),
            batch_size: default_batch_size(),
        }
    }
}

impl RemoteStrategyConfig {
    pub fn with_session_file(session_file: impl Into<PathBuf>) -> Self {
        RemoteStrategyConfig {
            file_name: default_file_name(),
            app_origin: default_app_origin(),
            auth_url: default_auth_url(),
            redirect_uri: None,
            session_file: session_file.into(),
        }
    }

    pub fn redirect_uri(&self) -> &str {
        self.redirect_uri.as_deref().unwrap_or(&self.app_origin)
    }
}
