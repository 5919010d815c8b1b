use std::io;

use thiserror::Error;

/// Fallo de E/S contra el store local o el proveedor remoto durante `get_data`/`store_data`.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Local store migration error: {0}")]
    Migration(#[from] refinery::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Remote storage error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Blocking store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Paths(#[from] ongaku_paths::Error),
}

/// Fallo al resolver un sign-in externo pendiente.
#[derive(Error, Debug)]
pub enum AuthProcessError {
    #[error("Failed to authenticate: {0}")]
    Provider(#[source] ProviderError),

    #[error("Signed in, but the active method could not be recorded: {0}")]
    Preferences(#[from] PreferencesError),
}

/// Fallo de `sign_in`/`sign_out`: el proveedor externo o el registro de preferencias.
#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Identity provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Preferences(#[from] PreferencesError),
}

/// Errores del proveedor de identidad + ficheros remoto.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("No user is signed in")]
    NotSignedIn,

    #[error("There is no pending sign-in to resolve")]
    NoPendingSignIn,

    #[error("Invalid auth response: {0}")]
    InvalidAuthResponse(String),

    #[error("Invalid provider URL: {0}")]
    Url(String),

    #[error("Session file I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Session file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Paths(#[from] ongaku_paths::Error),
}

/// Errores leyendo o escribiendo el registro de preferencias (método activo, flag anónimo).
#[derive(Error, Debug)]
pub enum PreferencesError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Preferences parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error(transparent)]
    Paths(#[from] ongaku_paths::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Configuration parse error: {0}")]
    Parse(#[from] config::ConfigError),

    #[error(transparent)]
    Paths(#[from] ongaku_paths::Error),
}

/// Nombre de método que no corresponde a ningún backend conocido.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown authentication method: {0:?}")]
pub struct UnknownAuthMethod(pub String);
