use std::{
    fs,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use serde::{Deserialize, Serialize};
use tracing::{Level, debug, instrument};

use ongaku_paths::fs_utils;

use crate::error::PreferencesError;

/// Estado persistido fuera de los backends: qué método está activo y si hay una
/// sesión local anónima. Se guarda como TOML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Se guarda tal cual; un valor desconocido se trata como "sin seleccionar" al resolver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_method: Option<String>,
    #[serde(default)]
    pub signed_in_anonymously: bool,
}

/// Acceso compartido al fichero de preferencias.
///
/// Las lecturas salen de una copia en memoria, así que son síncronas y no hacen E/S.
/// Cada escritura toma un lock exclusivo, relee el fichero, aplica el cambio y lo
/// reemplaza de forma atómica.
#[derive(Debug)]
pub struct PreferencesStore {
    path: PathBuf,
    lock_path: PathBuf,
    cached: RwLock<Preferences>,
}

impl PreferencesStore {
    #[instrument(level = Level::DEBUG, skip_all, fields(path = %path.as_ref().display()), err)]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PreferencesError> {
        let path = path.as_ref().to_path_buf();
        let mut lock_path = path.as_os_str().to_owned();
        lock_path.push(".lock");

        let cached = read_preferences(&path)?;
        debug!(?cached, "Preferencias cargadas");

        Ok(PreferencesStore {
            path,
            lock_path: PathBuf::from(lock_path),
            cached: RwLock::new(cached),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> Preferences {
        self.cached.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn auth_method(&self) -> Option<String> {
        self.get().auth_method
    }

    pub fn signed_in_anonymously(&self) -> bool {
        self.get().signed_in_anonymously
    }

    pub fn set_auth_method(&self, method: Option<&str>) -> Result<(), PreferencesError> {
        self.update(|p| p.auth_method = method.map(str::to_owned))
    }

    pub fn set_signed_in_anonymously(&self, value: bool) -> Result<(), PreferencesError> {
        self.update(|p| p.signed_in_anonymously = value)
    }

    #[instrument(level = Level::TRACE, skip_all, err)]
    fn update<F>(&self, updater: F) -> Result<(), PreferencesError>
    where
        F: FnOnce(&mut Preferences),
    {
        let _lock = fs_utils::lock_file(&self.lock_path)?;

        let mut prefs = read_preferences(&self.path)?;
        updater(&mut prefs);

        let toml_str = toml::to_string(&prefs)?;
        fs_utils::write_atomic(&self.path, toml_str.as_bytes())?;

        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = prefs;
        Ok(())
    }
}

fn read_preferences(path: &Path) -> Result<Preferences, PreferencesError> {
    if !path.exists() {
        return Ok(Preferences::default());
    }
    let data = fs::read_to_string(path)?;
    Ok(toml::from_str(&data)?)
}
