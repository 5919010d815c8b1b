//! Crate `ongaku_paths`: rutas, locks y ficheros de Ongaku

mod errors;
pub mod fs_utils;
mod paths;

pub use errors::Error;
pub use paths::{OngakuPaths, store_file_in};

use once_cell::sync::Lazy;

/// Singleton global, para usar en todo el crate sin repetir `new()`
pub static PATHS: Lazy<OngakuPaths> =
    Lazy::new(|| OngakuPaths::new().expect("Failed to initialize OngakuPaths"));

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        path::PathBuf,
        sync::{Mutex, MutexGuard},
    };
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// RAII-guard que setea y luego restaura (o elimina) una variable de entorno.
    /// Serializa los tests que la tocan.
    struct EnvVarGuard {
        key: String,
        original: Option<String>,
        _lock: MutexGuard<'static, ()>,
    }

    impl EnvVarGuard {
        fn new(key: &str, value: &str) -> Self {
            let lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
            let original = std::env::var(key).ok();
            // set_var es unsafe en edition 2024:
            unsafe { std::env::set_var(key, value) };
            EnvVarGuard {
                key: key.to_owned(),
                original,
                _lock: lock,
            }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match &self.original {
                Some(val) => unsafe { std::env::set_var(&self.key, val) },
                None => unsafe { std::env::remove_var(&self.key) },
            }
        }
    }

    #[test]
    fn store_path_ok() {
        let tmp = tempdir().unwrap();
        let _env = EnvVarGuard::new("ONGAKU_BASE_DIR", tmp.path().to_str().unwrap());

        let paths = OngakuPaths::new().unwrap();
        let p = paths.store_path("ongaku-ryoho-v1_0_2").unwrap();

        let expected: PathBuf = tmp
            .path()
            .join("data")
            .join("stores")
            .join("ongaku-ryoho-v1_0_2.db");
        assert_eq!(p, expected);
    }

    #[test]
    fn store_path_rejects_separators_and_empty() {
        let tmp = tempdir().unwrap();

        for bad in ["", "   ", "../escape", "a/b", "a\\b", ".."] {
            match store_file_in(tmp.path(), bad).unwrap_err() {
                Error::InvalidStoreName(n) => assert_eq!(n, bad),
                other => panic!("Esperaba InvalidStoreName, obtuve {other:?}"),
            }
        }
    }

    #[test]
    fn new_creates_structure() {
        let tmp = tempdir().unwrap();
        let _env = EnvVarGuard::new("ONGAKU_BASE_DIR", tmp.path().to_str().unwrap());

        let paths = OngakuPaths::new().unwrap();

        assert!(paths.config_dir.exists());
        assert!(paths.data_dir.exists());
        assert!(paths.stores_dir.exists());

        // Configuración, preferencias y sesión sólo existen cuando alguien las escribe
        assert!(!paths.settings_file.exists());
        assert!(!paths.preferences_file.exists());
        assert!(!paths.session_file.exists());

        // En data sólo está el directorio de stores; no hay cache ni logs
        let entries: Vec<_> = std::fs::read_dir(&paths.data_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, ["stores"]);
        assert!(!tmp.path().join("cache").exists());
    }

    #[test]
    fn validate_structure_recreates_missing_dirs() {
        let tmp = tempdir().unwrap();
        let _env = EnvVarGuard::new("ONGAKU_BASE_DIR", tmp.path().to_str().unwrap());

        let paths = OngakuPaths::new().unwrap();

        std::fs::remove_dir_all(&paths.data_dir).unwrap();
        assert!(!paths.stores_dir.exists());

        paths.validate_structure().unwrap();
        assert!(paths.data_dir.exists());
        assert!(paths.stores_dir.exists());
    }

    #[test]
    fn write_atomic_replaces_contents_and_lock_is_reentrant_per_handle() {
        let tmp = tempdir().unwrap();
        let target = tmp.path().join("nested").join("prefs.toml");

        fs_utils::write_atomic(&target, b"first").unwrap();
        fs_utils::write_atomic(&target, b"second").unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "second");

        let lock_path = tmp.path().join("prefs.lock");
        let handle = fs_utils::lock_file(&lock_path).unwrap();
        assert!(lock_path.exists());
        drop(handle);
        // Tras soltar el handle el lock se puede volver a tomar
        let _again = fs_utils::lock_file(&lock_path).unwrap();
    }
}
