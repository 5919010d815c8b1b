use std::{env, path::PathBuf};

use directories::ProjectDirs;

use crate::{errors::Error, fs_utils};

/// Nombre de la ENV var para override de ruta base (modo “portable”)
const ENV_BASE_DIR: &str = "ONGAKU_BASE_DIR";

/// Contenedor de todas las rutas y ficheros importantes de la app
#[derive(Debug)]
pub struct OngakuPaths {
    // config_dir
    pub config_dir: PathBuf,
    pub settings_file: PathBuf,
    pub preferences_file: PathBuf,

    // data_dir
    pub data_dir: PathBuf,
    pub stores_dir: PathBuf,
    pub session_file: PathBuf,
}

impl OngakuPaths {
    pub fn new() -> Result<Self, Error> {
        // 1) Calculamos config_dir y data_dir
        let (config_dir, data_dir) = if let Ok(base) = env::var(ENV_BASE_DIR) {
            let b = PathBuf::from(base);
            (b.join("config"), b.join("data"))
        } else {
            let proj = ProjectDirs::from("com", "OngakuRyoho", "Ongaku").ok_or(Error::NoHome)?;
            (proj.config_dir().to_path_buf(), proj.data_dir().to_path_buf())
        };

        // 2) Inicializamos todas las rutas en la estructura (sin crear nada aún)
        let paths = OngakuPaths {
            config_dir: config_dir.clone(),
            settings_file: config_dir.join("persistence.toml"),
            preferences_file: config_dir.join("preferences.toml"),

            data_dir: data_dir.clone(),
            stores_dir: data_dir.join("stores"),
            session_file: data_dir.join("session.json"),
        };

        // 3) Creamos la estructura y verificamos que todo está presente y escribible
        paths.ensure_structure()?;
        paths.validate_structure()?;

        Ok(paths)
    }
}

impl OngakuPaths {
    /// Devuelve la ruta del fichero SQLite de un store local.
    ///
    /// Estructura:
    ///   <data_dir>/stores/<store_name>.db
    ///
    /// El nombre lleva la versión del esquema (p. ej. `ongaku-ryoho-v1_0_2`), así que
    /// cambiar de versión abre un store distinto en vez de migrar el anterior.
    pub fn store_path(&self, store_name: &str) -> Result<PathBuf, Error> {
        store_file_in(&self.stores_dir, store_name)
    }
}

/// Misma regla que [`OngakuPaths::store_path`] pero sobre un directorio arbitrario.
pub fn store_file_in(dir: &std::path::Path, store_name: &str) -> Result<PathBuf, Error> {
    let name = store_name.trim();
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(Error::InvalidStoreName(store_name.to_string()));
    }

    Ok(dir.join(format!("{name}.db")))
}

impl OngakuPaths {
    /// Se asegura de que TODOS los dirs básicos existen. Los ficheros los crea quien
    /// los escribe.
    pub fn ensure_structure(&self) -> Result<(), Error> {
        fs_utils::ensure_dir(&self.config_dir)?;
        fs_utils::ensure_dir(&self.data_dir)?;
        fs_utils::ensure_dir(&self.stores_dir)?;
        Ok(())
    }

    /// Valida que cada ruta existe Y es escribible. Si falta, la intenta crear.
    /// Si no tiene permisos de escritura, retorna Err.
    pub fn validate_structure(&self) -> Result<(), Error> {
        let all_paths = [&self.config_dir, &self.data_dir, &self.stores_dir];
        for dir in all_paths {
            if !dir.exists() {
                fs_utils::ensure_dir(dir)?;
            }
            fs_utils::check_writable(dir)?;
        }
        Ok(())
    }
}
