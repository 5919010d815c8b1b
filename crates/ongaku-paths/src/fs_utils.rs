use fs2::FileExt;
use std::{fs, fs::OpenOptions, io, path::Path};

use tracing::{Level, instrument};

use crate::errors::Error;

/// Asegura que la carpeta `path` existe (creándola recursivamente si hace falta).
#[instrument(level = Level::TRACE, err)]
pub fn ensure_dir(path: &Path) -> Result<(), Error> {
    fs::create_dir_all(path)?;
    Ok(())
}

/// Asegura que el fichero `path` existe (creando su carpeta padre si hace falta).
#[instrument(level = Level::TRACE, err)]
pub fn ensure_file(path: &Path) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    if !path.exists() {
        fs::File::create(path)?;
    }

    Ok(())
}

/// Adquiere un lock exclusivo sobre el fichero `path`.
/// Devuelve el `File` bloqueado; mientras conserves el handle, el lock se mantiene.
#[instrument(level = Level::TRACE, err)]
pub fn lock_file(path: &Path) -> Result<fs::File, Error> {
    ensure_file(path)?;
    let file = OpenOptions::new().read(true).write(true).open(path)?;
    file.lock_exclusive()?;
    Ok(file)
}

/// Escribe `contents` en un fichero temporal hermano y lo renombra sobre `path`,
/// así un lector nunca ve el fichero a medio escribir.
#[instrument(level = Level::TRACE, skip(contents), err)]
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = Path::new(&tmp);

    fs::write(tmp, contents)?;
    fs::rename(tmp, path)?;
    Ok(())
}

/// Verifica que `path` es escribible (tiene permisos adecuados).
#[instrument(level = Level::TRACE, err)]
pub fn check_writable(path: &Path) -> Result<(), Error> {
    let meta = fs::metadata(path)?;
    // en Unix basta con que el owner tenga permisos de escritura:
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = meta.permissions().mode();
        if mode & 0o200 == 0 {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("No write permission for {}", path.display()),
            )
            .into());
        }
    }
    #[cfg(windows)]
    {
        if meta.permissions().readonly() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("No write permission for {}", path.display()),
            )
            .into());
        }
    }
    Ok(())
}
