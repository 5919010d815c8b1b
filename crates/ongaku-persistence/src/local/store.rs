use std::{
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use rusqlite::Connection;
use tracing::{info, trace};

use ongaku_paths::fs_utils;

use crate::error::PersistenceError;

refinery::embed_migrations!("migrations");

/// Conexión SQLite con las cuatro colecciones del dataset.
#[derive(Debug)]
pub struct LocalStore {
    conn: Arc<Mutex<Connection>>,
}

impl LocalStore {
    /// Bloqueante: abre (o crea) el fichero y aplica las migraciones pendientes.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs_utils::ensure_dir(parent)?;
        }

        info!("Abriendo el store local en {}", path.display());
        let mut conn = Connection::open(&path)?;
        Self::initialize_connection(&mut conn)?;

        Ok(LocalStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn initialize_connection(conn: &mut Connection) -> Result<(), PersistenceError> {
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        trace!("journal_mode = {mode}");
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        // Espera hasta 5 segundos si la base de datos está ocupada antes de fallar.
        conn.busy_timeout(Duration::from_secs(5))?;

        let report = migrations::runner().run(conn)?;
        for migration in report.applied_migrations() {
            trace!("Migración aplicada: {:?}", migration);
        }

        Ok(())
    }

    /// Ejecuta `f` con la conexión en el pool bloqueante de tokio.
    pub async fn run<F, T>(&self, f: F) -> Result<T, PersistenceError>
    where
        F: FnOnce(&mut Connection) -> Result<T, PersistenceError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut conn)
        })
        .await?
    }
}
