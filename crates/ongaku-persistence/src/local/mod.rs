mod queries;
mod store;

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use futures::future::try_join_all;
use ongaku_core::{Dataset, Favourite, Settings, Source, Track};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{Level, debug, error, info, instrument, trace};

use ongaku_paths::store_file_in;

pub use store::LocalStore;

use crate::{
    config::LocalStrategyConfig,
    error::{AuthProcessError, IdentityError, PersistenceError},
    preferences::PreferencesStore,
    traits::{PersistenceStrategy, SignInOutcome, SignInProcess, StrategyKind, UserData},
};

/// Las cuatro tablas del store local.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Favourites,
    Settings,
    Sources,
    Tracks,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Favourites,
        Collection::Settings,
        Collection::Sources,
        Collection::Tracks,
    ];

    pub fn table(self) -> &'static str {
        match self {
            Collection::Favourites => "favourites",
            Collection::Settings => "settings",
            Collection::Sources => "sources",
            Collection::Tracks => "tracks",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Representación de `settings` dentro del store: una fila `{obj: <settings>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsRow {
    pub obj: Settings,
}

impl SettingsRow {
    /// Un objeto se envuelve como una sola fila; la ausencia queda en cero filas.
    pub fn wrap(settings: Option<&Settings>) -> Vec<SettingsRow> {
        settings
            .map(|obj| SettingsRow { obj: obj.clone() })
            .into_iter()
            .collect()
    }
}

/// Filas listas para insertar en una colección.
#[derive(Debug, Clone)]
pub(crate) enum CollectionRows {
    Favourites(Vec<Favourite>),
    Settings(Vec<SettingsRow>),
    Sources(Vec<Source>),
    Tracks(Vec<Track>),
}

impl CollectionRows {
    fn from_dataset(data: &Dataset) -> [CollectionRows; 4] {
        [
            CollectionRows::Favourites(data.favourites.clone()),
            CollectionRows::Settings(SettingsRow::wrap(data.settings.as_ref())),
            CollectionRows::Sources(data.sources.clone()),
            CollectionRows::Tracks(data.tracks.clone()),
        ]
    }

    fn collection(&self) -> Collection {
        match self {
            CollectionRows::Favourites(_) => Collection::Favourites,
            CollectionRows::Settings(_) => Collection::Settings,
            CollectionRows::Sources(_) => Collection::Sources,
            CollectionRows::Tracks(_) => Collection::Tracks,
        }
    }

    fn len(&self) -> usize {
        match self {
            CollectionRows::Favourites(v) => v.len(),
            CollectionRows::Settings(v) => v.len(),
            CollectionRows::Sources(v) => v.len(),
            CollectionRows::Tracks(v) => v.len(),
        }
    }
}

/// Qué colecciones se escribieron y cuáles fallaron en un `replace_all`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreReport {
    pub written: Vec<(Collection, usize)>,
    pub failed: Vec<Collection>,
}

impl StoreReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Backend sobre un store SQLite local, con sesión "anónima" sin credenciales.
pub struct LocalStrategy {
    config: LocalStrategyConfig,
    preferences: Arc<PreferencesStore>,
    store: Mutex<Option<Arc<LocalStore>>>,
}

impl LocalStrategy {
    pub fn new(config: LocalStrategyConfig, preferences: Arc<PreferencesStore>) -> Self {
        LocalStrategy {
            config,
            preferences,
            store: Mutex::new(None),
        }
    }

    /// Abre la conexión la primera vez y la reutiliza después.
    async fn store(&self) -> Result<Arc<LocalStore>, PersistenceError> {
        let mut guard = self.store.lock().await;
        if let Some(store) = guard.as_ref() {
            return Ok(Arc::clone(store));
        }

        let path = store_file_in(&self.config.store_dir, &self.config.store_name)?;
        let store = Arc::new(tokio::task::spawn_blocking(move || LocalStore::open(path)).await??);
        *guard = Some(Arc::clone(&store));
        Ok(store)
    }

    /// Suelta la conexión. La siguiente operación de datos la vuelve a abrir.
    pub async fn close(&self) {
        if self.store.lock().await.take().is_some() {
            debug!("Store local cerrado");
        }
    }

    /// Reemplaza el contenido de las cuatro colecciones.
    ///
    /// Primero vacía todas (en paralelo); si eso falla, falla la llamada. Después
    /// escribe cada colección en su propia transacción, una tras otra: si una falla
    /// se registra, se deshace sólo esa y se sigue con las demás. Es un reemplazo
    /// best-effort, no todo-o-nada; la colección fallida queda vacía.
    #[instrument(level = Level::DEBUG, skip_all, err)]
    pub async fn replace_all(&self, data: &Dataset) -> Result<StoreReport, PersistenceError> {
        let store = self.store().await?;

        try_join_all(Collection::ALL.map(|collection| {
            store.run(move |conn| Ok(queries::clear(conn, collection)?))
        }))
        .await?;

        let mut report = StoreReport::default();
        for rows in CollectionRows::from_dataset(data) {
            let collection = rows.collection();
            let expected = rows.len();

            let result = store
                .run(move |conn| {
                    let tx = conn.transaction()?;
                    let written = queries::insert_rows(&tx, &rows)?;
                    tx.commit()?;
                    Ok(written)
                })
                .await;

            match result {
                Ok(written) => {
                    debug!(%collection, written, "Colección escrita");
                    report.written.push((collection, written));
                }
                Err(e) => {
                    error!(%collection, rows = expected, "Failed to write collection: {}", e);
                    report.failed.push(collection);
                }
            }
        }

        Ok(report)
    }

    async fn read_tracks(&self, store: &LocalStore) -> Result<Vec<Track>, PersistenceError> {
        let total = store
            .run(|conn| Ok(queries::count(conn, Collection::Tracks)?))
            .await?;
        let batch_size = self.config.batch_size.max(1);

        let mut tracks = Vec::with_capacity(total);
        let mut after = 0_i64;
        while tracks.len() < total {
            let limit = batch_size.min(total - tracks.len());
            let (batch, last) = store
                .run(move |conn| Ok(queries::tracks_after(conn, after, limit)?))
                .await?;

            if batch.is_empty() {
                break;
            }
            trace!(batch = batch.len(), loaded = tracks.len(), total, "Lote de pistas");
            tracks.extend(batch);
            after = last;
        }

        Ok(tracks)
    }
}

#[async_trait]
impl PersistenceStrategy for LocalStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Local
    }

    fn is_signed_in(&self) -> bool {
        self.preferences.signed_in_anonymously()
    }

    fn is_signing_in(&self) -> bool {
        false
    }

    async fn handle_sign_in_process(&self) -> Result<SignInProcess, AuthProcessError> {
        Ok(SignInProcess::NotApplicable)
    }

    fn sign_in(&self) -> Result<SignInOutcome, IdentityError> {
        self.preferences.set_signed_in_anonymously(true)?;
        info!("Sesión local anónima iniciada; hace falta reiniciar la aplicación");
        Ok(SignInOutcome::Restart)
    }

    fn sign_out(&self) -> Result<(), IdentityError> {
        self.preferences.set_signed_in_anonymously(false)?;
        Ok(())
    }

    #[instrument(level = Level::DEBUG, skip_all, err)]
    async fn get_data(&self) -> Result<Dataset, PersistenceError> {
        let store = self.store().await?;

        let (favourites, settings, sources) = store
            .run(|conn| {
                Ok((
                    queries::all_favourites(conn)?,
                    queries::settings(conn)?,
                    queries::all_sources(conn)?,
                ))
            })
            .await?;
        let tracks = self.read_tracks(&store).await?;

        debug!(
            favourites = favourites.len(),
            sources = sources.len(),
            tracks = tracks.len(),
            "Dataset local cargado"
        );

        Ok(Dataset {
            favourites,
            settings,
            sources,
            tracks,
        })
    }

    async fn store_data(&self, data: &Dataset) -> Result<(), PersistenceError> {
        let report = self.replace_all(data).await?;
        if !report.is_complete() {
            debug!(failed = ?report.failed, "Reemplazo parcial del dataset local");
        }
        Ok(())
    }

    fn user_data(&self) -> UserData {
        UserData::anonymous()
    }
}
