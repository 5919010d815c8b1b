use std::fmt;

use async_trait::async_trait;
use ongaku_core::Dataset;

use crate::error::{AuthProcessError, IdentityError, PersistenceError};

/// Qué implementación hay detrás de un `dyn PersistenceStrategy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Fallback,
    Local,
    Remote,
}

/// Resultado de `sign_in`. `Restart` y `Redirect` significan que el control sale del
/// flujo actual: quien llama no debe tratar el código posterior como "ya autenticado".
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    /// Nada que hacer (ningún backend seleccionado).
    Unchanged,
    /// La identidad quedó establecida; todo el estado en memoria está obsoleto y la
    /// aplicación tiene que volver a arrancar.
    Restart,
    /// Hay que navegar al proveedor de identidad; se vuelve por el callback.
    Redirect { url: String },
}

/// Resultado de `handle_sign_in_process` cuando no falla.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInProcess {
    /// No había ningún sign-in pendiente.
    NotApplicable,
    /// Sign-in completado y método activo registrado; recargar desde `location`.
    Reload { location: String },
}

/// Perfil mínimo del usuario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserData {
    pub display_name: String,
}

impl UserData {
    pub const ANONYMOUS: &'static str = "anonymous";

    pub fn anonymous() -> Self {
        UserData {
            display_name: Self::ANONYMOUS.to_string(),
        }
    }
}

impl fmt::Display for UserData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name)
    }
}

/// Contrato común de todos los backends: ciclo de vida de la identidad más
/// transferencia del dataset completo.
///
/// Las comprobaciones de identidad son síncronas y no hacen E/S. Las operaciones de
/// datos son asíncronas, no se cancelan y se asume como mucho una en vuelo por instancia.
#[async_trait]
pub trait PersistenceStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn is_signed_in(&self) -> bool;

    /// `true` sólo mientras hay un round-trip de sign-in externo en curso.
    fn is_signing_in(&self) -> bool;

    /// Retoma un sign-in pendiente. Si no hay ninguno devuelve `NotApplicable`.
    /// Si falla no toca la selección de método activo.
    async fn handle_sign_in_process(&self) -> Result<SignInProcess, AuthProcessError>;

    fn sign_in(&self) -> Result<SignInOutcome, IdentityError>;

    /// Olvida la identidad. No borra datos persistidos.
    fn sign_out(&self) -> Result<(), IdentityError>;

    /// Carga el dataset completo con las cuatro claves presentes.
    async fn get_data(&self) -> Result<Dataset, PersistenceError>;

    /// Reemplaza el dataset persistido por `data`. Cuánto se aplica si algo falla a
    /// medias depende del backend.
    async fn store_data(&self, data: &Dataset) -> Result<(), PersistenceError>;

    fn user_data(&self) -> UserData;
}
