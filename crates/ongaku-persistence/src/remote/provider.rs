use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Perfil cargado por el proveedor tras un sign-in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub username: Option<String>,
}

/// Proveedor externo de identidad + almacenamiento de ficheros por usuario.
///
/// El sign-in es por redirección: `redirect_to_sign_in` devuelve a dónde navegar y
/// la vuelta llega como un sign-in pendiente que se resuelve con
/// `handle_pending_sign_in`.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn is_user_signed_in(&self) -> bool;

    fn is_sign_in_pending(&self) -> bool;

    async fn handle_pending_sign_in(&self) -> Result<UserProfile, ProviderError>;

    /// URL del flujo de sign-in.
    fn redirect_to_sign_in(&self) -> Result<String, ProviderError>;

    fn sign_user_out(&self) -> Result<(), ProviderError>;

    /// Contenido completo del fichero, o `None` si no existe.
    async fn get_file(&self, name: &str) -> Result<Option<String>, ProviderError>;

    /// Sobrescribe el fichero completo.
    async fn put_file(&self, name: &str, contents: String) -> Result<(), ProviderError>;

    fn load_user_data(&self) -> Option<UserProfile>;
}
