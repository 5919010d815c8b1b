use async_trait::async_trait;
use ongaku_core::Dataset;
use tracing::debug;

use crate::{
    error::{AuthProcessError, IdentityError, PersistenceError},
    traits::{PersistenceStrategy, SignInOutcome, SignInProcess, StrategyKind, UserData},
};

/// Backend inerte que se usa mientras no hay ningún método seleccionado.
///
/// Nada falla y nada tiene efecto. Quien llama debe seleccionar un backend antes de
/// depender de `get_data`, `store_data` o `user_data`: aquí `get_data` devuelve un
/// dataset vacío, `store_data` descarta lo recibido y `user_data` es el perfil anónimo.
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackStrategy;

#[async_trait]
impl PersistenceStrategy for FallbackStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Fallback
    }

    fn is_signed_in(&self) -> bool {
        false
    }

    fn is_signing_in(&self) -> bool {
        false
    }

    async fn handle_sign_in_process(&self) -> Result<SignInProcess, AuthProcessError> {
        Ok(SignInProcess::NotApplicable)
    }

    fn sign_in(&self) -> Result<SignInOutcome, IdentityError> {
        Ok(SignInOutcome::Unchanged)
    }

    fn sign_out(&self) -> Result<(), IdentityError> {
        Ok(())
    }

    async fn get_data(&self) -> Result<Dataset, PersistenceError> {
        Ok(Dataset::default())
    }

    async fn store_data(&self, data: &Dataset) -> Result<(), PersistenceError> {
        debug!(
            tracks = data.tracks.len(),
            "No hay método seleccionado; se descarta el dataset"
        );
        Ok(())
    }

    fn user_data(&self) -> UserData {
        UserData::anonymous()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ongaku_core::Favourite;

    #[tokio::test]
    async fn everything_is_inert() {
        let fallback = FallbackStrategy;

        assert_eq!(fallback.kind(), StrategyKind::Fallback);
        assert!(!fallback.is_signed_in());
        assert!(!fallback.is_signing_in());
        assert_eq!(fallback.handle_sign_in_process().await.unwrap(), SignInProcess::NotApplicable);
        assert_eq!(fallback.sign_in().unwrap(), SignInOutcome::Unchanged);
        fallback.sign_out().unwrap();
        assert!(!fallback.is_signed_in());

        let data = Dataset {
            favourites: vec![Favourite {
                artist: "a".into(),
                title: "b".into(),
            }],
            ..Default::default()
        };
        fallback.store_data(&data).await.unwrap();
        assert_eq!(fallback.get_data().await.unwrap(), Dataset::default());
    }
}
