//! Persistencia del dataset de Ongaku detrás de backends intercambiables.
//!
//! [`StrategySelector`] recuerda qué método eligió el usuario y devuelve el
//! [`PersistenceStrategy`] correspondiente: [`LocalStrategy`] (SQLite),
//! [`RemoteStrategy`] (un documento en el almacenamiento del proveedor de identidad)
//! o [`FallbackStrategy`] mientras no hay nada seleccionado.

pub mod config;
pub mod error;
pub mod fallback;
pub mod local;
pub mod preferences;
pub mod remote;
pub mod selector;
pub mod traits;

pub use config::{LocalStrategyConfig, PersistenceConfig, RemoteStrategyConfig};
pub use error::{AuthProcessError, IdentityError, PersistenceError, PreferencesError, ProviderError};
pub use fallback::FallbackStrategy;
pub use local::{Collection, LocalStrategy, StoreReport};
pub use remote::{GaiaHubProvider, IdentityProvider, RemoteStrategy, UserProfile};
pub use selector::{AuthMethod, StrategySelector};
pub use traits::{PersistenceStrategy, SignInOutcome, SignInProcess, StrategyKind, UserData};
