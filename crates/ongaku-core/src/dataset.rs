use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub type SourceId = String;
pub type TrackId = String;

/// Ajustes de usuario: un objeto JSON libre. Nunca va envuelto en el modelo público.
pub type Settings = Map<String, Value>;

/// El documento lógico que intercambian la aplicación y cualquier backend.
///
/// Las cuatro claves están siempre presentes tras deserializar: una clave ausente o
/// un `null` se convierten en secuencia vacía (o `None` para `settings`). Es la regla
/// que comparten todos los backends al cargar, así que quien llama nunca tiene que
/// distinguir "sin clave" de "vacío".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default, deserialize_with = "null_as_default")]
    pub favourites: Vec<Favourite>,
    #[serde(default)]
    pub settings: Option<Settings>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sources: Vec<Source>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tracks: Vec<Track>,
}

/// Una canción marcada como favorita. No hay garantía de unicidad.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Favourite {
    pub artist: String,
    pub title: String,
}

/// Origen de pistas (carpeta local, servicio remoto...). `data` es propio de cada servicio.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub enabled: bool,
    pub service: String,
}

/// Pista de audio conocida por la biblioteca.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub path: String,
    /// Referencia débil a `Source::id`; puede apuntar a un source que ya no existe.
    #[serde(rename = "sourceId")]
    pub source_id: SourceId,
    #[serde(default)]
    pub tags: Value,
}

impl Dataset {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn is_empty(&self) -> bool {
        self.favourites.is_empty()
            && self.settings.is_none()
            && self.sources.is_empty()
            && self.tracks.is_empty()
    }

    /// Pistas cuyo `source_id` no corresponde a ningún source del dataset.
    pub fn orphan_tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks
            .iter()
            .filter(|t| !self.sources.iter().any(|s| s.id == t.source_id))
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
