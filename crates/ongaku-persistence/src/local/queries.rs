use ongaku_core::{Favourite, Settings, Source, Track};
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params, types::Type};
use serde::de::DeserializeOwned;

use super::{Collection, CollectionRows};
use crate::error::PersistenceError;

pub fn count(conn: &Connection, collection: Collection) -> rusqlite::Result<usize> {
    let sql = format!("SELECT COUNT(*) FROM {}", collection.table());
    conn.query_row(&sql, [], |row| row.get::<_, i64>(0))
        .map(|n| n as usize)
}

pub fn clear(conn: &Connection, collection: Collection) -> rusqlite::Result<usize> {
    conn.execute(&format!("DELETE FROM {}", collection.table()), [])
}

pub fn all_favourites(conn: &Connection) -> rusqlite::Result<Vec<Favourite>> {
    let mut stmt = conn.prepare("SELECT artist, title FROM favourites ORDER BY seq")?;
    let rows = stmt.query_map([], |row| {
        Ok(Favourite {
            artist: row.get(0)?,
            title: row.get(1)?,
        })
    })?;
    rows.collect()
}

/// Desenvuelve la fila `{obj: ...}`; `None` si la tabla está vacía.
pub fn settings(conn: &Connection) -> rusqlite::Result<Option<Settings>> {
    conn.query_row("SELECT obj FROM settings ORDER BY seq LIMIT 1", [], |row| {
        json_column::<Settings>(row, 0)
    })
    .optional()
}

pub fn all_sources(conn: &Connection) -> rusqlite::Result<Vec<Source>> {
    let mut stmt = conn.prepare("SELECT id, data, enabled, service FROM sources ORDER BY seq")?;
    let rows = stmt.query_map([], |row| {
        Ok(Source {
            id: row.get(0)?,
            data: json_column(row, 1)?,
            enabled: row.get(2)?,
            service: row.get(3)?,
        })
    })?;
    rows.collect()
}

/// Un lote de pistas con `seq > after`, en orden de inserción.
/// Devuelve también el último `seq` leído para pedir el siguiente lote.
pub fn tracks_after(conn: &Connection, after: i64, limit: usize) -> rusqlite::Result<(Vec<Track>, i64)> {
    let mut stmt = conn.prepare_cached(
        "SELECT seq, id, path, source_id, tags
           FROM tracks
          WHERE seq > ?1
          ORDER BY seq
          LIMIT ?2",
    )?;

    let mut last = after;
    let rows = stmt.query_map(params![after, limit as i64], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            Track {
                id: row.get(1)?,
                path: row.get(2)?,
                source_id: row.get(3)?,
                tags: json_column(row, 4)?,
            },
        ))
    })?;

    let mut tracks = Vec::with_capacity(limit);
    for row in rows {
        let (seq, track) = row?;
        last = seq;
        tracks.push(track);
    }
    Ok((tracks, last))
}

/// Bulk insert de una colección dentro de `tx`; devuelve las filas que quedan en la tabla.
///
/// En `sources` y `tracks` un `id` repetido reemplaza la fila anterior, igual que un
/// put por clave: gana el último valor y ocupa la posición de la última aparición.
pub fn insert_rows(tx: &Transaction, rows: &CollectionRows) -> Result<usize, PersistenceError> {
    match rows {
        CollectionRows::Favourites(items) => {
            let mut stmt = tx.prepare("INSERT INTO favourites (artist, title) VALUES (?1, ?2)")?;
            for fav in items {
                stmt.execute(params![fav.artist, fav.title])?;
            }
        }
        CollectionRows::Settings(items) => {
            let mut stmt = tx.prepare("INSERT INTO settings (obj) VALUES (?1)")?;
            for row in items {
                stmt.execute([serde_json::to_string(&row.obj)?])?;
            }
        }
        CollectionRows::Sources(items) => {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO sources (id, data, enabled, service) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for source in items {
                stmt.execute(params![
                    source.id,
                    serde_json::to_string(&source.data)?,
                    source.enabled,
                    source.service,
                ])?;
            }
        }
        CollectionRows::Tracks(items) => {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO tracks (id, path, source_id, tags) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for track in items {
                stmt.execute(params![
                    track.id,
                    track.path,
                    track.source_id,
                    serde_json::to_string(&track.tags)?,
                ])?;
            }
        }
    }
    Ok(count(tx, rows.collection())?)
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
