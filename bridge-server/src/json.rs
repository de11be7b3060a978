//! Playlist-to-JSON serialization.
//!
//! The schema is fixed. Fields the backend reports as absent are omitted
//! entirely, never emitted as `null` or empty strings; list-valued fields
//! are always present, possibly empty. `trackCount` carries the
//! backend-reported total while `tracks` silently skips entries that have
//! not loaded — the counts disagree on purpose during a progressive load.

use serde_json::{Map, Value};

use bridge_backend::{PlaylistSnapshot, TrackSnapshot};

/// Build the reply document for a loaded playlist.
pub fn playlist_document(snapshot: &PlaylistSnapshot) -> Value {
    let mut object = Map::new();

    object.insert("creator".to_string(), Value::from(snapshot.creator.clone()));
    object.insert("uri".to_string(), Value::from(snapshot.uri.clone()));
    object.insert("title".to_string(), Value::from(snapshot.title.clone()));
    object.insert(
        "collaborative".to_string(),
        Value::from(snapshot.collaborative),
    );

    if let Some(description) = &snapshot.description {
        object.insert("description".to_string(), Value::from(description.clone()));
    }

    object.insert(
        "subscriberCount".to_string(),
        Value::from(snapshot.subscriber_count),
    );
    object.insert("trackCount".to_string(), Value::from(snapshot.track_count));

    let tracks: Vec<Value> = snapshot
        .tracks
        .iter()
        .filter(|track| track.loaded)
        .map(track_document)
        .collect();
    object.insert("tracks".to_string(), Value::Array(tracks));

    Value::Object(object)
}

fn track_document(track: &TrackSnapshot) -> Value {
    let mut object = Map::new();

    if let Some(title) = &track.title {
        object.insert("title".to_string(), Value::from(title.clone()));
    }
    if let Some(album) = &track.album {
        object.insert("album".to_string(), Value::from(album.clone()));
    }
    object.insert("trackuri".to_string(), Value::from(track.uri.clone()));
    object.insert(
        "artists".to_string(),
        Value::Array(track.artists.iter().cloned().map(Value::from).collect()),
    );
    if track.duration_ms != 0 {
        object.insert("duration".to_string(), Value::from(track.duration_ms));
    }
    if track.popularity != 0 {
        object.insert("popularity".to_string(), Value::from(track.popularity));
    }

    Value::Object(object)
}
