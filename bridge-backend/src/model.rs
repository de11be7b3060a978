//! Queryable playlist and track fields, captured as plain data.
//!
//! A snapshot is taken from a loaded playlist and handed to the serializer;
//! it is never written back to the backend. Optional fields stay `Option` so
//! the serializer can distinguish "absent" from "empty" (the JSON schema
//! omits absent fields entirely).

use serde::{Deserialize, Serialize};

/// The fields of one playlist, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistSnapshot {
    /// Owner display name.
    pub creator: String,
    /// Canonical playlist address.
    pub uri: String,
    pub title: String,
    pub collaborative: bool,
    /// Absent when the owner never set one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub subscriber_count: u64,
    /// Backend-reported total, counting tracks that have not loaded yet.
    pub track_count: usize,
    /// One entry per track slot, loaded or not.
    #[serde(default)]
    pub tracks: Vec<TrackSnapshot>,
}

/// The fields of one track slot within a playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSnapshot {
    /// Whether the backend has delivered enough data to query this track.
    #[serde(default = "default_loaded")]
    pub loaded: bool,
    /// Canonical track address.
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default)]
    pub artists: Vec<String>,
    /// Milliseconds; zero means the backend has not reported one.
    #[serde(default)]
    pub duration_ms: u64,
    /// 0–100; zero means the backend has not reported one.
    #[serde(default)]
    pub popularity: u8,
}

fn default_loaded() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_defaults_fill_optional_fields() {
        let track: TrackSnapshot = serde_json::from_str(
            r#"{"uri": "spotify:track:58PipbkYEkKFzOowRPHF3m", "title": "Song"}"#,
        )
        .unwrap();

        assert!(track.loaded);
        assert_eq!(track.title.as_deref(), Some("Song"));
        assert_eq!(track.album, None);
        assert!(track.artists.is_empty());
        assert_eq!(track.duration_ms, 0);
        assert_eq!(track.popularity, 0);
    }

    #[test]
    fn snapshot_omits_absent_description_on_serialize() {
        let snapshot = PlaylistSnapshot {
            creator: "liesen".to_string(),
            uri: "spotify:playlist:37i9dQZF1DXcBWIGoYBM5M".to_string(),
            title: "Test".to_string(),
            collaborative: false,
            description: None,
            subscriber_count: 0,
            track_count: 0,
            tracks: vec![],
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json.get("description").is_none());
    }
}
