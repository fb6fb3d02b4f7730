use serde::{Deserialize, Serialize};

/// A single track in a session queue.
///
/// Tracks are plain values, a session never edits one in place.
/// Changing the current track or the queue always replaces the whole value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// The identifier of the track in the client's catalogue
    pub id: String,
    pub title: String,
    pub artist: String,
    /// Where the client can play the track from
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artwork: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
}

#[cfg(test)]
impl Track {
    /// Creates a track with made up metadata, for tests
    pub fn fake(id: &str) -> Self {
        Self {
            id: id.to_string(),
            title: format!("Title {id}"),
            artist: "Artist".to_string(),
            uri: format!("spotify:track:{id}"),
            artwork: None,
            duration_seconds: Some(180.),
        }
    }
}
