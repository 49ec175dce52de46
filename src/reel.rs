use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single biography reel as delivered by the listing provider.
///
/// The feed core only looks at `id` (identity across list replacements) and
/// `video_url` (what a playback controller starts); everything else is
/// payload for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReelItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub athlete_id: String,
    pub athlete_name: String,
    pub sport: String,
    #[serde(default)]
    pub thumbnail_url: String,
    pub video_url: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub views: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub athlete_name: String,
    pub sport: String,
}

impl GenerationRequest {
    pub fn new(athlete_name: impl Into<String>, sport: impl Into<String>) -> Self {
        Self {
            athlete_name: athlete_name.into(),
            sport: sport.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.athlete_name.trim().is_empty() && !self.sport.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Compact count used on the reel overlay: `1.2K`, `3.4M`.
pub fn format_count(value: u64) -> String {
    if value >= 1_000_000 {
        format!("{:.1}M", value as f64 / 1_000_000.0)
    } else if value >= 1_000 {
        format!("{:.1}K", value as f64 / 1_000.0)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_camel_case_listing_record() {
        let raw = r#"{
            "id": "3",
            "title": "Messi: The GOAT Journey",
            "athleteId": "3",
            "athleteName": "Lionel Messi",
            "sport": "Soccer",
            "thumbnailUrl": "https://img.test/messi.jpg",
            "videoUrl": "https://video.test/messi.mp4",
            "createdAt": "2024-03-01T12:00:00.000Z",
            "duration": 35,
            "likes": 18765,
            "views": 212567
        }"#;
        let reel: ReelItem = serde_json::from_str(raw).unwrap();
        assert_eq!(reel.athlete_name, "Lionel Messi");
        assert_eq!(reel.video_url, "https://video.test/messi.mp4");
        assert_eq!(reel.duration, 35);
    }

    #[test]
    fn formats_counts_like_the_overlay() {
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(15_420), "15.4K");
        assert_eq!(format_count(2_500_000), "2.5M");
    }

    #[test]
    fn generation_request_requires_both_fields() {
        assert!(GenerationRequest::new("Serena Williams", "Tennis").is_complete());
        assert!(!GenerationRequest::new("  ", "Tennis").is_complete());
        assert!(!GenerationRequest::new("Serena Williams", "").is_complete());
    }
}
