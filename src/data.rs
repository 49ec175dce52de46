use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::reel::{GenerationRequest, GenerationResponse, ReelItem};
use crate::remote;

/// Source of reels for the feed, newest first.
pub trait ReelService: Send + Sync {
    fn list_reels(&self, athlete_id: Option<&str>) -> Result<Vec<ReelItem>>;
    fn generate_reel(&self, request: &GenerationRequest) -> Result<GenerationResponse>;
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Missing required fields: athleteName and sport")]
    MissingFields,
}

pub struct RemoteReelService {
    client: Arc<remote::Client>,
}

impl RemoteReelService {
    pub fn new(client: Arc<remote::Client>) -> Self {
        Self { client }
    }
}

impl ReelService for RemoteReelService {
    fn list_reels(&self, athlete_id: Option<&str>) -> Result<Vec<ReelItem>> {
        self.client
            .list_reels(athlete_id)
            .context("fetch reels")
    }

    fn generate_reel(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        if !request.is_complete() {
            return Err(ServiceError::MissingFields.into());
        }
        self.client.generate(request).context("generate reel")
    }
}

const SAMPLE_BASE: &str = "https://storage.googleapis.com/gtv-videos-bucket/sample";

const SPORT_VIDEOS: [(&str, [&str; 2]); 5] = [
    ("Basketball", ["TearsOfSteel.mp4", "Sintel.mp4"]),
    ("Tennis", ["WeAreGoingOnBullrun.mp4", "VolkswagenGTIReview.mp4"]),
    ("Soccer", ["SubaruOutbackOnStreetAndDirt.mp4", "TearsOfSteel.mp4"]),
    ("Track & Field", ["Sintel.mp4", "WeAreGoingOnBullrun.mp4"]),
    (
        "Gymnastics",
        ["VolkswagenGTIReview.mp4", "SubaruOutbackOnStreetAndDirt.mp4"],
    ),
];

const DEFAULT_VIDEOS: [&str; 2] = ["TearsOfSteel.mp4", "Sintel.mp4"];

/// Characters `encodeURIComponent` leaves untouched.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// In-memory reel catalogue. Generation does not render anything: it picks
/// a sample clip for the sport and prepends a new reel, so the feed behaves
/// as it would once a real pipeline answered.
pub struct CatalogueReelService {
    reels: Mutex<Vec<ReelItem>>,
}

impl Default for CatalogueReelService {
    fn default() -> Self {
        Self::new(seed_reels())
    }
}

impl CatalogueReelService {
    pub fn new(reels: Vec<ReelItem>) -> Self {
        Self {
            reels: Mutex::new(reels),
        }
    }

    pub fn len(&self) -> usize {
        self.reels.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reels.lock().is_empty()
    }
}

impl ReelService for CatalogueReelService {
    fn list_reels(&self, athlete_id: Option<&str>) -> Result<Vec<ReelItem>> {
        let reels = self.reels.lock();
        Ok(match athlete_id {
            Some(id) => reels
                .iter()
                .filter(|reel| reel.athlete_id == id)
                .cloned()
                .collect(),
            None => reels.clone(),
        })
    }

    fn generate_reel(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        if !request.is_complete() {
            return Err(ServiceError::MissingFields.into());
        }
        let reel = compose_reel(request.athlete_name.trim(), request.sport.trim());
        let id = reel.id.clone();
        self.reels.lock().insert(0, reel);
        Ok(GenerationResponse {
            success: true,
            video_id: Some(id),
            message: Some("Video generation initiated".into()),
            error: None,
        })
    }
}

fn compose_reel(athlete_name: &str, sport: &str) -> ReelItem {
    let mut rng = rand::thread_rng();
    let id = new_reel_id(&mut rng);
    let pool = SPORT_VIDEOS
        .iter()
        .find(|(name, _)| *name == sport)
        .map(|(_, videos)| videos)
        .unwrap_or(&DEFAULT_VIDEOS);
    let clip = pool.choose(&mut rng).copied().unwrap_or(DEFAULT_VIDEOS[0]);

    ReelItem {
        title: format!("The Story of {athlete_name} - {sport} Legend"),
        athlete_id: id.clone(),
        athlete_name: athlete_name.to_string(),
        sport: sport.to_string(),
        thumbnail_url: format!(
            "https://source.unsplash.com/featured/?{},{}",
            utf8_percent_encode(sport, URI_COMPONENT),
            utf8_percent_encode(athlete_name, URI_COMPONENT)
        ),
        video_url: format!("{SAMPLE_BASE}/{clip}"),
        created_at: Utc::now(),
        duration: rng.gen_range(25..40),
        likes: rng.gen_range(0..10_000),
        views: rng.gen_range(0..200_000),
        id,
    }
}

fn new_reel_id<R: Rng>(rng: &mut R) -> String {
    let suffix: String = rng
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    format!("reel-{}", suffix.to_ascii_lowercase())
}

fn seed_reels() -> Vec<ReelItem> {
    let now = Utc::now();
    let seeds = [
        (
            "1",
            "The Legend of Michael Jordan",
            "Michael Jordan",
            "Basketball",
            "basketball,michael+jordan",
            "TearsOfSteel.mp4",
            5,
            32,
            15_420,
            189_345,
        ),
        (
            "2",
            "Serena Williams: Tennis Queen",
            "Serena Williams",
            "Tennis",
            "tennis,serena+williams",
            "Sintel.mp4",
            3,
            28,
            12_834,
            167_890,
        ),
        (
            "3",
            "Messi: The GOAT Journey",
            "Lionel Messi",
            "Soccer",
            "soccer,lionel+messi",
            "WeAreGoingOnBullrun.mp4",
            2,
            35,
            18_765,
            212_567,
        ),
        (
            "4",
            "Lightning Bolt: The Fastest Man",
            "Usain Bolt",
            "Track & Field",
            "track,usain+bolt",
            "SubaruOutbackOnStreetAndDirt.mp4",
            1,
            30,
            10_983,
            143_562,
        ),
        (
            "5",
            "Simone Biles: Gymnastics Revolution",
            "Simone Biles",
            "Gymnastics",
            "gymnastics,simone+biles",
            "VolkswagenGTIReview.mp4",
            0,
            26,
            8_765,
            98_432,
        ),
    ];

    seeds
        .into_iter()
        .map(
            |(id, title, athlete, sport, query, clip, days_ago, duration, likes, views)| ReelItem {
                id: id.into(),
                title: title.into(),
                athlete_id: id.into(),
                athlete_name: athlete.into(),
                sport: sport.into(),
                thumbnail_url: format!("https://source.unsplash.com/featured/?{query}"),
                video_url: format!("{SAMPLE_BASE}/{clip}"),
                created_at: now - ChronoDuration::days(days_ago),
                duration,
                likes,
                views,
            },
        )
        .collect()
}
