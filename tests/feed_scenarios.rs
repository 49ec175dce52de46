use std::time::{Duration, Instant};

use chrono::Utc;
use reel_feed::feed::FeedStore;
use reel_feed::playback::{Playback, PlaybackController};
use reel_feed::reel::ReelItem;
use reel_feed::viewport::{
    Layout, Navigation, ScrollMode, Signal, TrackerConfig, ViewportTracker, VisibilityObserver,
};

const ROWS: f64 = 30.0;

fn reel(id: &str) -> ReelItem {
    ReelItem {
        id: id.to_string(),
        title: format!("Reel {id}"),
        athlete_id: id.to_string(),
        athlete_name: format!("Athlete {id}"),
        sport: "Tennis".to_string(),
        thumbnail_url: String::new(),
        video_url: format!("https://video.test/{id}.mp4"),
        created_at: Utc::now(),
        duration: 30,
        likes: 0,
        views: 0,
    }
}

fn reels(ids: &[&str]) -> Vec<ReelItem> {
    ids.iter().map(|id| reel(id)).collect()
}

#[derive(Default)]
struct Log {
    events: Vec<String>,
    playing: usize,
    max_playing: usize,
}

impl PlaybackController for Log {
    fn become_active(&mut self, item: &ReelItem) {
        self.events.push(format!("+{}", item.id));
        self.playing += 1;
        self.max_playing = self.max_playing.max(self.playing);
    }

    fn become_inactive(&mut self, item: &ReelItem) {
        self.events.push(format!("-{}", item.id));
        self.playing -= 1;
    }
}

/// Store, tracker, observer and playback wired the way the event loop
/// wires them, with the viewport offset under test control.
struct Feed {
    store: FeedStore,
    tracker: ViewportTracker,
    observer: VisibilityObserver,
    playback: Playback<Log>,
    offset: f64,
}

impl Feed {
    fn new(ids: &[&str]) -> Self {
        let cfg = TrackerConfig::default();
        let mut feed = Self {
            store: FeedStore::new(),
            observer: VisibilityObserver::new(cfg.visibility_threshold),
            tracker: ViewportTracker::new(cfg),
            playback: Playback::new(Log::default(), true),
            offset: 0.0,
        };
        feed.tracker.set_viewport(ROWS);
        feed.replace(reels(ids), Instant::now());
        feed
    }

    fn replace(&mut self, items: Vec<ReelItem>, now: Instant) {
        self.store.set_items(items);
        self.tracker
            .resync(&self.store, Layout::uniform(self.store.len(), ROWS));
        self.observer.reset();
        self.follow_requests(now);
        self.playback.sync(&self.store);
    }

    fn scroll_to(&mut self, offset: f64, now: Instant) {
        self.offset = offset;
        self.tracker
            .handle(Signal::ScrollOffset(offset), &mut self.store, now);
        let crossings = self
            .observer
            .observe(self.tracker.layout(), offset, ROWS);
        for signal in crossings {
            self.tracker.handle(signal, &mut self.store, now);
        }
    }

    fn navigate(&mut self, navigation: Navigation, now: Instant) {
        self.tracker
            .handle(Signal::Navigate(navigation), &mut self.store, now);
        self.playback.sync(&self.store);
    }

    fn follow_requests(&mut self, now: Instant) {
        if let Some(request) = self.tracker.take_scroll_request() {
            self.scroll_to(request.offset, now);
        }
    }

    fn tick(&mut self, now: Instant) {
        self.tracker.tick(&mut self.store, now);
        self.follow_requests(now);
        self.playback.sync(&self.store);
    }

    fn active(&self) -> Option<usize> {
        self.store.active_index()
    }
}

fn later(start: Instant, millis: u64) -> Instant {
    start + Duration::from_millis(millis)
}

#[test]
fn first_reel_plays_on_load() {
    let feed = Feed::new(&["a", "b", "c"]);
    assert_eq!(feed.active(), Some(0));
    assert_eq!(feed.playback.playing_id(), Some("a"));
    assert_eq!(feed.playback.controller().events, ["+a"]);
}

#[test]
fn empty_feed_has_nothing_active() {
    let mut feed = Feed::new(&[]);
    let start = Instant::now();
    feed.navigate(Navigation::Next, start);
    feed.scroll_to(100.0, start);
    feed.tick(later(start, 400));

    assert_eq!(feed.active(), None);
    assert!(feed.playback.controller().events.is_empty());
}

#[test]
fn manual_scroll_settles_on_one_reel() {
    let mut feed = Feed::new(&["a", "b", "c", "d"]);
    let start = Instant::now();

    for (step, offset) in [8.0, 20.0, 33.0, 47.0, 58.0].into_iter().enumerate() {
        let now = later(start, 30 * step as u64);
        feed.scroll_to(offset, now);
        feed.tick(now);
        assert_eq!(feed.active(), Some(0));
    }

    feed.tick(later(start, 120 + 260));
    assert_eq!(feed.active(), Some(2));
    assert_eq!(feed.playback.controller().events, ["+a", "-a", "+c"]);
    assert_eq!(feed.offset, 2.0 * ROWS);
}

#[test]
fn navigation_is_not_undone_by_its_own_scroll() {
    let mut feed = Feed::new(&["a", "b", "c", "d"]);
    let start = Instant::now();

    feed.navigate(Navigation::Next, start);
    assert_eq!(feed.active(), Some(1));
    let request = feed.tracker.take_scroll_request().unwrap();
    assert_eq!(request.mode, ScrollMode::Smooth);

    // Intermediate animation frames between reel 0 and reel 1.
    for (step, offset) in [10.0, 17.0, 24.0, 28.0].into_iter().enumerate() {
        let now = later(start, 16 * (step as u64 + 1));
        feed.scroll_to(offset, now);
        feed.tick(now);
    }
    feed.scroll_to(request.offset, later(start, 90));
    feed.tick(later(start, 600));

    assert_eq!(feed.active(), Some(1));
    assert_eq!(feed.playback.controller().events, ["+a", "-a", "+b"]);
}

#[test]
fn arrow_keys_clamp_at_both_ends() {
    let mut feed = Feed::new(&["a", "b"]);
    let start = Instant::now();

    feed.navigate(Navigation::Previous, start);
    assert_eq!(feed.active(), Some(0));
    feed.navigate(Navigation::Next, start);
    feed.navigate(Navigation::Next, start);
    feed.navigate(Navigation::Next, start);
    assert_eq!(feed.active(), Some(1));
    assert_eq!(feed.playback.controller().max_playing, 1);
}

#[test]
fn prepending_a_reel_keeps_the_watched_one() {
    let mut feed = Feed::new(&["a", "b", "c"]);
    let start = Instant::now();
    feed.navigate(Navigation::Next, start);
    feed.follow_requests(start);

    feed.replace(reels(&["new", "a", "b", "c"]), later(start, 10));
    feed.tick(later(start, 400));

    assert_eq!(feed.active(), Some(2));
    assert_eq!(feed.playback.playing_id(), Some("b"));
    assert_eq!(feed.offset, 2.0 * ROWS);
}

#[test]
fn removing_the_active_reel_falls_back_to_first() {
    let mut feed = Feed::new(&["a", "b", "c"]);
    let start = Instant::now();
    feed.navigate(Navigation::Last, start);

    feed.replace(reels(&["a", "b"]), later(start, 10));

    assert_eq!(feed.active(), Some(0));
    assert_eq!(feed.playback.playing_id(), Some("a"));
    assert_eq!(feed.playback.controller().max_playing, 1);
}
