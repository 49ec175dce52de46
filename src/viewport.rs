//! Viewport tracking for the reel feed.
//!
//! Three input streams compete for the active reel: raw scroll offsets,
//! visibility-threshold crossings and explicit navigation. The tracker
//! reconciles them with a fixed precedence (navigation, then visibility,
//! then offset arithmetic) and is the only caller that commits an index to
//! the [`FeedStore`] on behalf of the viewport.

use std::time::{Duration, Instant};

use crossterm::event::KeyCode;

use crate::debug;
use crate::feed::FeedStore;

pub const DEFAULT_VISIBILITY_THRESHOLD: f64 = 0.7;
pub const DEFAULT_SETTLE_INTERVAL: Duration = Duration::from_millis(250);
pub const DEFAULT_SCROLL_TIMEOUT: Duration = Duration::from_millis(800);

/// Offsets closer than this are treated as the same position.
const ALIGN_TOLERANCE: f64 = 0.5;

/// Start offset of every reel along the scroll axis.
///
/// Lookups go through cumulative offsets, so reels of different heights are
/// handled the same way as a fixed stride.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    starts: Vec<f64>,
    total: f64,
}

impl Layout {
    pub fn uniform(count: usize, extent: f64) -> Self {
        Self::from_extents(std::iter::repeat(extent).take(count))
    }

    pub fn from_extents<I>(extents: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut starts = Vec::new();
        let mut total = 0.0;
        for extent in extents {
            starts.push(total);
            total += extent.max(0.0);
        }
        Self { starts, total }
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    pub fn total_extent(&self) -> f64 {
        self.total
    }

    pub fn offset_of(&self, index: usize) -> Option<f64> {
        self.starts.get(index).copied()
    }

    pub fn extent_of(&self, index: usize) -> Option<f64> {
        let start = *self.starts.get(index)?;
        let end = self.starts.get(index + 1).copied().unwrap_or(self.total);
        Some(end - start)
    }

    pub fn max_offset(&self, viewport: f64) -> f64 {
        (self.total - viewport).max(0.0)
    }

    /// Reel whose start is nearest to `offset`, clamped to the layout.
    /// For a uniform layout this is `round(offset / extent)`.
    pub fn index_at(&self, offset: f64) -> Option<usize> {
        if self.starts.is_empty() {
            return None;
        }
        let after = self.starts.partition_point(|start| *start <= offset);
        if after == 0 {
            return Some(0);
        }
        if after == self.starts.len() {
            return Some(self.starts.len() - 1);
        }
        let below = self.starts[after - 1];
        let above = self.starts[after];
        if offset - below >= above - offset {
            Some(after)
        } else {
            Some(after - 1)
        }
    }

    /// Share of a reel inside the viewport window `[offset, offset + viewport)`.
    ///
    /// Measured against the smaller of the reel and the viewport, so a reel
    /// taller than the screen still reaches 1.0 when it fills it.
    pub fn visible_fraction(&self, index: usize, offset: f64, viewport: f64) -> f64 {
        let (Some(start), Some(extent)) = (self.offset_of(index), self.extent_of(index)) else {
            return 0.0;
        };
        let basis = extent.min(viewport);
        if basis <= 0.0 {
            return 0.0;
        }
        let top = start.max(offset);
        let bottom = (start + extent).min(offset + viewport);
        ((bottom - top).max(0.0) / basis).min(1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Previous,
    Next,
    First,
    Last,
    Jump(usize),
}

impl Navigation {
    pub fn from_key(code: KeyCode) -> Option<Self> {
        match code {
            KeyCode::Up | KeyCode::Char('k') => Some(Navigation::Previous),
            KeyCode::Down | KeyCode::Char('j') => Some(Navigation::Next),
            KeyCode::Home => Some(Navigation::First),
            KeyCode::End => Some(Navigation::Last),
            _ => None,
        }
    }

    fn target(self, store: &FeedStore) -> Option<usize> {
        let len = store.len();
        let active = store.active_index()?;
        match self {
            Navigation::Previous => active.checked_sub(1),
            Navigation::Next => Some(active + 1).filter(|index| *index < len),
            Navigation::First => Some(0),
            Navigation::Last => Some(len - 1),
            Navigation::Jump(index) => Some(index).filter(|index| *index < len),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Signal {
    ScrollOffset(f64),
    Visible { index: usize, fraction: f64 },
    Navigate(Navigation),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollMode {
    Smooth,
    Instant,
}

/// Request for the viewport to move. Only the newest one is kept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollRequest {
    pub index: usize,
    pub offset: f64,
    pub mode: ScrollMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    pub visibility_threshold: f64,
    pub settle_interval: Duration,
    pub scroll_timeout: Duration,
    pub snap: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: DEFAULT_VISIBILITY_THRESHOLD,
            settle_interval: DEFAULT_SETTLE_INTERVAL,
            scroll_timeout: DEFAULT_SCROLL_TIMEOUT,
            snap: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Source {
    ScrollOffset,
    Visibility,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    index: usize,
    source: Source,
    updated_at: Instant,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    index: usize,
    offset: f64,
    issued_at: Instant,
}

pub struct ViewportTracker {
    cfg: TrackerConfig,
    layout: Layout,
    viewport: f64,
    offset: f64,
    pending: Option<Pending>,
    in_flight: Option<InFlight>,
    scroll_request: Option<ScrollRequest>,
}

impl ViewportTracker {
    pub fn new(cfg: TrackerConfig) -> Self {
        Self {
            cfg,
            layout: Layout::default(),
            viewport: 0.0,
            offset: 0.0,
            pending: None,
            in_flight: None,
            scroll_request: None,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.cfg
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn set_viewport(&mut self, extent: f64) {
        self.viewport = extent.max(0.0);
    }

    pub fn pending_index(&self) -> Option<usize> {
        self.pending.map(|pending| pending.index)
    }

    pub fn scroll_in_flight(&self) -> Option<usize> {
        self.in_flight.map(|flight| flight.index)
    }

    pub fn take_scroll_request(&mut self) -> Option<ScrollRequest> {
        self.scroll_request.take()
    }

    /// The user took over scrolling: the programmatic scroll no longer
    /// holds back offset and visibility candidates.
    pub fn cancel_scroll(&mut self) {
        if let Some(flight) = self.in_flight.take() {
            debug::log(format!(
                "tracker: scroll to {} cancelled by user",
                flight.index
            ));
        }
        self.scroll_request = None;
    }

    /// Adopts a replaced feed. Pending candidates refer to old indices and are
    /// dropped; the viewport is asked to jump to wherever the active reel
    /// ended up.
    pub fn resync(&mut self, store: &FeedStore, layout: Layout) {
        self.layout = layout;
        self.pending = None;
        self.in_flight = None;
        self.scroll_request = store.active_index().map(|index| ScrollRequest {
            index,
            offset: self.target_offset(index),
            mode: ScrollMode::Instant,
        });
    }

    /// Feeds one input signal. Returns true when the store's active index
    /// changed as a direct result.
    pub fn handle(&mut self, signal: Signal, store: &mut FeedStore, now: Instant) -> bool {
        match signal {
            Signal::ScrollOffset(offset) => {
                self.on_scroll_offset(offset, store, now);
                false
            }
            Signal::Visible { index, fraction } => {
                self.on_visible(index, fraction, store, now);
                false
            }
            Signal::Navigate(navigation) => self.navigate(navigation, store, now),
        }
    }

    /// Commits the pending candidate once the settling interval has passed
    /// without another candidate arriving.
    pub fn tick(&mut self, store: &mut FeedStore, now: Instant) -> bool {
        self.expire_in_flight(store, now);

        let Some(pending) = self.pending else {
            return false;
        };
        if now.saturating_duration_since(pending.updated_at) < self.cfg.settle_interval {
            return false;
        }
        self.pending = None;

        let Some(index) = store.clamp_index(pending.index) else {
            return false;
        };
        let changed = match store.set_active(index) {
            Ok(changed) => changed,
            Err(err) => {
                debug::log(format!("tracker: settle commit rejected: {err}"));
                return false;
            }
        };
        debug::log(format!(
            "tracker: settled on {index} from {:?} (changed={changed})",
            pending.source
        ));

        if self.cfg.snap {
            let target = self.target_offset(index);
            if (target - self.offset).abs() > ALIGN_TOLERANCE {
                self.request_scroll(index, target, ScrollMode::Smooth, now);
            }
        }
        changed
    }

    fn on_scroll_offset(&mut self, offset: f64, store: &FeedStore, now: Instant) {
        self.offset = offset;

        if let Some(flight) = self.in_flight {
            if (offset - flight.offset).abs() <= ALIGN_TOLERANCE {
                self.in_flight = None;
                return;
            }
            if !self.flight_expired(flight, now) {
                return;
            }
            self.in_flight = None;
        }

        let Some(index) = self
            .layout
            .index_at(offset)
            .and_then(|index| store.clamp_index(index))
        else {
            return;
        };
        self.propose(index, Source::ScrollOffset, now);
    }

    fn on_visible(&mut self, index: usize, fraction: f64, store: &FeedStore, now: Instant) {
        if fraction < self.cfg.visibility_threshold || index >= store.len() {
            return;
        }

        if let Some(flight) = self.in_flight {
            if !self.flight_expired(flight, now) {
                if flight.index != index {
                    debug::log(format!(
                        "tracker: ignoring visibility of {index} while scrolling to {}",
                        flight.index
                    ));
                }
                return;
            }
            self.in_flight = None;
        }

        self.propose(index, Source::Visibility, now);
    }

    fn navigate(&mut self, navigation: Navigation, store: &mut FeedStore, now: Instant) -> bool {
        let Some(target) = navigation.target(store) else {
            return false;
        };

        self.pending = None;
        let changed = match store.set_active(target) {
            Ok(changed) => changed,
            Err(err) => {
                debug::log(format!("tracker: navigation rejected: {err}"));
                return false;
            }
        };
        let offset = self.target_offset(target);
        self.request_scroll(target, offset, ScrollMode::Smooth, now);
        debug::log(format!(
            "tracker: {navigation:?} -> {target} (offset {offset:.1})"
        ));
        changed
    }

    fn propose(&mut self, index: usize, source: Source, now: Instant) {
        match self.pending.as_mut() {
            Some(pending) if pending.source > source => {
                pending.updated_at = now;
            }
            _ => {
                self.pending = Some(Pending {
                    index,
                    source,
                    updated_at: now,
                });
            }
        }
    }

    fn request_scroll(&mut self, index: usize, offset: f64, mode: ScrollMode, now: Instant) {
        self.scroll_request = Some(ScrollRequest {
            index,
            offset,
            mode,
        });
        self.in_flight = Some(InFlight {
            index,
            offset,
            issued_at: now,
        });
    }

    fn target_offset(&self, index: usize) -> f64 {
        let start = self.layout.offset_of(index).unwrap_or(0.0);
        if self.viewport > 0.0 {
            start.min(self.layout.max_offset(self.viewport))
        } else {
            start
        }
    }

    fn flight_expired(&self, flight: InFlight, now: Instant) -> bool {
        now.saturating_duration_since(flight.issued_at) >= self.cfg.scroll_timeout
    }

    /// A scroll that never reached its target leaves the viewport resting
    /// somewhere else; that offset becomes a candidate of its own.
    fn expire_in_flight(&mut self, store: &FeedStore, now: Instant) {
        let Some(flight) = self.in_flight else {
            return;
        };
        if !self.flight_expired(flight, now) {
            return;
        }
        self.in_flight = None;

        let Some(index) = self
            .layout
            .index_at(self.offset)
            .and_then(|index| store.clamp_index(index))
        else {
            return;
        };
        debug::log(format!(
            "tracker: scroll to {} timed out at offset {:.1}",
            flight.index, self.offset
        ));
        self.propose(index, Source::ScrollOffset, now);
    }
}

/// Edge-triggered visibility crossings, in the manner of an intersection
/// observer: a reel reports once when its visible share rises to the
/// threshold and again only after dropping below it.
#[derive(Debug, Clone)]
pub struct VisibilityObserver {
    threshold: f64,
    above: Vec<bool>,
}

impl VisibilityObserver {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            above: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        self.above.clear();
    }

    pub fn observe(&mut self, layout: &Layout, offset: f64, viewport: f64) -> Vec<Signal> {
        if self.above.len() != layout.len() {
            self.above = vec![false; layout.len()];
        }

        let mut crossings = Vec::new();
        for (index, was_above) in self.above.iter_mut().enumerate() {
            let fraction = layout.visible_fraction(index, offset, viewport);
            let is_above = fraction >= self.threshold;
            if is_above && !*was_above {
                crossings.push(Signal::Visible { index, fraction });
            }
            *was_above = is_above;
        }
        crossings
    }
}
