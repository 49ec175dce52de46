use std::collections::HashMap;
use std::io::{self, Stdout};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseEvent,
    MouseEventKind,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Padding, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::config::FeedConfig;
use crate::data::ReelService;
use crate::debug;
use crate::feed::FeedStore;
use crate::playback::{Playback, PlaybackController};
use crate::reel::{format_count, GenerationRequest, GenerationResponse, ReelItem};
use crate::viewport::{self, Navigation, ScrollMode, Signal, ViewportTracker, VisibilityObserver};

const COLOR_BG: Color = Color::Rgb(30, 30, 46);
const COLOR_PANEL_BG: Color = Color::Rgb(24, 24, 36);
const COLOR_PANEL_FOCUSED_BG: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_FOCUSED: Color = Color::Rgb(137, 180, 250);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
const COLOR_SUCCESS: Color = Color::Rgb(166, 227, 161);
const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);
const COLOR_SAVED: Color = Color::Rgb(249, 226, 175);

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const TICK_RATE: Duration = Duration::from_millis(120);
const FRAME_RATE: Duration = Duration::from_millis(16);
const NUMERIC_JUMP_TIMEOUT: Duration = Duration::from_millis(900);
const SCROLL_EASE: f64 = 0.35;

const MOCK_COMMENTS: [(&str, &str); 3] = [
    (
        "SportsFan82",
        "What an incredible athlete! Their achievements are legendary.",
    ),
    (
        "AthleticsLover",
        "I remember watching them break that record live. Unforgettable moment!",
    ),
    (
        "HistoryBuff",
        "The context about their early career is fascinating. Great video!",
    ),
];

pub struct Options {
    pub status_message: String,
    pub service: Arc<dyn ReelService>,
    pub athlete_id: Option<String>,
    pub feed: FeedConfig,
    pub controller: Box<dyn PlaybackController>,
    pub start_muted: bool,
}

/// Presentation state of one reel. Lives beside the feed core and never
/// influences which reel is active.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ReelState {
    liked: bool,
    likes: u64,
    saved: bool,
    comments_open: bool,
}

impl ReelState {
    fn for_reel(reel: &ReelItem) -> Self {
        Self {
            likes: reel.likes,
            ..Self::default()
        }
    }

    fn toggle_like(&mut self) {
        self.liked = !self.liked;
        self.likes = if self.liked {
            self.likes.saturating_add(1)
        } else {
            self.likes.saturating_sub(1)
        };
    }
}

/// Exponential ease-out toward a requested offset. User scrolling moves the
/// offset directly and cancels any running animation.
#[derive(Debug, Clone, Default)]
struct Scroller {
    offset: f64,
    target: Option<f64>,
}

impl Scroller {
    fn offset(&self) -> f64 {
        self.offset
    }

    fn is_animating(&self) -> bool {
        self.target.is_some()
    }

    fn jump(&mut self, offset: f64) {
        self.offset = offset;
        self.target = None;
    }

    fn animate_to(&mut self, offset: f64) {
        if (offset - self.offset).abs() < 0.5 {
            self.jump(offset);
        } else {
            self.target = Some(offset);
        }
    }

    fn nudge(&mut self, delta: f64, max: f64) {
        self.target = None;
        self.offset = (self.offset + delta).clamp(0.0, max.max(0.0));
    }

    fn tick(&mut self) -> bool {
        let Some(target) = self.target else {
            return false;
        };
        let remaining = target - self.offset;
        if remaining.abs() < 0.5 {
            self.offset = target;
            self.target = None;
        } else {
            self.offset += remaining * SCROLL_EASE;
        }
        true
    }
}

struct Spinner {
    index: usize,
    last_tick: Instant,
}

impl Spinner {
    fn new() -> Self {
        Self {
            index: 0,
            last_tick: Instant::now(),
        }
    }

    fn frame(&self) -> &'static str {
        SPINNER_FRAMES[self.index % SPINNER_FRAMES.len()]
    }

    fn advance(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last_tick) >= TICK_RATE {
            self.index = (self.index + 1) % SPINNER_FRAMES.len();
            self.last_tick = now;
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.index = 0;
        self.last_tick = Instant::now();
    }
}

struct NumericJump {
    value: usize,
    last_input: Instant,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum FormField {
    #[default]
    AthleteName,
    Sport,
    Submit,
}

impl FormField {
    fn next(self) -> Self {
        match self {
            FormField::AthleteName => FormField::Sport,
            FormField::Sport => FormField::Submit,
            FormField::Submit => FormField::AthleteName,
        }
    }

    fn previous(self) -> Self {
        match self {
            FormField::AthleteName => FormField::Submit,
            FormField::Sport => FormField::AthleteName,
            FormField::Submit => FormField::Sport,
        }
    }

    fn title(self) -> &'static str {
        match self {
            FormField::AthleteName => "Athlete",
            FormField::Sport => "Sport",
            FormField::Submit => "Generate",
        }
    }
}

#[derive(Default)]
struct GenerateForm {
    active: FormField,
    athlete_name: String,
    sport: String,
    status: Option<String>,
}

impl GenerateForm {
    fn active_value_mut(&mut self) -> Option<&mut String> {
        match self.active {
            FormField::AthleteName => Some(&mut self.athlete_name),
            FormField::Sport => Some(&mut self.sport),
            FormField::Submit => None,
        }
    }

    fn insert_char(&mut self, ch: char) {
        if let Some(value) = self.active_value_mut() {
            value.push(ch);
        }
        self.status = None;
    }

    fn backspace(&mut self) {
        if let Some(value) = self.active_value_mut() {
            value.pop();
        }
        self.status = None;
    }

    fn request(&self) -> GenerationRequest {
        GenerationRequest::new(self.athlete_name.trim(), self.sport.trim())
    }

    fn display_value(&self, field: FormField) -> &str {
        let raw = match field {
            FormField::AthleteName => self.athlete_name.as_str(),
            FormField::Sport => self.sport.as_str(),
            FormField::Submit => return "",
        };
        if raw.is_empty() {
            "(not set)"
        } else {
            raw
        }
    }
}

enum AsyncResponse {
    Reels {
        request_id: u64,
        result: Result<Vec<ReelItem>>,
    },
    Generated {
        athlete_name: String,
        result: Result<GenerationResponse>,
    },
}

pub struct Model {
    store: FeedStore,
    tracker: ViewportTracker,
    observer: VisibilityObserver,
    scroller: Scroller,
    playback: Playback<Box<dyn PlaybackController>>,
    reel_states: HashMap<String, ReelState>,
    service: Arc<dyn ReelService>,
    athlete_id: Option<String>,
    scroll_step: f64,
    viewport_rows: u16,
    last_offset: Option<f64>,
    status_message: String,
    spinner: Spinner,
    form: Option<GenerateForm>,
    numeric_jump: Option<NumericJump>,
    pending_reels: Option<u64>,
    pending_generation: bool,
    next_request_id: u64,
    response_tx: Sender<AsyncResponse>,
    response_rx: Receiver<AsyncResponse>,
    needs_redraw: bool,
}

impl Model {
    pub fn new(opts: Options) -> Self {
        let tracker_cfg = opts.feed.tracker();
        let (response_tx, response_rx) = unbounded();
        let mut model = Self {
            store: FeedStore::new(),
            observer: VisibilityObserver::new(tracker_cfg.visibility_threshold),
            tracker: ViewportTracker::new(tracker_cfg),
            scroller: Scroller::default(),
            playback: Playback::new(opts.controller, opts.start_muted),
            reel_states: HashMap::new(),
            service: opts.service,
            athlete_id: opts.athlete_id,
            scroll_step: f64::from(opts.feed.scroll_step.max(1)),
            viewport_rows: 0,
            last_offset: None,
            status_message: opts.status_message,
            spinner: Spinner::new(),
            form: None,
            numeric_jump: None,
            pending_reels: None,
            pending_generation: false,
            next_request_id: 1,
            response_tx,
            response_rx,
            needs_redraw: true,
        };
        model.reload_reels();
        model
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        stdout.execute(EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);
        self.playback.stop();

        disable_raw_mode()?;
        terminal.backend_mut().execute(DisableMouseCapture)?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();

        loop {
            if self.poll_async() {
                self.mark_dirty();
            }

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            let timeout = if self.scroller.is_animating() || self.tracker.pending_index().is_some()
            {
                FRAME_RATE
            } else {
                TICK_RATE
                    .checked_sub(last_tick.elapsed())
                    .unwrap_or(FRAME_RATE)
            };

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        match self.handle_key(key.code) {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(err) => {
                                self.status_message = format!("Error: {err}");
                                self.mark_dirty();
                            }
                        }
                    }
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    Event::Resize(_, _) => self.mark_dirty(),
                    _ => {}
                }
            }

            self.advance(Instant::now());

            if last_tick.elapsed() >= TICK_RATE {
                last_tick = Instant::now();
                if self.is_loading() {
                    if self.spinner.advance() {
                        self.mark_dirty();
                    }
                } else {
                    self.spinner.reset();
                }
                self.expire_numeric_jump();
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn is_loading(&self) -> bool {
        self.pending_reels.is_some() || self.pending_generation
    }

    /// One step of the feed pipeline: animation, offset and visibility
    /// signals, settling, then scroll requests and playback.
    fn advance(&mut self, now: Instant) {
        if self.scroller.tick() {
            self.mark_dirty();
        }
        self.feed_offset(now);
        if self.tracker.tick(&mut self.store, now) {
            self.mark_dirty();
        }
        self.apply_scroll_request(now);
        self.sync_playback();
    }

    fn feed_offset(&mut self, now: Instant) {
        let offset = self.scroller.offset();
        if self.last_offset == Some(offset) || self.viewport_rows == 0 {
            return;
        }
        self.last_offset = Some(offset);

        self.tracker
            .handle(Signal::ScrollOffset(offset), &mut self.store, now);
        let crossings = self.observer.observe(
            self.tracker.layout(),
            offset,
            f64::from(self.viewport_rows),
        );
        for signal in crossings {
            self.tracker.handle(signal, &mut self.store, now);
        }
    }

    fn apply_scroll_request(&mut self, now: Instant) {
        let Some(request) = self.tracker.take_scroll_request() else {
            return;
        };
        match request.mode {
            ScrollMode::Smooth => self.scroller.animate_to(request.offset),
            ScrollMode::Instant => self.scroller.jump(request.offset),
        }
        self.feed_offset(now);
        self.mark_dirty();
    }

    fn sync_playback(&mut self) {
        if let Some(transition) = self.playback.sync(&self.store) {
            debug::log(format!("ui: playback {transition:?}"));
            self.mark_dirty();
        }
    }

    fn navigate(&mut self, navigation: Navigation) {
        let now = Instant::now();
        if self
            .tracker
            .handle(Signal::Navigate(navigation), &mut self.store, now)
        {
            self.mark_dirty();
        }
        self.apply_scroll_request(now);
        self.sync_playback();
    }

    /// Called whenever the reel list or the viewport height changes.
    fn relayout(&mut self) {
        let layout = viewport::Layout::uniform(self.store.len(), f64::from(self.viewport_rows));
        self.tracker.set_viewport(f64::from(self.viewport_rows));
        self.tracker.resync(&self.store, layout);
        self.observer.reset();
        self.last_offset = None;
        self.apply_scroll_request(Instant::now());
        self.sync_playback();
    }

    fn replace_reels(&mut self, reels: Vec<ReelItem>) {
        for reel in &reels {
            self.reel_states
                .entry(reel.id.clone())
                .or_insert_with(|| ReelState::for_reel(reel));
        }
        self.store.set_items(reels);
        self.relayout();
    }

    fn reload_reels(&mut self) {
        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        self.pending_reels = Some(request_id);

        let service = Arc::clone(&self.service);
        let athlete_id = self.athlete_id.clone();
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let result = service.list_reels(athlete_id.as_deref());
            let _ = tx.send(AsyncResponse::Reels { request_id, result });
        });
        self.status_message = "Loading reels…".to_string();
    }

    fn submit_generation(&mut self) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        let request = form.request();
        if !request.is_complete() {
            form.status = Some("Please enter both athlete name and sport.".to_string());
            return;
        }
        if self.pending_generation {
            form.status = Some("A reel is already being generated.".to_string());
            return;
        }

        self.pending_generation = true;
        self.form = None;
        self.status_message = format!("Generating a reel for {}…", request.athlete_name);

        let service = Arc::clone(&self.service);
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let result = service.generate_reel(&request);
            let _ = tx.send(AsyncResponse::Generated {
                athlete_name: request.athlete_name,
                result,
            });
        });
    }

    fn poll_async(&mut self) -> bool {
        let mut changed = false;
        while let Ok(message) = self.response_rx.try_recv() {
            self.handle_async_response(message);
            changed = true;
        }
        changed
    }

    fn handle_async_response(&mut self, message: AsyncResponse) {
        match message {
            AsyncResponse::Reels { request_id, result } => {
                if self.pending_reels != Some(request_id) {
                    return;
                }
                self.pending_reels = None;
                match result {
                    Ok(reels) => {
                        let count = reels.len();
                        self.replace_reels(reels);
                        self.status_message = if count == 0 {
                            "No reels available. Press n to generate your first reel.".to_string()
                        } else {
                            format!("{count} reels loaded. j/k or the mouse wheel to browse.")
                        };
                    }
                    Err(err) => {
                        self.status_message = format!("Failed to load reels: {err:#}");
                    }
                }
            }
            AsyncResponse::Generated {
                athlete_name,
                result,
            } => {
                self.pending_generation = false;
                match result {
                    Ok(response) => {
                        debug::log(format!("ui: generated {:?}", response.video_id));
                        self.reload_reels();
                        self.status_message =
                            format!("Reel for {athlete_name} is ready. Press Home to watch it.");
                    }
                    Err(err) => {
                        self.status_message = format!("Failed to generate reel: {err:#}");
                    }
                }
            }
        }
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        if self.form.is_some() {
            self.handle_form_key(code);
            self.mark_dirty();
            return Ok(false);
        }

        if !matches!(code, KeyCode::Char(ch) if ch.is_ascii_digit()) {
            self.numeric_jump = None;
        }

        if let Some(navigation) = Navigation::from_key(code) {
            self.navigate(navigation);
            return Ok(false);
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
            KeyCode::PageDown | KeyCode::Char(' ') => self.navigate(Navigation::Next),
            KeyCode::PageUp => self.navigate(Navigation::Previous),
            KeyCode::Char(ch) if ch.is_ascii_digit() => self.numeric_input(ch),
            KeyCode::Char('r') | KeyCode::Char('R') => self.reload_reels(),
            KeyCode::Char('n') | KeyCode::Char('N') => {
                self.form = Some(GenerateForm::default());
                self.status_message = "Generate a reel: enter an athlete and a sport.".to_string();
            }
            KeyCode::Char('l') => self.with_active_state(|state| state.toggle_like()),
            KeyCode::Char('s') => self.with_active_state(|state| state.saved = !state.saved),
            KeyCode::Char('c') => {
                self.with_active_state(|state| state.comments_open = !state.comments_open)
            }
            KeyCode::Char('m') => {
                let muted = self.playback.toggle_mute();
                self.status_message = if muted { "Muted." } else { "Sound on." }.to_string();
            }
            KeyCode::Char('y') => self.share_active()?,
            KeyCode::Char('o') => self.open_active()?,
            _ => {}
        }
        self.mark_dirty();
        Ok(false)
    }

    fn handle_form_key(&mut self, code: KeyCode) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        match code {
            KeyCode::Esc => {
                self.form = None;
                self.status_message = "Generation cancelled.".to_string();
            }
            KeyCode::Tab | KeyCode::Down => form.active = form.active.next(),
            KeyCode::BackTab | KeyCode::Up => form.active = form.active.previous(),
            KeyCode::Enter => match form.active {
                FormField::AthleteName => form.active = FormField::Sport,
                FormField::Sport | FormField::Submit => self.submit_generation(),
            },
            KeyCode::Backspace => form.backspace(),
            KeyCode::Char(ch) => form.insert_char(ch),
            _ => {}
        }
    }

    fn handle_mouse(&mut self, event: MouseEvent) {
        if self.form.is_some() || self.viewport_rows == 0 {
            return;
        }
        self.numeric_jump = None;

        let delta = match event.kind {
            MouseEventKind::ScrollDown => self.scroll_step,
            MouseEventKind::ScrollUp => -self.scroll_step,
            _ => return,
        };
        let max = self
            .tracker
            .layout()
            .max_offset(f64::from(self.viewport_rows));
        self.tracker.cancel_scroll();
        self.scroller.nudge(delta, max);
        self.feed_offset(Instant::now());
        self.mark_dirty();
    }

    fn numeric_input(&mut self, ch: char) {
        let Some(digit) = ch.to_digit(10) else {
            return;
        };
        let now = Instant::now();
        let value = match &self.numeric_jump {
            Some(jump) => jump
                .value
                .saturating_mul(10)
                .saturating_add(digit as usize),
            None => digit as usize,
        };
        self.numeric_jump = Some(NumericJump {
            value,
            last_input: now,
        });
        if value > 0 {
            self.navigate(Navigation::Jump(value - 1));
        }
    }

    fn expire_numeric_jump(&mut self) {
        let expired = matches!(&self.numeric_jump, Some(jump) if jump.last_input.elapsed() >= NUMERIC_JUMP_TIMEOUT);
        if expired {
            self.numeric_jump = None;
        }
    }

    fn with_active_state<F>(&mut self, apply: F)
    where
        F: FnOnce(&mut ReelState),
    {
        let Some(reel) = self.store.active_item() else {
            return;
        };
        let state = self
            .reel_states
            .entry(reel.id.clone())
            .or_insert_with(|| ReelState::for_reel(reel));
        apply(state);
    }

    fn share_active(&mut self) -> Result<()> {
        let Some(reel) = self.store.active_item() else {
            return Ok(());
        };
        let url = reel.video_url.clone();
        let title = reel.title.clone();
        let mut clipboard = arboard::Clipboard::new().context("open clipboard")?;
        clipboard
            .set_text(url)
            .context("copy reel link to clipboard")?;
        self.status_message = format!("Copied link for \"{title}\" to the clipboard.");
        Ok(())
    }

    fn open_active(&mut self) -> Result<()> {
        let Some(reel) = self.store.active_item() else {
            return Ok(());
        };
        webbrowser::open(&reel.video_url)
            .with_context(|| format!("open {} in browser", reel.video_url))?;
        self.status_message = format!("Opened {} in your browser.", reel.title);
        Ok(())
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), full);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(full);

        let status_text = if self.is_loading() {
            format!("{} {}", self.spinner.frame(), self.status_message)
        } else {
            self.status_message.clone()
        };
        let status_line = Paragraph::new(status_text).style(
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .bg(COLOR_PANEL_FOCUSED_BG)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_widget(status_line, layout[0]);

        let feed_area = layout[1];
        if feed_area.height != self.viewport_rows {
            self.viewport_rows = feed_area.height;
            self.relayout();
        }
        self.draw_feed(frame, feed_area);

        let footer = Paragraph::new(self.footer_text())
            .style(
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .bg(COLOR_PANEL_BG)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(footer, layout[2]);

        if self.form.is_some() {
            self.draw_form(frame, feed_area);
        }
    }

    fn draw_feed(&self, frame: &mut Frame<'_>, area: Rect) {
        if self.store.is_empty() {
            let message = if self.pending_reels.is_some() {
                "Loading reels…"
            } else {
                "No Reels Available\n\nGenerate your first sports celebrity history reel to get started! (press n)"
            };
            let empty = Paragraph::new(message)
                .style(Style::default().fg(COLOR_TEXT_PRIMARY).bg(COLOR_PANEL_BG))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true });
            frame.render_widget(empty, centered_rect(80, 30, area));
            return;
        }

        let rows = i64::from(area.height);
        let offset = self.scroller.offset().round() as i64;
        let total = self.store.len();
        for (index, reel) in self.store.items().iter().enumerate() {
            let top = index as i64 * rows - offset;
            let bottom = top + rows;
            if bottom <= 0 || top >= rows {
                continue;
            }
            let visible_top = top.max(0);
            let visible_bottom = bottom.min(rows);
            let clip = (visible_top - top) as u16;
            let slot = Rect {
                x: area.x,
                y: area.y + visible_top as u16,
                width: area.width,
                height: (visible_bottom - visible_top) as u16,
            };

            let active = self.store.active_index() == Some(index);
            let card = CardView {
                reel,
                state: self.reel_states.get(&reel.id),
                position: index + 1,
                total,
                active,
                playing: self.playback.is_playing(&reel.id),
                muted: self.playback.muted(),
            };
            let lines = card.lines(area.width, area.height);
            let background = if active {
                COLOR_PANEL_FOCUSED_BG
            } else {
                COLOR_PANEL_BG
            };
            let widget = Paragraph::new(Text::from(lines))
                .style(Style::default().fg(COLOR_TEXT_PRIMARY).bg(background))
                .scroll((clip, 0));
            frame.render_widget(widget, slot);
        }
    }

    fn draw_form(&self, frame: &mut Frame<'_>, area: Rect) {
        let Some(form) = &self.form else {
            return;
        };
        let popup = centered_rect(60, 50, area);
        frame.render_widget(Clear, popup);

        let mut lines = vec![
            Line::from(Span::styled(
                "Create a sports celebrity history reel",
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
        ];
        for field in [FormField::AthleteName, FormField::Sport, FormField::Submit] {
            let selected = form.active == field;
            let marker = if selected { "▶ " } else { "  " };
            let style = if selected {
                Style::default()
                    .fg(COLOR_TEXT_PRIMARY)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(COLOR_TEXT_SECONDARY)
            };
            let text = match field {
                FormField::Submit => format!("{marker}[ {} ]", field.title()),
                _ => format!("{marker}{}: {}", field.title(), form.display_value(field)),
            };
            lines.push(Line::from(Span::styled(text, style)));
        }
        if let Some(status) = &form.status {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                status.clone(),
                Style::default().fg(COLOR_ERROR),
            )));
        }

        let block = Block::default()
            .title(Span::styled(
                "Generate Reel",
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(COLOR_BORDER_FOCUSED))
            .style(Style::default().bg(COLOR_PANEL_BG))
            .padding(Padding::uniform(1));
        let widget = Paragraph::new(Text::from(lines))
            .block(block)
            .wrap(Wrap { trim: false });
        frame.render_widget(widget, popup);
    }

    fn footer_text(&self) -> String {
        if self.form.is_some() {
            return "Tab/Shift-Tab change field · Enter advance/generate · Esc cancel".to_string();
        }

        let mut parts: Vec<String> = Vec::new();
        if self.store.is_empty() {
            parts.push("n generate a reel".to_string());
        } else {
            parts.push("j/k or wheel browse · digits jump".to_string());
            parts.push("l like · s save · c comments · y share · o open".to_string());
            parts.push("m mute".to_string());
            parts.push("n generate".to_string());
        }
        if self.pending_reels.is_some() {
            parts.push("Refreshing feed…".to_string());
        }
        parts.push("r refresh".to_string());
        parts.push("q quit".to_string());
        parts.join(" · ")
    }
}

struct CardView<'a> {
    reel: &'a ReelItem,
    state: Option<&'a ReelState>,
    position: usize,
    total: usize,
    active: bool,
    playing: bool,
    muted: bool,
}

impl CardView<'_> {
    /// Lines for one full-height card; the caller clips it to the viewport.
    fn lines(&self, width: u16, height: u16) -> Vec<Line<'static>> {
        let width = usize::from(width.saturating_sub(4)).max(1);
        let fallback = ReelState::for_reel(self.reel);
        let state = self.state.unwrap_or(&fallback);
        let secondary = Style::default().fg(COLOR_TEXT_SECONDARY);

        let (status, status_style) = if self.playing {
            ("▶ Playing", Style::default().fg(COLOR_SUCCESS))
        } else {
            ("⏸ Paused", secondary)
        };
        let sound = if self.muted { "🔇 muted" } else { "🔊 sound" };

        let mut body = vec![
            Line::from(vec![
                Span::styled(status, status_style.add_modifier(Modifier::BOLD)),
                Span::styled(format!("  {sound}"), secondary),
                Span::styled(format!("  {}/{}", self.position, self.total), secondary),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                truncate(&self.reel.title, width),
                Style::default()
                    .fg(COLOR_TEXT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                truncate(
                    &format!("{} · {}", self.reel.athlete_name, self.reel.sport),
                    width,
                ),
                Style::default().fg(COLOR_ACCENT),
            )),
            Line::from(Span::styled(
                truncate(
                    &format!(
                        "👁 {} views · {}s · {}",
                        format_count(self.reel.views),
                        self.reel.duration,
                        self.reel.created_at.format("%Y-%m-%d")
                    ),
                    width,
                ),
                secondary,
            )),
            Line::from(""),
            Line::from(vec![
                Span::styled(
                    format!(
                        "{} {}",
                        if state.liked { "♥" } else { "♡" },
                        format_count(state.likes)
                    ),
                    if state.liked {
                        Style::default().fg(COLOR_ERROR)
                    } else {
                        secondary
                    },
                ),
                Span::styled(
                    if state.saved { "   ★ saved" } else { "   ☆ save" },
                    if state.saved {
                        Style::default().fg(COLOR_SAVED)
                    } else {
                        secondary
                    },
                ),
                Span::styled("   💬 comments   ↗ share", secondary),
            ]),
            Line::from(Span::styled(truncate(&self.reel.video_url, width), secondary)),
        ];

        if state.comments_open {
            body.push(Line::from(""));
            body.push(Line::from(Span::styled(
                "Comments",
                Style::default()
                    .fg(COLOR_TEXT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            )));
            for (author, text) in MOCK_COMMENTS {
                body.push(Line::from(vec![
                    Span::styled(format!("{author}: "), Style::default().fg(COLOR_ACCENT)),
                    Span::styled(
                        truncate(text, width.saturating_sub(author.width() + 2)),
                        secondary,
                    ),
                ]));
            }
        }

        let height = usize::from(height).max(1);
        // Last row is the separator between cards.
        let room = height.saturating_sub(1);
        let mut lines = Vec::with_capacity(height);
        lines.extend(std::iter::repeat(Line::from("")).take(room.saturating_sub(body.len()) / 2));
        let indent = if self.active { "▌ " } else { "  " };
        for line in body.into_iter().take(room) {
            let mut spans = vec![Span::styled(indent, Style::default().fg(COLOR_ACCENT))];
            spans.extend(line.spans);
            lines.push(Line::from(spans));
        }
        while lines.len() < room {
            lines.push(Line::from(""));
        }
        lines.push(Line::from(Span::styled(
            "─".repeat(width + 4),
            Style::default().fg(COLOR_PANEL_FOCUSED_BG),
        )));
        lines
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let percent_x = percent_x.min(100);
    let percent_y = percent_y.min(100);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage(100 - percent_x - (100 - percent_x) / 2),
        ])
        .split(area);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage(100 - percent_y - (100 - percent_y) / 2),
        ])
        .split(horizontal[1]);
    vertical[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CatalogueReelService;
    use crate::playback::Silent;
    use crossterm::event::KeyModifiers;

    fn model_with(reels: Vec<ReelItem>) -> Model {
        let mut model = Model::new(Options {
            status_message: String::new(),
            service: Arc::new(CatalogueReelService::new(Vec::new())),
            athlete_id: None,
            feed: FeedConfig::default(),
            controller: Box::new(Silent),
            start_muted: true,
        });
        model.pending_reels = None;
        model.viewport_rows = 20;
        model.replace_reels(reels);
        model
    }

    #[test]
    fn scroller_eases_onto_target() {
        let mut scroller = Scroller::default();
        scroller.animate_to(40.0);
        let mut steps = 0;
        while scroller.tick() {
            steps += 1;
            assert!(steps < 100);
        }
        assert_eq!(scroller.offset(), 40.0);
        assert!(!scroller.is_animating());
    }

    #[test]
    fn scroller_nudge_clamps_and_cancels() {
        let mut scroller = Scroller::default();
        scroller.animate_to(40.0);
        scroller.nudge(-5.0, 80.0);
        assert_eq!(scroller.offset(), 0.0);
        assert!(!scroller.is_animating());
        scroller.nudge(500.0, 80.0);
        assert_eq!(scroller.offset(), 80.0);
    }

    #[test]
    fn like_toggle_adjusts_count() {
        let reel = crate::feed::tests::reel("a");
        let mut state = ReelState::for_reel(&ReelItem { likes: 10, ..reel });
        state.toggle_like();
        assert_eq!((state.liked, state.likes), (true, 11));
        state.toggle_like();
        assert_eq!((state.liked, state.likes), (false, 10));
    }

    #[test]
    fn truncate_respects_display_width() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a long reel title", 7), "a long…");
        assert!(truncate("🦀🦀🦀🦀", 5).width() <= 5);
    }

    #[test]
    fn card_fills_its_height() {
        let reel = crate::feed::tests::reel("a");
        let card = CardView {
            reel: &reel,
            state: None,
            position: 1,
            total: 3,
            active: true,
            playing: true,
            muted: true,
        };
        assert_eq!(card.lines(60, 24).len(), 24);
        assert_eq!(card.lines(60, 4).len(), 4);
    }

    #[test]
    fn keyboard_navigation_moves_playback() {
        let mut model = model_with(crate::feed::tests::reels(&["a", "b", "c"]));
        assert_eq!(model.playback.playing_id(), Some("a"));

        model.handle_key(KeyCode::Down).unwrap();
        assert_eq!(model.store.active_index(), Some(1));
        assert_eq!(model.playback.playing_id(), Some("b"));
        assert!(model.scroller.is_animating());

        model.handle_key(KeyCode::Up).unwrap();
        model.handle_key(KeyCode::Up).unwrap();
        assert_eq!(model.store.active_index(), Some(0));
    }

    #[test]
    fn digits_jump_to_reel() {
        let mut model = model_with(crate::feed::tests::reels(&["a", "b", "c"]));
        model.handle_key(KeyCode::Char('3')).unwrap();
        assert_eq!(model.store.active_index(), Some(2));

        let status = model.status_message.clone();
        model.handle_key(KeyCode::Char('9')).unwrap();
        assert_eq!(model.store.active_index(), Some(2));
        assert_eq!(model.status_message, status);
    }

    #[test]
    fn wheel_during_navigation_scroll_takes_over() {
        let mut model = model_with(crate::feed::tests::reels(&["a", "b", "c", "d"]));
        model.handle_key(KeyCode::Down).unwrap();
        assert_eq!(model.playback.playing_id(), Some("b"));

        for _ in 0..20 {
            model.handle_mouse(MouseEvent {
                kind: MouseEventKind::ScrollDown,
                column: 0,
                row: 0,
                modifiers: KeyModifiers::NONE,
            });
        }
        assert!(!model.scroller.is_animating());
        assert_eq!(model.scroller.offset(), 60.0);

        model.advance(Instant::now() + Duration::from_secs(4));

        assert_eq!(model.store.active_index(), Some(3));
        assert_eq!(model.playback.playing_id(), Some("d"));
    }

    #[test]
    fn prepended_reel_keeps_playback_and_position() {
        let mut model = model_with(crate::feed::tests::reels(&["a", "b", "c"]));
        model.handle_key(KeyCode::Down).unwrap();

        model.replace_reels(crate::feed::tests::reels(&["z", "a", "b", "c"]));

        assert_eq!(model.store.active_index(), Some(2));
        assert_eq!(model.playback.playing_id(), Some("b"));
        assert_eq!(model.scroller.offset(), 40.0);
    }

    #[test]
    fn local_state_is_per_reel() {
        let mut model = model_with(crate::feed::tests::reels(&["a", "b"]));
        model.handle_key(KeyCode::Char('s')).unwrap();
        model.handle_key(KeyCode::Down).unwrap();

        assert!(model.reel_states["a"].saved);
        assert!(!model.reel_states["b"].saved);
    }

    #[test]
    fn form_requires_both_fields() {
        let mut model = model_with(Vec::new());
        model.handle_key(KeyCode::Char('n')).unwrap();
        for ch in "Pelé".chars() {
            model.handle_key(KeyCode::Char(ch)).unwrap();
        }
        model.handle_key(KeyCode::Enter).unwrap();
        model.handle_key(KeyCode::Enter).unwrap();

        let form = model.form.as_ref().unwrap();
        assert_eq!(form.athlete_name, "Pelé");
        assert!(form.status.is_some());
        assert!(!model.pending_generation);
    }
}
