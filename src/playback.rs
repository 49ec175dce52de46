use std::process::{Child, Command, Stdio};

use anyhow::{anyhow, Context, Result};
use serde_json::json;

#[cfg(unix)]
use rand::{distributions::Alphanumeric, Rng};
#[cfg(unix)]
use std::io::Write;
#[cfg(unix)]
use std::os::unix::net::UnixStream;

use crate::debug;
use crate::feed::FeedStore;
use crate::reel::ReelItem;

/// Receives start/stop notifications for individual reels.
pub trait PlaybackController {
    fn become_active(&mut self, item: &ReelItem);
    fn become_inactive(&mut self, item: &ReelItem);
    fn set_muted(&mut self, _muted: bool) {}
}

/// Controller with no side effects, for when no player is configured.
#[derive(Debug, Default)]
pub struct Silent;

impl PlaybackController for Silent {
    fn become_active(&mut self, _item: &ReelItem) {}
    fn become_inactive(&mut self, _item: &ReelItem) {}
}

impl<C: PlaybackController + ?Sized> PlaybackController for Box<C> {
    fn become_active(&mut self, item: &ReelItem) {
        (**self).become_active(item)
    }

    fn become_inactive(&mut self, item: &ReelItem) {
        (**self).become_inactive(item)
    }

    fn set_muted(&mut self, muted: bool) {
        (**self).set_muted(muted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub stopped: Option<String>,
    pub started: Option<String>,
}

/// Follows the store's committed active reel and forwards the difference to
/// a controller. The previous reel is always told to stop before the next
/// one starts, so the controller never sees two reels active.
pub struct Playback<C> {
    controller: C,
    playing: Option<ReelItem>,
    muted: bool,
}

impl<C: PlaybackController> Playback<C> {
    pub fn new(controller: C, muted: bool) -> Self {
        let mut playback = Self {
            controller,
            playing: None,
            muted,
        };
        playback.controller.set_muted(muted);
        playback
    }

    pub fn playing_id(&self) -> Option<&str> {
        self.playing.as_ref().map(|item| item.id.as_str())
    }

    pub fn is_playing(&self, id: &str) -> bool {
        self.playing_id() == Some(id)
    }

    pub fn muted(&self) -> bool {
        self.muted
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        self.controller.set_muted(self.muted);
        self.muted
    }

    pub fn sync(&mut self, store: &FeedStore) -> Option<Transition> {
        let next = store.active_item();
        if next.map(|item| item.id.as_str()) == self.playing_id() {
            return None;
        }

        let stopped = self.playing.take().map(|item| {
            self.controller.become_inactive(&item);
            item.id
        });
        let started = next.map(|item| {
            self.controller.become_active(item);
            self.playing = Some(item.clone());
            item.id.clone()
        });

        debug::log(format!("playback: stopped={stopped:?} started={started:?}"));
        Some(Transition { stopped, started })
    }

    /// Stops whatever is playing, e.g. before the application exits.
    pub fn stop(&mut self) {
        if let Some(item) = self.playing.take() {
            self.controller.become_inactive(&item);
        }
    }
}

struct MpvSession {
    reel_id: String,
    child: Child,
    ipc_path: Option<String>,
}

/// Plays reels in an external mpv window and drives it over its JSON IPC
/// socket. One mpv process is alive at a time; it is paused when its reel
/// stops being active and replaced when another reel becomes active.
pub struct MpvController {
    mpv_path: String,
    muted: bool,
    session: Option<MpvSession>,
}

impl MpvController {
    pub fn new(mpv_path: impl Into<String>) -> Self {
        Self {
            mpv_path: mpv_path.into(),
            muted: true,
            session: None,
        }
    }

    fn launch(&mut self, item: &ReelItem) -> Result<()> {
        if item.video_url.trim().is_empty() {
            return Err(anyhow!("video URL missing"));
        }
        self.shutdown();

        let ipc_path = unique_ipc_path();
        let mut args = vec![
            item.video_url.trim().to_string(),
            "--force-window=yes".to_string(),
            "--keep-open=no".to_string(),
            "--loop-file=inf".to_string(),
            "--really-quiet".to_string(),
            "--no-config".to_string(),
            "--ytdl=no".to_string(),
            format!("--mute={}", if self.muted { "yes" } else { "no" }),
        ];
        if !item.title.trim().is_empty() {
            args.push(format!("--force-media-title={}", item.title.trim()));
        }
        if let Some(path) = &ipc_path {
            args.push(format!("--input-ipc-server={path}"));
        }
        debug::log(format!("playback: mpv args: {args:?}"));

        let child = Command::new(&self.mpv_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("launch mpv to play {}", item.video_url))?;

        self.session = Some(MpvSession {
            reel_id: item.id.clone(),
            child,
            ipc_path,
        });
        Ok(())
    }

    fn send(&self, command: serde_json::Value) -> Result<()> {
        let Some(session) = &self.session else {
            return Ok(());
        };
        let Some(path) = &session.ipc_path else {
            return Err(anyhow!("mpv controls are not supported on this platform"));
        };
        let payload = serde_json::to_string(&json!({ "command": command }))
            .context("serialize mpv command")?;
        send_ipc_command(path, &payload)
    }

    fn shutdown(&mut self) {
        if let Some(mut session) = self.session.take() {
            let _ = session.child.kill();
            let _ = session.child.wait();
            #[cfg(unix)]
            if let Some(path) = &session.ipc_path {
                let _ = std::fs::remove_file(path);
            }
        }
    }
}

impl PlaybackController for MpvController {
    fn become_active(&mut self, item: &ReelItem) {
        let resumed = match &self.session {
            Some(session) if session.reel_id == item.id => {
                self.send(json!(["set_property", "pause", false])).is_ok()
            }
            _ => false,
        };
        if resumed {
            return;
        }
        if let Err(err) = self.launch(item) {
            debug::log(format!("playback: {err:#}"));
        }
    }

    fn become_inactive(&mut self, item: &ReelItem) {
        let owns = matches!(&self.session, Some(session) if session.reel_id == item.id);
        if !owns {
            return;
        }
        if self.send(json!(["set_property", "pause", true])).is_err() {
            self.shutdown();
        }
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        if let Err(err) = self.send(json!(["set_property", "mute", muted])) {
            debug::log(format!("playback: mute failed: {err:#}"));
        }
    }
}

impl Drop for MpvController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(unix)]
fn send_ipc_command(path: &str, serialized: &str) -> Result<()> {
    let mut stream =
        UnixStream::connect(path).with_context(|| format!("connect to mpv IPC socket {path}"))?;
    stream
        .write_all(serialized.as_bytes())
        .context("write mpv IPC command")?;
    stream
        .write_all(b"\n")
        .context("write mpv IPC command terminator")?;
    Ok(())
}

#[cfg(not(unix))]
fn send_ipc_command(_path: &str, _serialized: &str) -> Result<()> {
    Err(anyhow!("mpv controls are not supported on this platform"))
}

#[cfg(unix)]
fn unique_ipc_path() -> Option<String> {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect();
    let mut path = std::env::temp_dir();
    path.push(format!("reel-feed-mpv-{}-{suffix}.sock", std::process::id()));
    Some(path.to_string_lossy().to_string())
}

#[cfg(not(unix))]
fn unique_ipc_path() -> Option<String> {
    None
}
