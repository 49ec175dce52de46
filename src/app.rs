use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::{self, Config};
use crate::data::{CatalogueReelService, ReelService, RemoteReelService};
use crate::debug;
use crate::playback::{MpvController, PlaybackController, Silent};
use crate::reel::format_count;
use crate::remote;
use crate::ui;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config_file: Option<PathBuf>,
}

pub fn run() -> Result<()> {
    run_with(RunOptions::default())
}

pub fn run_with(opts: RunOptions) -> Result<()> {
    let cfg = load_config(&opts)?;
    let config_path = opts.config_file.clone().or_else(config::default_path);
    let display_path = friendly_path(config_path.as_ref());
    debug::log(format!("app: config from {display_path}: {cfg:?}"));

    let service = build_service(&cfg)?;
    let controller: Box<dyn PlaybackController> = if cfg.player.enabled {
        Box::new(MpvController::new(cfg.player.mpv_path.clone()))
    } else {
        Box::new(Silent)
    };

    let status = if cfg.source.base_url.trim().is_empty() {
        format!("Browsing the built-in reel catalogue (config: {display_path}).")
    } else {
        format!("Browsing reels from {}.", cfg.source.base_url.trim())
    };

    let options = ui::Options {
        status_message: status,
        service,
        athlete_id: cfg.source.athlete_id.clone(),
        feed: cfg.feed.clone(),
        controller,
        start_muted: cfg.player.start_muted,
    };

    let mut model = ui::Model::new(options);
    model.run()
}

/// Prints the feed as plain text, one reel per line, without starting the
/// terminal interface.
pub fn list(opts: RunOptions, out: &mut impl Write) -> Result<()> {
    let cfg = load_config(&opts)?;
    let service = build_service(&cfg)?;
    let reels = service
        .list_reels(cfg.source.athlete_id.as_deref())
        .context("list reels")?;

    if reels.is_empty() {
        writeln!(out, "No reels available.")?;
        return Ok(());
    }
    for (index, reel) in reels.iter().enumerate() {
        writeln!(
            out,
            "{:>3}. {} ({} · {}) {} views, {} likes, {}s\n     {}",
            index + 1,
            reel.title,
            reel.athlete_name,
            reel.sport,
            format_count(reel.views),
            format_count(reel.likes),
            reel.duration,
            reel.video_url
        )?;
    }
    Ok(())
}

fn load_config(opts: &RunOptions) -> Result<Config> {
    config::load(config::LoadOptions {
        config_file: opts.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")
}

fn build_service(cfg: &Config) -> Result<Arc<dyn ReelService>> {
    let base_url = cfg.source.base_url.trim();
    if base_url.is_empty() {
        return Ok(Arc::new(CatalogueReelService::default()));
    }

    let user_agent = if cfg.source.user_agent.trim().is_empty() {
        format!("reel-feed/{}", crate::VERSION)
    } else {
        cfg.source.user_agent.clone()
    };
    let client = remote::Client::new(remote::ClientConfig {
        base_url: base_url.to_string(),
        user_agent,
        http_client: None,
    })
    .context("create reel client")?;
    Ok(Arc::new(RemoteReelService::new(Arc::new(client))))
}

fn friendly_path(path: Option<&PathBuf>) -> String {
    if let Some(path) = path {
        if let Some(home) = dirs::home_dir() {
            if let Ok(stripped) = path.strip_prefix(&home) {
                let mut display = String::from("~");
                if !stripped.as_os_str().is_empty() {
                    display.push_str(&format!("/{}", stripped.display()));
                }
                return display;
            }
        }
        path.display().to_string()
    } else {
        "~/.config/reel-feed/config.yaml".to_string()
    }
}
