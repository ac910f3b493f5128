use std::io::{self, Write};
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tokio::sync::watch;

use changer::playback::{Advance, OrchestratorHandle, Snapshot, Status, Step};
use changer::state::{Config, RACK_SIZE};

use crate::cli::commands::utils::{format_duration, spawn_orchestrator};

const SEEK_STEP_MS: u64 = 10_000;
const VOLUME_STEP: u8 = 5;

fn render(snapshot: &Snapshot) -> String {
    let status = match snapshot.session.status {
        Status::Playing => "▶",
        Status::Paused => "⏸",
        Status::Stopped => "■",
    };

    let now = match (snapshot.current_album(), snapshot.current_track()) {
        (Some(album), Some(track)) => format!(
            "[{}] {} - {} / {:>2}. {} {}/{}",
            snapshot.position.slot,
            album.artist_name,
            album.album_name,
            snapshot.position.track + 1,
            track.name,
            format_duration(snapshot.session.remote_position_ms),
            format_duration(track.duration_ms),
        ),
        _ => format!("[{}] empty slot", snapshot.position.slot),
    };

    let error = snapshot
        .session
        .last_error
        .as_deref()
        .map(|e| format!("  ! {}", e))
        .unwrap_or_default();

    format!("{} {}  vol {}%{}", status, now, snapshot.session.volume_percent, error)
}

fn show(snapshot: &Snapshot) -> io::Result<()> {
    print!("\r\x1b[2K{}", render(snapshot));
    io::stdout().flush()
}

fn report(result: changer::Result<Advance>) {
    match result {
        Ok(Advance::NoTarget) => print!("\x07"),
        Ok(_) => {}
        Err(e) => print!("\r\x1b[2K{}\r\n", e),
    }
}

fn slot_key(c: char) -> Option<usize> {
    let slot = (c as usize).checked_sub('a' as usize)?;
    (slot < RACK_SIZE).then_some(slot)
}

async fn handle_key(changer: &OrchestratorHandle, code: KeyCode) -> bool {
    let snapshot = changer.snapshot();
    let outcome = match code {
        KeyCode::Char('q') => return false,
        KeyCode::Char(' ') => changer.toggle_play_pause().await.map(|_| ()),
        KeyCode::Char('n') => {
            report(changer.navigate_from(Step::NextTrack, snapshot.generation).await);
            Ok(())
        }
        KeyCode::Char('p') => {
            report(changer.navigate_from(Step::PreviousTrack, snapshot.generation).await);
            Ok(())
        }
        KeyCode::Char('N') => {
            report(changer.navigate_from(Step::NextAlbum, snapshot.generation).await);
            Ok(())
        }
        KeyCode::Char('P') => {
            report(changer.navigate_from(Step::PreviousAlbum, snapshot.generation).await);
            Ok(())
        }
        KeyCode::Char('+') | KeyCode::Char('=') => changer
            .set_volume(snapshot.session.volume_percent.saturating_add(VOLUME_STEP))
            .await
            .map(|_| ()),
        KeyCode::Char('-') => changer
            .set_volume(snapshot.session.volume_percent.saturating_sub(VOLUME_STEP))
            .await
            .map(|_| ()),
        KeyCode::Right => {
            changer
                .seek(snapshot.session.remote_position_ms + SEEK_STEP_MS)
                .await
        }
        KeyCode::Left => {
            changer
                .seek(snapshot.session.remote_position_ms.saturating_sub(SEEK_STEP_MS))
                .await
        }
        KeyCode::Char(c) => match slot_key(c) {
            Some(slot) => changer.select_slot(slot).await,
            None => Ok(()),
        },
        _ => Ok(()),
    };

    if let Err(e) = outcome {
        print!("\r\x1b[2K{}\r\n", e);
    }
    true
}

async fn session(changer: &OrchestratorHandle, updates: &mut watch::Receiver<Snapshot>) -> Result<()> {
    loop {
        // Check for keyboard input (non-blocking)
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(KeyEvent { code, .. }) = event::read()? {
                if !handle_key(changer, code).await {
                    return Ok(());
                }
            }
        }

        if updates.has_changed()? {
            show(&updates.borrow_and_update())?;
        }
    }
}

pub async fn run(slot: Option<usize>, config: &Config) -> Result<()> {
    let (changer, _) = spawn_orchestrator(config).await?;
    let mut updates = changer.subscribe();

    if changer.snapshot().rack.loaded_count() == 0 {
        changer.shutdown().await;
        anyhow::bail!("The rack is empty. Load an album with 'changer load <slot> <album>'.");
    }

    println!("Connecting to Spotify...");
    if let Err(e) = changer.initialize().await {
        changer.shutdown().await;
        return Err(e.into());
    }

    if let Some(slot) = slot {
        changer.select_slot(slot).await?;
    }
    changer.toggle_play_pause().await?;

    println!(
        "\nControls: [space] play/pause  [n/p] track  [N/P] album  [a-l] slot  [+/-] volume  [←/→] seek  [q] quit\n"
    );
    show(&updates.borrow_and_update())?;

    enable_raw_mode()?;
    let result = session(&changer, &mut updates).await;
    disable_raw_mode()?;
    println!();

    changer.disconnect().await?;
    changer.shutdown().await;
    result
}
