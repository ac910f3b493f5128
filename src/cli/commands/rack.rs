use anyhow::Result;

use changer::playback::DEFAULT_VOLUME;
use changer::provider::{group_by_album, lookup_album, Catalog};
use changer::state::store::VOLUME_KEY;
use changer::state::{Config, RackStore};

use crate::cli::commands::utils::{
    create_provider, extract_album_id, format_duration, open_store, spawn_offline,
    spawn_orchestrator,
};

pub async fn search(query: &str, config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let spotify = create_provider(&store).await?;

    let albums = group_by_album(spotify.search(query).await?);
    if albums.is_empty() {
        println!("No albums found for {:?}", query);
        return Ok(());
    }

    println!();
    for (i, album) in albums.iter().enumerate() {
        println!("{:2}. {} - {}  [{}]", i + 1, album.artist_name, album.album_name, album.id);
    }
    println!("\nLoad one with: changer load <slot> <album id>");
    Ok(())
}

pub async fn load(slot: usize, input: &str, config: &Config) -> Result<()> {
    let (changer, spotify) = spawn_orchestrator(config).await?;

    let album = lookup_album(&spotify, &extract_album_id(input)).await?;
    let summary = format!(
        "{} - {} ({} tracks)",
        album.artist_name,
        album.album_name,
        album.tracks.len()
    );

    let result = changer.load_album(slot, album).await;
    changer.shutdown().await;
    result?;

    println!("Slot {}: {}", slot, summary);
    Ok(())
}

pub async fn remove(slot: usize, config: &Config) -> Result<()> {
    let changer = spawn_offline(config)?;
    let result = changer.remove_album(slot).await;
    changer.shutdown().await;

    match result? {
        Some(album) => println!("Slot {}: removed {}", slot, album.album_name),
        None => println!("Slot {} was already empty", slot),
    }
    Ok(())
}

pub fn list(config: &Config) -> Result<()> {
    let rack = RackStore::open(open_store(config)?);
    let rack = rack.rack();

    println!("\nRack ({} albums loaded)\n", rack.loaded_count());
    for (slot, album) in rack.slots() {
        match album {
            Some(album) => {
                let total: u64 = album.tracks.iter().map(|t| t.duration_ms).sum();
                println!(
                    "{:2}. {} - {} [{} tracks, {}]",
                    slot,
                    album.artist_name,
                    album.album_name,
                    album.tracks.len(),
                    format_duration(total)
                );
            }
            None => println!("{:2}. -", slot),
        }
    }
    Ok(())
}

pub async fn volume(percent: Option<u8>, config: &Config) -> Result<()> {
    let Some(percent) = percent else {
        let store = open_store(config)?;
        let volume = store.get::<u8>(VOLUME_KEY)?.unwrap_or(DEFAULT_VOLUME);
        println!("Volume: {}%", volume);
        return Ok(());
    };

    let changer = spawn_offline(config)?;
    let result = changer.set_volume(percent).await;
    changer.shutdown().await;
    println!("Volume: {}%", result?);
    Ok(())
}
