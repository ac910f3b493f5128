use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use rand::{distributions::Alphanumeric, Rng};

use changer::state::store::{CREDENTIALS_KEY, DEVICE_KEY};
use changer::state::Config;

use crate::cli::commands::utils::{client, open_store};

fn random_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

/// Pull `code` out of the pasted redirect URL, checking `state` when present.
/// A bare code is accepted too.
fn parse_callback(input: &str, expected_state: &str) -> Result<String> {
    let Some((_, query)) = input.split_once('?') else {
        return Ok(input.to_string());
    };

    let mut code = None;
    let mut state = None;
    for pair in query.split('&') {
        match pair.split_once('=') {
            Some(("code", value)) => code = Some(urlencoding::decode(value)?.into_owned()),
            Some(("state", value)) => state = Some(urlencoding::decode(value)?.into_owned()),
            Some(("error", value)) => bail!("Authorization denied: {}", value),
            _ => {}
        }
    }

    if let Some(state) = state {
        if state != expected_state {
            bail!("State mismatch in callback, refusing the code");
        }
    }
    code.context("No authorization code in callback URL")
}

pub async fn run(config: &Config) -> Result<()> {
    let spotify = client()?;
    let store = open_store(config)?;

    let state = random_state();
    let url = spotify.oauth_url(&config.redirect_uri, &state);

    println!("Opening browser for Spotify authorization...");
    if open::that(&url).is_err() {
        println!("Could not open a browser. Visit this URL:\n{}", url);
    }

    print!("\nPaste the URL you were redirected to: ");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let code = parse_callback(input.trim(), &state)?;
    let token = spotify
        .exchange_code(&code, &config.redirect_uri)
        .await
        .context("Failed to exchange authorization code")?;

    store.put(CREDENTIALS_KEY, &token)?;
    println!("Authenticated with Spotify.");
    Ok(())
}

pub fn logout(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    store.remove(CREDENTIALS_KEY)?;
    store.remove(DEVICE_KEY)?;
    println!("Logged out.");
    Ok(())
}
