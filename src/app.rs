use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::api;
use crate::config;
use crate::data::Services;
use crate::feed::{Card, Feed, FeedSettings};
use crate::model::DictionaryEntry;
use crate::session::{self, SessionStore};
use crate::storage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the first `limit` cards of the live feed.
    Feed { limit: usize },
    /// Same, against generated sample content with nothing persisted.
    Demo { limit: usize },
    Login { email: String, password: String },
    Logout,
    /// List the signed-in member's saved words.
    Dictionary,
}

pub const DEFAULT_LIMIT: usize = 10;

pub fn run(command: Command) -> Result<()> {
    let cfg = config::load(config::LoadOptions::default()).context("load config")?;
    info!(
        config = %friendly_path(config::default_path().as_ref()),
        base_url = %cfg.api.base_url,
        "starting lingofeed"
    );

    match command {
        Command::Demo { limit } => {
            let store: Arc<dyn SessionStore> =
                Arc::new(storage::Store::open_in_memory().context("open storage")?);
            let feed = build_feed(&cfg, store, Services::sample(60, cfg.feed.page_size))?;
            print_feed(&feed, limit)
        }
        Command::Feed { limit } => {
            let feed = live_feed(&cfg)?;
            print_feed(&feed, limit)
        }
        Command::Login { email, password } => {
            let feed = live_feed(&cfg)?;
            let profile = feed.login(&email, &password)?;
            println!("Signed in as {} <{}>", profile.full_name, profile.email);
            Ok(())
        }
        Command::Logout => {
            let feed = live_feed(&cfg)?;
            if !feed.session().is_authenticated() {
                println!("Not signed in.");
                return Ok(());
            }
            feed.logout()?;
            println!("Signed out.");
            Ok(())
        }
        Command::Dictionary => {
            let feed = live_feed(&cfg)?;
            feed.fetch_dictionary().context("load dictionary")?;
            let dictionary = feed.dictionary();
            if dictionary.items.is_empty() {
                println!("No saved words yet.");
            }
            for entry in &dictionary.items {
                println!("{}", render_entry(entry));
            }
            Ok(())
        }
    }
}

fn live_feed(cfg: &config::Config) -> Result<Feed> {
    let store: Arc<dyn SessionStore> =
        Arc::new(storage::Store::open(storage::Options::default()).context("open storage")?);
    let client = api::Client::new(api::ClientConfig {
        base_url: cfg.api.base_url.clone(),
        user_agent: cfg.api.user_agent.clone(),
        timeout: Some(cfg.api.timeout),
        http_client: None,
    })
    .context("create api client")?;
    let services = Services::api(Arc::new(client), cfg.api.word_index_url());
    build_feed(cfg, store, services)
}

fn build_feed(
    cfg: &config::Config,
    store: Arc<dyn SessionStore>,
    services: Services,
) -> Result<Feed> {
    let session = Arc::new(session::Manager::new(store).context("restore session")?);
    Ok(Feed::new(services, session, FeedSettings::from_config(cfg)))
}

fn print_feed(feed: &Feed, limit: usize) -> Result<()> {
    feed.start().context("load feed")?;
    match feed.session().profile() {
        Some(profile) => println!("Feed for {} ({})", profile.full_name, profile.role.as_str()),
        None => println!("Feed for guest"),
    }

    let mut index = 0;
    while index < limit {
        if index >= feed.len() {
            if feed.on_scroll(index.saturating_sub(1))?.is_none() {
                break;
            }
            if index >= feed.len() {
                break;
            }
        }
        if let Some(card) = feed.card(index) {
            println!("{}", render_card(&card));
            if card.active {
                let subs = feed.subtitles(&card.item.id);
                if let Some(line) = subs.original {
                    println!("     EN: {line}");
                }
                if let Some(line) = subs.translation {
                    println!("     RU: {line}");
                }
            }
        }
        index += 1;
    }
    Ok(())
}

fn render_card(card: &Card) -> String {
    let marker = if card.active { '>' } else { ' ' };
    let analysis = &card.item.analysis;
    let liked = if card.item.is_liked { " ♥" } else { "" };
    format!(
        "{marker}{:>3}. [{} {}] {} ({} likes{liked})",
        card.index + 1,
        analysis.cefr_level.as_str(),
        analysis.speech_speed.as_str(),
        card.item.video_name,
        card.item.likes_count,
    )
}

fn render_entry(entry: &DictionaryEntry) -> String {
    let mut line = format!("{} - {}", entry.word, entry.translation);
    if let Some(part) = entry.part_of_speech.as_deref() {
        line.push_str(&format!(" ({part})"));
    }
    if let Some(transcription) = entry.transcription.as_deref() {
        line.push_str(&format!(" [{transcription}]"));
    }
    line
}

fn friendly_path(path: Option<&std::path::PathBuf>) -> String {
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
        "~/.config/lingofeed/config.yaml".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{sample_dictionary_entry, sample_items};
    use crate::view::CardView;

    #[test]
    fn card_line_shows_level_and_likes() {
        let card = Card {
            index: 2,
            item: sample_items(3).remove(2),
            content: Default::default(),
            view: CardView::default(),
            active: true,
            should_load: true,
        };
        let line = render_card(&card);
        assert!(line.starts_with(">  3."));
        assert!(line.contains("likes"));
    }

    #[test]
    fn dictionary_line_shows_word_and_translation() {
        let mut entry = sample_dictionary_entry("d1", "coffee", "кофе");
        assert_eq!(render_entry(&entry), "coffee - кофе (noun)");
        entry.transcription = Some("ˈkɒfi".into());
        entry.part_of_speech = None;
        assert_eq!(render_entry(&entry), "coffee - кофе [ˈkɒfi]");
    }

    #[test]
    fn friendly_path_falls_back_to_default() {
        assert_eq!(friendly_path(None), "~/.config/lingofeed/config.yaml");
    }
}
