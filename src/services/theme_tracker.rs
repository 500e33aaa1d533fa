use std::{collections::HashMap, sync::Arc};

use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use regex::Regex;
use tokio::sync::Mutex;

use crate::{
    constants::{books::BookInfo, prompts::render_theme_analysis_prompt},
    errors::AppResult,
    models::domain::ThemeSet,
    repositories::ThemeRepository,
    services::conversation::ConversationRunner,
};

const MAX_THEMES: usize = 20;

static SESSION_SUFFIX_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"-\d+$").expect("SESSION_SUFFIX_REGEX is a valid regex pattern")
});

static LIST_MARKER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[-*•]+|\d+[.)]|[a-zA-Z][.)])\s+")
        .expect("LIST_MARKER_REGEX is a valid regex pattern")
});

/// Strips a trailing `-<n>` so numbered sub-sessions share theme history.
pub fn base_session_id(session_id: &str) -> &str {
    match SESSION_SUFFIX_REGEX.find(session_id) {
        Some(suffix) if suffix.start() > 0 => &session_id[..suffix.start()],
        _ => session_id,
    }
}

pub fn session_key(session_id: &str, chapter: &str) -> String {
    format!("{}:{}", base_session_id(session_id), chapter)
}

/// Turns a free-form theme listing into clean, de-duplicated entries.
pub fn parse_theme_list(text: &str) -> Vec<String> {
    let mut themes: Vec<String> = Vec::new();

    for line in text.lines() {
        let stripped = LIST_MARKER_REGEX.replace(line.trim(), "");
        let theme = stripped
            .trim_matches(|c: char| c == '*' || c == '"' || c == '`' || c.is_whitespace())
            .trim_end_matches(['.', ';', ','])
            .to_string();

        if theme.is_empty() || theme.ends_with(':') || theme.len() > 120 {
            continue;
        }
        if themes.iter().any(|known| known.eq_ignore_ascii_case(&theme)) {
            continue;
        }

        themes.push(theme);
        if themes.len() == MAX_THEMES {
            break;
        }
    }

    themes
}

#[derive(Debug, Default)]
struct SessionProgress {
    used_themes: Vec<String>,
    questions_requested: u32,
}

/// Rotates themes per session/chapter so consecutive questions cover
/// different material. Usage history is process-local.
pub struct ThemeTracker {
    repository: Arc<dyn ThemeRepository>,
    runner: Arc<ConversationRunner>,
    progress: Mutex<HashMap<String, SessionProgress>>,
}

impl ThemeTracker {
    pub fn new(repository: Arc<dyn ThemeRepository>, runner: Arc<ConversationRunner>) -> Self {
        Self {
            repository,
            runner,
            progress: Mutex::new(HashMap::new()),
        }
    }

    /// Loads the stored theme set for the chapter, deriving and storing one
    /// on first use. Theme store failures are logged and never abort
    /// generation.
    pub async fn themes_for(&self, book: &BookInfo, chapter: &str) -> AppResult<Vec<String>> {
        match self.repository.find(book.category, chapter).await {
            Ok(Some(stored)) if !stored.themes.is_empty() => return Ok(stored.themes),
            Ok(_) => {}
            Err(err) => log::warn!(
                "Theme store unavailable for {} / {}, deriving themes instead: {}",
                book.category,
                chapter,
                err
            ),
        }

        let themes = self.derive_themes(book, chapter).await?;
        if themes.is_empty() {
            log::warn!(
                "No themes could be derived for {} / {}; using a generic theme",
                book.category,
                chapter
            );
            return Ok(vec![generic_theme(book, chapter)]);
        }

        log::info!(
            "Derived {} themes for {} / {}",
            themes.len(),
            book.category,
            chapter
        );
        match self
            .repository
            .save(ThemeSet::new(book.category, chapter, themes.clone()))
            .await
        {
            Ok(saved) => Ok(saved.themes),
            Err(err) => {
                log::warn!(
                    "Could not store themes for {} / {}: {}",
                    book.category,
                    chapter,
                    err
                );
                Ok(themes)
            }
        }
    }

    async fn derive_themes(&self, book: &BookInfo, chapter: &str) -> AppResult<Vec<String>> {
        let thread_id = self.runner.client().create_thread().await?;
        let prompt = render_theme_analysis_prompt(book, chapter);
        let reply = self.runner.complete_turn(&thread_id, &prompt).await?;

        Ok(parse_theme_list(&reply))
    }

    /// Picks a theme not yet used under `key`, starting over once every theme
    /// has been used.
    pub async fn select_theme(&self, book: &BookInfo, chapter: &str, key: &str) -> AppResult<String> {
        let themes = self.themes_for(book, chapter).await?;

        let mut progress = self.progress.lock().await;
        let entry = progress.entry(key.to_string()).or_default();

        let mut eligible: Vec<&String> = themes
            .iter()
            .filter(|theme| !entry.used_themes.contains(theme))
            .collect();

        if eligible.is_empty() {
            log::info!("All {} themes used for {}; starting over", themes.len(), key);
            entry.used_themes.clear();
            eligible = themes.iter().collect();
        }

        let theme = eligible
            .choose(&mut rand::thread_rng())
            .map(|theme| theme.to_string())
            .unwrap_or_else(|| generic_theme(book, chapter));

        entry.used_themes.push(theme.clone());
        log::debug!(
            "Theme for {}: {} ({} of {} used)",
            key,
            theme,
            entry.used_themes.len(),
            themes.len()
        );

        Ok(theme)
    }

    /// Counts `count` more questions against `key` and returns the running
    /// number of the first one.
    pub async fn next_question_number(&self, key: &str, count: usize) -> u32 {
        let mut progress = self.progress.lock().await;
        let entry = progress.entry(key.to_string()).or_default();
        let number = entry.questions_requested + 1;
        entry.questions_requested = entry
            .questions_requested
            .saturating_add(u32::try_from(count).unwrap_or(u32::MAX));
        number
    }

    pub async fn used_themes(&self, key: &str) -> Vec<String> {
        self.progress
            .lock()
            .await
            .get(key)
            .map(|entry| entry.used_themes.clone())
            .unwrap_or_default()
    }
}

fn generic_theme(book: &BookInfo, chapter: &str) -> String {
    if chapter == crate::constants::books::ENTIRE_BOOK {
        format!("Core concepts of {}", book.book_name)
    } else {
        format!("Core concepts of {}", chapter)
    }
}
