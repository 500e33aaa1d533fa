#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex, RwLock,
    },
    time::{Duration, Instant},
};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use regex::Regex;

use mcq_server::{
    config::Config,
    constants::prompts::MCQ_DELIMITER,
    errors::{AppError, AppResult},
    models::domain::{CachedQuestion, LeaderboardEntry, ThemeSet},
    repositories::{LeaderboardRepository, QuestionFilter, QuestionRepository, ThemeRepository},
    services::{assistant_client::StoredFile, AssistantClient, Run, RunStatus},
};

static REQUESTED_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Generate (\d+) MCQ\(s\)").unwrap());

pub fn test_config() -> Config {
    let mut config = Config::from_env();
    config.lock_timeout_secs = 10;
    config.run_poll_interval_ms = 5;
    config.run_poll_max_interval_ms = 20;
    config.run_timeout_secs = 10;
    config.max_generation_retries = 2;
    config
}

pub fn mcq_block(index: usize) -> String {
    format!(
        "Question: Which body conducts elections to Parliament, as asked in set {index}?\n\n\
         Options:\n(a) Election Commission\n(b) Supreme Court\n(c) Finance Commission\n(d) NITI Aayog\n\n\
         Correct Answer: (a)\n\n\
         Explanation: Article 324 vests superintendence of elections in the Election Commission."
    )
}

pub fn mcq_reply(count: usize) -> String {
    (1..=count)
        .map(mcq_block)
        .collect::<Vec<_>>()
        .join(&format!("\n\n{}\n\n", MCQ_DELIMITER))
}

pub const THEME_REPLY: &str = "1. Composition of the Commission\n2. Powers under Article 324\n3. Model Code of Conduct";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyMode {
    Valid,
    Malformed,
    FailRuns,
}

#[derive(Default)]
struct ScriptState {
    prompts: HashMap<String, String>,
    runs: HashMap<String, (String, Instant)>,
    in_flight: HashMap<String, usize>,
    max_in_flight: usize,
    events: Vec<(String, &'static str)>,
    theme_requests: usize,
}

/// Assistant stand-in with slow runs, recording the order of calls per thread.
pub struct ScriptedAssistant {
    run_delay: Duration,
    mode: Mutex<ReplyMode>,
    threads_created: AtomicUsize,
    runs_created: AtomicUsize,
    state: Mutex<ScriptState>,
}

impl ScriptedAssistant {
    pub fn new(run_delay: Duration) -> Self {
        Self {
            run_delay,
            mode: Mutex::new(ReplyMode::Valid),
            threads_created: AtomicUsize::new(0),
            runs_created: AtomicUsize::new(0),
            state: Mutex::new(ScriptState::default()),
        }
    }

    pub fn set_mode(&self, mode: ReplyMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn runs_created(&self) -> usize {
        self.runs_created.load(Ordering::SeqCst)
    }

    pub fn threads_created(&self) -> usize {
        self.threads_created.load(Ordering::SeqCst)
    }

    /// Highest number of open turns seen on any single thread.
    pub fn max_in_flight(&self) -> usize {
        self.state.lock().unwrap().max_in_flight
    }

    pub fn theme_requests(&self) -> usize {
        self.state.lock().unwrap().theme_requests
    }

    pub fn events_for(&self, thread_id: &str) -> Vec<&'static str> {
        self.state
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|(thread, _)| thread == thread_id)
            .map(|(_, event)| *event)
            .collect()
    }

    fn status_of(&self, started: Instant) -> RunStatus {
        if started.elapsed() < self.run_delay {
            RunStatus::InProgress
        } else if *self.mode.lock().unwrap() == ReplyMode::FailRuns {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        }
    }
}

#[async_trait]
impl AssistantClient for ScriptedAssistant {
    async fn create_thread(&self) -> AppResult<String> {
        let n = self.threads_created.fetch_add(1, Ordering::SeqCst);
        Ok(format!("thread_{}", n))
    }

    async fn add_user_message(&self, thread_id: &str, content: &str) -> AppResult<()> {
        let mut state = self.state.lock().unwrap();
        state.prompts.insert(thread_id.to_string(), content.to_string());
        let open = state.in_flight.entry(thread_id.to_string()).or_insert(0);
        *open += 1;
        let open = *open;
        state.max_in_flight = state.max_in_flight.max(open);
        state.events.push((thread_id.to_string(), "message"));
        Ok(())
    }

    async fn create_run(&self, thread_id: &str) -> AppResult<Run> {
        let n = self.runs_created.fetch_add(1, Ordering::SeqCst);
        let run_id = format!("run_{}", n);
        let mut state = self.state.lock().unwrap();
        state
            .runs
            .insert(run_id.clone(), (thread_id.to_string(), Instant::now()));
        state.events.push((thread_id.to_string(), "run"));
        Ok(Run::new(run_id, RunStatus::Queued))
    }

    async fn retrieve_run(&self, _thread_id: &str, run_id: &str) -> AppResult<Run> {
        let started = self
            .state
            .lock()
            .unwrap()
            .runs
            .get(run_id)
            .map(|(_, started)| *started)
            .ok_or_else(|| AppError::AiService(format!("unknown run {}", run_id)))?;
        Ok(Run::new(run_id, self.status_of(started)))
    }

    async fn list_runs(&self, thread_id: &str) -> AppResult<Vec<Run>> {
        let runs: Vec<(String, Instant)> = self
            .state
            .lock()
            .unwrap()
            .runs
            .iter()
            .filter(|(_, (thread, _))| thread == thread_id)
            .map(|(id, (_, started))| (id.clone(), *started))
            .collect();
        Ok(runs
            .into_iter()
            .map(|(id, started)| Run::new(id, self.status_of(started)))
            .collect())
    }

    async fn latest_assistant_message(&self, thread_id: &str) -> AppResult<Option<String>> {
        let mode = *self.mode.lock().unwrap();
        let mut state = self.state.lock().unwrap();
        if let Some(open) = state.in_flight.get_mut(thread_id) {
            *open = open.saturating_sub(1);
        }
        state.events.push((thread_id.to_string(), "reply"));

        let prompt = state.prompts.get(thread_id).cloned().unwrap_or_default();
        if prompt.contains("topical themes") {
            state.theme_requests += 1;
            return Ok(Some(THEME_REPLY.to_string()));
        }

        if mode == ReplyMode::Malformed {
            return Ok(Some("Sorry, here is something else entirely.".to_string()));
        }

        let count = REQUESTED_COUNT
            .captures(&prompt)
            .and_then(|caps| caps[1].parse().ok())
            .unwrap_or(1);
        Ok(Some(mcq_reply(count)))
    }

    async fn retrieve_file(&self, file_id: &str) -> AppResult<StoredFile> {
        Ok(StoredFile {
            id: file_id.to_string(),
            filename: format!("{}.pdf", file_id),
        })
    }

    async fn create_vector_store(&self, _name: &str, _file_ids: Vec<String>) -> AppResult<String> {
        Ok("vs_scripted".to_string())
    }

    async fn update_assistant(&self, _vector_store_id: &str) -> AppResult<()> {
        Ok(())
    }
}

fn ensure_available(unavailable: &AtomicBool) -> AppResult<()> {
    if unavailable.load(Ordering::SeqCst) {
        return Err(AppError::DatabaseError("store unreachable".to_string()));
    }
    Ok(())
}

#[derive(Default)]
pub struct InMemoryQuestionRepository {
    questions: RwLock<Vec<CachedQuestion>>,
    unavailable: AtomicBool,
}

impl InMemoryQuestionRepository {
    pub fn seed(&self, question: CachedQuestion) {
        self.questions.write().unwrap().push(question);
    }

    pub fn len(&self) -> usize {
        self.questions.read().unwrap().len()
    }

    pub fn all(&self) -> Vec<CachedQuestion> {
        self.questions.read().unwrap().clone()
    }

    /// Makes every call fail as if the database were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl QuestionRepository for InMemoryQuestionRepository {
    async fn insert_many(&self, questions: Vec<CachedQuestion>) -> AppResult<usize> {
        ensure_available(&self.unavailable)?;
        let inserted = questions.len();
        self.questions.write().unwrap().extend(questions);
        Ok(inserted)
    }

    async fn count(&self, filter: &QuestionFilter) -> AppResult<u64> {
        ensure_available(&self.unavailable)?;
        let questions = self.questions.read().unwrap();
        Ok(questions.iter().filter(|q| filter.matches(q)).count() as u64)
    }

    async fn sample(&self, filter: &QuestionFilter, size: usize) -> AppResult<Vec<CachedQuestion>> {
        ensure_available(&self.unavailable)?;
        let mut matching: Vec<CachedQuestion> = self
            .questions
            .read()
            .unwrap()
            .iter()
            .filter(|q| filter.matches(q))
            .cloned()
            .collect();
        matching.shuffle(&mut rand::thread_rng());
        matching.truncate(size);
        Ok(matching)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        ensure_available(&self.unavailable)
    }
}

#[derive(Default)]
pub struct InMemoryThemeRepository {
    theme_sets: RwLock<Vec<ThemeSet>>,
    unavailable: AtomicBool,
}

impl InMemoryThemeRepository {
    pub fn insert(&self, theme_set: ThemeSet) {
        let mut theme_sets = self.theme_sets.write().unwrap();
        theme_sets.retain(|t| !(t.category == theme_set.category && t.chapter == theme_set.chapter));
        theme_sets.push(theme_set);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl ThemeRepository for InMemoryThemeRepository {
    async fn find(&self, category: &str, chapter: &str) -> AppResult<Option<ThemeSet>> {
        ensure_available(&self.unavailable)?;
        Ok(self
            .theme_sets
            .read()
            .unwrap()
            .iter()
            .find(|t| t.category == category && t.chapter == chapter)
            .cloned())
    }

    async fn save(&self, theme_set: ThemeSet) -> AppResult<ThemeSet> {
        ensure_available(&self.unavailable)?;
        self.insert(theme_set.clone());
        Ok(theme_set)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        ensure_available(&self.unavailable)
    }
}

#[derive(Default)]
pub struct InMemoryLeaderboardRepository {
    entries: RwLock<Vec<LeaderboardEntry>>,
}

#[async_trait]
impl LeaderboardRepository for InMemoryLeaderboardRepository {
    async fn insert(&self, entry: LeaderboardEntry) -> AppResult<LeaderboardEntry> {
        self.entries.write().unwrap().push(entry.clone());
        Ok(entry)
    }

    async fn top(&self, limit: i64) -> AppResult<Vec<LeaderboardEntry>> {
        let mut entries = self.entries.read().unwrap().clone();
        entries.sort_by(|a, b| b.score.cmp(&a.score).then(a.date.cmp(&b.date)));
        entries.truncate(limit.max(0) as usize);
        Ok(entries)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}
