use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Sender};
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::api::Caller;
use crate::data::{ExerciseService, WordIndexSource};
use crate::error::{FeedError, FeedResult};
use crate::model::{AnswerReport, ExerciseItem, ExerciseRequest, TranscriptChunk};

pub const DEFAULT_WORD_LIMIT: usize = 200;
pub const DEFAULT_ADVANCE_DELAY: Duration = Duration::from_millis(1200);

static WORD_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z'\-]+").expect("word split"));
static NOT_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z'\-]").expect("word filter"));

/// Maps a raw token to its dictionary form, or `None` when it cannot be one.
pub fn normalize_form(raw: &str) -> Option<String> {
    let lower = raw.trim().to_lowercase().replace(['`', '’'], "'");
    let cleaned = NOT_WORD.replace_all(&lower, "").into_owned();
    let len = cleaned.chars().count();
    if !(2..=25).contains(&len) {
        return None;
    }
    Some(cleaned)
}

fn split_words(text: &str) -> impl Iterator<Item = &str> {
    WORD_SPLIT.split(text).filter(|w| !w.is_empty())
}

/// Word-form to word-id mapping, fetched once and kept for the process.
pub struct WordIndex {
    source: Arc<dyn WordIndexSource>,
    forms: OnceCell<HashMap<String, i64>>,
}

impl WordIndex {
    pub fn new(source: Arc<dyn WordIndexSource>) -> Self {
        Self {
            source,
            forms: OnceCell::new(),
        }
    }

    fn forms(&self) -> FeedResult<&HashMap<String, i64>> {
        self.forms.get_or_try_init(|| {
            let forms = self.source.load_index()?;
            info!(forms = forms.len(), "word index loaded");
            Ok(forms)
        })
    }

    /// Ids for the distinct words in `texts`, in first-seen order, capped at
    /// `limit`.
    pub fn word_ids<'a>(
        &self,
        texts: impl IntoIterator<Item = &'a str>,
        limit: usize,
    ) -> FeedResult<Vec<i64>> {
        let mut seen_forms = HashSet::new();
        let mut forms = Vec::new();
        for text in texts {
            for word in split_words(text) {
                if let Some(form) = normalize_form(word) {
                    if seen_forms.insert(form.clone()) {
                        forms.push(form);
                    }
                }
            }
        }
        if forms.is_empty() {
            return Ok(Vec::new());
        }

        let index = self.forms()?;
        let mut seen_ids = HashSet::new();
        let mut ids = Vec::new();
        for form in forms {
            if ids.len() >= limit {
                break;
            }
            if let Some(id) = index.get(&form).copied().filter(|id| *id > 0) {
                if seen_ids.insert(id) {
                    ids.push(id);
                }
            }
        }
        Ok(ids)
    }
}

struct Job {
    caller: Caller,
    report: AnswerReport,
}

/// Sends answer outcomes in the background so the quiz never waits on them.
pub struct AnswerReporter {
    jobs: Option<Sender<Job>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl AnswerReporter {
    pub fn new(service: Arc<dyn ExerciseService>) -> Self {
        let (tx, rx) = unbounded::<Job>();
        let handle = thread::spawn(move || {
            for job in rx.iter() {
                if let Err(err) = service.report_answer(&job.caller, &job.report) {
                    warn!(word_id = job.report.word_id, error = %err, "answer report failed");
                }
            }
        });
        Self {
            jobs: Some(tx),
            handle: Some(handle),
        }
    }

    pub fn report(&self, caller: Caller, report: AnswerReport) {
        if let Some(jobs) = self.jobs.as_ref() {
            let _ = jobs.send(Job { caller, report });
        }
    }
}

impl Drop for AnswerReporter {
    fn drop(&mut self) {
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExerciseSettings {
    pub word_limit: usize,
    pub exercise_limit: Option<usize>,
    pub advance_delay: Duration,
}

impl Default for ExerciseSettings {
    fn default() -> Self {
        Self {
            word_limit: DEFAULT_WORD_LIMIT,
            exercise_limit: None,
            advance_delay: DEFAULT_ADVANCE_DELAY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub chosen: String,
    pub correct: bool,
    pub correct_answer: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum View<'a> {
    Question {
        item: &'a ExerciseItem,
        index: usize,
        total: usize,
        feedback: Option<&'a Feedback>,
    },
    /// Every exercise has been shown.
    Finished,
}

struct Answered {
    feedback: Feedback,
    advance_at: Instant,
}

/// One card's quiz: a fixed batch shown one question at a time.
pub struct ExerciseSession {
    video_id: String,
    caller: Caller,
    items: Vec<ExerciseItem>,
    index: usize,
    answered: Option<Answered>,
    advance_delay: Duration,
    reporter: Arc<AnswerReporter>,
}

impl ExerciseSession {
    /// Builds a session from the subtitle chunks currently on screen.
    pub fn start(
        service: &dyn ExerciseService,
        words: &WordIndex,
        reporter: Arc<AnswerReporter>,
        caller: Caller,
        video_id: &str,
        chunks: &[&TranscriptChunk],
        settings: ExerciseSettings,
    ) -> FeedResult<Self> {
        let ids = words.word_ids(chunks.iter().map(|c| c.text.as_str()), settings.word_limit)?;
        if ids.is_empty() {
            debug!(video_id, "no known words on screen");
            return Err(FeedError::EmptyResult);
        }
        let request = ExerciseRequest {
            word_ids: ids,
            word_limit: Some(settings.word_limit),
            exercise_limit: settings.exercise_limit,
            video_id: video_id.parse::<i64>().ok(),
        };
        let batch = service.load_exercises(&caller, &request)?;
        info!(
            video_id,
            words = request.word_ids.len(),
            exercises = batch.exercises.len(),
            "exercise batch loaded"
        );
        Ok(Self::with_items(
            video_id,
            caller,
            batch.exercises,
            settings.advance_delay,
            reporter,
        ))
    }

    pub fn with_items(
        video_id: &str,
        caller: Caller,
        items: Vec<ExerciseItem>,
        advance_delay: Duration,
        reporter: Arc<AnswerReporter>,
    ) -> Self {
        Self {
            video_id: video_id.to_string(),
            caller,
            items,
            index: 0,
            answered: None,
            advance_delay,
            reporter,
        }
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn view(&self) -> View<'_> {
        match self.items.get(self.index) {
            Some(item) => View::Question {
                item,
                index: self.index,
                total: self.items.len(),
                feedback: self.answered.as_ref().map(|a| &a.feedback),
            },
            None => View::Finished,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.items.len()
    }

    /// Locks the current question with `option`. Returns `None` when the
    /// question was already answered or the session is over.
    pub fn answer(&mut self, option: &str, now: Instant) -> Option<Feedback> {
        if self.answered.is_some() {
            return None;
        }
        let item = self.items.get(self.index)?;
        let correct = option == item.correct_answer;
        let feedback = Feedback {
            chosen: option.to_string(),
            correct,
            correct_answer: item.correct_answer.clone(),
        };
        self.reporter.report(
            self.caller.clone(),
            AnswerReport {
                word_id: item.word_id,
                is_correct: correct,
            },
        );
        self.answered = Some(Answered {
            feedback: feedback.clone(),
            advance_at: now + self.advance_delay,
        });
        Some(feedback)
    }

    /// Moves past an answered question once its feedback delay has elapsed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.answered.as_ref() {
            Some(answered) if now >= answered.advance_at => {
                self.answered = None;
                self.index += 1;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{sample_exercises, sample_word_index, MockExerciseService, MockWordIndex};

    fn index() -> (WordIndex, Arc<MockWordIndex>) {
        let source = Arc::new(MockWordIndex::new(sample_word_index()));
        (WordIndex::new(source.clone()), source)
    }

    #[test]
    fn normalize_strips_punctuation_and_bounds_length() {
        assert_eq!(normalize_form("Coffee!").as_deref(), Some("coffee"));
        assert_eq!(normalize_form("Don’t").as_deref(), Some("don't"));
        assert_eq!(normalize_form("a"), None);
        assert_eq!(normalize_form(&"x".repeat(26)), None);
    }

    #[test]
    fn word_ids_dedupe_and_keep_order() {
        let (words, source) = index();
        let ids = words
            .word_ids(["Coffee, coffee and a CUP", "The cup of coffee"], 10)
            .unwrap();
        assert_eq!(ids, vec![102, 107]);
        words.word_ids(["park"], 10).unwrap();
        assert_eq!(source.loads(), 1);
    }

    #[test]
    fn typographic_apostrophe_splits_the_word() {
        let forms = [("don't", 1), ("don", 2)]
            .into_iter()
            .map(|(form, id)| (form.to_string(), id))
            .collect();
        let words = WordIndex::new(Arc::new(MockWordIndex::new(forms)));
        assert_eq!(words.word_ids(["Don’t"], 10).unwrap(), vec![2]);
        assert_eq!(words.word_ids(["Don`t"], 10).unwrap(), vec![2]);
        assert_eq!(words.word_ids(["Don't"], 10).unwrap(), vec![1]);
    }

    #[test]
    fn numeric_video_id_is_sent_with_the_request() {
        let (words, _) = index();
        let service = Arc::new(MockExerciseService::new(sample_exercises()));
        let reporter = Arc::new(AnswerReporter::new(service.clone()));
        let chunk = TranscriptChunk::new("coffee", 0.0, 1.0);
        for id in ["42", "v1"] {
            let session = ExerciseSession::start(
                service.as_ref(),
                &words,
                reporter.clone(),
                Caller::default(),
                id,
                &[&chunk],
                ExerciseSettings::default(),
            )
            .unwrap();
            assert_eq!(session.video_id(), id);
        }
        let requests = service.requests();
        assert_eq!(requests[0].video_id, Some(42));
        assert_eq!(requests[1].video_id, None);
        let body = serde_json::to_value(&requests[0]).unwrap();
        assert_eq!(body["videoId"], serde_json::json!(42));
    }

    #[test]
    fn word_ids_respect_limit() {
        let (words, _) = index();
        let ids = words
            .word_ids(["morning coffee weather lovely park"], 2)
            .unwrap();
        assert_eq!(ids, vec![101, 102]);
    }

    #[test]
    fn no_words_skips_index_load() {
        let (words, source) = index();
        assert!(words.word_ids(["... !!"], 10).unwrap().is_empty());
        assert_eq!(source.loads(), 0);
    }

    #[test]
    fn start_without_known_words_is_empty_result() {
        let (words, _) = index();
        let service = Arc::new(MockExerciseService::new(sample_exercises()));
        let reporter = Arc::new(AnswerReporter::new(service.clone()));
        let chunk = TranscriptChunk::new("zzz qqq", 0.0, 1.0);
        let result = ExerciseSession::start(
            service.as_ref(),
            &words,
            reporter,
            Caller::default(),
            "v1",
            &[&chunk],
            ExerciseSettings::default(),
        );
        assert_eq!(result.err(), Some(FeedError::EmptyResult));
        assert!(service.requests().is_empty());
    }

    #[test]
    fn answers_lock_report_and_advance() {
        let (words, _) = index();
        let service = Arc::new(MockExerciseService::new(sample_exercises()));
        let reporter = Arc::new(AnswerReporter::new(service.clone()));
        let chunk = TranscriptChunk::new("Good morning! Coffee in a cup?", 0.0, 2.0);
        let mut session = ExerciseSession::start(
            service.as_ref(),
            &words,
            reporter.clone(),
            Caller::guest("g1"),
            "v1",
            &[&chunk],
            ExerciseSettings::default(),
        )
        .unwrap();
        assert_eq!(service.requests()[0].word_ids, vec![101, 102, 107]);

        let t0 = Instant::now();
        let feedback = session.answer("утро", t0).unwrap();
        assert!(feedback.correct);
        assert_eq!(session.answer("вечер", t0), None);

        assert!(!session.tick(t0 + Duration::from_millis(100)));
        assert!(session.tick(t0 + DEFAULT_ADVANCE_DELAY));
        match session.view() {
            View::Question { index, total, feedback, .. } => {
                assert_eq!(index, 1);
                assert_eq!(total, 3);
                assert!(feedback.is_none());
            }
            View::Finished => panic!("expected a question"),
        }

        let wrong = session.answer("чай", t0).unwrap();
        assert!(!wrong.correct);
        assert_eq!(wrong.correct_answer, "кофе");

        drop(session);
        drop(reporter);
        let reports = service.reports();
        assert_eq!(
            reports,
            vec![
                AnswerReport {
                    word_id: 101,
                    is_correct: true
                },
                AnswerReport {
                    word_id: 102,
                    is_correct: false
                },
            ]
        );
    }

    #[test]
    fn exhausting_items_finishes_without_looping() {
        let service = Arc::new(MockExerciseService::default());
        let reporter = Arc::new(AnswerReporter::new(service));
        let items = sample_exercises().into_iter().take(1).collect();
        let mut session = ExerciseSession::with_items(
            "v1",
            Caller::default(),
            items,
            Duration::ZERO,
            reporter,
        );
        let now = Instant::now();
        session.answer("утро", now).unwrap();
        assert!(session.tick(now));
        assert_eq!(session.view(), View::Finished);
        assert!(session.is_finished());
        assert_eq!(session.answer("утро", now), None);
        assert!(!session.tick(now));
    }
}
