use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;

use crate::api::{self, Caller, FeedQuery};
use crate::error::{FeedError, FeedResult};
use crate::model::{
    Analysis, AnswerReport, AuthResponse, AuthTokens, Author, CefrLevel, ContentDetail,
    DictionaryEntry, ExerciseBatch, ExerciseDirection, ExerciseItem, ExerciseProgress,
    ExerciseRequest, FeedItem, FeedPage, LikeState, ModerationUpdate, NewDictionaryEntry,
    SpeechSpeed, Transcript, TranscriptChunk, UserProfile, UserRole, WatchStatus,
};

pub trait FeedService: Send + Sync {
    fn load_page(&self, caller: &Caller, query: &FeedQuery) -> FeedResult<FeedPage>;
}

pub trait ContentService: Send + Sync {
    fn load_content(&self, caller: &Caller, id: &str) -> FeedResult<ContentDetail>;
}

pub trait InteractionService: Send + Sync {
    fn set_like(&self, caller: &Caller, id: &str, like: bool) -> FeedResult<LikeState>;
    fn moderate(
        &self,
        caller: &Caller,
        id: &str,
        update: &ModerationUpdate,
    ) -> FeedResult<ContentDetail>;
    fn delete(&self, caller: &Caller, id: &str) -> FeedResult<()>;
    fn authors(&self, caller: &Caller) -> FeedResult<Vec<Author>>;
}

pub trait ExerciseService: Send + Sync {
    fn load_exercises(
        &self,
        caller: &Caller,
        request: &ExerciseRequest,
    ) -> FeedResult<ExerciseBatch>;
    fn report_answer(&self, caller: &Caller, report: &AnswerReport) -> FeedResult<()>;
}

pub trait DictionaryService: Send + Sync {
    fn entries(&self, caller: &Caller) -> FeedResult<Vec<DictionaryEntry>>;
    fn add_entry(
        &self,
        caller: &Caller,
        entry: &NewDictionaryEntry,
    ) -> FeedResult<DictionaryEntry>;
    fn delete_entry(&self, caller: &Caller, id: &str) -> FeedResult<()>;
}

pub trait WordIndexSource: Send + Sync {
    fn load_index(&self) -> FeedResult<HashMap<String, i64>>;
}

pub trait AuthService: Send + Sync {
    fn login(&self, email: &str, password: &str) -> FeedResult<AuthResponse>;
    fn register(&self, email: &str, password: &str, full_name: &str) -> FeedResult<AuthResponse>;
    fn telegram(&self, init_data: &str) -> FeedResult<AuthResponse>;
}

/// Every backend collaborator the feed talks to.
#[derive(Clone)]
pub struct Services {
    pub feed: Arc<dyn FeedService>,
    pub content: Arc<dyn ContentService>,
    pub interaction: Arc<dyn InteractionService>,
    pub exercises: Arc<dyn ExerciseService>,
    pub dictionary: Arc<dyn DictionaryService>,
    pub words: Arc<dyn WordIndexSource>,
    pub auth: Arc<dyn AuthService>,
}

impl Services {
    pub fn api(client: Arc<api::Client>, word_index_url: String) -> Self {
        Self {
            feed: Arc::new(ApiFeedService::new(client.clone())),
            content: Arc::new(ApiContentService::new(client.clone())),
            interaction: Arc::new(ApiInteractionService::new(client.clone())),
            exercises: Arc::new(ApiExerciseService::new(client.clone())),
            dictionary: Arc::new(ApiDictionaryService::new(client.clone())),
            words: Arc::new(ApiWordIndex::new(client.clone(), word_index_url)),
            auth: Arc::new(ApiAuthService::new(client)),
        }
    }

    /// Offline services backed by generated sample content.
    pub fn sample(total: usize, page_size: usize) -> Self {
        Self {
            feed: Arc::new(MockFeedService::paged(sample_items(total), page_size)),
            content: Arc::new(MockContentService::default()),
            interaction: Arc::new(MockInteractionService::default()),
            exercises: Arc::new(MockExerciseService::new(sample_exercises())),
            dictionary: Arc::new(MockDictionaryService::default()),
            words: Arc::new(MockWordIndex::new(sample_word_index())),
            auth: Arc::new(MockAuthService::default()),
        }
    }
}

pub struct ApiFeedService {
    client: Arc<api::Client>,
}

impl ApiFeedService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl FeedService for ApiFeedService {
    fn load_page(&self, caller: &Caller, query: &FeedQuery) -> FeedResult<FeedPage> {
        self.client.feed(caller, query)
    }
}

pub struct ApiContentService {
    client: Arc<api::Client>,
}

impl ApiContentService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl ContentService for ApiContentService {
    fn load_content(&self, caller: &Caller, id: &str) -> FeedResult<ContentDetail> {
        self.client.content(caller, id)
    }
}

pub struct ApiInteractionService {
    client: Arc<api::Client>,
}

impl ApiInteractionService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl InteractionService for ApiInteractionService {
    fn set_like(&self, caller: &Caller, id: &str, like: bool) -> FeedResult<LikeState> {
        self.client.update_like(caller, id, like)
    }

    fn moderate(
        &self,
        caller: &Caller,
        id: &str,
        update: &ModerationUpdate,
    ) -> FeedResult<ContentDetail> {
        self.client.moderate(caller, id, update)
    }

    fn delete(&self, caller: &Caller, id: &str) -> FeedResult<()> {
        self.client.delete_video(caller, id)
    }

    fn authors(&self, caller: &Caller) -> FeedResult<Vec<Author>> {
        self.client.authors(caller)
    }
}

pub struct ApiExerciseService {
    client: Arc<api::Client>,
}

impl ApiExerciseService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl ExerciseService for ApiExerciseService {
    fn load_exercises(
        &self,
        caller: &Caller,
        request: &ExerciseRequest,
    ) -> FeedResult<ExerciseBatch> {
        self.client.exercises(caller, request)
    }

    fn report_answer(&self, caller: &Caller, report: &AnswerReport) -> FeedResult<()> {
        self.client.report_answer(caller, report)
    }
}

pub struct ApiDictionaryService {
    client: Arc<api::Client>,
}

impl ApiDictionaryService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl DictionaryService for ApiDictionaryService {
    fn entries(&self, caller: &Caller) -> FeedResult<Vec<DictionaryEntry>> {
        self.client.dictionary(caller)
    }

    fn add_entry(
        &self,
        caller: &Caller,
        entry: &NewDictionaryEntry,
    ) -> FeedResult<DictionaryEntry> {
        self.client.add_dictionary_entry(caller, entry)
    }

    fn delete_entry(&self, caller: &Caller, id: &str) -> FeedResult<()> {
        self.client.delete_dictionary_entry(caller, id)
    }
}

pub struct ApiWordIndex {
    client: Arc<api::Client>,
    url: String,
}

impl ApiWordIndex {
    pub fn new(client: Arc<api::Client>, url: String) -> Self {
        Self { client, url }
    }
}

impl WordIndexSource for ApiWordIndex {
    fn load_index(&self) -> FeedResult<HashMap<String, i64>> {
        self.client.word_index(&self.url)
    }
}

pub struct ApiAuthService {
    client: Arc<api::Client>,
}

impl ApiAuthService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl AuthService for ApiAuthService {
    fn login(&self, email: &str, password: &str) -> FeedResult<AuthResponse> {
        self.client.login(email, password)
    }

    fn register(&self, email: &str, password: &str, full_name: &str) -> FeedResult<AuthResponse> {
        self.client.register(email, password, full_name)
    }

    fn telegram(&self, init_data: &str) -> FeedResult<AuthResponse> {
        self.client.telegram_auth(init_data)
    }
}

/// Serves scripted pages first, then falls back to slicing `catalog`.
#[derive(Default)]
pub struct MockFeedService {
    scripted: Mutex<VecDeque<FeedResult<FeedPage>>>,
    catalog: Vec<FeedItem>,
    page_size: usize,
    queries: Mutex<Vec<FeedQuery>>,
}

impl MockFeedService {
    pub fn scripted(pages: Vec<FeedResult<FeedPage>>) -> Self {
        Self {
            scripted: Mutex::new(pages.into()),
            ..Default::default()
        }
    }

    pub fn paged(catalog: Vec<FeedItem>, page_size: usize) -> Self {
        Self {
            catalog,
            page_size: page_size.max(1),
            ..Default::default()
        }
    }

    pub fn queries(&self) -> Vec<FeedQuery> {
        self.queries.lock().clone()
    }
}

impl FeedService for MockFeedService {
    fn load_page(&self, _caller: &Caller, query: &FeedQuery) -> FeedResult<FeedPage> {
        self.queries.lock().push(query.clone());
        if let Some(page) = self.scripted.lock().pop_front() {
            return page;
        }
        let start = query
            .cursor
            .as_deref()
            .and_then(|c| c.strip_prefix('c'))
            .and_then(|n| n.parse::<usize>().ok())
            .map(|n| n * self.page_size)
            .unwrap_or(0);
        let end = (start + self.page_size).min(self.catalog.len());
        let items = self.catalog.get(start..end).unwrap_or_default().to_vec();
        let next_cursor = if end < self.catalog.len() {
            Some(format!("c{}", end / self.page_size.max(1)))
        } else {
            None
        };
        Ok(FeedPage {
            has_more: next_cursor.is_some(),
            items,
            next_cursor,
        })
    }
}

/// Content source with call accounting. When a gate is installed every call
/// blocks until the gate yields, which lets callers observe in-flight state.
#[derive(Default)]
pub struct MockContentService {
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
    gate: Option<Receiver<()>>,
}

impl MockContentService {
    pub fn gated(gate: Receiver<()>) -> Self {
        Self {
            gate: Some(gate),
            ..Default::default()
        }
    }

    pub fn fail(&self, id: &str, failing: bool) {
        let mut set = self.failing.lock();
        if failing {
            set.insert(id.to_string());
        } else {
            set.remove(id);
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl ContentService for MockContentService {
    fn load_content(&self, _caller: &Caller, id: &str) -> FeedResult<ContentDetail> {
        self.calls.lock().push(id.to_string());
        if let Some(gate) = self.gate.as_ref() {
            let _ = gate.recv();
        }
        if self.failing.lock().contains(id) {
            return Err(FeedError::network(format!("content {id} unavailable")));
        }
        Ok(sample_detail(id))
    }
}

/// Interaction backend with call accounting. Gated like calls each take the
/// next gate and block until it yields, so tests choose the order in which
/// concurrent toggles complete.
#[derive(Default)]
pub struct MockInteractionService {
    like_responses: Mutex<VecDeque<FeedResult<LikeState>>>,
    like_gates: Mutex<VecDeque<Receiver<()>>>,
    likes: Mutex<Vec<(String, bool)>>,
    moderation: Mutex<Vec<(String, ModerationUpdate)>>,
    deleted: Mutex<Vec<String>>,
}

impl MockInteractionService {
    pub fn with_like_responses(responses: Vec<FeedResult<LikeState>>) -> Self {
        Self {
            like_responses: Mutex::new(responses.into()),
            ..Default::default()
        }
    }

    pub fn gated_likes(
        responses: Vec<FeedResult<LikeState>>,
        gates: Vec<Receiver<()>>,
    ) -> Self {
        Self {
            like_responses: Mutex::new(responses.into()),
            like_gates: Mutex::new(gates.into()),
            ..Default::default()
        }
    }

    pub fn like_calls(&self) -> Vec<(String, bool)> {
        self.likes.lock().clone()
    }

    pub fn moderation_calls(&self) -> Vec<(String, ModerationUpdate)> {
        self.moderation.lock().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().clone()
    }
}

impl InteractionService for MockInteractionService {
    fn set_like(&self, _caller: &Caller, id: &str, like: bool) -> FeedResult<LikeState> {
        let response = self.like_responses.lock().pop_front();
        let gate = self.like_gates.lock().pop_front();
        self.likes.lock().push((id.to_string(), like));
        if let Some(gate) = gate {
            let _ = gate.recv();
        }
        response.unwrap_or(Ok(LikeState {
            likes_count: i64::from(like),
            is_liked: like,
        }))
    }

    fn moderate(
        &self,
        _caller: &Caller,
        id: &str,
        update: &ModerationUpdate,
    ) -> FeedResult<ContentDetail> {
        self.moderation
            .lock()
            .push((id.to_string(), update.clone()));
        let mut detail = sample_detail(id);
        match update {
            ModerationUpdate::CefrLevel(level) => detail.cefr_level = Some(*level),
            ModerationUpdate::SpeechSpeed(speed) => detail.speech_speed = Some(*speed),
            ModerationUpdate::Author(author) => detail.author = Some(author.clone()),
            ModerationUpdate::Adult(flag) => detail.is_adult_content = *flag,
            ModerationUpdate::Moderated(flag) => detail.is_moderated = *flag,
        }
        Ok(detail)
    }

    fn delete(&self, _caller: &Caller, id: &str) -> FeedResult<()> {
        self.deleted.lock().push(id.to_string());
        Ok(())
    }

    fn authors(&self, _caller: &Caller) -> FeedResult<Vec<Author>> {
        Ok(vec![Author {
            username: "lingofeed".into(),
        }])
    }
}

#[derive(Default)]
pub struct MockExerciseService {
    exercises: Vec<ExerciseItem>,
    requests: Mutex<Vec<ExerciseRequest>>,
    reports: Mutex<Vec<AnswerReport>>,
}

impl MockExerciseService {
    pub fn new(exercises: Vec<ExerciseItem>) -> Self {
        Self {
            exercises,
            ..Default::default()
        }
    }

    pub fn requests(&self) -> Vec<ExerciseRequest> {
        self.requests.lock().clone()
    }

    pub fn reports(&self) -> Vec<AnswerReport> {
        self.reports.lock().clone()
    }
}

impl ExerciseService for MockExerciseService {
    fn load_exercises(
        &self,
        _caller: &Caller,
        request: &ExerciseRequest,
    ) -> FeedResult<ExerciseBatch> {
        self.requests.lock().push(request.clone());
        let limit = request.exercise_limit.unwrap_or(self.exercises.len());
        Ok(ExerciseBatch {
            exercises: self.exercises.iter().take(limit).cloned().collect(),
        })
    }

    fn report_answer(&self, _caller: &Caller, report: &AnswerReport) -> FeedResult<()> {
        self.reports.lock().push(*report);
        Ok(())
    }
}

/// In-memory personal dictionary. A gate, when installed, blocks listing
/// calls until it yields.
#[derive(Default)]
pub struct MockDictionaryService {
    entries: Mutex<Vec<DictionaryEntry>>,
    failing: Mutex<bool>,
    next_id: Mutex<usize>,
    gate: Option<Receiver<()>>,
}

impl MockDictionaryService {
    pub fn new(entries: Vec<DictionaryEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
            ..Default::default()
        }
    }

    pub fn gated(entries: Vec<DictionaryEntry>, gate: Receiver<()>) -> Self {
        Self {
            entries: Mutex::new(entries),
            gate: Some(gate),
            ..Default::default()
        }
    }

    pub fn fail(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    fn check(&self) -> FeedResult<()> {
        if *self.failing.lock() {
            return Err(FeedError::network("dictionary unavailable"));
        }
        Ok(())
    }
}

impl DictionaryService for MockDictionaryService {
    fn entries(&self, _caller: &Caller) -> FeedResult<Vec<DictionaryEntry>> {
        if let Some(gate) = self.gate.as_ref() {
            let _ = gate.recv();
        }
        self.check()?;
        Ok(self.entries.lock().clone())
    }

    fn add_entry(
        &self,
        _caller: &Caller,
        entry: &NewDictionaryEntry,
    ) -> FeedResult<DictionaryEntry> {
        self.check()?;
        let id = {
            let mut next = self.next_id.lock();
            *next += 1;
            format!("new-{}", *next)
        };
        let saved = DictionaryEntry {
            id,
            word: entry.word.clone(),
            translation: entry.translation.clone(),
            transcription: entry.transcription.clone(),
            part_of_speech: entry.part_of_speech.clone(),
            audio_url: entry.audio_url.clone(),
            source_lang: entry.source_lang.clone().unwrap_or_else(|| "en".into()),
            target_lang: entry.target_lang.clone().unwrap_or_else(|| "ru".into()),
            created_at: "2024-05-01T10:00:00Z".into(),
            updated_at: "2024-05-01T10:00:00Z".into(),
        };
        self.entries.lock().insert(0, saved.clone());
        Ok(saved)
    }

    fn delete_entry(&self, _caller: &Caller, id: &str) -> FeedResult<()> {
        self.check()?;
        self.entries.lock().retain(|entry| entry.id != id);
        Ok(())
    }
}

pub struct MockWordIndex {
    forms: HashMap<String, i64>,
    loads: Mutex<usize>,
}

impl MockWordIndex {
    pub fn new(forms: HashMap<String, i64>) -> Self {
        Self {
            forms,
            loads: Mutex::new(0),
        }
    }

    pub fn loads(&self) -> usize {
        *self.loads.lock()
    }
}

impl WordIndexSource for MockWordIndex {
    fn load_index(&self) -> FeedResult<HashMap<String, i64>> {
        *self.loads.lock() += 1;
        Ok(self.forms.clone())
    }
}

#[derive(Default)]
pub struct MockAuthService;

impl AuthService for MockAuthService {
    fn login(&self, email: &str, _password: &str) -> FeedResult<AuthResponse> {
        Ok(mock_auth(email, "Lingofeed Learner", UserRole::User))
    }

    fn register(&self, email: &str, _password: &str, full_name: &str) -> FeedResult<AuthResponse> {
        Ok(mock_auth(email, full_name, UserRole::User))
    }

    fn telegram(&self, init_data: &str) -> FeedResult<AuthResponse> {
        if init_data.trim().is_empty() {
            return Err(FeedError::Unauthenticated);
        }
        Ok(mock_auth("telegram@lingofeed", "Telegram Learner", UserRole::User))
    }
}

fn mock_auth(email: &str, full_name: &str, role: UserRole) -> AuthResponse {
    AuthResponse {
        tokens: AuthTokens {
            access_token: "mock-access".into(),
            refresh_token: "mock-refresh".into(),
        },
        profile: UserProfile {
            id: format!("user-{}", email.split('@').next().unwrap_or("anon")),
            email: email.into(),
            full_name: full_name.into(),
            role,
            avatar_url: None,
            streak_days: 0,
            completed_lessons: 0,
            level: "A2".into(),
            xp_points: 0,
        },
    }
}

const SAMPLE_LINES: [(&str, &str); 4] = [
    ("Good morning, how are you today?", "Доброе утро, как ты сегодня?"),
    ("I would like a cup of coffee.", "Я бы хотел чашку кофе."),
    (
        "The weather is lovely this afternoon.",
        "Погода чудесная сегодня днём.",
    ),
    (
        "Let's walk to the park together.",
        "Давай прогуляемся в парк вместе.",
    ),
];

pub fn sample_item(n: usize) -> FeedItem {
    let levels = [CefrLevel::A1, CefrLevel::A2, CefrLevel::B1, CefrLevel::B2];
    let speeds = [SpeechSpeed::Slow, SpeechSpeed::Normal, SpeechSpeed::Fast];
    FeedItem {
        id: format!("v{n}"),
        video_name: format!("Everyday English #{n}"),
        video_url: format!("https://cdn.lingofeed.test/v{n}.mp4"),
        duration_seconds: Some(8.0),
        analysis: Analysis {
            cefr_level: levels[n % levels.len()],
            speech_speed: speeds[n % speeds.len()],
            grammar_complexity: "simple".into(),
            vocabulary_complexity: "basic".into(),
            topics: vec!["daily life".into()],
        },
        status: WatchStatus::NotStarted,
        likes_count: (n % 7) as i64,
        is_liked: false,
        audio_level: None,
        created_at: "2024-05-01T10:00:00Z".into(),
        is_adult_content: false,
        is_moderated: true,
        author: Some("lingofeed".into()),
    }
}

pub fn sample_items(total: usize) -> Vec<FeedItem> {
    (0..total).map(sample_item).collect()
}

pub fn sample_detail(id: &str) -> ContentDetail {
    let mut original = Vec::new();
    let mut translated = Vec::new();
    for (idx, (en, ru)) in SAMPLE_LINES.iter().enumerate() {
        let start = idx as f64 * 2.0;
        original.push(TranscriptChunk::new(*en, start, start + 2.0));
        translated.push(TranscriptChunk::new(*ru, start, start + 2.0));
    }
    ContentDetail {
        id: id.to_string(),
        video_name: format!("Everyday English {id}"),
        transcription: Some(Transcript {
            text: SAMPLE_LINES.iter().map(|(en, _)| *en).collect::<Vec<_>>().join(" "),
            chunks: original,
        }),
        translation: Some(Transcript {
            text: SAMPLE_LINES.iter().map(|(_, ru)| *ru).collect::<Vec<_>>().join(" "),
            chunks: translated,
        }),
        word_chunks: Vec::new(),
        likes_count: 0,
        is_liked: false,
        cefr_level: Some(CefrLevel::A2),
        speech_speed: Some(SpeechSpeed::Normal),
        author: Some("lingofeed".into()),
        is_adult_content: false,
        is_moderated: true,
    }
}

pub fn sample_dictionary_entry(id: &str, word: &str, translation: &str) -> DictionaryEntry {
    DictionaryEntry {
        id: id.into(),
        word: word.into(),
        translation: translation.into(),
        transcription: None,
        part_of_speech: Some("noun".into()),
        audio_url: None,
        source_lang: "en".into(),
        target_lang: "ru".into(),
        created_at: "2024-05-01T10:00:00Z".into(),
        updated_at: "2024-05-01T10:00:00Z".into(),
    }
}

pub fn sample_word_index() -> HashMap<String, i64> {
    [
        ("morning", 101),
        ("coffee", 102),
        ("weather", 103),
        ("lovely", 104),
        ("park", 105),
        ("walk", 106),
        ("cup", 107),
    ]
    .into_iter()
    .map(|(form, id)| (form.to_string(), id))
    .collect()
}

pub fn sample_exercises() -> Vec<ExerciseItem> {
    [
        (101, "morning", "утро", ["утро", "вечер", "ночь"]),
        (102, "coffee", "кофе", ["чай", "кофе", "сок"]),
        (107, "cup", "чашка", ["тарелка", "ложка", "чашка"]),
    ]
    .into_iter()
    .map(|(word_id, word, answer, options)| ExerciseItem {
        word_id,
        word: word.into(),
        part_of_speech: Some("noun".into()),
        direction: ExerciseDirection::EnRu,
        prompt: word.into(),
        correct_answer: answer.into(),
        options: options.iter().map(|s| s.to_string()).collect(),
        translations: vec![answer.into()],
        progress: ExerciseProgress::default(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FilterSet;

    fn query(cursor: Option<&str>) -> FeedQuery {
        FeedQuery {
            cursor: cursor.map(str::to_string),
            limit: 5,
            filters: FilterSet::default(),
        }
    }

    #[test]
    fn paged_mock_walks_catalog() {
        let svc = MockFeedService::paged(sample_items(12), 5);
        let first = svc.load_page(&Caller::default(), &query(None)).unwrap();
        assert_eq!(first.items.len(), 5);
        assert_eq!(first.next_cursor.as_deref(), Some("c1"));
        let last = svc.load_page(&Caller::default(), &query(Some("c2"))).unwrap();
        assert_eq!(last.items.len(), 2);
        assert!(last.next_cursor.is_none());
        assert!(!last.has_more);
        assert_eq!(svc.queries().len(), 2);
    }

    #[test]
    fn scripted_pages_take_priority() {
        let svc = MockFeedService::scripted(vec![Err(FeedError::network("offline"))]);
        let err = svc.load_page(&Caller::default(), &query(None)).unwrap_err();
        assert_eq!(err.to_string(), "offline");
    }

    #[test]
    fn sample_detail_has_aligned_transcripts() {
        let detail = sample_detail("v1");
        assert_eq!(
            detail.transcript_chunks().len(),
            detail.translation_chunks().len()
        );
    }
}
