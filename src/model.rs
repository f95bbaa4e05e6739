use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CefrLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl CefrLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CefrLevel::A1 => "A1",
            CefrLevel::A2 => "A2",
            CefrLevel::B1 => "B1",
            CefrLevel::B2 => "B2",
            CefrLevel::C1 => "C1",
            CefrLevel::C2 => "C2",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "A1" => Some(CefrLevel::A1),
            "A2" => Some(CefrLevel::A2),
            "B1" => Some(CefrLevel::B1),
            "B2" => Some(CefrLevel::B2),
            "C1" => Some(CefrLevel::C1),
            "C2" => Some(CefrLevel::C2),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechSpeed {
    Slow,
    Normal,
    Fast,
}

impl SpeechSpeed {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpeechSpeed::Slow => "slow",
            SpeechSpeed::Normal => "normal",
            SpeechSpeed::Fast => "fast",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "slow" => Some(SpeechSpeed::Slow),
            "normal" => Some(SpeechSpeed::Normal),
            "fast" => Some(SpeechSpeed::Fast),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WatchStatus {
    #[default]
    NotStarted,
    Watched,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub cefr_level: CefrLevel,
    pub speech_speed: SpeechSpeed,
    #[serde(default)]
    pub grammar_complexity: String,
    #[serde(default)]
    pub vocabulary_complexity: String,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// One video's summary as it appears in the scrolling list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub id: String,
    pub video_name: String,
    pub video_url: String,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    pub analysis: Analysis,
    #[serde(default)]
    pub status: WatchStatus,
    #[serde(default)]
    pub likes_count: i64,
    #[serde(default)]
    pub is_liked: bool,
    #[serde(default)]
    pub audio_level: Option<f64>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub is_adult_content: bool,
    #[serde(default)]
    pub is_moderated: bool,
    #[serde(default)]
    pub author: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    #[serde(default)]
    pub items: Vec<FeedItem>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

/// A timestamped transcript segment. On the wire the bounds travel as
/// `timestamp: [start, end]`; an open end collapses onto the start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptChunk {
    pub text: String,
    pub timestamp: (f64, Option<f64>),
}

impl TranscriptChunk {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            timestamp: (start, Some(end)),
        }
    }

    pub fn start(&self) -> f64 {
        self.timestamp.0
    }

    pub fn end(&self) -> f64 {
        self.timestamp.1.unwrap_or(self.timestamp.0)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Transcript {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub chunks: Vec<TranscriptChunk>,
}

/// The full per-video payload fetched when a card comes into view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDetail {
    pub id: String,
    #[serde(default)]
    pub video_name: String,
    #[serde(default)]
    pub transcription: Option<Transcript>,
    #[serde(default)]
    pub translation: Option<Transcript>,
    #[serde(default)]
    pub word_chunks: Vec<TranscriptChunk>,
    #[serde(default)]
    pub likes_count: i64,
    #[serde(default)]
    pub is_liked: bool,
    #[serde(default)]
    pub cefr_level: Option<CefrLevel>,
    #[serde(default)]
    pub speech_speed: Option<SpeechSpeed>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub is_adult_content: bool,
    #[serde(default)]
    pub is_moderated: bool,
}

impl ContentDetail {
    pub fn transcript_chunks(&self) -> &[TranscriptChunk] {
        self.transcription
            .as_ref()
            .map(|t| t.chunks.as_slice())
            .unwrap_or_default()
    }

    pub fn translation_chunks(&self) -> &[TranscriptChunk] {
        self.translation
            .as_ref()
            .map(|t| t.chunks.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeState {
    pub likes_count: i64,
    pub is_liked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationFilter {
    #[default]
    All,
    Moderated,
    Unmoderated,
}

impl ModerationFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationFilter::All => "all",
            ModerationFilter::Moderated => "moderated",
            ModerationFilter::Unmoderated => "unmoderated",
        }
    }
}

/// User-chosen feed constraints. `None` level/speed lists mean "any".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    #[serde(default)]
    pub cefr_levels: Option<Vec<CefrLevel>>,
    #[serde(default)]
    pub speech_speeds: Option<Vec<SpeechSpeed>>,
    #[serde(default = "default_true")]
    pub show_english_subtitles: bool,
    #[serde(default = "default_true")]
    pub show_russian_subtitles: bool,
    #[serde(default = "default_true")]
    pub show_adult_content: bool,
    #[serde(default)]
    pub moderation_filter: ModerationFilter,
}

impl Default for FilterSet {
    fn default() -> Self {
        Self {
            cefr_levels: None,
            speech_speeds: None,
            show_english_subtitles: true,
            show_russian_subtitles: true,
            show_adult_content: true,
            moderation_filter: ModerationFilter::All,
        }
    }
}

impl FilterSet {
    /// Whether switching from `self` to `other` changes what the server
    /// returns. Subtitle toggles only affect rendering.
    pub fn affects_query(&self, other: &FilterSet) -> bool {
        self.cefr_levels != other.cefr_levels
            || self.speech_speeds != other.speech_speeds
            || self.show_adult_content != other.show_adult_content
            || self.moderation_filter != other.moderation_filter
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    #[default]
    User,
    Admin,
    Moderator,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "USER",
            UserRole::Admin => "ADMIN",
            UserRole::Moderator => "MODERATOR",
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Moderator)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub streak_days: i64,
    #[serde(default)]
    pub completed_lessons: i64,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub xp_points: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub tokens: AuthTokens,
    pub profile: UserProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExerciseDirection {
    #[serde(rename = "en-ru")]
    EnRu,
    #[serde(rename = "ru-en")]
    RuEn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    #[default]
    New,
    Learning,
    Known,
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseProgress {
    #[serde(default)]
    pub status: ProgressStatus,
    #[serde(default)]
    pub touches_total: i64,
    #[serde(default)]
    pub touches_correct: i64,
    #[serde(default)]
    pub streak: i64,
    #[serde(default)]
    pub added_to_vocab: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseItem {
    pub word_id: i64,
    #[serde(default)]
    pub word: String,
    #[serde(default)]
    pub part_of_speech: Option<String>,
    pub direction: ExerciseDirection,
    pub prompt: String,
    pub correct_answer: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub translations: Vec<String>,
    #[serde(default)]
    pub progress: ExerciseProgress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseRequest {
    pub word_ids: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exercise_limit: Option<usize>,
    /// Sent only when the card id is numeric.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExerciseBatch {
    #[serde(default)]
    pub exercises: Vec<ExerciseItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerReport {
    pub word_id: i64,
    pub is_correct: bool,
}

/// A single-field moderation write. Each variant maps to its own endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationUpdate {
    CefrLevel(CefrLevel),
    SpeechSpeed(SpeechSpeed),
    Author(String),
    Adult(bool),
    Moderated(bool),
}

impl ModerationUpdate {
    pub fn path_segment(&self) -> &'static str {
        match self {
            ModerationUpdate::CefrLevel(_) => "cefr-level",
            ModerationUpdate::SpeechSpeed(_) => "speech-speed",
            ModerationUpdate::Author(_) => "author",
            ModerationUpdate::Adult(_) => "adult",
            ModerationUpdate::Moderated(_) => "status",
        }
    }

    pub fn body(&self) -> serde_json::Value {
        match self {
            ModerationUpdate::CefrLevel(level) => serde_json::json!({ "cefrLevel": level }),
            ModerationUpdate::SpeechSpeed(speed) => serde_json::json!({ "speechSpeed": speed }),
            ModerationUpdate::Author(author) => serde_json::json!({ "author": author }),
            ModerationUpdate::Adult(flag) => serde_json::json!({ "isAdultContent": flag }),
            ModerationUpdate::Moderated(flag) => serde_json::json!({ "isModerated": flag }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub username: String,
}

/// A word the member saved to their personal dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictionaryEntry {
    pub id: String,
    pub word: String,
    pub translation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_of_speech: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    pub source_lang: String,
    pub target_lang: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDictionaryEntry {
    pub word: String,
    pub translation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_of_speech: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_lang: Option<String>,
}
