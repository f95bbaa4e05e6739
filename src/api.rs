use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::error::{FeedError, FeedResult};
use crate::model::{
    AnswerReport, AuthResponse, Author, ContentDetail, DictionaryEntry, ExerciseBatch,
    ExerciseRequest, FeedPage, FilterSet, LikeState, ModerationUpdate, NewDictionaryEntry,
    UserRole,
};

pub const DEFAULT_API_BASE: &str = "https://api.slothary.ru/api";

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Option<Duration>,
    pub http_client: Option<HttpClient>,
}

/// Who a request is made on behalf of. Guests carry only a user id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Option<String>,
    pub role: Option<UserRole>,
    pub access_token: Option<String>,
}

impl Caller {
    pub fn guest(id: impl Into<String>) -> Self {
        Self {
            user_id: Some(id.into()),
            role: None,
            access_token: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    pub cursor: Option<String>,
    pub limit: usize,
    pub filters: FilterSet,
}

pub struct Client {
    http: HttpClient,
    user_agent: String,
    base_url: String,
}

impl Client {
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        if config.user_agent.trim().is_empty() {
            anyhow::bail!("api client user agent required");
        }
        let base = if config.base_url.trim().is_empty() {
            DEFAULT_API_BASE.to_string()
        } else {
            config.base_url.trim().trim_end_matches('/').to_string()
        };
        Url::parse(&base).map_err(|err| anyhow::anyhow!("invalid api base url {base}: {err}"))?;

        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout.unwrap_or(Duration::from_secs(20)))
                .build()?,
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
            base_url: base,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn feed(&self, caller: &Caller, query: &FeedQuery) -> FeedResult<FeedPage> {
        let url = self.feed_url(query)?;
        self.send(Method::GET, url, caller, None::<&()>)
    }

    pub fn content(&self, caller: &Caller, id: &str) -> FeedResult<ContentDetail> {
        let url = self.endpoint(&format!("video-learning/{id}"))?;
        self.send(Method::GET, url, caller, None::<&()>)
    }

    pub fn update_like(&self, caller: &Caller, id: &str, like: bool) -> FeedResult<LikeState> {
        let url = self.endpoint(&format!("video-learning/{id}/like"))?;
        let body = serde_json::json!({ "like": like });
        self.send(Method::POST, url, caller, Some(&body))
    }

    pub fn exercises(
        &self,
        caller: &Caller,
        request: &ExerciseRequest,
    ) -> FeedResult<ExerciseBatch> {
        let url = self.endpoint("exercises/for-content")?;
        self.send(Method::POST, url, caller, Some(request))
    }

    pub fn report_answer(&self, caller: &Caller, report: &AnswerReport) -> FeedResult<()> {
        let url = self.endpoint("exercises/answer")?;
        self.send_empty(Method::POST, url, caller, Some(report))
    }

    pub fn login(&self, email: &str, password: &str) -> FeedResult<AuthResponse> {
        let url = self.endpoint("auth/login")?;
        let body = serde_json::json!({ "email": email, "password": password });
        self.send(Method::POST, url, &Caller::default(), Some(&body))
    }

    pub fn register(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> FeedResult<AuthResponse> {
        let url = self.endpoint("auth/register")?;
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "fullName": full_name,
        });
        self.send(Method::POST, url, &Caller::default(), Some(&body))
    }

    pub fn telegram_auth(&self, init_data: &str) -> FeedResult<AuthResponse> {
        let url = self.endpoint("auth/telegram")?;
        let body = serde_json::json!({ "initData": init_data });
        self.send(Method::POST, url, &Caller::default(), Some(&body))
    }

    pub fn moderate(
        &self,
        caller: &Caller,
        id: &str,
        update: &ModerationUpdate,
    ) -> FeedResult<ContentDetail> {
        let url = self.endpoint(&format!(
            "video-learning/{id}/moderation/{}",
            update.path_segment()
        ))?;
        self.send(Method::PATCH, url, caller, Some(&update.body()))
    }

    pub fn delete_video(&self, caller: &Caller, id: &str) -> FeedResult<()> {
        let url = self.endpoint(&format!("video-learning/{id}"))?;
        self.send_empty(Method::DELETE, url, caller, None::<&()>)
    }

    pub fn authors(&self, caller: &Caller) -> FeedResult<Vec<Author>> {
        let url = self.endpoint("video-learning/authors")?;
        self.send(Method::GET, url, caller, None::<&()>)
    }

    pub fn dictionary(&self, caller: &Caller) -> FeedResult<Vec<DictionaryEntry>> {
        let url = self.endpoint("dictionary")?;
        self.send(Method::GET, url, caller, None::<&()>)
    }

    pub fn add_dictionary_entry(
        &self,
        caller: &Caller,
        entry: &NewDictionaryEntry,
    ) -> FeedResult<DictionaryEntry> {
        let url = self.endpoint("dictionary")?;
        self.send(Method::POST, url, caller, Some(entry))
    }

    pub fn delete_dictionary_entry(&self, caller: &Caller, id: &str) -> FeedResult<()> {
        let url = self.endpoint(&format!("dictionary/{id}"))?;
        self.send_empty(Method::DELETE, url, caller, None::<&()>)
    }

    /// Fetches a static JSON document such as the word-form index.
    pub fn word_index(&self, url: &str) -> FeedResult<HashMap<String, i64>> {
        let url = Url::parse(url).map_err(|err| FeedError::network(err.to_string()))?;
        self.send(Method::GET, url, &Caller::default(), None::<&()>)
    }

    fn endpoint(&self, path: &str) -> FeedResult<Url> {
        let full = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        Url::parse(&full).map_err(|err| FeedError::network(format!("invalid url {full}: {err}")))
    }

    fn feed_url(&self, query: &FeedQuery) -> FeedResult<Url> {
        let mut url = self.endpoint("video-learning/feed")?;
        {
            let mut pairs = url.query_pairs_mut();
            if query.limit > 0 {
                pairs.append_pair("limit", &query.limit.to_string());
            }
            if let Some(cursor) = query.cursor.as_deref() {
                pairs.append_pair("cursor", cursor);
            }
            let filters = &query.filters;
            if let Some(levels) = filters.cefr_levels.as_ref() {
                let joined = levels.iter().map(|l| l.as_str()).collect::<Vec<_>>().join(",");
                pairs.append_pair("cefrLevels", &joined);
            }
            if let Some(speeds) = filters.speech_speeds.as_ref() {
                let joined = speeds.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(",");
                pairs.append_pair("speechSpeeds", &joined);
            }
            pairs.append_pair("showAdultContent", &filters.show_adult_content.to_string());
            pairs.append_pair("moderationFilter", filters.moderation_filter.as_str());
        }
        Ok(url)
    }

    fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        caller: &Caller,
        body: Option<&B>,
    ) -> RequestBuilder {
        let mut builder = self
            .http
            .request(method, url)
            .header(USER_AGENT, &self.user_agent)
            .header(CONTENT_TYPE, "application/json");
        if let Some(id) = caller.user_id.as_deref() {
            builder = builder.header("x-user-id", id);
        }
        if let Some(role) = caller.role {
            builder = builder.header("x-user-role", role.as_str());
        }
        if let Some(token) = caller.access_token.as_deref() {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        builder
    }

    fn send<T, B>(
        &self,
        method: Method,
        url: Url,
        caller: &Caller,
        body: Option<&B>,
    ) -> FeedResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.dispatch(method, url, caller, body)?;
        let bytes = response.bytes()?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn send_empty<B>(
        &self,
        method: Method,
        url: Url,
        caller: &Caller,
        body: Option<&B>,
    ) -> FeedResult<()>
    where
        B: Serialize + ?Sized,
    {
        self.dispatch(method, url, caller, body).map(|_| ())
    }

    fn dispatch<B>(
        &self,
        method: Method,
        url: Url,
        caller: &Caller,
        body: Option<&B>,
    ) -> FeedResult<Response>
    where
        B: Serialize + ?Sized,
    {
        let path = url.path().to_string();
        debug!("api request {} {}", method, path);
        let response = self.request(method, url, caller, body).send()?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().unwrap_or_default();
        let message = error_message(status, &text);
        warn!("api request {} failed with {}: {}", path, status.as_u16(), message);
        Err(FeedError::Network(message))
    }
}

/// Picks the most useful message out of a failed response body.
pub fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = map.get("message") {
            return match message {
                serde_json::Value::String(text) => text.clone(),
                other => other.to_string(),
            };
        }
    }
    if body.trim().is_empty() {
        format!("Request failed with status {}", status.as_u16())
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CefrLevel, SpeechSpeed};

    fn client() -> Client {
        Client::new(ClientConfig {
            base_url: "https://api.example.test/api/".into(),
            user_agent: "lingofeed-test".into(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn rejects_blank_user_agent() {
        assert!(Client::new(ClientConfig::default()).is_err());
    }

    #[test]
    fn trims_trailing_slash_from_base() {
        assert_eq!(client().base_url(), "https://api.example.test/api");
    }

    #[test]
    fn feed_url_carries_cursor_and_filters() {
        let filters = FilterSet {
            cefr_levels: Some(vec![CefrLevel::A2, CefrLevel::B1]),
            speech_speeds: Some(vec![SpeechSpeed::Slow]),
            ..FilterSet::default()
        };
        let url = client()
            .feed_url(&FeedQuery {
                cursor: Some("c1".into()),
                limit: 20,
                filters,
            })
            .unwrap();
        let pairs: HashMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(url.path(), "/api/video-learning/feed");
        assert_eq!(pairs["limit"], "20");
        assert_eq!(pairs["cursor"], "c1");
        assert_eq!(pairs["cefrLevels"], "A2,B1");
        assert_eq!(pairs["speechSpeeds"], "slow");
        assert_eq!(pairs["moderationFilter"], "all");
    }

    #[test]
    fn dictionary_endpoints_sit_under_base() {
        let client = client();
        assert_eq!(
            client.endpoint("dictionary").unwrap().as_str(),
            "https://api.example.test/api/dictionary"
        );
        assert_eq!(
            client.endpoint(&format!("dictionary/{}", "d7")).unwrap().path(),
            "/api/dictionary/d7"
        );
    }

    #[test]
    fn first_page_has_no_cursor() {
        let url = client()
            .feed_url(&FeedQuery {
                cursor: None,
                limit: 20,
                filters: FilterSet::default(),
            })
            .unwrap();
        assert!(!url.query_pairs().any(|(k, _)| k == "cursor"));
    }

    #[test]
    fn error_message_prefers_json_message() {
        let msg = error_message(StatusCode::BAD_REQUEST, r#"{"message":"bad cursor"}"#);
        assert_eq!(msg, "bad cursor");
        let msg = error_message(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(msg, "upstream down");
        let msg = error_message(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert_eq!(msg, "Request failed with status 500");
    }
}
