pub mod csrf;

use async_trait::async_trait;
use log::{ debug, info };
use reqwest::Client as HttpClient;
use reqwest::header::COOKIE;
use reqwest::{ RequestBuilder, Response };
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::time::Duration;
use url::Url;

use crate::error::{ ChatError, Result };
use crate::models::api::{
    ChatContext,
    ChatRequest,
    CodeReviewRequest,
    HistoryEntry,
    HistoryResponse,
    StatusReport,
    SuggestionRequest,
    TextReply,
};
use self::csrf::{ csrf_token, CSRF_HEADER };

pub const CHAT_ROUTE: &str = "api/v1/sister/chat/";
pub const HISTORY_ROUTE: &str = "api/v1/sister/history/";
pub const CODE_REVIEW_ROUTE: &str = "api/v1/sister/code-review/";
pub const SUGGESTION_ROUTE: &str = "api/v1/sister/suggestion/";
pub const STATUS_ROUTE: &str = "api/status/";

/// The assistant backend as seen by a chat session.
#[async_trait]
pub trait SisterApi: Send + Sync {
    async fn send_chat(&self, message: &str, context: ChatContext) -> Result<String>;

    async fn fetch_history(&self) -> Result<Vec<HistoryEntry>>;

    async fn code_review(&self, code: &str, language: &str) -> Result<String>;

    async fn suggestion(&self, project_info: &JsonValue) -> Result<String>;

    async fn status(&self) -> Result<StatusReport>;
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    /// Raw `Cookie` header value; also the source of the CSRF token.
    pub cookie: String,
    pub request_timeout: Option<Duration>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            cookie: String::new(),
            request_timeout: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpSisterApi {
    http: HttpClient,
    base_url: Url,
    cookie: String,
}

impl HttpSisterApi {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut builder = HttpClient::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Self::with_client(http, config)
    }

    pub fn with_client(http: HttpClient, config: &ApiConfig) -> Result<Self> {
        let mut raw = config.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base_url = Url::parse(&raw)?;
        info!("Sister API base URL: {}", base_url);
        Ok(Self {
            http,
            base_url,
            cookie: config.cookie.clone(),
        })
    }

    pub fn endpoint(&self, route: &str) -> Result<Url> {
        Ok(self.base_url.join(route)?)
    }

    fn with_cookie(&self, req: RequestBuilder) -> RequestBuilder {
        if self.cookie.is_empty() { req } else { req.header(COOKIE, self.cookie.as_str()) }
    }

    async fn post_for_text<B: serde::Serialize + ?Sized>(
        &self,
        route: &str,
        body: &B
    ) -> Result<String> {
        let url = self.endpoint(route)?;
        debug!("POST {}", url);
        let req = self.http
            .post(url)
            .header(CSRF_HEADER, csrf_token(&self.cookie))
            .json(body);
        let resp = self.with_cookie(req).send().await?;
        let reply: TextReply = decode_body(resp).await?;
        reply.response.ok_or(ChatError::MissingField("response"))
    }

    async fn get_json<T: DeserializeOwned>(&self, route: &str) -> Result<T> {
        let url = self.endpoint(route)?;
        debug!("GET {}", url);
        let resp = self.with_cookie(self.http.get(url)).send().await?;
        decode_body(resp).await
    }
}

async fn decode_body<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        return Err(ChatError::Status(status));
    }
    let text = resp.text().await?;
    Ok(serde_json::from_str(&text)?)
}

#[async_trait]
impl SisterApi for HttpSisterApi {
    async fn send_chat(&self, message: &str, context: ChatContext) -> Result<String> {
        let req = ChatRequest {
            message: message.to_string(),
            context,
        };
        self.post_for_text(CHAT_ROUTE, &req).await
    }

    async fn fetch_history(&self) -> Result<Vec<HistoryEntry>> {
        let body: HistoryResponse = self.get_json(HISTORY_ROUTE).await?;
        Ok(body.history)
    }

    async fn code_review(&self, code: &str, language: &str) -> Result<String> {
        let req = CodeReviewRequest {
            code: code.to_string(),
            language: language.to_string(),
        };
        self.post_for_text(CODE_REVIEW_ROUTE, &req).await
    }

    async fn suggestion(&self, project_info: &JsonValue) -> Result<String> {
        let req = SuggestionRequest {
            project_info: project_info.clone(),
        };
        self.post_for_text(SUGGESTION_ROUTE, &req).await
    }

    async fn status(&self) -> Result<StatusReport> {
        self.get_json(STATUS_ROUTE).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(base: &str) -> HttpSisterApi {
        HttpSisterApi::new(&ApiConfig {
            base_url: base.to_string(),
            ..ApiConfig::default()
        }).unwrap()
    }

    #[test]
    fn endpoints_join_under_base_path() {
        let api = api("http://localhost:8000/app");
        assert_eq!(
            api.endpoint(CHAT_ROUTE).unwrap().as_str(),
            "http://localhost:8000/app/api/v1/sister/chat/"
        );
        assert_eq!(
            api.endpoint(STATUS_ROUTE).unwrap().as_str(),
            "http://localhost:8000/app/api/status/"
        );
    }

    #[test]
    fn rejects_garbage_base_url() {
        let err = HttpSisterApi::new(&ApiConfig {
            base_url: "not a url".to_string(),
            ..ApiConfig::default()
        }).unwrap_err();
        assert!(matches!(err, ChatError::InvalidUrl(_)));
    }
}
