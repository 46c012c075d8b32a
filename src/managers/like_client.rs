//! Client for the upstream likes API.
//!
//! Looks a player up in the primary region and retries once in the
//! fallback region when the primary reports the player as not found.

use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::LikeApiSettings;
use crate::error::{BotError, Result};
use crate::models::{LikeLookupResult, LikeSuccess};

const PLAYER_NOT_FOUND: &str = "PLAYER_NOT_FOUND";

/// Body returned by `GET /likes`. Display fields are loosely typed
/// because the API mixes numbers and strings.
#[derive(Debug, Default, Deserialize)]
struct LikeApiResponse {
    status: Option<Value>,
    error: Option<String>,
    nickname: Option<Value>,
    region: Option<Value>,
    level: Option<Value>,
    exp: Option<Value>,
    likes_antes: Option<Value>,
    likes_depois: Option<Value>,
    sent: Option<Value>,
}

impl LikeApiResponse {
    fn status_code(&self) -> Option<i64> {
        match self.status.as_ref()? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn is_player_not_found(&self) -> bool {
        self.status_code() == Some(404) && self.error.as_deref() == Some(PLAYER_NOT_FOUND)
    }
}

/// What a single region request produced
#[derive(Debug)]
enum RegionResponse {
    Found(LikeApiResponse),
    NotFound,
    Status(u16),
    Malformed,
}

pub struct LikeClient {
    http: reqwest::Client,
    settings: LikeApiSettings,
}

impl LikeClient {
    pub fn new(settings: LikeApiSettings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &settings.api_key {
            headers.insert("x-rapidapi-key", header_value("RAPIDAPI_KEY", key)?);
            if let Some(host) = &settings.api_key_host {
                headers.insert("x-rapidapi-host", header_value("RAPIDAPI_HOST", host)?);
            }
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| BotError::HttpClient { source: e })?;

        Ok(Self { http, settings })
    }

    pub fn settings(&self) -> &LikeApiSettings {
        &self.settings
    }

    /// Look the player up, falling back to the secondary region on "not found".
    /// Never fails: transport problems come back as `Timeout`/`UpstreamError`.
    pub async fn lookup_player(&self, uid: &str) -> LikeLookupResult {
        let primary = &self.settings.primary_region;
        let body = match self.fetch_region(uid, primary).await {
            Ok(RegionResponse::Found(body)) => body,
            Ok(RegionResponse::NotFound) => {
                let fallback = &self.settings.fallback_region;
                info!(
                    "Player {} not found in region '{}', retrying in '{}'",
                    uid, primary, fallback
                );
                match self.fetch_region(uid, fallback).await {
                    Ok(RegionResponse::Found(body)) => body,
                    Ok(RegionResponse::NotFound) => {
                        return LikeLookupResult::PlayerNotFound {
                            uid: uid.to_string(),
                        }
                    }
                    Ok(RegionResponse::Status(code)) => {
                        return LikeLookupResult::UpstreamError {
                            status_code: Some(code),
                        }
                    }
                    Ok(RegionResponse::Malformed) => {
                        return LikeLookupResult::UpstreamError { status_code: None }
                    }
                    Err(e) => return transport_failure(e),
                }
            }
            Ok(RegionResponse::Status(429)) => return LikeLookupResult::RateLimited,
            Ok(RegionResponse::Status(code)) => {
                return LikeLookupResult::UpstreamError {
                    status_code: Some(code),
                }
            }
            Ok(RegionResponse::Malformed) => {
                return LikeLookupResult::UpstreamError { status_code: None }
            }
            Err(e) => return transport_failure(e),
        };

        classify(uid, body)
    }

    async fn fetch_region(
        &self,
        uid: &str,
        region: &str,
    ) -> std::result::Result<RegionResponse, reqwest::Error> {
        let url = format!("{}/likes", self.settings.api_host);
        let amount = self.settings.amount_of_likes.to_string();

        debug!("GET {} uid={} region={}", url, uid, region);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("uid", uid),
                ("amount_of_likes", amount.as_str()),
                ("auth", self.settings.auth.as_str()),
                ("region", region),
            ])
            .send()
            .await?;

        let status = response.status().as_u16();
        match status {
            404 => return Ok(RegionResponse::NotFound),
            200 => {}
            _ => {
                let text = response.text().await.unwrap_or_default();
                error!("Like API error ({}): {} - {}", region, status, text);
                return Ok(RegionResponse::Status(status));
            }
        }

        let text = response.text().await?;
        match serde_json::from_str::<LikeApiResponse>(&text) {
            Ok(body) if body.is_player_not_found() => Ok(RegionResponse::NotFound),
            Ok(body) => Ok(RegionResponse::Found(body)),
            Err(e) => {
                error!("Like API returned an unreadable body ({}): {} - {}", region, e, text);
                Ok(RegionResponse::Malformed)
            }
        }
    }
}

/// Turn an effective response body into a result
fn classify(uid: &str, body: LikeApiResponse) -> LikeLookupResult {
    let nickname = display(&body.nickname, "Unknown");

    if body.status_code() != Some(200) {
        debug!(
            "Like API reported status {:?} for {}, treating as daily limit reached",
            body.status_code(),
            uid
        );
        return LikeLookupResult::AlreadyMaxedToday { nickname };
    }

    let sent = display(&body.sent, "0 likes");
    if sent.starts_with('0') {
        return LikeLookupResult::AlreadyMaxedToday { nickname };
    }

    LikeLookupResult::Success(LikeSuccess {
        uid: uid.to_string(),
        nickname,
        region: display(&body.region, "Unknown"),
        level: display(&body.level, "N/A"),
        exp: display(&body.exp, "N/A"),
        likes_before: display(&body.likes_antes, "N/A"),
        likes_after: display(&body.likes_depois, "N/A"),
        sent_count: sent,
    })
}

fn display(value: &Option<Value>, default: &str) -> String {
    match value {
        None | Some(Value::Null) => default.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn transport_failure(e: reqwest::Error) -> LikeLookupResult {
    if e.is_timeout() {
        warn!("Like API request timed out: {}", e);
        LikeLookupResult::Timeout
    } else {
        error!("Like API request failed: {}", e);
        LikeLookupResult::UpstreamError { status_code: None }
    }
}

fn header_value(key: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| BotError::ConfigValidation {
        message: format!("{} contains characters not allowed in an HTTP header", key),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::Server) -> LikeClient {
        LikeClient::new(LikeApiSettings {
            api_host: server.url(),
            api_key: None,
            api_key_host: None,
            ..Default::default()
        })
        .unwrap()
    }

    fn region_query(uid: &str, region: &str) -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("uid".into(), uid.into()),
            Matcher::UrlEncoded("amount_of_likes".into(), "100".into()),
            Matcher::UrlEncoded("auth".into(), "vortex".into()),
            Matcher::UrlEncoded("region".into(), region.into()),
        ])
    }

    #[tokio::test]
    async fn test_success_from_primary_region() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/likes")
            .match_query(region_query("123456", "br"))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "status": 200,
                    "nickname": "Player",
                    "region": "BR",
                    "level": 60,
                    "exp": 123456,
                    "likes_antes": 1000,
                    "likes_depois": 1100,
                    "sent": "100 likes"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let result = client_for(&server).lookup_player("123456").await;

        assert_eq!(
            result,
            LikeLookupResult::Success(LikeSuccess {
                uid: "123456".to_string(),
                nickname: "Player".to_string(),
                region: "BR".to_string(),
                level: "60".to_string(),
                exp: "123456".to_string(),
                likes_before: "1000".to_string(),
                likes_after: "1100".to_string(),
                sent_count: "100 likes".to_string(),
            })
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_not_found_body_falls_back_to_secondary_region() {
        let mut server = mockito::Server::new_async().await;
        let primary = server
            .mock("GET", "/likes")
            .match_query(region_query("123456", "br"))
            .with_status(200)
            .with_body(r#"{"status":404,"error":"PLAYER_NOT_FOUND"}"#)
            .create_async()
            .await;
        let fallback = server
            .mock("GET", "/likes")
            .match_query(region_query("123456", "ind"))
            .with_status(200)
            .with_body(r#"{"status":200,"sent":"50 likes","nickname":"Remote","region":"IND"}"#)
            .create_async()
            .await;

        let result = client_for(&server).lookup_player("123456").await;

        match result {
            LikeLookupResult::Success(success) => {
                assert_eq!(success.nickname, "Remote");
                assert_eq!(success.region, "IND");
                assert_eq!(success.sent_count, "50 likes");
                assert_eq!(success.likes_before, "N/A");
            }
            other => panic!("expected success, got {:?}", other),
        }
        primary.assert_async().await;
        fallback.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_404_on_both_regions_is_player_not_found() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/likes")
            .match_query(Matcher::Any)
            .with_status(404)
            .expect(2)
            .create_async()
            .await;

        let result = client_for(&server).lookup_player("654321").await;

        assert_eq!(
            result,
            LikeLookupResult::PlayerNotFound {
                uid: "654321".to_string()
            }
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fallback_server_error_is_upstream_error() {
        let mut server = mockito::Server::new_async().await;
        let _primary = server
            .mock("GET", "/likes")
            .match_query(region_query("123456", "br"))
            .with_status(404)
            .create_async()
            .await;
        let _fallback = server
            .mock("GET", "/likes")
            .match_query(region_query("123456", "ind"))
            .with_status(503)
            .create_async()
            .await;

        let result = client_for(&server).lookup_player("123456").await;
        assert_eq!(
            result,
            LikeLookupResult::UpstreamError {
                status_code: Some(503)
            }
        );
    }

    #[tokio::test]
    async fn test_zero_sent_is_already_maxed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/likes")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"status":200,"sent":"0 likes","nickname":"X"}"#)
            .create_async()
            .await;

        let result = client_for(&server).lookup_player("123456").await;
        assert_eq!(
            result,
            LikeLookupResult::AlreadyMaxedToday {
                nickname: "X".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_rate_limit_skips_fallback() {
        let mut server = mockito::Server::new_async().await;
        let primary = server
            .mock("GET", "/likes")
            .match_query(region_query("123456", "br"))
            .with_status(429)
            .create_async()
            .await;
        let fallback = server
            .mock("GET", "/likes")
            .match_query(region_query("123456", "ind"))
            .expect(0)
            .create_async()
            .await;

        let result = client_for(&server).lookup_player("123456").await;

        assert_eq!(result, LikeLookupResult::RateLimited);
        primary.assert_async().await;
        fallback.assert_async().await;
    }

    #[tokio::test]
    async fn test_other_primary_status_is_upstream_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/likes")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let result = client_for(&server).lookup_player("123456").await;
        assert_eq!(
            result,
            LikeLookupResult::UpstreamError {
                status_code: Some(500)
            }
        );
    }

    #[tokio::test]
    async fn test_unreadable_body_is_upstream_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/likes")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let result = client_for(&server).lookup_player("123456").await;
        assert_eq!(result, LikeLookupResult::UpstreamError { status_code: None });
    }

    #[tokio::test]
    async fn test_api_key_headers_are_sent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/likes")
            .match_query(Matcher::Any)
            .match_header("x-rapidapi-key", "secret")
            .match_header("x-rapidapi-host", "likes.example")
            .with_status(200)
            .with_body(r#"{"status":200,"sent":"100 likes"}"#)
            .create_async()
            .await;

        let client = LikeClient::new(LikeApiSettings {
            api_host: server.url(),
            api_key: Some("secret".to_string()),
            api_key_host: Some("likes.example".to_string()),
            ..Default::default()
        })
        .unwrap();

        assert!(matches!(
            client.lookup_player("123456").await,
            LikeLookupResult::Success(_)
        ));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_connection_failure_is_upstream_error() {
        let client = LikeClient::new(LikeApiSettings {
            api_host: "http://127.0.0.1:1".to_string(),
            timeout_secs: 2,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(
            client.lookup_player("123456").await,
            LikeLookupResult::UpstreamError { status_code: None }
        );
    }

    #[tokio::test]
    async fn test_silent_server_is_timeout() {
        // Accepts connections and never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let silent = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = LikeClient::new(LikeApiSettings {
            api_host: format!("http://{}", addr),
            timeout_secs: 1,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(client.lookup_player("123456").await, LikeLookupResult::Timeout);
        silent.abort();
    }

    #[test]
    fn test_missing_display_fields_use_defaults() {
        let body: LikeApiResponse = serde_json::from_str(r#"{"status":200,"sent":"7 likes"}"#).unwrap();

        match classify("123456", body) {
            LikeLookupResult::Success(success) => {
                assert_eq!(success.nickname, "Unknown");
                assert_eq!(success.region, "Unknown");
                assert_eq!(success.level, "N/A");
                assert_eq!(success.likes_after, "N/A");
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_sent_counts_as_zero() {
        let body: LikeApiResponse = serde_json::from_str(r#"{"status":200,"nickname":"Y"}"#).unwrap();
        assert_eq!(
            classify("123456", body),
            LikeLookupResult::AlreadyMaxedToday {
                nickname: "Y".to_string()
            }
        );
    }

    #[test]
    fn test_string_status_is_accepted() {
        let body: LikeApiResponse =
            serde_json::from_str(r#"{"status":"404","error":"PLAYER_NOT_FOUND"}"#).unwrap();
        assert!(body.is_player_not_found());
    }
}
