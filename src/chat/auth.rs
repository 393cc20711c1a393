// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Chat account login
//!
//! Submits the login form and pulls the `api_token` and `session_id` cookies
//! out of the response. Both are sent back as a `Cookie` header on the
//! websocket upgrade.

use regex::Regex;
use reqwest::header::SET_COOKIE;
use reqwest::{redirect, Client};
use std::fmt;
use std::sync::LazyLock;

use crate::config::ChatConfig;
use crate::error::{AuthError, Result, WoodyError};

static API_TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"api_token=[^;]+").expect("valid api_token regex"));

static SESSION_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"session_id=[^;]+").expect("valid session_id regex"));

/// Headers that identify the bot on every request
pub fn identity_headers(chat: &ChatConfig) -> Vec<(&'static str, String)> {
    let mut headers = vec![
        ("User-Agent", chat.user_agent.clone()),
        ("Origin", chat.origin.clone()),
    ];
    if chat.dnt {
        headers.push(("DNT", "1".to_string()));
    }
    headers
}

/// Session cookies returned by a successful login
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// `api_token=<value>`
    api_token: String,
    /// `session_id=<value>`
    session_id: String,
}

impl Credentials {
    /// Extract both cookies from the `Set-Cookie` header values.
    pub fn from_set_cookie<'a>(values: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut api_token = None;
        let mut session_id = None;

        for value in values {
            if api_token.is_none() {
                api_token = API_TOKEN_PATTERN.find(value).map(|m| m.as_str().to_string());
            }
            if session_id.is_none() {
                session_id = SESSION_ID_PATTERN
                    .find(value)
                    .map(|m| m.as_str().to_string());
            }
        }

        Ok(Self {
            api_token: api_token.ok_or(AuthError::MissingToken("api_token"))?,
            session_id: session_id.ok_or(AuthError::MissingToken("session_id"))?,
        })
    }

    /// Value for the `Cookie` request header
    pub fn cookie_header(&self) -> String {
        format!("{}; {}", self.api_token, self.session_id)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_token", &"<redacted>")
            .field("session_id", &"<redacted>")
            .finish()
    }
}

/// Performs the login exchange
pub struct Authenticator {
    client: Client,
    login_url: String,
    name: String,
    password: String,
    headers: Vec<(&'static str, String)>,
}

impl Authenticator {
    pub fn new(chat: &ChatConfig, name: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        // The session cookies are set on the redirect response itself
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            login_url: format!("{}/login/submit", chat.base_url.trim_end_matches('/')),
            name: name.into(),
            password: password.into(),
            headers: identity_headers(chat),
        })
    }

    /// Account name the bot logs in as
    pub fn account_name(&self) -> &str {
        &self.name
    }

    /// Log in and return fresh session credentials.
    pub async fn authenticate(&self) -> Result<Credentials> {
        let form = [
            ("name", self.name.as_str()),
            ("password", self.password.as_str()),
            ("submit", "log+in"),
        ];

        let mut request = self.client.post(&self.login_url).form(&form);
        for (name, value) in &self.headers {
            request = request.header(*name, value);
        }

        let response = request.send().await.map_err(WoodyError::Http)?;
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(AuthError::Rejected {
                status: status.as_u16(),
            }
            .into());
        }

        let credentials = Credentials::from_set_cookie(
            response
                .headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|value| value.to_str().ok()),
        )?;

        tracing::debug!(status = status.as_u16(), "login succeeded");
        Ok(credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chat_config(base_url: &str) -> ChatConfig {
        ChatConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_credentials_from_single_header() {
        let credentials = Credentials::from_set_cookie([
            "api_token=abc123; Path=/; HttpOnly, session_id=xyz; Path=/",
        ])
        .unwrap();
        assert_eq!(credentials.cookie_header(), "api_token=abc123; session_id=xyz");
    }

    #[test]
    fn test_credentials_from_multiple_headers() {
        let credentials = Credentials::from_set_cookie([
            "session_id=s1; Path=/",
            "theme=dark",
            "api_token=t1; Secure",
        ])
        .unwrap();
        assert_eq!(credentials.cookie_header(), "api_token=t1; session_id=s1");
    }

    #[test]
    fn test_credentials_missing_token() {
        let err = Credentials::from_set_cookie(["session_id=s1"]).unwrap_err();
        assert!(err.to_string().contains("api_token"));

        let err = Credentials::from_set_cookie(["api_token=t1"]).unwrap_err();
        assert!(err.to_string().contains("session_id"));
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let credentials = Credentials::from_set_cookie(["api_token=secret; session_id=hidden"]).unwrap();
        let debug = format!("{:?}", credentials);
        assert!(!debug.contains("secret"));
        assert!(!debug.contains("hidden"));
    }

    #[test]
    fn test_identity_headers() {
        let mut chat = ChatConfig::default();
        let headers = identity_headers(&chat);
        assert!(headers.contains(&("User-Agent", "woody".to_string())));
        assert!(headers.contains(&("Origin", "https://deek.chat".to_string())));
        assert!(headers.contains(&("DNT", "1".to_string())));

        chat.dnt = false;
        assert!(!identity_headers(&chat).iter().any(|(name, _)| *name == "DNT"));
    }

    #[tokio::test]
    async fn test_authenticate_posts_form_and_reads_cookies() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/submit"))
            .and(header("User-Agent", "woody"))
            .and(body_string_contains("name=woody"))
            .and(body_string_contains("password=hunter2"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("Location", "/")
                    .append_header("Set-Cookie", "api_token=tok; Path=/")
                    .append_header("Set-Cookie", "session_id=sess; Path=/"),
            )
            .mount(&server)
            .await;

        let auth = Authenticator::new(&chat_config(&server.uri()), "woody", "hunter2").unwrap();
        let credentials = auth.authenticate().await.unwrap();
        assert_eq!(credentials.cookie_header(), "api_token=tok; session_id=sess");
        assert_eq!(auth.account_name(), "woody");
    }

    #[tokio::test]
    async fn test_authenticate_without_cookies_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/submit"))
            .respond_with(ResponseTemplate::new(200).set_body_string("bad password"))
            .mount(&server)
            .await;

        let auth = Authenticator::new(&chat_config(&server.uri()), "woody", "wrong").unwrap();
        let err = auth.authenticate().await.unwrap_err();
        assert!(matches!(err, WoodyError::Auth(AuthError::MissingToken(_))));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_authenticate_rejected_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/submit"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let auth = Authenticator::new(&chat_config(&server.uri()), "woody", "pw").unwrap();
        let err = auth.authenticate().await.unwrap_err();
        assert!(matches!(
            err,
            WoodyError::Auth(AuthError::Rejected { status: 503 })
        ));
    }
}
