use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::debug;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

pub const USER_AGENT: &str = "Posts comics from GoComics to /r/Calvin_And_Hobbes/.";

#[derive(Debug, Error)]
pub enum PostError {
    #[error("{step} request failed")]
    Transport {
        step: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{step} answered with HTTP {status}")]
    Status {
        step: &'static str,
        status: StatusCode,
    },

    #[error("login rejected: {0}")]
    Auth(String),

    #[error("reddit refused the post: {}", .0.join("; "))]
    Api(Vec<String>),

    #[error("unexpected {step} response: {detail}")]
    MalformedResponse { step: &'static str, detail: String },

    #[error("cannot read image {}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("pre-post checks failed: {0}")]
    ChecksFailed(String),
}

impl PostError {
    /// Whether the run may log this and carry on with the next post.
    pub fn is_recoverable(&self) -> bool {
        match self {
            PostError::Transport { source, .. } => {
                source.is_connect() || source.is_timeout() || source.is_request()
            }
            PostError::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            PostError::Api(_) | PostError::ChecksFailed(_) => true,
            PostError::Auth(_) | PostError::MalformedResponse { .. } | PostError::Image { .. } => {
                false
            }
        }
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub client_id: String,
    pub client_secret: String,
}

/// A bearer token and when it was issued.
#[derive(Debug, Clone)]
pub struct Session {
    access_token: String,
    issued_at: Instant,
    expires_in: Duration,
}

impl Session {
    pub fn new(access_token: impl Into<String>, expires_in: Duration) -> Session {
        Session {
            access_token: access_token.into(),
            issued_at: Instant::now(),
            expires_in,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// True while the token is younger than both `max_age` and its own
    /// expiry.
    pub fn is_fresh(&self, max_age: Duration) -> bool {
        self.issued_at.elapsed() < max_age.min(self.expires_in)
    }
}

/// Where a post ends up and what it shows.
pub trait Poster {
    fn authenticate(&self, credentials: &Credentials) -> Result<Session, PostError>;

    fn publish_image(
        &self,
        session: &Session,
        subreddit: &str,
        title: &str,
        image_path: &Path,
    ) -> Result<(), PostError>;
}

#[derive(Debug, Clone)]
pub struct Endpoints {
    /// Host of the token endpoint.
    pub auth_base: String,
    /// Host of the OAuth API.
    pub api_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints {
            auth_base: "https://www.reddit.com".to_string(),
            api_base: "https://oauth.reddit.com".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadLease {
    args: UploadArgs,
}

#[derive(Debug, Deserialize)]
struct UploadArgs {
    action: String,
    fields: Vec<UploadField>,
}

#[derive(Debug, Deserialize)]
struct UploadField {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    json: SubmitJson,
}

#[derive(Debug, Deserialize)]
struct SubmitJson {
    #[serde(default)]
    errors: Vec<Vec<serde_json::Value>>,
}

/// Blocking client for a Reddit script app.
pub struct RedditClient {
    client: Client,
    endpoints: Endpoints,
}

impl RedditClient {
    pub fn new() -> Result<RedditClient, PostError> {
        RedditClient::with_endpoints(Endpoints::default())
    }

    pub fn with_endpoints(endpoints: Endpoints) -> Result<RedditClient, PostError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|source| PostError::Transport {
                step: "client setup",
                source,
            })?;
        Ok(RedditClient { client, endpoints })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.endpoints.api_base.trim_end_matches('/'), path)
    }

    fn request_upload_lease(
        &self,
        session: &Session,
        image_path: &Path,
    ) -> Result<UploadLease, PostError> {
        let file_name = image_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let request = self
            .client
            .post(self.api_url("/api/media/asset.json"))
            .bearer_auth(session.access_token())
            .form(&[
                ("filepath", file_name.as_str()),
                ("mimetype", mime_type(image_path)),
            ]);
        parse_json(send(request, "upload lease")?, "upload lease")
    }

    fn upload(&self, lease: &UploadLease, image_path: &Path) -> Result<String, PostError> {
        let bytes = fs::read(image_path).map_err(|source| PostError::Image {
            path: image_path.to_path_buf(),
            source,
        })?;
        let file_name = image_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        let mut form = Form::new();
        let mut key = None;
        for field in &lease.args.fields {
            if field.name == "key" {
                key = Some(field.value.clone());
            }
            form = form.text(field.name.clone(), field.value.clone());
        }
        let key = key.ok_or_else(|| PostError::MalformedResponse {
            step: "upload lease",
            detail: "no `key` field".to_string(),
        })?;

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime_type(image_path))
            .map_err(|source| PostError::Transport {
                step: "upload",
                source,
            })?;
        form = form.part("file", part);

        let action = upload_action_url(&lease.args.action);
        debug!("Uploading {} to {}", image_path.display(), action);
        send(self.client.post(&action).multipart(form), "upload")?;

        Ok(format!("{}/{}", action.trim_end_matches('/'), key))
    }
}

impl Poster for RedditClient {
    fn authenticate(&self, credentials: &Credentials) -> Result<Session, PostError> {
        let url = format!(
            "{}/api/v1/access_token",
            self.endpoints.auth_base.trim_end_matches('/')
        );
        let request = self
            .client
            .post(url)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
            ]);
        let response = send(request, "login")?;
        let token: TokenResponse = parse_json(response, "login")?;

        if let Some(error) = token.error {
            return Err(PostError::Auth(error));
        }
        let access_token = token.access_token.ok_or_else(|| PostError::MalformedResponse {
            step: "login",
            detail: "no access_token".to_string(),
        })?;
        Ok(Session::new(
            access_token,
            Duration::from_secs(token.expires_in.unwrap_or(3600)),
        ))
    }

    fn publish_image(
        &self,
        session: &Session,
        subreddit: &str,
        title: &str,
        image_path: &Path,
    ) -> Result<(), PostError> {
        debug!("Posting to {} subreddit...", subreddit);
        let lease = self.request_upload_lease(session, image_path)?;
        let image_url = self.upload(&lease, image_path)?;

        let request = self
            .client
            .post(self.api_url("/api/submit"))
            .bearer_auth(session.access_token())
            .form(&[
                ("sr", subreddit),
                ("kind", "image"),
                ("title", title),
                ("url", image_url.as_str()),
                ("api_type", "json"),
                ("resubmit", "true"),
            ]);
        let submitted: SubmitResponse = parse_json(send(request, "submit")?, "submit")?;

        if !submitted.json.errors.is_empty() {
            let messages = submitted
                .json
                .errors
                .iter()
                .map(|error| {
                    error
                        .iter()
                        .filter_map(|part| part.as_str())
                        .collect::<Vec<_>>()
                        .join(": ")
                })
                .collect();
            return Err(PostError::Api(messages));
        }
        Ok(())
    }
}

fn send(request: RequestBuilder, step: &'static str) -> Result<Response, PostError> {
    let response = request
        .send()
        .map_err(|source| PostError::Transport { step, source })?;
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(PostError::Auth(format!("{} answered with HTTP {}", step, status)));
    }
    if !status.is_success() {
        return Err(PostError::Status { step, status });
    }
    Ok(response)
}

fn parse_json<T: DeserializeOwned>(response: Response, step: &'static str) -> Result<T, PostError> {
    let body = response
        .text()
        .map_err(|source| PostError::Transport { step, source })?;
    serde_json::from_str(&body).map_err(|e| PostError::MalformedResponse {
        step,
        detail: e.to_string(),
    })
}

/// Upload targets come back protocol-relative (`//bucket.host`).
pub fn upload_action_url(action: &str) -> String {
    if action.starts_with("//") {
        format!("https:{}", action)
    } else {
        action.to_string()
    }
}

pub fn mime_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "image/gif",
    }
}
