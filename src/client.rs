//! Client-side view state for one collection.
//!
//! A [`CollectionView`] mirrors what a page shows: the fetched list, an
//! optional record being edited and the form being filled in. After every
//! successful mutation it re-reads the whole collection from the server.

use crate::model::{Entity, Record};
use axum::body::Body;
use axum::http::{header, Method, Request, Response, StatusCode};
use http_body_util::BodyExt;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use std::fmt;
use tower::{Service, ServiceExt};

#[derive(Debug)]
pub enum ClientError {
    Transport(String),
    Status { status: StatusCode, message: String },
    Decode(serde_json::Error),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Transport(message) => write!(f, "request failed: {message}"),
            ClientError::Status { status, message } => write!(f, "{status}: {message}"),
            ClientError::Decode(err) => write!(f, "unexpected response body: {err}"),
        }
    }
}

impl std::error::Error for ClientError {}

#[axum::async_trait]
pub trait Api<E: Entity>: Send + Sync {
    async fn list(&self) -> Result<Vec<Record<E>>, ClientError>;

    async fn create(&self, input: &E::Input) -> Result<Record<E>, ClientError>;

    async fn update(&self, id: &str, input: &E::Input) -> Result<Record<E>, ClientError>;

    async fn delete(&self, id: &str) -> Result<(), ClientError>;
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Speaks the JSON API over any HTTP [`Service`], such as the application router.
#[derive(Clone)]
pub struct HttpApi<S> {
    service: S,
    base_url: String,
}

impl<S> HttpApi<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + Sync + 'static,
    S::Error: fmt::Display,
    S::Future: Send,
{
    pub fn new(service: S, base_url: impl Into<String>) -> Self {
        Self {
            service,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: String,
        body: Option<Vec<u8>>,
    ) -> Result<T, ClientError> {
        let builder = Request::builder()
            .method(method)
            .uri(format!("{}{}", self.base_url, path));
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body)),
            None => builder.body(Body::empty()),
        }
        .map_err(|err| ClientError::Transport(err.to_string()))?;

        let response = self
            .service
            .clone()
            .oneshot(request)
            .await
            .map_err(|err| ClientError::Transport(err.to_string()))?;
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|err| ClientError::Transport(err.to_string()))?
            .to_bytes();

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&bytes)
                .map(|body| body.error)
                .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
            return Err(ClientError::Status { status, message });
        }
        serde_json::from_slice(&bytes).map_err(ClientError::Decode)
    }
}

#[axum::async_trait]
impl<E, S> Api<E> for HttpApi<S>
where
    E: Entity,
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + Sync + 'static,
    S::Error: fmt::Display,
    S::Future: Send,
{
    async fn list(&self) -> Result<Vec<Record<E>>, ClientError> {
        self.send(Method::GET, E::KIND.path().to_string(), None)
            .await
    }

    async fn create(&self, input: &E::Input) -> Result<Record<E>, ClientError> {
        let body = serde_json::to_vec(input).map_err(ClientError::Decode)?;
        self.send(Method::POST, E::KIND.path().to_string(), Some(body))
            .await
    }

    async fn update(&self, id: &str, input: &E::Input) -> Result<Record<E>, ClientError> {
        let body = serde_json::to_vec(input).map_err(ClientError::Decode)?;
        self.send(Method::PUT, format!("{}/{}", E::KIND.path(), id), Some(body))
            .await
    }

    async fn delete(&self, id: &str) -> Result<(), ClientError> {
        let _: IgnoredAny = self
            .send(Method::DELETE, format!("{}/{}", E::KIND.path(), id), None)
            .await?;
        Ok(())
    }
}

pub struct CollectionView<E: Entity, A> {
    api: A,
    items: Vec<Record<E>>,
    editing: Option<Record<E>>,
    form: E::Input,
    form_open: bool,
}

impl<E: Entity, A: Api<E>> CollectionView<E, A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            items: Vec::new(),
            editing: None,
            form: E::Input::default(),
            form_open: false,
        }
    }

    pub fn items(&self) -> &[Record<E>] {
        &self.items
    }

    pub fn editing(&self) -> Option<&Record<E>> {
        self.editing.as_ref()
    }

    pub fn form(&self) -> &E::Input {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut E::Input {
        &mut self.form
    }

    pub fn is_form_open(&self) -> bool {
        self.form_open
    }

    /// Replaces the list with the server's; keeps the old list on failure.
    pub async fn load(&mut self) -> bool {
        match self.api.list().await {
            Ok(items) => {
                self.items = items;
                true
            }
            Err(err) => {
                tracing::error!("Error fetching {} records: {}", E::KIND, err);
                false
            }
        }
    }

    pub fn open_create(&mut self) {
        self.editing = None;
        self.form = E::Input::default();
        self.form_open = true;
    }

    pub fn open_edit(&mut self, record: &Record<E>) {
        self.form = record.fields.to_input();
        self.editing = Some(record.clone());
        self.form_open = true;
    }

    pub fn close_form(&mut self) {
        self.editing = None;
        self.form = E::Input::default();
        self.form_open = false;
    }

    /// Updates the record being edited, or creates a new one.
    ///
    /// On failure the error is logged and the form stays open as filled in.
    pub async fn submit(&mut self) -> bool {
        let saved = match &self.editing {
            Some(record) => self.api.update(&record.id, &self.form).await,
            None => self.api.create(&self.form).await,
        };
        match saved {
            Ok(_) => {
                self.load().await;
                self.close_form();
                true
            }
            Err(err) => {
                tracing::error!("Error saving {} record: {}", E::KIND, err);
                false
            }
        }
    }

    /// Deletes `id` once `confirm` agrees to the kind's prompt.
    pub async fn delete(&mut self, id: &str, confirm: impl FnOnce(&str) -> bool) -> bool {
        if !confirm(E::KIND.delete_prompt()) {
            return false;
        }
        match self.api.delete(id).await {
            Ok(()) => {
                self.load().await;
                true
            }
            Err(err) => {
                tracing::error!("Error deleting {} record {}: {}", E::KIND, id, err);
                false
            }
        }
    }
}

/// Adds `https://` to addresses typed without a scheme.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub name: &'static str,
    pub base_url: &'static str,
}

/// Platforms offered when adding a social profile. Any other name is accepted too.
pub static KNOWN_PLATFORMS: [Platform; 9] = [
    Platform {
        name: "GitHub",
        base_url: "https://github.com/",
    },
    Platform {
        name: "LinkedIn",
        base_url: "https://linkedin.com/in/",
    },
    Platform {
        name: "Twitter",
        base_url: "https://twitter.com/",
    },
    Platform {
        name: "Instagram",
        base_url: "https://instagram.com/",
    },
    Platform {
        name: "Facebook",
        base_url: "https://facebook.com/",
    },
    Platform {
        name: "YouTube",
        base_url: "https://youtube.com/@",
    },
    Platform {
        name: "TikTok",
        base_url: "https://tiktok.com/@",
    },
    Platform {
        name: "Discord",
        base_url: "https://discord.com/users/",
    },
    Platform {
        name: "Twitch",
        base_url: "https://twitch.tv/",
    },
];

pub fn find_platform(name: &str) -> Option<&'static Platform> {
    let name = name.trim();
    KNOWN_PLATFORMS
        .iter()
        .find(|platform| platform.name.eq_ignore_ascii_case(name))
}

pub fn profile_url(platform: &str, username: &str) -> Option<String> {
    let platform = find_platform(platform)?;
    let username = username.trim().trim_start_matches('@');
    if username.is_empty() {
        return None;
    }
    Some(format!("{}{}", platform.base_url, username))
}
