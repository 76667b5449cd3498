use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpecError {
    #[error("unsupported method `{0}`, expected one of get, post, put, patch, delete, options")]
    UnsupportedMethod(String),
}

/// The HTTP methods a spec can be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Patch => "patch",
            Self::Delete => "delete",
            Self::Options => "options",
        }
    }

    /// Whether a request payload travels as the request body. `get` sends it
    /// as query parameters instead.
    pub const fn sends_body(self) -> bool {
        !matches!(self, Self::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "get" => Ok(Self::Get),
            "post" => Ok(Self::Post),
            "put" => Ok(Self::Put),
            "patch" => Ok(Self::Patch),
            "delete" => Ok(Self::Delete),
            "options" => Ok(Self::Options),
            _ => Err(SpecError::UnsupportedMethod(s.to_string())),
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
            Method::Options => reqwest::Method::OPTIONS,
        }
    }
}

/// One endpoint test case.
///
/// `A` is the actor identity the suite calls the endpoint as, e.g. an
/// authenticated user or the name of a set of credentials.
#[derive(Debug, Clone, PartialEq)]
pub struct Spec<A> {
    pub title: Option<String>,
    pub endpoint: String,
    pub method: Method,
    pub expected_status: u16,
    pub actors: Option<Vec<A>>,
    pub expected_response: Option<Value>,
    pub request_payload: Option<Value>,
}

impl<A> Spec<A> {
    pub fn new(endpoint: impl Into<String>, method: Method, expected_status: u16) -> Self {
        Self {
            title: None,
            endpoint: endpoint.into(),
            method,
            expected_status,
            actors: None,
            expected_response: None,
            request_payload: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn actors(mut self, actors: impl IntoIterator<Item = A>) -> Self {
        self.actors = Some(actors.into_iter().collect());
        self
    }

    pub fn expect_response(mut self, expected: Value) -> Self {
        self.expected_response = Some(expected);
        self
    }

    pub fn payload(mut self, payload: Value) -> Self {
        self.request_payload = Some(payload);
        self
    }

    /// The title to report the spec under, falling back to its position in
    /// the suite.
    pub fn resolved_title(&self, index: usize) -> String {
        self.title.clone().unwrap_or_else(|| index.to_string())
    }

    /// Actors to run the spec as. Empty means the spec is skipped.
    pub fn actor_list(&self) -> &[A] {
        self.actors.as_deref().unwrap_or_default()
    }
}
