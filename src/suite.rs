use std::fmt::Display;
use std::future::Future;

use serde_json::Value;
use thiserror::Error;

use crate::compare::SequenceMatch;
use crate::spec::Spec;

/// What an endpoint answered with.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointResponse {
    pub status: u16,
    pub body: Value,
}

impl EndpointResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }
}

/// The endpoint could not be called at all.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct CallError(pub String);

impl From<reqwest::Error> for CallError {
    fn from(error: reqwest::Error) -> Self {
        Self(error.to_string())
    }
}

/// A set of endpoint specs together with the means to call them.
///
/// Implementors provide the specs and the transport; the runner takes care of
/// expanding every spec over its actors and asserting the responses.
pub trait SpecSuite {
    /// Identity a spec is run as. Rendered in progress lines and failures.
    type Actor: Display;

    /// Name used in progress output. Defaults to the type's name without its
    /// module path or generic parameters.
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// How expected arrays are matched against actual arrays.
    fn sequence_match(&self) -> SequenceMatch {
        SequenceMatch::Truncate
    }

    fn specs(&self) -> Vec<Spec<Self::Actor>>;

    /// Calls the endpoint `spec` describes as `actor`.
    fn call_endpoint(
        &self,
        spec: &Spec<Self::Actor>,
        actor: &Self::Actor,
    ) -> impl Future<Output = Result<EndpointResponse, CallError>> + Send;
}

fn short_type_name(full: &'static str) -> &'static str {
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}
