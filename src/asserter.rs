use core::fmt;
use std::fmt::Display;

use serde_json::Value;

use crate::compare::Mismatch;
use crate::compare::SequenceMatch;
use crate::compare::assert_partial;
use crate::spec::Method;
use crate::spec::Spec;
use crate::suite::CallError;
use crate::suite::EndpointResponse;

#[derive(Debug, Clone, PartialEq)]
pub enum FailureKind {
    Status { expected: u16, actual: u16 },
    Body(Mismatch),
    Transport(CallError),
}

/// A failed (spec, actor) case with everything needed to diagnose it without
/// re-running.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseFailure {
    pub title: String,
    pub actor: String,
    pub method: Method,
    pub endpoint: String,
    pub request_payload: Option<Value>,
    pub response: Option<Value>,
    pub kind: FailureKind,
}

impl CaseFailure {
    fn new<A: Display>(title: &str, spec: &Spec<A>, actor: &A, kind: FailureKind) -> Self {
        Self {
            title: title.to_string(),
            actor: actor.to_string(),
            method: spec.method,
            endpoint: spec.endpoint.clone(),
            request_payload: spec.request_payload.clone(),
            response: None,
            kind,
        }
    }

    fn with_response(mut self, response: &Value) -> Self {
        self.response = Some(response.clone());
        self
    }
}

/// Checks a response against the expectations of `spec`.
///
/// The status is checked first; the body is only compared when the spec
/// carries an expected response.
pub fn assert_case<A: Display>(
    title: &str,
    spec: &Spec<A>,
    actor: &A,
    result: Result<EndpointResponse, CallError>,
    sequences: SequenceMatch,
) -> Result<EndpointResponse, CaseFailure> {
    let response = result
        .map_err(|error| CaseFailure::new(title, spec, actor, FailureKind::Transport(error)))?;

    if response.status != spec.expected_status {
        let kind = FailureKind::Status {
            expected: spec.expected_status,
            actual: response.status,
        };
        return Err(CaseFailure::new(title, spec, actor, kind).with_response(&response.body));
    }

    if let Some(expected) = &spec.expected_response {
        assert_partial(expected, &response.body, sequences).map_err(|mismatch| {
            CaseFailure::new(title, spec, actor, FailureKind::Body(mismatch))
                .with_response(&response.body)
        })?;
    }

    Ok(response)
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Status { expected, actual } => {
                writeln!(
                    f,
                    "  Expected: {}",
                    console::style(format!("status {expected}")).green()
                )?;
                writeln!(
                    f,
                    "  Actual:   {}",
                    console::style(format!("status {actual}")).red()
                )
            }
            FailureKind::Body(mismatch @ Mismatch::ValueMismatch {
                expected, actual, ..
            }) => {
                writeln!(
                    f,
                    "  {} {}",
                    console::style("Field:").yellow().bold(),
                    mismatch.path()
                )?;
                writeln!(f, "  Expected: {}", console::style(expected).green())?;
                writeln!(f, "  Actual:   {}", console::style(actual).red())
            }
            FailureKind::Body(mismatch) => {
                writeln!(f, "  {}", console::style(mismatch).red())
            }
            FailureKind::Transport(error) => {
                writeln!(
                    f,
                    "  {} {}",
                    console::style("Request failed with error:").red(),
                    console::style(error).red().bold()
                )
            }
        }
    }
}

impl Display for CaseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} {} '{}'",
            console::style("✘").red().bold(),
            console::style("FAIL!").red().bold(),
            self.title
        )?;
        writeln!(f, "  Actor: {}", console::style(&self.actor).cyan())?;
        writeln!(
            f,
            "  API:   {} {}",
            console::style(self.method).bold(),
            self.endpoint
        )?;
        if let Some(payload) = &self.request_payload {
            writeln!(f, "  Data:  {}", console::style(payload).dim())?;
        }
        write!(f, "{}", self.kind)?;
        if let Some(response) = &self.response {
            writeln!(f, "  {}", console::style("Response:").red())?;
            writeln!(f, "{}", console::style(pretty(response)).dim())?;
        }

        Ok(())
    }
}
