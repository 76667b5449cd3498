//! Declarative API contract tests.
//!
//! Describe what an endpoint should answer as a list of [`Spec`]s, implement
//! [`SpecSuite`] to say how an endpoint is called for a given actor, and let
//! [`run_suite`] (or [`assert_suite`] from a test) call every spec once per
//! actor, checking the status code and that the response contains the
//! expected fields.
//!
//! Specs can also be written in a TOML file and run over HTTP with
//! [`HttpSuite`], which is what the `api-spec-test` binary does.

pub mod asserter;
pub mod client;
pub mod compare;
pub mod outputter;
pub mod parser;
pub mod runner;
pub mod spec;
pub mod suite;
pub mod validator;

pub use crate::asserter::CaseFailure;
pub use crate::asserter::FailureKind;
pub use crate::client::HttpSuite;
pub use crate::compare::FieldPath;
pub use crate::compare::Mismatch;
pub use crate::compare::SequenceMatch;
pub use crate::compare::assert_partial;
pub use crate::runner::RunEvent;
pub use crate::runner::RunSummary;
pub use crate::runner::assert_suite;
pub use crate::runner::run_suite;
pub use crate::spec::Method;
pub use crate::spec::Spec;
pub use crate::spec::SpecError;
pub use crate::suite::CallError;
pub use crate::suite::EndpointResponse;
pub use crate::suite::SpecSuite;
