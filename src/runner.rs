use flume::SendError;
use flume::Sender;
use thiserror::Error;

use crate::asserter::CaseFailure;
use crate::asserter::assert_case;
use crate::spec::Method;
use crate::suite::SpecSuite;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("channel error")]
    ChannelError(#[from] SendError<RunEvent>),
}

/// Progress reported by the runner, in execution order.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    SuiteStarted { suite: String, n_specs: usize },
    SpecStarted { title: String },
    SpecSkipped { title: String },
    CasePassed(CasePass),
    CaseFailed(CaseFailure),
    SuiteFinished(RunSummary),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CasePass {
    pub title: String,
    pub actor: String,
    pub method: Method,
    pub endpoint: String,
    pub status: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub specs: usize,
    pub skipped: usize,
    pub passed: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn cases(&self) -> usize {
        self.passed + self.failed
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Runs every spec of `suite` once per actor.
///
/// Cases run one after the other. A failing case is reported and the run
/// carries on with the next one; specs without actors are skipped.
pub async fn run_suite<S: SpecSuite>(
    suite: &S,
    tx: &Sender<RunEvent>,
) -> Result<RunSummary, RunnerError> {
    let specs = suite.specs();
    let sequences = suite.sequence_match();
    let mut summary = RunSummary {
        specs: specs.len(),
        ..RunSummary::default()
    };

    tx.send_async(RunEvent::SuiteStarted {
        suite: suite.name().to_string(),
        n_specs: specs.len(),
    })
    .await?;

    for (index, spec) in specs.iter().enumerate() {
        let title = spec.resolved_title(index);
        tx.send_async(RunEvent::SpecStarted {
            title: title.clone(),
        })
        .await?;

        let actors = spec.actor_list();
        if actors.is_empty() {
            summary.skipped += 1;
            tx.send_async(RunEvent::SpecSkipped { title }).await?;
            continue;
        }

        for actor in actors {
            let result = suite.call_endpoint(spec, actor).await;

            let event = match assert_case(&title, spec, actor, result, sequences) {
                Ok(response) => {
                    summary.passed += 1;
                    RunEvent::CasePassed(CasePass {
                        title: title.clone(),
                        actor: actor.to_string(),
                        method: spec.method,
                        endpoint: spec.endpoint.clone(),
                        status: response.status,
                    })
                }
                Err(failure) => {
                    summary.failed += 1;
                    RunEvent::CaseFailed(failure)
                }
            };

            tx.send_async(event).await?;
        }
    }

    tx.send_async(RunEvent::SuiteFinished(summary)).await?;

    Ok(summary)
}

/// Runs `suite` and panics with every failed case when any fails.
///
/// Meant to be called from a test:
///
/// ```ignore
/// #[tokio::test]
/// async fn users_api_specs() {
///     api_spec_test::assert_suite(&UsersApi::new()).await;
/// }
/// ```
pub async fn assert_suite<S: SpecSuite>(suite: &S) -> RunSummary {
    let (tx, rx) = flume::unbounded();

    let summary = match run_suite(suite, &tx).await {
        Ok(summary) => summary,
        Err(error) => panic!("running '{}' failed: {error}", suite.name()),
    };
    drop(tx);

    let failures: Vec<String> = rx
        .drain()
        .filter_map(|event| match event {
            RunEvent::CaseFailed(failure) => Some(failure.to_string()),
            _ => None,
        })
        .collect();

    if !failures.is_empty() {
        panic!(
            "{} of {} cases of '{}' failed:\n\n{}",
            summary.failed,
            summary.cases(),
            suite.name(),
            failures.join("\n")
        );
    }

    summary
}
