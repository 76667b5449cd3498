use console::Style;
use flume::Receiver;

use crate::asserter::CaseFailure;
use crate::runner::RunEvent;
use crate::runner::RunSummary;

pub struct OutPutter;

impl OutPutter {
    /// Prints runner events as they arrive and a summary once the channel is
    /// closed. Returns the summary reported by the runner, if any.
    pub async fn start(rx: Receiver<RunEvent>, spec_path: &str) -> Option<RunSummary> {
        let mut i = 1;
        let mut n_specs = 0;
        let mut summary = None;
        let mut failed_cases: Vec<CaseFailure> = vec![];

        while let Ok(event) = rx.recv_async().await {
            match event {
                RunEvent::SuiteStarted { suite, n_specs: n } => {
                    n_specs = n;
                    let style = Style::new().bold().cyan();
                    let open_text = format!(
                        "Running spec file: {spec_path} Starting {n} API specs of '{suite}'..."
                    );
                    println!("{}", style.apply_to(open_text));
                }
                RunEvent::SpecStarted { title } => {
                    println!(
                        "[{i}/{n_specs}] Testing the '{}' API spec...",
                        console::style(title).bold()
                    );
                    i += 1;
                }
                RunEvent::SpecSkipped { title } => {
                    println!(
                        "    {}",
                        console::style(format!("skipped '{title}': no actors")).dim()
                    );
                }
                RunEvent::CasePassed(pass) => {
                    println!(
                        "    {}  {} {} as {}: got status {} {}",
                        console::style("✔").green().bold(),
                        pass.method,
                        pass.endpoint,
                        console::style(&pass.actor).cyan(),
                        pass.status,
                        console::style("PASS!").green().bold(),
                    );
                }
                RunEvent::CaseFailed(failure) => {
                    println!(
                        "    {}  {} {} as {} {}",
                        console::style("╳").red().bold(),
                        failure.method,
                        failure.endpoint,
                        console::style(&failure.actor).cyan(),
                        console::style("FAILED!").red().bold(),
                    );
                    failed_cases.push(failure);
                }
                RunEvent::SuiteFinished(finished) => summary = Some(finished),
            }
        }

        if !failed_cases.is_empty() {
            println!();
            println!(
                "{}",
                console::style("Summary of Failed Tests:").bold().red()
            );
            for (idx, failure) in failed_cases.iter().enumerate() {
                println!("\n{}. {}", idx + 1, failure);
            }
        } else if summary.is_some() {
            println!();
            println!("{}", console::style("All specs passed! 🎉").bold().green());
        }

        if let Some(summary) = &summary {
            println!(
                "\n{} passed, {} failed, {} skipped",
                console::style(summary.passed).green().bold(),
                console::style(summary.failed).red().bold(),
                console::style(summary.skipped).dim(),
            );
        }

        summary
    }
}
