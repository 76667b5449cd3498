use clap::Parser;

/// Run the API specs of a spec file against a running service
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the spec file
    #[arg(short, long, default_value = "api_specs.toml")]
    pub path: String,

    /// Require actual arrays to be at least as long as expected ones,
    /// regardless of the spec file's setting
    #[arg(long)]
    pub strict_sequences: bool,
}
