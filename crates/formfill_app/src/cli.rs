//! Command line of the `formfill` binary.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use formfill_logging::LogDestination;

/// Fill a form in a saved HTML page with values from a chat-completion service.
#[derive(Debug, Parser)]
#[command(name = "formfill")]
#[command(version)]
pub(crate) struct Cli {
    /// Saved HTML page holding the form
    #[arg(long)]
    pub page: PathBuf,

    /// Selector path of the form; use `::shadow-root` to enter shadow trees
    #[arg(long)]
    pub selector: String,

    /// Send a compact HTML snapshot of the form instead of field definitions
    #[arg(long)]
    pub snapshot: bool,

    /// Extra instruction for the completion service
    #[arg(long)]
    pub instruction: Option<String>,

    /// Configuration file
    #[arg(long, default_value = "formfill.ron")]
    pub config: PathBuf,

    /// Model name, overriding the configuration file
    #[arg(long)]
    pub model: Option<String>,

    /// Also write the final report to this file
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Where log output goes
    #[arg(long, value_enum, default_value_t = LogTarget::File)]
    pub log: LogTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogTarget {
    Terminal,
    File,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, LogTarget};

    #[test]
    fn defaults_apply_when_only_required_flags_are_given() {
        let cli = Cli::try_parse_from(["formfill", "--page", "p.html", "--selector", "#f"]).unwrap();
        assert_eq!(cli.selector, "#f");
        assert_eq!(cli.config.to_str(), Some("formfill.ron"));
        assert_eq!(cli.log, LogTarget::File);
        assert!(!cli.snapshot);
    }

    #[test]
    fn selector_is_required() {
        assert!(Cli::try_parse_from(["formfill", "--page", "p.html"]).is_err());
    }
}
