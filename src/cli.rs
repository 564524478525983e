// src/cli.rs

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "siteflow",
    version,
    about = "Build static-site assets, then serve and rebuild them on change."
)]
pub struct CliArgs {
    /// Built-in task (html, css, js, images, webp, fonts, favicon, clear,
    /// build) or a `[task.<name>]` composite. `default` builds everything,
    /// then serves the build root and rebuilds on change.
    #[arg(value_name = "TASK", default_value = crate::tasks::DEFAULT_TASK)]
    pub task: String,

    /// Project config. A missing file means built-in defaults; its directory
    /// is the project root.
    #[arg(short, long, value_name = "PATH", default_value = "Siteflow.toml")]
    pub config: PathBuf,

    /// Overrides `SITEFLOW_LOG`.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print resolved paths and the composite tree, then exit.
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// `EnvFilter` directive for this level.
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_the_default_task() {
        let args = CliArgs::parse_from(["siteflow"]);
        assert_eq!(args.task, "default");
        assert_eq!(args.config, PathBuf::from("Siteflow.toml"));
        assert!(!args.dry_run);
    }

    #[test]
    fn accepts_task_and_flags() {
        let args =
            CliArgs::parse_from(["siteflow", "css", "-c", "site/Siteflow.toml", "--log-level", "debug", "-n"]);
        assert_eq!(args.task, "css");
        assert_eq!(args.config, PathBuf::from("site/Siteflow.toml"));
        assert_eq!(args.log_level, Some(LogLevel::Debug));
        assert!(args.dry_run);
    }
}
