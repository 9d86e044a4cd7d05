use crate::dataset_ref::DatasetRef;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for structured messages.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum MessageFormat {
    /// JSON format, one message per line
    Json,
}

#[derive(Clone, Debug, Parser)]
#[command(name = "dsfetch")]
#[command(about = "Fetch versioned datasets from configured providers into a local cache")]
#[command(version)]
#[non_exhaustive]
pub struct CliArgs {
    /// Read configuration from the given TOML file instead of the default location.
    ///
    /// Without this option, `dsfetch.toml` in the user's config directory is read if it exists.
    /// With no config file at all, a single local provider rooted at the cache directory is used.
    #[arg(short = 'c', long, value_name = "FILE", env = "DSFETCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Use verbose output (-vv for debug, -vvv for trace)
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit structured diagnostic messages on stdout in the given format
    #[arg(long, value_enum, value_name = "FMT", global = true)]
    pub message_format: Option<MessageFormat>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Debug, Subcommand)]
#[non_exhaustive]
pub enum Command {
    /// List the datasets and versions available from the configured providers
    List {
        /// Only list this configured provider (default: every configured provider)
        provider: Option<String>,

        /// For a remote provider, list what is in its local cache instead of the remote catalog
        #[arg(short = 'l', long)]
        local: bool,
    },

    /// Download datasets into the local cache
    Download {
        /// Datasets to download; VERSION may be 'latest', exact, partial or contain '*'
        #[arg(required = true, value_name = "DATASET[:VERSION]", value_parser = parse_dataset_ref)]
        datasets: Vec<DatasetRef>,

        /// Only use this configured provider (default: try every provider in order)
        #[arg(short = 'p', long)]
        provider: Option<String>,

        /// Download again even if the version is already cached
        #[arg(short = 'f', long)]
        force: bool,
    },

    /// Remove datasets from the local cache
    Remove {
        /// Datasets to remove; without a VERSION every cached version is removed
        #[arg(
            value_name = "DATASET[:VERSION]",
            value_parser = parse_dataset_ref,
            required_unless_present = "all"
        )]
        datasets: Vec<DatasetRef>,

        /// Remove every cached dataset
        #[arg(short = 'a', long, conflicts_with = "datasets")]
        all: bool,

        /// Remove from the cache of this configured provider (default: the first one)
        #[arg(short = 'p', long)]
        provider: Option<String>,
    },
}

impl CliArgs {
    /// Parse the process's command line, exiting with a usage message on error.
    pub fn parse_from_cli_args() -> Self {
        Self::parse()
    }
}

fn parse_dataset_ref(token: &str) -> Result<DatasetRef, String> {
    token.parse().map_err(|e: crate::Error| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::VersionSelector;
    use assert_matches::assert_matches;

    fn parse(args: &[&str]) -> Result<CliArgs, clap::Error> {
        CliArgs::try_parse_from(std::iter::once("dsfetch").chain(args.iter().copied()))
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        CliArgs::command().debug_assert();
    }

    #[test]
    fn download_parses_refs() {
        let args = parse(&["-c", "/tmp/x.toml", "download", "mnist", "cifar:1.*", "-f"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/tmp/x.toml")));
        assert_matches!(args.command, Command::Download { datasets, provider: None, force: true } => {
            assert_eq!(datasets.len(), 2);
            assert_eq!(datasets[0].selector, VersionSelector::Latest);
            assert_eq!(datasets[1].name, "cifar");
        });
    }

    #[test]
    fn download_rejects_bad_refs_up_front() {
        assert!(parse(&["download", "mnist:1:2"]).is_err());
        assert!(parse(&["download", "mnist:abc"]).is_err());
        assert!(parse(&["download"]).is_err());
    }

    #[test]
    fn remove_requires_datasets_or_all() {
        assert!(parse(&["remove"]).is_err());
        assert!(parse(&["remove", "--all", "mnist"]).is_err());
        assert_matches!(parse(&["remove", "-a"]).unwrap().command, Command::Remove { all: true, .. });
    }

    #[test]
    fn list_with_provider_and_global_verbosity() {
        let args = parse(&["list", "nas", "--local", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
        assert_matches!(args.command, Command::List { provider: Some(p), local: true } if p == "nas");
    }
}
