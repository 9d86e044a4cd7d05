pub(crate) mod archive;
pub(crate) mod cache;
pub mod cli;
pub mod config;
pub mod dataset_ref;
pub mod error;
pub mod http;
pub(crate) mod logging;
pub mod messages;
pub mod orchestrator;
pub mod providers;
pub mod version;

use cli::{Command, MessageFormat};
use config::Config;
use messages::{Message, MessageReporter};
use orchestrator::{DownloadReport, Orchestrator, ProviderListing, RemoveReport};
use tracing::*;

pub use cli::CliArgs;
pub use error::{Error, Result};

/// Re-export of the snafu [`snafu::Report`] type so that callers can refer to this type without
/// taking an explicit snafu dep
pub use snafu::Report as SnafuReport;

/// Main entry point for the `dsfetch` tool.
///
/// Meant to be called from `main.rs` or other frontends.
#[snafu::report]
pub fn dsfetch_main() -> Result<()> {
    let args = CliArgs::parse_from_cli_args();

    // Initialize tracing early, before any other operations
    logging::init(&args);

    let config = Config::load(&args)?;
    logging::apply_config(&config, &args);
    debug!("Using config: {:#?}", config);

    const MESSAGE_CHANNEL_SIZE: usize = 100;

    // In JSON mode every diagnostic message is serialized to stdout by a separate thread
    let json_mode = matches!(args.message_format, Some(MessageFormat::Json));
    let (tx, rx) = std::sync::mpsc::sync_channel::<Message>(MESSAGE_CHANNEL_SIZE);
    let reporter_thread = std::thread::spawn(move || {
        debug!("Starting message reporter thread");
        for msg in rx {
            if json_mode {
                match serde_json::to_string(&msg) {
                    Ok(json) => println!("{}", json),
                    Err(e) => eprintln!("Failed to serialize message: {}", e),
                }
            }
        }
        debug!("Message reporter thread exiting");
    });
    let reporter = MessageReporter::channel(tx);

    let result = run(&args.command, &config, &reporter);

    // Once every sender is gone the reporter thread drains the channel and exits
    drop(reporter);
    debug!("Waiting for reporter thread to finish");
    let _ = reporter_thread.join();

    result
}

fn run(command: &Command, config: &Config, reporter: &MessageReporter) -> Result<()> {
    match command {
        Command::List { provider, local } => {
            let orchestrator = Orchestrator::from_config(config, provider.as_deref(), reporter)?;
            print_listings(&orchestrator.list(*local)?);
            Ok(())
        }
        Command::Download {
            datasets,
            provider,
            force,
        } => {
            let orchestrator = Orchestrator::from_config(config, provider.as_deref(), reporter)?;
            let report = orchestrator.download(datasets, *force);
            print_downloads(&report);

            if report.has_failures() {
                return error::BatchFailedSnafu {
                    action: "downloaded",
                    failed: report.failures(),
                    total: report.items.len(),
                }
                .fail();
            }
            Ok(())
        }
        Command::Remove {
            datasets,
            all,
            provider,
        } => {
            let orchestrator = Orchestrator::from_config(config, provider.as_deref(), reporter)?;
            let report = orchestrator.remove(datasets, *all)?;
            print_removals(&report);

            if report.has_failures() {
                return error::BatchFailedSnafu {
                    action: "removed",
                    failed: report.failures(),
                    total: report.items.len(),
                }
                .fail();
            }
            Ok(())
        }
    }
}

fn print_listings(listings: &[ProviderListing]) {
    for listing in listings {
        println!("Listing datasets of '{}' at {}:", listing.provider, listing.location);

        for dataset in &listing.datasets {
            let versions: Vec<String> = dataset
                .versions
                .iter()
                .map(|v| {
                    if Some(v) == dataset.latest.as_ref() {
                        format!("{} [latest]", v)
                    } else {
                        v.to_string()
                    }
                })
                .collect();
            println!("  {}: {}", dataset.name, versions.join(", "));
        }
    }
}

fn print_downloads(report: &DownloadReport) {
    for (request, result) in &report.items {
        match result {
            Ok(downloaded) => println!(
                "Dataset {} {} loaded from '{}' and stored at '{}'",
                downloaded.dataset.name,
                downloaded.dataset.version,
                downloaded.provider,
                downloaded.dataset.path.display()
            ),
            Err(e) => eprintln!("Failed to download {}: {}", request, e),
        }
    }
}

fn print_removals(report: &RemoveReport) {
    for item in &report.items {
        match (&item.version, &item.result) {
            (Some(version), Ok(())) => {
                println!("Removed dataset {} {} from {}", item.name, version, report.location)
            }
            (Some(version), Err(e)) => eprintln!("Failed to remove {} {}: {}", item.name, version, e),
            (None, Err(e)) => eprintln!("Nothing removed for {}: {}", item.name, e),
            (None, Ok(())) => {}
        }
    }
}
