use std::path::PathBuf;
use std::process::ExitCode;

use airport_resolver::client::DEFAULT_SERVER_URL;
use airport_resolver::{
    ResolveClient, ResolveResponse, ResolvedLocation, ResolverConfig, RetryPolicy, TripQuery,
    logging, user_message, web,
};
use anyhow::Result;
use clap::{Parser, Subcommand};

/// Resolve free-form place names into IATA airport and city codes.
///
/// Examples:
///   airport-resolver serve
///   airport-resolver resolve Dublin lisboa
///   airport-resolver resolve "Sao Paulo" Tenerife --compare Madrid
#[derive(Parser)]
#[command(name = "airport-resolver", version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP resolution endpoint
    Serve {
        /// Port override
        #[arg(long, short = 'p')]
        port: Option<u16>,
    },
    /// Resolve a trip through a running server
    Resolve {
        origin: String,
        destination: String,

        /// Optional second destination to compare against
        #[arg(long)]
        compare: Option<String>,

        /// Base URL of the resolver server
        #[arg(long, default_value = DEFAULT_SERVER_URL)]
        server: String,
    },
}

fn describe(location: &ResolvedLocation) -> String {
    match &location.country {
        Some(country) => format!("{} ({}, {})", location.iata_code, location.name, country),
        None => location.iata_code.clone(),
    }
}

fn print_resolution(response: &ResolveResponse) {
    let labelled = [
        ("origin", &response.origin),
        ("destination", &response.destination),
        ("compare", &response.compare),
    ];
    for (label, location) in labelled {
        if let Some(location) = location {
            println!("{label:<12} {}", describe(location));
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = ResolverConfig::load_from_path(cli.config)?;
    logging::init(&config.logging)?;

    match cli.command {
        Command::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            web::run(&config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Resolve {
            origin,
            destination,
            compare,
            server,
        } => {
            let mut query = TripQuery::new(origin, destination);
            if let Some(compare) = compare {
                query = query.with_compare(compare);
            }

            let client = ResolveClient::with_policy(&server, RetryPolicy::from(&config.retry));
            match client.resolve_trip(&query).await {
                Ok(response) => {
                    print_resolution(&response);
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    tracing::debug!("Resolve request failed: {}", e);
                    eprintln!("{}", user_message(&e));
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}
