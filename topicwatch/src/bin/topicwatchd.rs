mod config;

use clap::Parser;
use clap::Subcommand;
use log::error;

use topicwatch::error::Error;
use topicwatch::logger;
use topicwatch::version;
use topicwatch::BANNER;

use config::IngesterConfig;

pub const LOG: &str = "topicwatchd";

const INFO: &str = "
Topicwatchd consumes Kafka topics as a member of a consumer group and
republishes the decoded messages as tagged, timestamped event batches.";

#[derive(Debug, Parser)]
#[clap(name = "Topicwatchd command-line interface")]
#[clap(about = INFO, before_help = BANNER, disable_version_flag = true, arg_required_else_help = true)]
struct AppOptions {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start watching topics
    Ingest(IngesterConfig),
    Version,
}

#[tokio::main]
async fn main() {
    let app = AppOptions::parse();

    let output = match app.command {
        Commands::Ingest(c) => {
            // Set the default log level
            logger::init(&c.log);

            match c.try_into() {
                Ok(c) => topicwatch::ingester::run(c).await,
                Err(e) => Err(Error::Config(e)),
            }
        }
        Commands::Version => version::init(),
    };

    if let Err(e) = output {
        error!(target: LOG, "{}", e);
        std::process::exit(1);
    }
}
