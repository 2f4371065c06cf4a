use crate::prelude::*;
use clap::Parser;

mod analyze;
mod error;
mod openai;
mod prelude;
mod report;
mod tm;
mod translate;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Translate InDesign IDML packages with overflow prediction and text compression"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Whether to display additional information.
    #[clap(long, env = "IDMLTRANS_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Translate an IDML package
    Translate(crate::translate::Options),

    /// Predict overflow and detect diagram frames without calling the API
    Analyze(crate::analyze::Options),

    /// Translation memory operations
    Tm(crate::tm::App),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::Translate(options) => crate::translate::run(options, app.global).await,
        SubCommands::Analyze(options) => crate::analyze::run(options, app.global).await,
        SubCommands::Tm(sub_app) => crate::tm::run(sub_app, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
