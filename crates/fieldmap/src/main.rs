use crate::prelude::*;
use clap::Parser;

mod classify;
mod compile;
mod config;
mod extract;
mod prelude;
mod store;
mod template;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Contract PDF form-field extraction, classification, and filling"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Template database path
    #[clap(long, env = "FIELDMAP_DB", global = true)]
    db: Option<std::path::PathBuf>,

    /// Whether to display additional information.
    #[clap(long, env = "FIELDMAP_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Extract and classify the form fields of a contract PDF
    Extract(crate::extract::App),

    /// Manage stored field templates
    Template(crate::template::App),

    /// Fill a contract PDF from a stored template and a value map
    Compile(crate::compile::App),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::Extract(sub_app) => crate::extract::run(sub_app, app.global).await,
        SubCommands::Template(sub_app) => crate::template::run(sub_app, app.global).await,
        SubCommands::Compile(sub_app) => crate::compile::run(sub_app, app.global).await,
    }
}
