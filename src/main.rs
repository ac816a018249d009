use clap::Parser;
use derive_more::{Display, Error};
use exn::ResultExt;
use lowres_config::Config;
use lowres_library::resize::{Orchestrator, Summary};
use lowres_storage::ClientHandle;
use lowres_storage::backend::{DropboxClient, ReadOnlyClient};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Replace oversized images in a Dropbox folder with downsized renditions,
/// moving the originals into an archive subfolder.
#[derive(Parser, Debug)]
#[command(name = "lowres", version)]
struct Args {
    /// Configuration file (TOML, YAML or JSON). Defaults to `lowres.*` in the
    /// platform configuration directory, if present.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// List and render thumbnails, but upload and move nothing.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Display, Error)]
enum ErrorKind {
    #[display("configuration error")]
    Config,
    #[display("could not create storage client")]
    Client,
    #[display("resize run aborted")]
    Run,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env_lossy())
        .init();

    let args = Args::parse();
    match run(&args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            // The orchestrator has already logged why it aborted.
            if !matches!(&*e, ErrorKind::Run) {
                tracing::error!(error = ?e, "Could not start resize run");
            }
            ExitCode::FAILURE
        },
    }
}

async fn run(args: &Args) -> Result<Summary, exn::Exn<ErrorKind>> {
    let config = Config::load(args.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let ctx = config.context().or_raise(|| ErrorKind::Config)?;

    let dropbox = DropboxClient::new("dropbox", config.storage.token.clone())
        .or_raise(|| ErrorKind::Client)?
        .with_endpoints(&config.storage.api_url, &config.storage.content_url);
    let mut client: ClientHandle = Arc::new(dropbox);
    if args.dry_run {
        tracing::info!("Dry run: nothing will be uploaded or moved");
        client = Arc::new(ReadOnlyClient::new(client));
    }

    Orchestrator::new(client, ctx).run().await.or_raise(|| ErrorKind::Run)
}
