//! detect_api - HTTP inference service.
//!
//! POST /detect with a multipart image; GET /health; GET /classes.

use anyhow::Result;
use clap::Parser;

use safety_detect::api::{router, serve, shutdown_signal, ApiState};
use safety_detect::cli::{DetectorArgs, DetectorSession};
use safety_detect::ui::Ui;

#[derive(Parser, Debug)]
#[command(author, version, about = "Safety equipment detection HTTP service")]
struct Args {
    /// Listen address (overrides [api] addr / SAFETY_API_ADDR).
    #[arg(long)]
    addr: Option<String>,

    #[command(flatten)]
    detector: DetectorArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let ui = Ui::detect(args.detector.ui);

    let mut config = args.detector.load_config()?;
    if let Some(addr) = args.addr {
        config.api.addr = addr;
    }
    let session = {
        let _stage = ui.stage("loading detector");
        tokio::task::block_in_place(|| DetectorSession::start(config, false))?
    };

    let addr = session.config.api.addr.clone();
    let max_upload_bytes = session.config.api.max_upload_bytes;
    let state = ApiState::new(session.detector, session.classes, session.annotate);
    serve(&addr, router(state, max_upload_bytes), shutdown_signal()).await
}
