//! tcad-replay: run a manipulation script against an empty scene
//!
//! Usage: `tcad-replay <script.ron> [--config <config.ron>]`

mod runner;
mod script;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use parking_lot::RwLock;
use tcad_core::{ConfigManager, create_shared_config};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::runner::Replay;
use crate::script::ReplayScript;

struct Args {
    script: PathBuf,
    config: Option<PathBuf>,
}

fn parse_args() -> Option<Args> {
    let mut args = std::env::args().skip(1);
    let mut script = None;
    let mut config = None;
    while let Some(arg) = args.next() {
        if arg == "--config" {
            config = Some(PathBuf::from(args.next()?));
        } else if script.is_none() {
            script = Some(PathBuf::from(arg));
        } else {
            return None;
        }
    }
    Some(Args {
        script: script?,
        config,
    })
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tcad_replay=debug,tcad_manip=info,tcad_csg=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let Some(args) = parse_args() else {
        eprintln!("usage: tcad-replay <script.ron> [--config <config.ron>]");
        return ExitCode::from(2);
    };

    let shared = match args.config {
        Some(path) => Arc::new(RwLock::new(ConfigManager::with_path(path))),
        None => create_shared_config(),
    };
    let config = {
        let manager = shared.read();
        tracing::debug!("Config path {}", manager.config_file_path().display());
        manager.config().clone()
    };

    let script = match ReplayScript::load(&args.script) {
        Ok(script) => script,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let base_dir = args
        .script
        .parent()
        .map(PathBuf::from)
        .unwrap_or_default();
    let mut replay = Replay::new(config).with_base_dir(base_dir);
    match replay.run(&script) {
        Ok(()) => {
            tracing::info!(
                "Final scene: {} objects, {} selected",
                replay.scene().len(),
                replay.session().selection().len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
