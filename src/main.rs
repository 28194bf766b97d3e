//! main.rs
//! Entry point for rdir

use rdir_tui::app::AppState;
use rdir_tui::config::Config;
use rdir_tui::core::external::ExternalTools;
use rdir_tui::core::terminal;
use rdir_tui::core::worker::{Loaders, action_channel};
use rdir_tui::utils::cli::{CliAction, handle_args};

use std::process::ExitCode;

fn main() -> ExitCode {
    let start_dir = match handle_args() {
        CliAction::Exit { code } => return ExitCode::from(code as u8),
        CliAction::RunApp { start_dir } => start_dir,
    };

    let _log_guard = init_tracing();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("rdir: config error: {e}");
            return ExitCode::from(2);
        }
    };

    let tools = ExternalTools::detect();
    let (sink, actions_rx) = action_channel();
    let loaders = Loaders::spawn(sink.clone());
    let mut state = AppState::new(config, start_dir, loaders, sink, tools);

    match terminal::run_terminal(&mut state, &actions_rx) {
        Ok(Some(final_path)) => {
            println!("{}", final_path.display());
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("rdir: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Enables verbose tracing to a file under the temp dir when
/// `RDIR_DEBUG_LOG=1`; otherwise logging stays disabled.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    if std::env::var("RDIR_DEBUG_LOG").as_deref() != Ok("1") {
        return None;
    }
    let appender = tracing_appender::rolling::never(std::env::temp_dir(), "rdir-debug.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Some(guard)
}
