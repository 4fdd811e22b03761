mod app;
mod config;
mod error;
mod highlight;
mod history;
mod input;
mod models;
mod network;
mod review;
mod selection;
mod session;
mod theme;
mod ui;
mod utils;

use std::{io, path::Path, time::Duration};

use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::config::Settings;
use crate::error::ReviewError;
use crate::history::{FileSlotStore, HistoryStore};
use crate::input::{Action, handle_key};
use crate::models::RawAnalysis;
use crate::network::AnalysisClient;
use crate::session::SessionController;
use crate::theme::Theme;

#[derive(Parser, Debug)]
#[command(author, version, about = "Review a translation against the problems a verifier flags")]
struct Args {
    /// Folder with the source-language files
    #[arg(long)]
    source_dir: Option<String>,

    /// Folder with the translated files
    #[arg(long)]
    target_dir: Option<String>,

    /// Model to start with
    #[arg(short, long)]
    model: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage past verifications without opening the UI
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryAction {
    /// Print every stored verification, newest first
    List,
    /// Remove one verification by id
    Delete { id: String },
    /// Remove all verifications
    Clear,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut settings = Settings::new()?;
    if let Some(model) = args.model {
        settings.model = model;
    }

    let data_dir = settings.resolved_data_dir()?;
    std::fs::create_dir_all(&data_dir)?;
    let _log_guard = init_logging(&settings, &data_dir);

    let history = HistoryStore::open(FileSlotStore::new(&data_dir));

    if let Some(Command::History { action }) = args.command {
        return run_history_command(history, action);
    }

    let source_dir = Settings::resolve_dir(args.source_dir.as_deref().or(settings.source_dir.as_deref()))?;
    let target_dir = Settings::resolve_dir(args.target_dir.as_deref().or(settings.target_dir.as_deref()))?;
    tracing::info!("starting with source {} and target {}", source_dir.display(), target_dir.display());

    let client = AnalysisClient::from_settings(&settings)?;
    let mut app = App::new(settings, SessionController::new(history), source_dir, target_dir);
    app.credential_path = config::get_user_config_path().ok();
    app.rescan();

    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut app, client);

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = &result {
        tracing::error!("terminal loop failed: {:#}", e);
    }
    result
}

fn init_logging(settings: &Settings, data_dir: &Path) -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = tracing_appender::rolling::never(data_dir, "transverify.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    let fallback = settings.log_filter.clone().unwrap_or_else(|| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
    guard
}

fn run<B: Backend>(terminal: &mut Terminal<B>, app: &mut App, client: AnalysisClient) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    let (tx, mut rx) = mpsc::unbounded_channel::<Result<RawAnalysis, ReviewError>>();
    let theme = Theme::default();

    loop {
        terminal.draw(|f| ui::render(f, app, &theme))?;

        if let Ok(outcome) = rx.try_recv() {
            app.finish_analysis(outcome);
            continue;
        }

        if event::poll(Duration::from_millis(200))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match handle_key(key, app) {
                    Action::Quit => break,
                    Action::Analyze(request) => {
                        let client = client.clone();
                        let tx = tx.clone();
                        runtime.spawn(async move {
                            let outcome = client.analyze(&request).await;
                            let _ = tx.send(outcome);
                        });
                    }
                    Action::Continue => {}
                }
            }
        }
    }

    Ok(())
}

fn run_history_command(mut history: HistoryStore<FileSlotStore>, action: HistoryAction) -> anyhow::Result<()> {
    match action {
        HistoryAction::List => {
            let sessions = history.sessions();
            if sessions.is_empty() {
                println!("No past verifications.");
            }
            for s in sessions {
                println!(
                    "{}  {}  {}  {} -> {}  ({} problems)",
                    s.id,
                    s.created_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"),
                    s.label,
                    s.source_file_name,
                    s.target_file_name,
                    s.markers.len()
                );
            }
        }
        HistoryAction::Delete { id } => {
            if history.get(&id).is_none() {
                return Err(ReviewError::SessionNotFound(id).into());
            }
            let left = history.delete(&id).len();
            println!("Deleted {}. {} left.", id, left);
        }
        HistoryAction::Clear => {
            history.clear_all();
            println!("History cleared.");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_history_subcommands() {
        let args = Args::parse_from(["transverify", "history", "delete", "abc"]);
        assert!(matches!(
            args.command,
            Some(Command::History { action: HistoryAction::Delete { ref id } }) if id == "abc"
        ));
    }

    #[test]
    fn parses_folder_flags() {
        let args = Args::parse_from(["tverify", "--source-dir", "en", "--target-dir", "vi", "-m", "x/y"]);
        assert_eq!(args.source_dir.as_deref(), Some("en"));
        assert_eq!(args.target_dir.as_deref(), Some("vi"));
        assert_eq!(args.model.as_deref(), Some("x/y"));
        assert!(args.command.is_none());
    }

    #[test]
    fn history_commands_act_on_the_slot() {
        let dir = tempfile::tempdir().unwrap();
        let history = HistoryStore::open(FileSlotStore::new(dir.path()));
        run_history_command(history, HistoryAction::Clear).unwrap();
        let history = HistoryStore::open(FileSlotStore::new(dir.path()));
        assert!(history.sessions().is_empty());
        let history = HistoryStore::open(FileSlotStore::new(dir.path()));
        assert!(run_history_command(history, HistoryAction::Delete { id: "missing".into() }).is_err());
    }
}
