mod cli;
mod ui;

use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::Parser;
use console::Term;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use checkin_board::api::{CheckInService, HttpCheckInService};
use checkin_board::board::{
    Board, ChannelPrompt, FetchMode, TransitionOutcome, TransitionRequest,
};
use checkin_board::checkin::{Groomer, GroomerId, Status};
use checkin_board::config::BoardConfig;
use checkin_board::BoardError;
use cli::{Cli, Command};
use ui::{BoardKey, LoadingSpinner};

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "checkin_board=debug"
    } else {
        "checkin_board=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = BoardConfig::load().context("failed to load configuration")?;
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }
    if let Some(secs) = cli.interval {
        config.poll_interval_secs = secs;
    }
    config.validate()?;

    let service = Arc::new(HttpCheckInService::with_timeouts(
        config.api_base_url.clone(),
        config.connect_timeout(),
        config.request_timeout(),
    )?);
    let (prompt, requests) = ChannelPrompt::new(1);
    tokio::spawn(ui::serve_prompts(requests));
    let board = Board::new(service.clone(), Arc::new(prompt), config.poll_interval());

    match cli.command {
        Command::Board { once: false } => live_board(board).await,
        Command::Board { once: true } => {
            initial_load(&board).await;
            render(&board);
            Ok(())
        }
        Command::Move { id, column } => {
            initial_load(&board).await;
            report(&board, board.dragdrop.move_card(id, column.into()).await)
        }
        Command::Start { id, groomer } => {
            initial_load(&board).await;
            let mut request = TransitionRequest::new(id, Status::Started);
            if let Some(groomer_id) = groomer {
                request = request.with_groomer(find_groomer(service.as_ref(), groomer_id).await?);
            }
            report(&board, board.engine.request_transition(request).await)
        }
        Command::Assign { id } => {
            initial_load(&board).await;
            report(&board, board.engine.assign_groomer(id).await)
        }
        Command::Finish { id } => {
            initial_load(&board).await;
            let request = TransitionRequest::new(id, Status::Finished);
            report(&board, board.engine.request_transition(request).await)
        }
        Command::Groomers => {
            for groomer in service.list_groomers().await? {
                let id = groomer.id.map(|id| id.to_string()).unwrap_or_default();
                println!("{id:>6}  {}", groomer.name);
            }
            Ok(())
        }
        Command::History { date } => {
            let records = service.list_by_date(date).await?;
            print!("{}", ui::render_history(&records));
            Ok(())
        }
    }
}

async fn initial_load(board: &Board) {
    let spinner = LoadingSpinner::start("Loading check-ins...");
    let _ = board.sync.refresh(FetchMode::Blocking).await;
    spinner.finish();
}

async fn find_groomer(service: &dyn CheckInService, id: GroomerId) -> anyhow::Result<Groomer> {
    service
        .list_groomers()
        .await?
        .into_iter()
        .find(|g| g.id == Some(id))
        .ok_or_else(|| anyhow!(BoardError::UnknownGroomer(id.to_string()).user_message()))
}

fn report(
    board: &Board,
    result: checkin_board::Result<TransitionOutcome>,
) -> anyhow::Result<()> {
    if let Some(banner) = board.notices.banner() {
        eprintln!("{}", console::style(banner).red());
    }
    match result {
        Ok(outcome) => {
            println!("{}", ui::describe_outcome(&outcome));
            Ok(())
        }
        Err(e) => Err(anyhow!(e.user_message())),
    }
}

fn board_text(board: &Board) -> String {
    let banner = board.notices.banner();
    ui::render_board(
        &board.store.columns(),
        board.sync.state(),
        banner.as_deref(),
        &board.notices.alerts(),
    )
}

fn render(board: &Board) {
    print!("{}", board_text(board));
}

async fn next_key(keys: &mut Option<mpsc::Receiver<BoardKey>>) -> Option<BoardKey> {
    match keys {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Live board: re-rendered on every store or sync change until `q` or Ctrl-C.
async fn live_board(board: Board) -> anyhow::Result<()> {
    let term = Term::stdout();
    let mut events = board.store.subscribe();
    let mut state = board.sync.subscribe_state();
    let mut keys = ui::spawn_key_reader();

    let spinner = LoadingSpinner::start("Loading check-ins...");
    let handle = board.sync.clone().start().await;
    spinner.finish();

    loop {
        let _ = term.clear_screen();
        // Raw key reads turn off newline translation.
        print!("{}", board_text(&board).replace('\n', "\r\n"));
        if keys.is_some() {
            print!("\r\nr: refresh  q: quit\r\n");
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            key = next_key(&mut keys) => match key {
                Some(BoardKey::Refresh) => {
                    let _ = board.sync.refresh_now().await;
                }
                Some(BoardKey::Quit) | None => break,
            },
            event = events.recv() => match event {
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    handle.stop().await;
    Ok(())
}
