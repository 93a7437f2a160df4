use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{backend::CrosstermBackend, prelude::*};
use tracing::info;

mod app;
mod error;
mod fetch;
mod logging;
mod ui;

use app::{App, Focus};
use fetch::{FetchRequest, FetchResponse, HttpRowSource, start_fetch_worker};

#[derive(Parser, Debug)]
#[command(author, version, about = "Browse a remote table one row at a time")]
struct Args {
    /// Base URL of the data API serving /api/headers and /api/data/{index}
    #[arg(long, env = "ROW_NAVIGATOR_URL", default_value = "http://127.0.0.1:5000")]
    url: String,

    /// 1-based row to show at startup
    #[arg(long, env = "ROW_NAVIGATOR_START_ROW", default_value_t = 1,
          value_parser = clap::value_parser!(u64).range(1..))]
    start_row: u64,

    /// Per-request timeout in seconds (no timeout when unset)
    #[arg(long, env = "ROW_NAVIGATOR_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Write logs to this file
    #[arg(long, env = "ROW_NAVIGATOR_LOG_FILE", value_name = "PATH")]
    log_file: Option<PathBuf>,
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_tracing(args.log_file.as_deref())?;

    let source = HttpRowSource::new(&args.url, args.timeout_secs.map(Duration::from_secs))?;
    info!(url = %args.url, "starting row navigator");

    // Fetch worker channels
    let (req_tx, req_rx) = crossbeam_channel::unbounded::<FetchRequest>();
    let (resp_tx, resp_rx) = crossbeam_channel::unbounded::<FetchResponse>();
    std::thread::spawn(move || start_fetch_worker(source, req_rx, resp_tx));

    let mut terminal = setup_terminal()?;

    let mut app = App::new(req_tx, resp_rx);
    app.go_to_row(usize::try_from(args.start_row).unwrap_or(usize::MAX));

    let tick_rate = Duration::from_millis(100);
    let res = run_app(&mut terminal, &mut app, tick_rate);

    restore_terminal(terminal)?;
    if let Err(e) = res {
        eprintln!("Error: {e:?}");
    }
    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    tick_rate: Duration,
) -> Result<()> {
    let mut last_tick = Instant::now();
    // Redraw only when state changes or on tick
    let mut dirty = true;
    loop {
        // Drain fetch responses without blocking
        while let Ok(resp) = app.resp_rx.try_recv() {
            app.handle_fetch_response(resp);
            dirty = true;
        }

        let tick_due = last_tick.elapsed() >= tick_rate;
        if dirty || tick_due {
            terminal.draw(|f| ui::draw(f, app))?;
            dirty = false;
            if tick_due {
                last_tick = Instant::now();
            }
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::from_secs(0));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match app.focus {
                        Focus::GotoInput => handle_key_goto(app, key),
                        Focus::Buttons => handle_key_browse(app, key),
                    }
                    dirty = true;
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key_browse(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        if let KeyCode::Char('c') = key.code {
            app.should_quit = true;
        }
        return;
    }
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('?') => {
            app.toggle_help();
            app.status = if app.show_help {
                "Showing keybinds (press ? to close)".into()
            } else {
                "Closed keybinds".into()
            };
        }
        KeyCode::Right | KeyCode::PageDown | KeyCode::Char('n') | KeyCode::Char('j') => {
            app.go_next();
        }
        KeyCode::Left | KeyCode::PageUp | KeyCode::Char('p') | KeyCode::Char('k') => {
            app.go_previous();
        }
        KeyCode::Char('g') | KeyCode::Char(':') => {
            app.begin_goto_input();
            app.status = "Go to row: type a number and Enter (Esc to cancel)".into();
        }
        KeyCode::Esc => app.show_help = false,
        _ => {}
    }
}

fn handle_key_goto(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => {
            if !app.submit_goto() {
                app.status = format!("Not a row number: {:?}", app.goto_input);
            }
        }
        KeyCode::Esc => {
            app.cancel_goto_input();
            app.status = "Go to row cancelled".into();
        }
        KeyCode::Backspace => app.goto_input_backspace(),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.goto_input_insert(c);
        }
        _ => {}
    }
}
