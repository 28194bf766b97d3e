//! Terminal ownership and the main event loop for rdir.
//!
//! Handles raw-mode/alternate-screen setup and teardown (including a panic
//! hook so a panic never leaves the terminal raw), translates events
//! through the input mapper, applies actions through the reducer, and
//! performs the modal hand-offs: the in-process pager and the external
//! editor, both of which take the tty via `suspend`/`resume`.

use crate::app::actions::Action;
use crate::app::input::{map_key, map_mouse};
use crate::app::reducer::reduce;
use crate::app::state::{AppState, ExitMode, ExternalRequest};
use crate::error::{Error, Result};
use crate::pager::{PagerOutcome, run_pager};
use crate::ui;

use crossbeam_channel::Receiver;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::{Backend, CrosstermBackend};

use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Event poll cadence of the main loop.
const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// Upper bound on the [ensure_preview_current] barrier.
const PREVIEW_BARRIER: Duration = Duration::from_millis(500);

fn terminal_err(e: impl Into<io::Error>) -> Error {
    Error::Terminal { source: e.into() }
}

/// Restores the terminal to cooked mode. Safe to call more than once.
fn restore() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
}

/// Registers a panic hook that restores the terminal before the default
/// hook prints the panic message.
pub fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        restore();
        default_hook(info);
    }));
}

/// Releases the tty to an external process: cooked mode, normal screen,
/// cursor shown.
pub fn suspend() -> Result<()> {
    disable_raw_mode().map_err(terminal_err)?;
    execute!(
        io::stdout(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        crossterm::cursor::Show
    )
    .map_err(terminal_err)?;
    Ok(())
}

/// Reclaims the tty after [suspend]; pending input typed into the child is
/// drained so it cannot leak into the browser.
pub fn resume() -> Result<()> {
    enable_raw_mode().map_err(terminal_err)?;
    execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture).map_err(terminal_err)?;
    while event::poll(Duration::ZERO).map_err(terminal_err)? {
        let _ = event::read().map_err(terminal_err)?;
    }
    Ok(())
}

/// Initializes the terminal and runs the main loop until quit. Returns the
/// final path when the user asked to change directory on exit.
pub fn run_terminal(state: &mut AppState, actions_rx: &Receiver<Action>) -> Result<Option<PathBuf>> {
    install_panic_hook();
    enable_raw_mode().map_err(terminal_err)?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture).map_err(terminal_err)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout)).map_err(terminal_err)?;

    let result = event_loop(&mut terminal, state, actions_rx);

    restore();
    result
}

fn event_loop<B>(
    terminal: &mut Terminal<B>,
    state: &mut AppState,
    actions_rx: &Receiver<Action>,
) -> Result<Option<PathBuf>>
where
    B: Backend,
    io::Error: From<<B as Backend>::Error>,
{
    let size = terminal.size().map_err(terminal_err)?;
    state.screen_width = size.width;
    state.screen_height = size.height;

    loop {
        let mut changed = state.tick();

        // Worker results and queued input, in offer order.
        while let Ok(action) = actions_rx.try_recv() {
            let (mutated, _) = reduce(state, action);
            changed |= mutated;
        }

        if let Some(exit) = state.exit {
            return Ok(match exit {
                ExitMode::Quit => None,
                ExitMode::QuitAndChange => Some(state.current_path.clone()),
            });
        }

        if let Some(request) = state.external_request.take() {
            match request {
                ExternalRequest::Editor => run_editor(terminal, state)?,
                ExternalRequest::Pager => {
                    ensure_preview_current(state, actions_rx);
                    match run_pager(terminal, state)? {
                        PagerOutcome::QuitApp => return Ok(None),
                        PagerOutcome::Returned => {}
                    }
                }
            }
            terminal.clear().map_err(terminal_err)?;
            changed = true;
        }

        // Redraw on change and while an animation (spinner, status flash)
        // is live.
        if changed
            || state.preview_loading
            || state.active_error().is_some()
            || state.yank_flash_active()
        {
            terminal
                .draw(|frame| ui::render(frame, state))
                .map_err(terminal_err)?;
        }

        if !event::poll(POLL_INTERVAL).map_err(terminal_err)? {
            continue;
        }
        match event::read().map_err(terminal_err)? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if let Some(action) = map_key(state, key) {
                    let (mutated, _) = reduce(state, action);
                    if mutated {
                        terminal
                            .draw(|frame| ui::render(frame, state))
                            .map_err(terminal_err)?;
                    }
                }
            }
            Event::Mouse(mouse) => {
                if let Some(action) = map_mouse(state, mouse) {
                    reduce(state, action);
                }
            }
            Event::Resize(width, height) => {
                reduce(state, Action::Resize { width, height });
                terminal
                    .draw(|frame| ui::render(frame, state))
                    .map_err(terminal_err)?;
            }
            _ => {}
        }
    }
}

/// Barrier used before modal hand-offs: waits briefly for an in-flight
/// preview load so the pager opens on current content.
pub fn ensure_preview_current(state: &mut AppState, actions_rx: &Receiver<Action>) {
    state.flush_pending_preview();
    if !state.preview_loading && state.preview_data.is_some() {
        return;
    }
    if state.preview_data.is_none() && !state.preview_loading {
        state.generate_preview();
    }
    let deadline = Instant::now() + PREVIEW_BARRIER;
    while state.preview_loading && Instant::now() < deadline {
        match actions_rx.recv_timeout(Duration::from_millis(25)) {
            Ok(action) => {
                reduce(state, action);
            }
            Err(_) => {}
        }
    }
}

/// Hands the tty to the external editor for the current selection, then
/// refreshes directory and preview.
fn run_editor<B>(terminal: &mut Terminal<B>, state: &mut AppState) -> Result<()>
where
    B: Backend,
    io::Error: From<<B as Backend>::Error>,
{
    let Some(entry) = state.selected_entry().cloned() else {
        return Ok(());
    };
    let Some(editor) = state.tools.editor.clone() else {
        state.set_error("no editor configured");
        return Ok(());
    };

    suspend()?;
    let result = crate::core::external::run_with_terminal(&editor, entry.path(), "editor");
    resume()?;
    terminal.clear().map_err(terminal_err)?;

    if let Err(e) = result {
        state.set_error(e.status_line());
    }
    state.request_directory_load();
    state.generate_preview();
    Ok(())
}
