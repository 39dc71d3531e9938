mod app;
mod input;
mod ui;

#[cfg(test)]
mod testing;

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use parley_client::Transport;
use parley_core::ChatSession;
use ratatui::prelude::*;

pub use app::ChatApp;

use crate::error::ToolError;

pub async fn run<T: Transport + 'static>(
    session: ChatSession<T>,
    new_thread: bool,
) -> Result<(), ToolError> {
    if new_thread {
        session.reset()?;
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = ChatApp::new(session);
    app.open_thread();

    let result = run_loop(&mut terminal, &mut app).await;

    let thread_id = app.thread_id();

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Some(thread_id) = thread_id {
        println!("Thread: {}", thread_id);
        println!("To continue: parley chat --thread {}", thread_id);
    }

    result
}

async fn run_loop<T: Transport + 'static>(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut ChatApp<T>,
) -> Result<(), ToolError> {
    loop {
        let mut top = None;
        terminal.draw(|f| top = ui::render(f, app))?;
        app.report_viewport_top(top);

        // Poll for input with a short timeout so reveal updates keep flowing
        if event::poll(Duration::from_millis(50))? {
            let event = event::read()?;
            input::handle_event(app, event);
        }

        // The session runs on other tasks; give them a turn
        tokio::task::yield_now().await;
        app.sync();

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
