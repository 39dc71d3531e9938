use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use parley_client::Transport;

use super::app::ChatApp;

pub fn handle_event<T: Transport + 'static>(app: &mut ChatApp<T>, event: Event) {
    if let Event::Key(key) = event {
        handle_key(app, key);
    }
}

fn handle_key<T: Transport + 'static>(app: &mut ChatApp<T>, key: KeyEvent) {
    match (key.code, key.modifiers) {
        (KeyCode::Esc, _) => {
            app.should_quit = true;
        }
        (KeyCode::Enter, KeyModifiers::NONE) => {
            app.send_message();
        }
        (KeyCode::Tab, _) if app.input.is_empty() || app.is_fresh() => {
            app.next_starter_prompt();
        }
        (KeyCode::Char('l'), KeyModifiers::CONTROL) => {
            app.load_older();
        }
        (KeyCode::Char('n'), KeyModifiers::CONTROL) => {
            app.new_thread();
        }
        (KeyCode::Up, KeyModifiers::CONTROL) => {
            app.scroll_up();
        }
        (KeyCode::Down, KeyModifiers::CONTROL) => {
            app.scroll_down();
        }
        (KeyCode::Backspace, _) => {
            app.input_backspace();
        }
        (KeyCode::Delete, _) => {
            app.input_delete();
        }
        (KeyCode::Left, _) => {
            app.input_left();
        }
        (KeyCode::Right, _) => {
            app.input_right();
        }
        (KeyCode::Home, _) => {
            app.input_home();
        }
        (KeyCode::End, _) => {
            app.input_end();
        }
        (KeyCode::Char(c), KeyModifiers::NONE | KeyModifiers::SHIFT) => {
            app.input_char(c);
        }
        _ => {}
    }
}
