pub mod dashboard;
pub mod load_form;
pub mod menu;

use std::path::PathBuf;

use crossterm::event::KeyCode;
use ratatui::Frame;

use crate::state::session::SessionState;

/// A background action the shell can kick off.
pub enum Command {
    Run,
    Load { manifest: PathBuf, weights: PathBuf },
    Save,
}

/// What a key press asks the app to do.
pub enum Action {
    None,
    Quit,
    Transition(Screen),
    Start(Command),
    /// Surface a precondition failure without leaving the screen.
    Alert { title: &'static str, text: String },
}

pub enum Screen {
    Menu(menu::MenuState),
    Dashboard,
    LoadForm(load_form::LoadFormState),
}

impl Screen {
    pub fn draw(&self, f: &mut Frame, session: &SessionState) {
        match self {
            Screen::Menu(s) => menu::draw(f, s),
            Screen::Dashboard => dashboard::draw(f, session),
            Screen::LoadForm(s) => load_form::draw(f, s),
        }
    }

    pub fn handle_key(&mut self, key: KeyCode) -> Action {
        match self {
            Screen::Menu(s) => menu::handle_key(s, key),
            Screen::Dashboard => dashboard::handle_key(key),
            Screen::LoadForm(s) => load_form::handle_key(s, key),
        }
    }
}
