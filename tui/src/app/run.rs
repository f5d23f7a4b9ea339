use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Frame, Terminal};
use tokio::sync::mpsc;

use pipeline::{
    config::{ModelConfig, TrainingConfig},
    model_io, PipelineErr,
};

use crate::state::session::{SessionState, UiEvent};
use crate::ui::screens::{menu, Action, Command, Screen};
use crate::ui::widgets;

struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// The shell: one screen at a time, one background action at a time, and a
/// single guarded slot holding the trained model.
struct App {
    rt: tokio::runtime::Runtime,
    slot: Arc<pipeline::ModelSlot>,
    tx: mpsc::Sender<UiEvent>,
    session: SessionState,
    screen: Screen,
}

impl App {
    fn new(rt: tokio::runtime::Runtime) -> Self {
        let (tx, rx) = mpsc::channel(256);
        Self {
            rt,
            slot: Arc::new(pipeline::ModelSlot::new()),
            tx,
            session: SessionState::new(rx),
            screen: Screen::Menu(menu::MenuState::new()),
        }
    }

    fn tick(&mut self) {
        self.session.tick();
    }

    fn draw(&self, f: &mut Frame) {
        self.screen.draw(f, &self.session);
        if let Some(dialog) = self.session.dialog() {
            widgets::render_dialog(f, dialog);
        }
    }

    /// Returns `true` when the app should exit.
    fn handle_key(&mut self, key: KeyCode) -> bool {
        // A visible dialog swallows the next key press.
        if self.session.dialog().is_some() {
            self.session.dismiss_dialog();
            return false;
        }

        match self.screen.handle_key(key) {
            Action::None => false,
            Action::Quit => true,
            Action::Transition(next) => {
                self.screen = next;
                false
            }
            Action::Alert { title, text } => {
                self.session.show_error(title, text);
                false
            }
            Action::Start(command) => {
                self.start(command);
                false
            }
        }
    }

    fn start(&mut self, command: Command) {
        if self.session.busy() {
            self.session.show_error(
                "Busy",
                "another action is still running; wait for it to finish".into(),
            );
            return;
        }

        match command {
            Command::Run => self.start_run(),
            Command::Load { manifest, weights } => self.start_load(manifest, weights),
            Command::Save => self.start_save(),
        }
    }

    fn start_run(&mut self) {
        let training = TrainingConfig::default();
        self.session.begin_run(training.epochs.get());
        self.screen = Screen::Dashboard;

        let tx = self.tx.clone();
        let slot = self.slot.clone();
        self.rt.spawn(async move {
            let (ptx, mut prx) = mpsc::channel(32);

            let progress = tx.clone();
            let forwarder = tokio::spawn(async move {
                while let Some(event) = prx.recv().await {
                    if progress.send(UiEvent::Pipeline(event)).await.is_err() {
                        break;
                    }
                }
            });

            let result = pipeline::run(ModelConfig::mpg_net(), training, slot, ptx).await;
            let _ = forwarder.await;

            let done = match result {
                Ok(_) => UiEvent::RunFinished,
                Err(e) => UiEvent::RunFailed(e.to_string()),
            };
            let _ = tx.send(done).await;
        });
    }

    fn start_load(&mut self, manifest: PathBuf, weights: PathBuf) {
        self.session.begin_action();
        self.screen = Screen::Dashboard;

        let tx = self.tx.clone();
        self.rt.spawn_blocking(move || {
            let done = match model_io::load(&manifest, &weights) {
                Ok((_, predictions)) => UiEvent::LoadDone { predictions },
                Err(e) => UiEvent::LoadFailed(e.to_string()),
            };
            let _ = tx.blocking_send(done);
        });
    }

    fn start_save(&mut self) {
        if self.slot.is_empty() {
            self.session
                .show_error("Save failed", PipelineErr::NoModel.to_string());
            return;
        }

        self.session.begin_action();
        let tx = self.tx.clone();
        let slot = self.slot.clone();
        self.rt.spawn_blocking(move || {
            let done = std::env::current_dir()
                .map_err(PipelineErr::from)
                .and_then(|dir| model_io::save_current(&slot, &dir))
                .map(|(manifest, weights)| UiEvent::SaveDone { manifest, weights })
                .unwrap_or_else(|e| UiEvent::SaveFailed(e.to_string()));
            let _ = tx.blocking_send(done);
        });
    }
}

/// Runs the TUI application.
///
/// # Errors
/// Returns an error if terminal or runtime setup fails.
pub fn run() -> Result<()> {
    let _guard = TerminalGuard::enter()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let mut app = App::new(rt);

    loop {
        app.tick();
        terminal.draw(|f| app.draw(f))?;

        if event::poll(Duration::from_millis(120))? {
            if let Event::Key(k) = event::read()? {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if app.handle_key(k.code) {
                    break;
                }
            }
        }
    }

    terminal.show_cursor()?;
    Ok(())
}
