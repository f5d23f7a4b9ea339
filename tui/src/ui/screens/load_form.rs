use std::path::PathBuf;

use crossterm::event::KeyCode;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::ui::{layout::centered_rect, theme::Theme};

use super::{Action, Command, Screen};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Manifest,
    Weights,
}

/// The two file-path fields gating the load action.
pub struct LoadFormState {
    pub manifest: String,
    pub weights: String,
    pub focus: Field,
}

impl LoadFormState {
    pub fn new() -> Self {
        Self {
            manifest: String::new(),
            weights: String::new(),
            focus: Field::Manifest,
        }
    }

    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            Field::Manifest => &mut self.manifest,
            Field::Weights => &mut self.weights,
        }
    }
}

pub fn handle_key(state: &mut LoadFormState, key: KeyCode) -> Action {
    match key {
        KeyCode::Esc => Action::Transition(Screen::Menu(super::menu::MenuState::new())),
        KeyCode::Tab | KeyCode::Up | KeyCode::Down => {
            state.focus = match state.focus {
                Field::Manifest => Field::Weights,
                Field::Weights => Field::Manifest,
            };
            Action::None
        }
        KeyCode::Backspace => {
            state.focused_mut().pop();
            Action::None
        }
        KeyCode::Char(c) => {
            state.focused_mut().push(c);
            Action::None
        }
        KeyCode::Enter => {
            // The precondition check: both files must be chosen before any
            // deserialization is attempted.
            if state.manifest.trim().is_empty() || state.weights.trim().is_empty() {
                return Action::Alert {
                    title: "No file chosen",
                    text: "Please provide both the manifest and the weights paths".into(),
                };
            }
            Action::Start(Command::Load {
                manifest: PathBuf::from(state.manifest.trim()),
                weights: PathBuf::from(state.weights.trim()),
            })
        }
        _ => Action::None,
    }
}

pub fn draw(f: &mut Frame, state: &LoadFormState) {
    let area = f.size();
    f.render_widget(Block::default().style(Theme::base()), area);

    let outer = centered_rect(70, 50, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Theme::border())
        .title(" Load Model ")
        .title_style(Theme::title());
    let inner = block.inner(outer);
    f.render_widget(block, outer);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(inner);

    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            "Pick the manifest/weights pair produced by Save Model.",
            Theme::dim(),
        ))),
        chunks[0],
    );

    draw_field(
        f,
        chunks[1],
        "manifest (.json)",
        &state.manifest,
        state.focus == Field::Manifest,
    );
    draw_field(
        f,
        chunks[2],
        "weights (.safetensors)",
        &state.weights,
        state.focus == Field::Weights,
    );

    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("tab", Theme::dim()),
            Span::styled("  switch    ", Theme::muted()),
            Span::styled("enter", Theme::dim()),
            Span::styled("  load    ", Theme::muted()),
            Span::styled("esc", Theme::dim()),
            Span::styled("  back", Theme::muted()),
        ])),
        chunks[4],
    );
}

fn draw_field(f: &mut Frame, area: ratatui::layout::Rect, label: &str, value: &str, focused: bool) {
    let style = if focused { Theme::title() } else { Theme::dim() };
    let cursor = if focused { "█" } else { "" };

    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(format!("{value}{cursor}"), Theme::text()),
        ]))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(style)
                .title(label.to_string()),
        ),
        area,
    );
}
