use crossterm::event::KeyCode;
use ratatui::{widgets::Block, Frame};

use crate::state::session::SessionState;
use crate::ui::{layout, theme::Theme, widgets};

use super::{Action, Screen};

pub fn handle_key(key: KeyCode) -> Action {
    match key {
        KeyCode::Esc | KeyCode::Char('m') => {
            Action::Transition(Screen::Menu(super::menu::MenuState::new()))
        }
        KeyCode::Char('q') => Action::Quit,
        _ => Action::None,
    }
}

pub fn draw(f: &mut Frame, session: &SessionState) {
    let area = f.size();
    f.render_widget(Block::default().style(Theme::base()), area);

    let view = session.view();
    let (header_area, top_area, bottom_area, logs_area) = layout::dashboard(area);
    let (data_area, progress_area) = layout::halves(top_area);
    let (eval_area, summary_area) = layout::halves(bottom_area);

    f.render_widget(widgets::header(view, session.busy()), header_area);
    f.render_widget(widgets::data_chart(view), data_area);
    f.render_widget(widgets::progress_chart(view), progress_area);
    f.render_widget(widgets::eval_chart(view), eval_area);
    f.render_widget(widgets::summary(view), summary_area);
    f.render_widget(widgets::logs(view), logs_area);
}
