use ratatui::{
    layout::Constraint,
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Block, Borders, Cell, Chart, Clear, Dataset, GraphType, Paragraph, Row, Table, Wrap,
    },
    Frame,
};

use crate::state::model::{DashboardView, DialogView, Phase};
use crate::ui::{layout, theme::Theme};

pub fn header<'a>(view: &'a DashboardView, busy: bool) -> Paragraph<'a> {
    let phase = match view.phase {
        Phase::Idle => "IDLE",
        Phase::Fetching => "FETCHING",
        Phase::Training => "TRAINING",
        Phase::Evaluated => "EVALUATED",
        Phase::Failed => "FAILED",
    };

    let line1 = Line::from(vec![
        Span::styled("Horsepower → MPG Lab", Theme::title()),
        Span::raw("  |  "),
        Span::raw(format!("Phase: {phase}")),
        Span::styled(if busy { "  (working)" } else { "" }, Theme::dim()),
    ]);

    let line2 = Line::from(vec![Span::raw(format!(
        "Elapsed: {:02}:{:02}  |  Epochs: {} / {}  |  Samples: {}",
        view.elapsed.as_secs() / 60,
        view.elapsed.as_secs() % 60,
        view.epochs_done,
        view.epochs_total,
        view.data_points.len(),
    ))]);

    Paragraph::new(vec![line1, line2])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border())
                .title("Overview"),
        )
        .wrap(Wrap { trim: true })
}

pub fn data_chart<'a>(view: &'a DashboardView) -> Chart<'a> {
    let datasets = vec![Dataset::default()
        .name("samples")
        .marker(symbols::Marker::Dot)
        .graph_type(GraphType::Scatter)
        .style(Theme::series_b())
        .data(&view.data_points)];

    let series = [view.data_points.as_slice()];
    chart(
        datasets,
        "Data",
        "horsepower",
        "mpg",
        bounds_of(&series, |p| p.0),
        bounds_of(&series, |p| p.1),
    )
}

pub fn progress_chart<'a>(view: &'a DashboardView) -> Chart<'a> {
    let datasets = vec![
        Dataset::default()
            .name("loss")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Theme::series_a())
            .data(&view.losses),
        Dataset::default()
            .name("mse")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Theme::series_b())
            .data(&view.mses),
    ];

    let x_max = view.epochs_total.max(1) as f64;
    let series = [view.losses.as_slice(), view.mses.as_slice()];
    let y = bounds_of(&series, |p| p.1);

    chart(datasets, "Progress", "epoch", "loss / mse", [1.0, x_max], y)
}

pub fn eval_chart<'a>(view: &'a DashboardView) -> Chart<'a> {
    let datasets = vec![
        Dataset::default()
            .name("original")
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(Theme::series_b())
            .data(&view.original),
        Dataset::default()
            .name("predicted")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Theme::series_a())
            .data(&view.predicted),
    ];

    let series = [view.original.as_slice(), view.predicted.as_slice()];
    chart(
        datasets,
        "Evaluation",
        "horsepower",
        "mpg",
        bounds_of(&series, |p| p.0),
        bounds_of(&series, |p| p.1),
    )
}

pub fn summary<'a>(view: &'a DashboardView) -> Table<'a> {
    let header = Row::new(vec!["layer", "shape", "params"]).style(Theme::title());

    let rows: Vec<Row> = match &view.summary {
        Some(summary) => summary
            .layers
            .iter()
            .enumerate()
            .map(|(i, &(n, m))| {
                Row::new(vec![
                    Cell::from(format!("dense_{i}")),
                    Cell::from(format!("{n} → {m}")),
                    Cell::from(((n + 1) * m).to_string()),
                ])
            })
            .chain(std::iter::once(
                Row::new(vec![
                    Cell::from("total"),
                    Cell::from(""),
                    Cell::from(summary.num_params.to_string()),
                ])
                .style(Theme::dim()),
            ))
            .collect(),
        None => vec![Row::new(vec![Cell::from("no model built yet")]).style(Theme::muted())],
    };

    Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Length(12),
            Constraint::Min(8),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Theme::border())
            .title("Model"),
    )
}

pub fn logs<'a>(view: &'a DashboardView) -> Paragraph<'a> {
    let tail = view.logs.iter().rev().take(6).rev();

    let lines = tail
        .map(|l| {
            let style = if l.level == "ERROR" {
                Theme::error()
            } else {
                Theme::dim()
            };
            Line::from(vec![
                Span::styled(format!("[{}] ", l.level), style),
                Span::styled(l.message.as_str(), Theme::text()),
            ])
        })
        .collect::<Vec<_>>();

    Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border())
                .title("Events"),
        )
        .wrap(Wrap { trim: true })
}

/// Renders a modal popup over whatever is underneath.
pub fn render_dialog(f: &mut Frame, dialog: &DialogView) {
    let area = layout::centered_rect(60, 30, f.size());
    let style = if dialog.error {
        Theme::error()
    } else {
        Theme::ok()
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(style)
        .title(Span::styled(format!(" {} ", dialog.title), style));

    let text: Vec<Line> = dialog
        .text
        .lines()
        .map(|l| Line::from(Span::styled(l.to_string(), Theme::text())))
        .chain([
            Line::from(""),
            Line::from(Span::styled("press any key to dismiss", Theme::muted())),
        ])
        .collect();

    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(text)
            .block(block)
            .style(Theme::base())
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn chart<'a>(
    datasets: Vec<Dataset<'a>>,
    title: &'a str,
    x_title: &'a str,
    y_title: &'a str,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
) -> Chart<'a> {
    Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border())
                .title(title),
        )
        .x_axis(
            Axis::default()
                .title(x_title)
                .style(Theme::muted())
                .bounds(x_bounds)
                .labels(axis_labels(x_bounds)),
        )
        .y_axis(
            Axis::default()
                .title(y_title)
                .style(Theme::muted())
                .bounds(y_bounds)
                .labels(axis_labels(y_bounds)),
        )
}

fn axis_labels<'a>(bounds: [f64; 2]) -> Vec<Span<'a>> {
    let mid = (bounds[0] + bounds[1]) / 2.0;
    [bounds[0], mid, bounds[1]]
        .iter()
        .map(|v| Span::styled(format!("{v:.1}"), Theme::muted()))
        .collect()
}

/// Min/max of one coordinate across several series, padded a little so
/// points never sit on the frame. Empty input maps to [0, 1].
fn bounds_of(series: &[&[(f64, f64)]], pick: fn(&(f64, f64)) -> f64) -> [f64; 2] {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for s in series {
        for p in *s {
            let v = pick(p);
            min = min.min(v);
            max = max.max(v);
        }
    }

    if !min.is_finite() || !max.is_finite() {
        return [0.0, 1.0];
    }

    let pad = ((max - min) * 0.05).max(0.1);
    [min - pad, max + pad]
}
