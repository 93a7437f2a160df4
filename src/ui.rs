use crate::app::{App, Display, END_OF_DATA_MESSAGE, Focus, LOADING_MESSAGE};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
};

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3), Constraint::Length(1)].as_ref())
        .split(f.size());

    draw_data(f, chunks[0], app);
    draw_controls(f, chunks[1], app);
    draw_status(f, chunks[2], app);

    if app.show_help {
        draw_help(f, f.size());
    }
}

fn draw_data(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().borders(Borders::ALL).title("Data");
    match &app.display {
        Display::Loading => {
            let p = Paragraph::new(LOADING_MESSAGE)
                .style(Style::default().fg(Color::DarkGray))
                .block(block);
            f.render_widget(p, area);
        }
        Display::EndOfData => {
            let p = Paragraph::new(END_OF_DATA_MESSAGE)
                .style(Style::default().fg(Color::Yellow))
                .block(block);
            f.render_widget(p, area);
        }
        Display::Row(items) => {
            let list_items: Vec<ListItem> = items
                .iter()
                .map(|item| {
                    ListItem::new(Line::from(vec![
                        Span::styled(
                            format!("{}: ", item.header),
                            Style::default()
                                .fg(Color::Cyan)
                                .add_modifier(Modifier::BOLD),
                        ),
                        Span::raw(item.value.as_str()),
                    ]))
                })
                .collect();
            f.render_widget(List::new(list_items).block(block), area);
        }
    }
}

fn draw_controls(f: &mut Frame, area: Rect, app: &App) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Length(12),
                Constraint::Min(10),
                Constraint::Length(12),
                Constraint::Length(22),
                Constraint::Length(6),
            ]
            .as_ref(),
        )
        .split(area);

    f.render_widget(button("◀ Prev", app.prev_enabled()), cols[0]);
    let counter = Paragraph::new(app.row_counter_text())
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(counter, cols[1]);
    f.render_widget(button("Next ▶", app.next_enabled()), cols[2]);

    let input_style = if app.focus == Focus::GotoInput {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let cursor = if app.focus == Focus::GotoInput { "_" } else { "" };
    let input = Paragraph::new(format!("{}{}", app.goto_input, cursor)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(input_style)
            .title("Go to row"),
    );
    f.render_widget(input, cols[3]);
    f.render_widget(button("Go", app.goto_enabled()), cols[4]);
}

fn button(label: &str, enabled: bool) -> Paragraph<'_> {
    let style = if enabled {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Paragraph::new(label)
        .style(style)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).border_style(style))
}

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
    let mode = match app.focus {
        Focus::Buttons => "BROWSE",
        Focus::GotoInput => "GOTO",
    };
    let text = Line::from(vec![
        Span::styled(
            format!("[{mode}] "),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(&app.status),
    ]);
    f.render_widget(Paragraph::new(text), area);
}

const HELP_LINES: &[&str] = &[
    "n / → / PgDn / j   next row",
    "p / ← / PgUp / k   previous row",
    "g / :              go to row",
    "Enter              submit row number",
    "Esc                cancel input",
    "?                  toggle this help",
    "q / Ctrl-C         quit",
];

fn draw_help(f: &mut Frame, screen: Rect) {
    let width = 40.min(screen.width);
    let height = (HELP_LINES.len() as u16 + 2).min(screen.height);
    let area = Rect {
        x: screen.x + (screen.width - width) / 2,
        y: screen.y + (screen.height - height) / 2,
        width,
        height,
    };
    let lines: Vec<Line> = HELP_LINES.iter().map(|l| Line::from(*l)).collect();
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Keys"));
    f.render_widget(Clear, area);
    f.render_widget(p, area);
}
