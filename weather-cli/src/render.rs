//! Panel layout for the dashboard and error messages.
//!
//! Panels are drawn with ratatui widgets into an off-screen [`Buffer`] sized
//! to fit their content, then printed row by row so they can go to any
//! writer, not only a live terminal.

use chrono::{DateTime, Utc};
use colored::Colorize;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Cell, Padding, Paragraph, Row, Table, Widget},
};
use unicode_width::UnicodeWidthStr;
use weather_core::{Dashboard, ForecastDay, Units};

const GREY70: Color = Color::Rgb(178, 178, 178);
const GREY62: Color = Color::Rgb(158, 158, 158);
const GREY50: Color = Color::Rgb(127, 127, 127);

const COLUMN_SPACING: u16 = 2;

fn plain() -> Style {
    Style::default().fg(Color::White)
}

fn strong() -> Style {
    plain().add_modifier(Modifier::BOLD)
}

fn muted() -> Style {
    Style::default().fg(GREY70)
}

fn footer() -> Style {
    Style::default().fg(GREY62)
}

fn border() -> Style {
    Style::default().fg(GREY50)
}

fn cols(width: usize) -> u16 {
    u16::try_from(width).unwrap_or(u16::MAX)
}

/// One vertical slice of a panel.
enum Section<'a> {
    Blank,
    Text(Line<'a>),
    Grid {
        table: Table<'a>,
        width: u16,
        height: u16,
    },
}

impl Section<'_> {
    fn width(&self) -> u16 {
        match self {
            Section::Blank => 0,
            Section::Text(line) => cols(line.width()),
            Section::Grid { width, .. } => *width,
        }
    }

    fn height(&self) -> u16 {
        match self {
            Section::Blank | Section::Text(_) => 1,
            Section::Grid { height, .. } => *height,
        }
    }

    fn render(self, area: Rect, buf: &mut Buffer) {
        match self {
            Section::Blank => {}
            Section::Text(line) => Paragraph::new(line).render(area, buf),
            Section::Grid { table, .. } => Widget::render(table, area, buf),
        }
    }
}

/// Turns display models into terminal text.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Bold one-line heading used for banners and prompts.
    pub fn heading(&self, text: &str) -> String {
        self.paint(text, strong())
    }

    pub fn muted(&self, text: &str) -> String {
        self.paint(text, muted())
    }

    pub fn dashboard(&self, dash: &Dashboard, now: DateTime<Utc>) -> String {
        let current = &dash.current;
        let units = dash.units;

        let t = units.temperature_suffix();
        let details = [
            ("Condition", current.condition.clone()),
            ("Description", weather_core::forecast::capitalize(&current.description)),
            ("Temperature", format!("{:.1}{t}", current.temperature)),
            ("Feels Like", format!("{:.1}{t}", current.feels_like)),
            ("Humidity", format!("{}%", current.humidity_pct)),
            ("Pressure", format!("{} hPa", current.pressure_hpa)),
            ("Wind", format!("{} {}", current.wind_speed, units.speed_suffix())),
            ("Visibility", format!("{:.1} km", current.visibility_km())),
            ("Clouds", format!("{}%", current.clouds_pct)),
            ("Sunrise", current.local_time(current.sunrise).format("%H:%M").to_string()),
            ("Sunset", current.local_time(current.sunset).format("%H:%M").to_string()),
        ];

        let sections = vec![
            Section::Text(
                Line::styled(format!("{}, {}", current.city, current.country), strong())
                    .alignment(Alignment::Center),
            ),
            Section::Text(
                Line::styled(
                    format!(
                        "Local: {}  •  Updated: {}",
                        current.local_time(now).format("%Y-%m-%d %H:%M"),
                        now.format("%Y-%m-%d %H:%M UTC"),
                    ),
                    muted(),
                )
                .alignment(Alignment::Center),
            ),
            Section::Blank,
            details_table(details),
            Section::Blank,
            Section::Text(Line::styled("FORECAST", strong())),
            forecast_table(&dash.forecast, units),
            Section::Blank,
            Section::Text(
                Line::styled(
                    format!(
                        "API Latencies: current={}ms  forecast={}ms  |  Units: {}",
                        dash.latencies.current_ms, dash.latencies.forecast_ms, units
                    ),
                    footer(),
                )
                .alignment(Alignment::Center),
            ),
        ];

        self.panel(None, sections, Padding::new(2, 2, 1, 1))
    }

    pub fn error(&self, message: &str) -> String {
        let sections = vec![
            Section::Text(Line::from(vec![
                Span::styled("Error:", strong()),
                Span::styled(format!(" {message}"), plain()),
            ])),
            Section::Text(Line::styled(
                "Please check the city name and try again.",
                muted(),
            )),
        ];

        self.panel(Some("Weather Data Unavailable"), sections, Padding::horizontal(1))
    }

    /// Draws `sections` stacked inside a rounded box sized to fit them.
    fn panel(&self, title: Option<&str>, sections: Vec<Section<'_>>, padding: Padding) -> String {
        let mut block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(border())
            .padding(padding);
        let mut title_width = 0;
        if let Some(title) = title {
            let title = format!(" {title} ");
            title_width = cols(title.width());
            block = block
                .title(Line::styled(title, strong()))
                .title_alignment(Alignment::Center);
        }

        let frame_x = padding.left + padding.right + 2;
        let frame_y = padding.top + padding.bottom + 2;
        let content_width = sections.iter().map(Section::width).max().unwrap_or(0);
        let width = (content_width + frame_x).max(title_width + 2);
        let height = sections.iter().map(Section::height).sum::<u16>() + frame_y;

        let area = Rect::new(0, 0, width, height);
        let mut buf = Buffer::empty(area);
        let inner = block.inner(area);
        block.render(area, &mut buf);

        let rows = Layout::vertical(sections.iter().map(|s| Constraint::Length(s.height())))
            .split(inner);
        for (section, row) in sections.into_iter().zip(rows.iter()) {
            section.render(*row, &mut buf);
        }

        self.print(&buf)
    }

    /// Flattens the buffer into lines, colouring runs of equally styled cells.
    fn print(&self, buf: &Buffer) -> String {
        let area = buf.area;
        (area.top()..area.bottom())
            .map(|y| {
                let mut out = String::new();
                let mut run = String::new();
                let mut run_style = Style::default();
                let mut skip = 0;

                for x in area.left()..area.right() {
                    let Some(cell) = buf.cell((x, y)) else {
                        continue;
                    };
                    // Cells behind a wide glyph are placeholders.
                    if skip > 0 {
                        skip -= 1;
                        continue;
                    }
                    let symbol = cell.symbol();
                    skip = symbol.width().saturating_sub(1);

                    let style = Style::default().fg(cell.fg).add_modifier(cell.modifier);
                    if style != run_style {
                        out.push_str(&self.paint(&run, run_style));
                        run.clear();
                        run_style = style;
                    }
                    run.push_str(symbol);
                }
                out.push_str(&self.paint(&run, run_style));
                out
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if !self.color || text.is_empty() {
            return text.to_owned();
        }
        let mut painted = match style.fg {
            Some(Color::Rgb(r, g, b)) => text.truecolor(r, g, b),
            Some(Color::White) => text.white(),
            _ => text.normal(),
        };
        if style.add_modifier.contains(Modifier::BOLD) {
            painted = painted.bold();
        }
        painted.to_string()
    }
}

fn details_table<'a>(details: [(&'a str, String); 11]) -> Section<'a> {
    let label_width = details.iter().map(|(l, _)| l.width()).max().unwrap_or(0);
    let value_width = details.iter().map(|(_, v)| v.width()).max().unwrap_or(0);
    let height = cols(details.len());

    let rows = details.into_iter().map(|(label, value)| {
        Row::new([
            Cell::from(Line::from(label).alignment(Alignment::Right)).style(muted()),
            Cell::from(value).style(plain()),
        ])
    });
    let table = Table::new(
        rows,
        [
            Constraint::Length(cols(label_width)),
            Constraint::Length(cols(value_width)),
        ],
    )
    .column_spacing(COLUMN_SPACING);

    Section::Grid {
        table,
        width: cols(label_width + value_width) + COLUMN_SPACING,
        height,
    }
}

const FORECAST_COLUMNS: [(&str, Alignment); 5] = [
    ("Date", Alignment::Center),
    ("Min", Alignment::Center),
    ("Max", Alignment::Center),
    ("Pop", Alignment::Center),
    ("Summary", Alignment::Left),
];

fn forecast_table(days: &[ForecastDay], units: Units) -> Section<'static> {
    if days.is_empty() {
        return Section::Text(Line::styled("No forecast data available.", muted()));
    }

    let t = units.temperature_suffix();
    let rows: Vec<[String; 5]> = days
        .iter()
        .map(|d| {
            [
                d.date.format("%Y-%m-%d").to_string(),
                format!("{:.1}{t}", d.min),
                format!("{:.1}{t}", d.max),
                format!("{}%", d.pop_pct),
                d.summary.clone(),
            ]
        })
        .collect();

    let mut widths = FORECAST_COLUMNS.map(|(name, _)| name.width());
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.width());
        }
    }
    let width = cols(widths.iter().sum()) + COLUMN_SPACING * cols(widths.len() - 1);
    let height = cols(rows.len() + 1);

    let cell = |text: String, align: Alignment| Cell::from(Line::from(text).alignment(align));
    let header = Row::new(FORECAST_COLUMNS.map(|(name, align)| cell(name.to_owned(), align)))
        .style(strong());
    let body = rows.into_iter().map(|row| {
        Row::new(
            row.into_iter()
                .zip(FORECAST_COLUMNS)
                .map(|(text, (_, align))| cell(text, align)),
        )
        .style(plain())
    });

    let table = Table::new(body, widths.map(|w| Constraint::Length(cols(w))))
        .header(header)
        .column_spacing(COLUMN_SPACING);

    Section::Grid {
        table,
        width,
        height,
    }
}
