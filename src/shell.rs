//! Terminal host for the dashboard.
//!
//! Reads one command per line, swaps in a new `Selection` when the user picks
//! something, and re-renders the whole dashboard from scratch.

use log::debug;
use serde::Serialize;
use std::io::{self, BufRead, Write};

use crate::config::OutputFormat;
use crate::loader::Datasets;
use crate::models::campus::{BuildingId, FloorId, SpaceType};
use crate::presentation::{self, FloorMapChart, MarkerColor, MarkerShape, TrendChart};
use crate::selection::{self, SelectOption, Selection};
use crate::services::pipeline::{self, Kpis};

pub const TITLE: &str = "Study Space Booking Dashboard";
pub const BOOKING_ACK: &str = "This would open the official booking system. Placeholder only.";
const HELP: &str = "commands: building <id|name>, floor <id|name>, type <desk|room|pc>, book, show, help, quit";

const MAP_COLS: usize = 41;
const MAP_ROWS: usize = 21;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectorOptions {
    pub buildings: Vec<SelectOption<BuildingId>>,
    pub floors: Vec<SelectOption<FloorId>>,
    pub space_types: Vec<SelectOption<SpaceType>>,
}

/// Everything one render shows, in renderer-neutral form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub title: &'static str,
    pub selection: Selection,
    pub options: SelectorOptions,
    pub kpis: Kpis,
    pub floor_map: FloorMapChart,
    pub trend: TrendChart,
}

pub fn build_view(data: &Datasets, selection: &Selection) -> DashboardView {
    let result = pipeline::evaluate(data, selection);
    debug!(
        "Evaluated building={} floor={} ({} floor option(s)) type={}: total={} occupied={} free_rooms={} mean_occ={:.3} wait={}min",
        label_or_dash(selection.building_id.as_ref()),
        label_or_dash(result.floor_id),
        result.floors.len(),
        result.space_type,
        result.kpis.total,
        result.kpis.occupied,
        result.kpis.free_rooms,
        result.kpis.mean_occ,
        result.kpis.wait_minutes
    );

    DashboardView {
        title: TITLE,
        selection: selection.clone(),
        options: SelectorOptions {
            buildings: selection::building_options(data),
            floors: selection::floor_options(data, selection.building_id.as_ref()),
            space_types: selection::space_type_options(),
        },
        kpis: result.kpis,
        floor_map: presentation::floor_map_chart(&result),
        trend: presentation::trend_chart(&result),
    }
}

fn label_or_dash<K: AsRef<str>>(key: Option<&K>) -> &str {
    key.map(|k| k.as_ref()).unwrap_or("-")
}

fn option_label<'a, K: PartialEq>(options: &'a [SelectOption<K>], key: Option<&K>) -> &'a str {
    key.and_then(|k| options.iter().find(|o| &o.key == k))
        .map(|o| o.label.as_str())
        .unwrap_or("-")
}

/// `Floors: [F1=Level 1], F2=Level 2`; the current choice is bracketed.
fn option_line<K: AsRef<str> + PartialEq>(name: &str, options: &[SelectOption<K>], current: Option<&K>) -> String {
    let entries = options
        .iter()
        .map(|o| {
            let key = o.key.as_ref();
            let entry = if o.label == key { key.to_string() } else { format!("{}={}", key, o.label) };
            if current == Some(&o.key) { format!("[{}]", entry) } else { entry }
        })
        .collect::<Vec<_>>();
    if entries.is_empty() {
        format!("{}: -\n", name)
    } else {
        format!("{}: {}\n", name, entries.join(", "))
    }
}

fn percent(rate: f64) -> String {
    format!("{:.0}%", rate * 100.0)
}

pub fn render_text(view: &DashboardView) -> String {
    let mut out = String::new();
    let sel = &view.selection;

    out.push_str(view.title);
    out.push('\n');
    out.push_str(&format!(
        "Building: {} | Floor: {} | Space Type: {}\n",
        option_label(&view.options.buildings, sel.building_id.as_ref()),
        option_label(&view.options.floors, sel.floor_id.as_ref()),
        sel.space_type
    ));
    out.push_str(&option_line("Buildings", &view.options.buildings, sel.building_id.as_ref()));
    out.push_str(&option_line("Floors", &view.options.floors, sel.floor_id.as_ref()));
    out.push_str(&option_line("Types", &view.options.space_types, Some(&sel.space_type)));
    out.push('\n');

    let tiles = [
        ("Free Seats", view.kpis.free.to_string()),
        ("Occupancy", percent(view.kpis.occ_rate)),
        ("Free Rooms", view.kpis.free_rooms.to_string()),
        ("Est. Wait", format!("{} min", view.kpis.wait_minutes)),
    ];
    for (name, _) in &tiles {
        out.push_str(&format!("{:<12}", name));
    }
    out.push('\n');
    for (_, value) in &tiles {
        out.push_str(&format!("{:<12}", value));
    }
    out.push_str("\n\n");

    out.push_str("Floor Map\n");
    out.push_str(&render_map(&view.floor_map));
    out.push('\n');

    out.push_str("Trend (mean & p25)\n");
    match &view.trend {
        TrendChart::NoData { message } => {
            out.push_str(message);
            out.push('\n');
        }
        TrendChart::Lines { series, .. } => {
            out.push_str(&format!("{:<8}{:>6}{:>6}\n", "time", series.mean.name, series.p25.name));
            for ((bucket, mean), (_, p25)) in series.mean.points.iter().zip(&series.p25.points) {
                out.push_str(&format!("{:<8}{:>6}{:>6}\n", bucket.axis_label(), percent(*mean), percent(*p25)));
            }
        }
    }
    out.push('\n');
    out.push_str(&presentation::legend());
    out.push('\n');
    out
}

fn glyph(color: MarkerColor, shape: MarkerShape) -> char {
    match (color, shape) {
        (MarkerColor::Occupied, MarkerShape::Room) => '■',
        (MarkerColor::Free, MarkerShape::Room) => '□',
        (MarkerColor::Occupied, MarkerShape::Other) => '●',
        (MarkerColor::Free, MarkerShape::Other) => '○',
    }
}

/// Plot markers on a character grid; y grows upwards like the chart. When
/// markers share a cell an occupied one is shown over a free one.
fn render_map(chart: &FloorMapChart) -> String {
    let mut cells: Vec<Vec<Option<(MarkerColor, MarkerShape)>>> = vec![vec![None; MAP_COLS]; MAP_ROWS];
    let [x0, x1] = chart.x_axis.range;
    let [y0, y1] = chart.y_axis.range;

    for m in &chart.markers {
        let fx = ((m.x - x0) / (x1 - x0)).clamp(0.0, 1.0);
        let fy = ((m.y - y0) / (y1 - y0)).clamp(0.0, 1.0);
        if fx.is_nan() || fy.is_nan() {
            continue;
        }
        let col = (fx * (MAP_COLS - 1) as f64).round() as usize;
        let row = MAP_ROWS - 1 - (fy * (MAP_ROWS - 1) as f64).round() as usize;
        let cell = &mut cells[row][col];
        let hidden_occupied = matches!(cell, Some((MarkerColor::Occupied, _))) && m.color == MarkerColor::Free;
        if !hidden_occupied {
            *cell = Some((m.color, m.shape));
        }
    }

    let mut out = String::with_capacity((MAP_COLS + 3) * MAP_ROWS * 3);
    for row in cells {
        out.push('|');
        out.extend(row.into_iter().map(|c| c.map_or('·', |(color, shape)| glyph(color, shape))));
        out.push_str("|\n");
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Building(String),
    Floor(String),
    SpaceType(String),
    Book,
    Show,
    Help,
    Quit,
}

impl Command {
    /// `Ok(None)` for blank lines and `#` comments.
    pub fn parse(line: &str) -> Result<Option<Command>, String> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        let (verb, arg) = match line.split_once(char::is_whitespace) {
            Some((v, a)) => (v, a.trim()),
            None => (line, ""),
        };
        let need_arg = |make: fn(String) -> Command| {
            if arg.is_empty() {
                Err(format!("`{}` requires an argument", verb))
            } else {
                Ok(Some(make(arg.to_string())))
            }
        };
        match verb.to_ascii_lowercase().as_str() {
            "building" | "b" => need_arg(Command::Building),
            "floor" | "f" => need_arg(Command::Floor),
            "type" | "t" => need_arg(Command::SpaceType),
            "book" => Ok(Some(Command::Book)),
            "show" => Ok(Some(Command::Show)),
            "help" | "?" => Ok(Some(Command::Help)),
            "quit" | "exit" | "q" => Ok(Some(Command::Quit)),
            other => Err(format!("unknown command `{}`; try `help`", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Selection changed or a redraw was requested
    Render,
    /// Show a message; the selection is unchanged
    Notice(String),
    Quit,
}

/// Why a session ended early. Reading commands and writing the dashboard fail
/// for different reasons, so they are reported separately.
#[derive(Debug)]
pub enum ShellError {
    Read(io::Error),
    Write(io::Error),
}

impl core::fmt::Display for ShellError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ShellError::Read(e) => write!(f, "reading commands failed: {}", e),
            ShellError::Write(e) => write!(f, "writing dashboard failed: {}", e),
        }
    }
}

impl std::error::Error for ShellError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ShellError::Read(e) | ShellError::Write(e) => Some(e),
        }
    }
}

#[derive(Serialize)]
struct NoticeDoc<'a> {
    message: &'a str,
}

pub struct Shell<'a> {
    data: &'a Datasets,
    selection: Selection,
    output: OutputFormat,
}

impl<'a> Shell<'a> {
    pub fn new(data: &'a Datasets, selection: Selection, output: OutputFormat) -> Self {
        Shell { data, selection, output }
    }

    pub fn handle(&mut self, command: Command) -> Outcome {
        let next = match command {
            Command::Building(choice) => self.selection.choose_building(self.data, &choice),
            Command::Floor(choice) => self.selection.choose_floor(self.data, &choice),
            Command::SpaceType(choice) => self.selection.choose_space_type(&choice),
            Command::Book => return Outcome::Notice(BOOKING_ACK.to_string()),
            Command::Show => return Outcome::Render,
            Command::Help => return Outcome::Notice(HELP.to_string()),
            Command::Quit => return Outcome::Quit,
        };
        match next {
            Ok(selection) => {
                self.selection = selection;
                Outcome::Render
            }
            Err(e) => Outcome::Notice(e.to_string()),
        }
    }

    pub fn render<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let view = build_view(self.data, &self.selection);
        match self.output {
            OutputFormat::Text => write!(out, "{}", render_text(&view)),
            OutputFormat::Json => {
                serde_json::to_writer(&mut *out, &view)?;
                writeln!(out)
            }
        }
    }

    fn notice<W: Write>(&self, out: &mut W, message: &str) -> io::Result<()> {
        match self.output {
            OutputFormat::Text => writeln!(out, "{}", message),
            OutputFormat::Json => {
                serde_json::to_writer(&mut *out, &NoticeDoc { message })?;
                writeln!(out)
            }
        }
    }

    /// Render once, then serve commands until `quit` or end of input.
    /// Lines that are not valid UTF-8 are answered with a notice like any
    /// other bad command.
    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, out: &mut W, prompt: bool) -> Result<(), ShellError> {
        self.render(out).map_err(ShellError::Write)?;
        let mut buf = Vec::new();
        loop {
            if prompt {
                write!(out, "> ").and_then(|_| out.flush()).map_err(ShellError::Write)?;
            }
            buf.clear();
            if input.read_until(b'\n', &mut buf).map_err(ShellError::Read)? == 0 {
                break;
            }
            let parsed = match std::str::from_utf8(&buf) {
                Ok(line) => Command::parse(line),
                Err(_) => Err("input line is not valid UTF-8".to_string()),
            };
            let written = match parsed {
                Ok(Some(command)) => match self.handle(command) {
                    Outcome::Render => self.render(out),
                    Outcome::Notice(message) => self.notice(out, &message),
                    Outcome::Quit => break,
                },
                Ok(None) => Ok(()),
                Err(e) => self.notice(out, &e),
            };
            written.map_err(ShellError::Write)?;
        }
        out.flush().map_err(ShellError::Write)
    }
}
