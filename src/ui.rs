use std::error::Error;
use std::io;
use std::time::Duration as StdDuration;

use chrono::{Local, NaiveDate};
use crossterm::event::{self, Event as CEvent, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, ExecutableCommand};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};
use ratatui::{Frame, Terminal};

use crate::config::{FieldBindings, GridOptions};
use crate::daterange::{
	day_label, next_period, next_week, previous_period, previous_week, range_label, today_anchor,
	visible_range,
};
use crate::domain::{EntryIndex, Project};
use crate::editor::{CellEditor, CellKey, CommitOutcome};
use crate::host::{EntrySource, ProjectAction, ProjectSource, RecordHost, SourceStatus};

const SELECTED_CELL_COLOR: Color = Color::Yellow;
const TOTALS_COLOR: Color = Color::DarkGray;
const PROJECT_COLUMN_WIDTH: u16 = 18;
const DATE_COLUMN_WIDTH: u16 = 11;

/// Runs the grid dashboard against any host implementing the full contract.
pub fn run_grid<H>(
	host: &mut H,
	options: &GridOptions,
	bindings: &FieldBindings,
) -> Result<(), Box<dyn Error>>
where
	H: ProjectSource + EntrySource + RecordHost + ProjectAction,
{
	enable_raw_mode()?;
	let mut stdout = io::stdout();
	stdout.execute(EnterAlternateScreen)?;
	let backend = CrosstermBackend::new(stdout);
	let mut terminal = Terminal::new(backend)?;

	let result = run_event_loop(&mut terminal, host, options, bindings);

	disable_raw_mode()?;
	execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
	terminal.show_cursor()?;

	result
}

fn run_event_loop<H>(
	terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
	host: &mut H,
	options: &GridOptions,
	bindings: &FieldBindings,
) -> Result<(), Box<dyn Error>>
where
	H: ProjectSource + EntrySource + RecordHost + ProjectAction,
{
	let mut app = App::new(options);

	loop {
		let view = build_view(host, options, bindings, app.anchor);
		app.clamp_selection(&view);
		terminal.draw(|frame| draw_grid(frame, &app, &view, options))?;

		if event::poll(StdDuration::from_millis(250))? {
			if let CEvent::Key(key) = event::read()? {
				if key.kind != KeyEventKind::Press {
					continue;
				}

				let should_quit = if app.editing {
					handle_edit_key(&mut app, key.code, host, options, bindings, &view)
				} else {
					handle_normal_key(&mut app, key.code, options, &view)
				};

				if should_quit {
					break;
				}
			}
		}
	}

	Ok(())
}

fn handle_normal_key(app: &mut App, code: KeyCode, options: &GridOptions, view: &GridView) -> bool {
	match code {
		KeyCode::Char('q') | KeyCode::Esc => true,
		KeyCode::Up | KeyCode::Char('k') => {
			app.row = app.row.saturating_sub(1);
			false
		}
		KeyCode::Down | KeyCode::Char('j') => {
			if !view.projects.is_empty() {
				app.row = (app.row + 1).min(view.projects.len() - 1);
			}
			false
		}
		KeyCode::Left | KeyCode::Char('h') => {
			app.col = app.col.saturating_sub(1);
			false
		}
		KeyCode::Right | KeyCode::Char('l') => {
			if !view.dates.is_empty() {
				app.col = (app.col + 1).min(view.dates.len() - 1);
			}
			false
		}
		KeyCode::Char('p') => {
			app.anchor = previous_period(app.anchor, options.days);
			app.status = "previous period".to_string();
			false
		}
		KeyCode::Char('n') => {
			app.anchor = next_period(app.anchor, options.days);
			app.status = "next period".to_string();
			false
		}
		KeyCode::Char('P') => {
			app.anchor = previous_week(app.anchor);
			app.status = "previous week".to_string();
			false
		}
		KeyCode::Char('N') => {
			app.anchor = next_week(app.anchor);
			app.status = "next week".to_string();
			false
		}
		KeyCode::Char('t') => {
			app.anchor = today_anchor();
			app.status = "current week".to_string();
			false
		}
		KeyCode::Enter | KeyCode::Char('i') => {
			if !options.editable {
				app.status = "grid is read-only".to_string();
			} else if let Some(key) = app.selected_key(view) {
				// An unsaved edit left on the cell stays in place.
				if !app.editor.has_draft(&key) {
					app.editor.update(key, String::new());
				}
				app.editing = true;
				app.status = "editing: type hours, Enter saves, Esc cancels".to_string();
			}
			false
		}
		_ => false,
	}
}

fn handle_edit_key<H>(
	app: &mut App,
	code: KeyCode,
	host: &mut H,
	options: &GridOptions,
	bindings: &FieldBindings,
	view: &GridView,
) -> bool
where
	H: ProjectSource + EntrySource + RecordHost + ProjectAction,
{
	let Some(key) = app.selected_key(view) else {
		app.editing = false;
		return false;
	};

	match code {
		KeyCode::Esc => {
			app.editor.cancel(&key);
			app.editing = false;
			app.status = "edit cancelled".to_string();
		}
		KeyCode::Backspace => {
			app.editor.pop_char(&key);
		}
		KeyCode::Char(value) if value.is_ascii_digit() || value == '.' => {
			app.editor.push_char(&key, value);
		}
		KeyCode::Enter | KeyCode::Tab => {
			let advance = code == KeyCode::Tab;
			let outcome = app.editor.commit(&key, host, options, bindings, &view.projects);
			app.status = status_for(&outcome, &key);
			app.editing = false;
			if advance && app.col + 1 < view.dates.len() {
				app.col += 1;
			}
		}
		_ => {}
	}

	false
}

fn status_for(outcome: &CommitOutcome, key: &CellKey) -> String {
	match outcome {
		CommitOutcome::Saved => format!("saved hours for {}", key.date.format("%Y-%m-%d")),
		CommitOutcome::Skipped => "nothing saved".to_string(),
		CommitOutcome::Failed(err) => format!("error: {err}"),
	}
}

fn build_view<H>(host: &H, options: &GridOptions, bindings: &FieldBindings, anchor: NaiveDate) -> GridView
where
	H: ProjectSource + EntrySource,
{
	let dates = visible_range(anchor, options.days, options.show_weekends);
	let loading = host.project_status() != SourceStatus::Available;
	let projects = if loading {
		Vec::new()
	} else {
		Project::from_items(&host.project_items(), bindings)
	};
	let index = if host.entry_status() == SourceStatus::Available {
		EntryIndex::from_items(&host.entry_items(), bindings)
	} else {
		EntryIndex::default()
	};

	GridView {
		range_label: range_label(&dates),
		dates,
		projects,
		index,
		loading,
	}
}

fn draw_grid(frame: &mut Frame, app: &App, view: &GridView, options: &GridOptions) {
	let layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([Constraint::Length(3), Constraint::Min(8), Constraint::Length(4)])
		.split(frame.area());

	render_header(frame, layout[0], view);
	render_table(frame, layout[1], app, view, options);
	render_footer(frame, layout[2], app, options);
}

fn render_header(frame: &mut Frame, area: Rect, view: &GridView) {
	let header = Paragraph::new(Line::from(view.range_label.clone()))
		.block(Block::default().borders(Borders::ALL).title("Timesheet"));
	frame.render_widget(header, area);
}

fn render_table(frame: &mut Frame, area: Rect, app: &App, view: &GridView, options: &GridOptions) {
	if view.loading {
		let placeholder =
			Paragraph::new("Loading projects...").block(Block::default().borders(Borders::ALL));
		frame.render_widget(placeholder, area);
		return;
	}

	if view.projects.is_empty() {
		let placeholder =
			Paragraph::new("No projects available").block(Block::default().borders(Borders::ALL));
		frame.render_widget(placeholder, area);
		return;
	}

	let mut header_cells = vec![Cell::from("Project")];
	for date in &view.dates {
		header_cells.push(Cell::from(day_label(*date)));
	}
	if options.show_totals {
		header_cells.push(Cell::from("Total"));
	}
	let header = Row::new(header_cells).style(Style::default().add_modifier(Modifier::BOLD));

	let mut rows = Vec::new();
	for (row_index, project) in view.projects.iter().enumerate() {
		let mut cells = vec![Cell::from(project.name.clone())];
		for (col_index, date) in view.dates.iter().enumerate() {
			let key = CellKey::new(project.id.clone(), *date);
			let selected = row_index == app.row && col_index == app.col;
			let mut text = app.editor.display_value(&key, &view.index);
			if selected && app.editing {
				text.push('_');
			} else if text.is_empty() && !options.editable {
				text = "-".to_string();
			}

			let style = if selected {
				Style::default()
					.fg(Color::Black)
					.bg(SELECTED_CELL_COLOR)
					.add_modifier(Modifier::BOLD)
			} else {
				Style::default()
			};
			cells.push(Cell::from(text).style(style));
		}
		if options.show_totals {
			cells.push(
				Cell::from(format!("{:.1}", view.index.row_total(&project.id)))
					.style(Style::default().fg(TOTALS_COLOR)),
			);
		}
		rows.push(Row::new(cells));
	}

	if options.show_daily_totals {
		let mut cells = vec![Cell::from("Daily Total")];
		for date in &view.dates {
			cells.push(Cell::from(format!("{:.1}", view.index.column_total(*date))));
		}
		if options.show_totals {
			cells.push(Cell::from(format!("{:.1}", view.index.grand_total())));
		}
		rows.push(
			Row::new(cells).style(Style::default().fg(TOTALS_COLOR).add_modifier(Modifier::BOLD)),
		);
	}

	let mut widths = vec![Constraint::Length(PROJECT_COLUMN_WIDTH)];
	for _ in &view.dates {
		widths.push(Constraint::Length(DATE_COLUMN_WIDTH));
	}
	if options.show_totals {
		widths.push(Constraint::Length(8));
	}

	let table = Table::new(rows, widths)
		.header(header)
		.column_spacing(1)
		.block(Block::default().borders(Borders::ALL));
	frame.render_widget(table, area);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App, options: &GridOptions) {
	let keys = if app.editing {
		"digits/. type | Backspace erase | Enter save | Tab save+next | Esc cancel"
	} else if options.editable {
		"arrows/hjkl move | Enter/i edit | p/n period | P/N week | t today | q quit"
	} else {
		"arrows/hjkl move | p/n period | P/N week | t today | q quit"
	};

	let footer = Paragraph::new(vec![Line::from(keys), Line::from(app.status.clone())])
		.block(Block::default().borders(Borders::ALL).title("Shortcuts"));
	frame.render_widget(footer, area);
}

struct App {
	anchor: NaiveDate,
	row: usize,
	col: usize,
	editing: bool,
	editor: CellEditor,
	status: String,
}

impl App {
	fn new(options: &GridOptions) -> Self {
		Self {
			anchor: options
				.start_date
				.unwrap_or_else(|| Local::now().date_naive()),
			row: 0,
			col: 0,
			editing: false,
			editor: CellEditor::new(),
			status: "Ready".to_string(),
		}
	}

	fn clamp_selection(&mut self, view: &GridView) {
		if view.projects.is_empty() {
			self.row = 0;
		} else {
			self.row = self.row.min(view.projects.len() - 1);
		}

		if view.dates.is_empty() {
			self.col = 0;
		} else {
			self.col = self.col.min(view.dates.len() - 1);
		}
	}

	fn selected_key(&self, view: &GridView) -> Option<CellKey> {
		let project = view.projects.get(self.row)?;
		let date = view.dates.get(self.col)?;
		Some(CellKey::new(project.id.clone(), *date))
	}
}

struct GridView {
	range_label: String,
	dates: Vec<NaiveDate>,
	projects: Vec<Project>,
	index: EntryIndex,
	loading: bool,
}

#[cfg(test)]
mod tests {
	use chrono::NaiveDate;
	use serde_json::{Value, json};

	use crate::config::{FieldBindings, GridOptions};
	use crate::host::{EntrySource, HostError, ProjectSource, SourceStatus};

	use super::build_view;

	struct FakeSources {
		status: SourceStatus,
		projects: Vec<Value>,
		entries: Vec<Value>,
	}

	impl ProjectSource for FakeSources {
		fn project_status(&self) -> SourceStatus {
			self.status
		}

		fn project_items(&self) -> Vec<Value> {
			self.projects.clone()
		}
	}

	impl EntrySource for FakeSources {
		fn entry_status(&self) -> SourceStatus {
			self.status
		}

		fn entry_items(&self) -> Vec<Value> {
			self.entries.clone()
		}

		fn reload(&mut self) -> Result<(), HostError> {
			Ok(())
		}
	}

	fn day(year: i32, month: u32, day: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(year, month, day).expect("test date should be valid")
	}

	#[test]
	fn loading_source_yields_a_placeholder_view() {
		let host = FakeSources {
			status: SourceStatus::Loading,
			projects: vec![json!({"id": "p1", "name": "Apollo"})],
			entries: Vec::new(),
		};

		let view = build_view(&host, &GridOptions::default(), &FieldBindings::default(), day(2024, 1, 1));
		assert!(view.loading);
		assert!(view.projects.is_empty());
		assert!(view.index.is_empty());
	}

	#[test]
	fn available_source_populates_projects_and_index() {
		let host = FakeSources {
			status: SourceStatus::Available,
			projects: vec![json!({"id": "p1", "name": "Apollo"})],
			entries: vec![json!({"project_id": "p1", "date": "2024-01-01", "hours": 8.0})],
		};

		let view = build_view(&host, &GridOptions::default(), &FieldBindings::default(), day(2024, 1, 1));
		assert!(!view.loading);
		assert_eq!(view.projects.len(), 1);
		assert_eq!(view.dates.len(), 7);
		assert_eq!(view.range_label, "Jan 1, 2024 - Jan 7, 2024");
		assert_eq!(view.index.hours_at("p1", day(2024, 1, 1)), Some(8.0));
	}
}
