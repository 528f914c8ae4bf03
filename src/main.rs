mod config;
mod daterange;
mod domain;
mod editor;
mod host;
mod sheets;
mod storage;
mod ui;

use std::error::Error;
use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};

use crate::config::GridOptions;
use crate::daterange::{range_label, visible_range};
use crate::domain::{EntryIndex, Project};
use crate::editor::{CellEditor, CellKey, CommitOutcome};
use crate::host::{EntrySource, ProjectSource};
use crate::sheets::{recent_sheets, remember_sheet, resolve_sheet_path};
use crate::storage::SheetFile;
use crate::ui::run_grid;

#[derive(Debug, Parser)]
#[command(name = "hourgrid", about = "Terminal-first timesheet grid")]
struct Cli {
	#[arg(long)]
	sheet: Option<PathBuf>,
	#[arg(long)]
	start: Option<NaiveDate>,
	#[arg(long)]
	days: Option<u32>,
	#[arg(long)]
	weekends: Option<bool>,
	#[arg(long)]
	readonly: bool,
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
	Init,
	Grid,
	AddProject {
		#[arg(long)]
		name: String,
	},
	Log {
		#[arg(long)]
		project: String,
		#[arg(long)]
		date: NaiveDate,
		#[arg(long)]
		hours: String,
	},
	Summary,
	Entries {
		#[arg(long, default_value_t = 20)]
		limit: usize,
	},
	Sheets {
		#[arg(long, default_value_t = 20)]
		limit: usize,
	},
}

fn main() {
	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run() -> Result<(), Box<dyn Error>> {
	let cli = Cli::parse();

	if let Some(Command::Sheets { limit }) = &cli.command {
		print_recent_sheets(*limit)?;
		return Ok(());
	}

	let sheet_path = resolve_sheet_path(cli.sheet.clone())?;
	let mut sheet = SheetFile::open(&sheet_path)?;
	if let Err(err) = remember_sheet(&sheet_path) {
		eprintln!("warning: failed to store recent sheet: {err}");
	}

	let options = apply_overrides(sheet.header.grid.clone(), &cli);
	let bindings = sheet.header.bindings.clone();

	match cli.command.unwrap_or(Command::Grid) {
		Command::Init => {
			sheet.save()?;
			println!("initialized sheet at {}", sheet_path.display());
		}
		Command::Grid => {
			run_grid(&mut sheet, &options, &bindings)?;
		}
		Command::AddProject { name } => {
			let project_id = sheet.add_project(name);
			sheet.save()?;
			println!("created project {project_id}");
		}
		Command::Log {
			project,
			date,
			hours,
		} => {
			log_hours(&mut sheet, &options, &project, date, hours)?;
		}
		Command::Summary => {
			print_summary(&sheet, &options);
		}
		Command::Entries { limit } => {
			print_entries(&sheet, limit);
		}
		Command::Sheets { .. } => {}
	}

	Ok(())
}

fn apply_overrides(mut options: GridOptions, cli: &Cli) -> GridOptions {
	if cli.start.is_some() {
		options.start_date = cli.start;
	}
	if let Some(days) = cli.days {
		options.days = days;
	}
	if let Some(weekends) = cli.weekends {
		options.show_weekends = weekends;
	}
	if cli.readonly {
		options.editable = false;
	}
	options
}

fn log_hours(
	sheet: &mut SheetFile,
	options: &GridOptions,
	project: &str,
	date: NaiveDate,
	hours: String,
) -> Result<(), Box<dyn Error>> {
	let bindings = sheet.header.bindings.clone();
	let projects = Project::from_items(&sheet.project_items(), &bindings);
	let Some(target) = projects
		.iter()
		.find(|candidate| candidate.id == project || candidate.name == project)
	else {
		return Err(format!("project not found: {project}").into());
	};

	let key = CellKey::new(target.id.clone(), date);
	let mut editor = CellEditor::new();
	editor.update(key.clone(), hours);

	match editor.commit(&key, sheet, options, &bindings, &projects) {
		CommitOutcome::Saved => println!("recorded hours for {}", target.name),
		CommitOutcome::Skipped => println!("nothing recorded (zero or unparsable hours are skipped)"),
		CommitOutcome::Failed(err) => eprintln!("error: {err}"),
	}

	Ok(())
}

fn print_summary(sheet: &SheetFile, options: &GridOptions) {
	let bindings = &sheet.header.bindings;
	let anchor = options
		.start_date
		.unwrap_or_else(|| Local::now().date_naive());
	let range = visible_range(anchor, options.days, options.show_weekends);
	let projects = Project::from_items(&sheet.project_items(), bindings);
	let index = EntryIndex::from_items(&sheet.entry_items(), bindings);

	println!("summary for {}", range_label(&range));
	if projects.is_empty() {
		println!("no projects yet");
		return;
	}

	println!("\nby project:");
	for project in &projects {
		println!("{:>8.1} | {}", index.row_total(&project.id), project.name);
	}

	println!("\nby day:");
	for date in &range {
		println!(
			"{:>8.1} | {}",
			index.column_total(*date),
			date.format("%Y-%m-%d")
		);
	}

	println!("\ntotal: {:.1}", index.grand_total());
}

fn print_entries(sheet: &SheetFile, limit: usize) {
	let index = EntryIndex::from_items(&sheet.entry_items(), &sheet.header.bindings);
	if index.is_empty() {
		println!("no entries yet");
		return;
	}

	println!("{} entries", index.len());
	for entry in index.entries().iter().rev().take(limit) {
		let date = entry
			.date
			.map(|date| date.format("%Y-%m-%d").to_string())
			.unwrap_or_else(|| "(no date)".to_string());
		let project = entry.project_id.as_deref().unwrap_or("(no project)");
		let hours = entry
			.hours
			.map(|hours| hours.to_string())
			.unwrap_or_else(|| "-".to_string());
		println!("{date} | {project} | {hours}");
	}
}

fn print_recent_sheets(limit: usize) -> Result<(), Box<dyn Error>> {
	let rows = recent_sheets(limit)?;
	if rows.is_empty() {
		println!("no recent sheets");
		return Ok(());
	}

	for (index, path) in rows.iter().enumerate() {
		println!("{:>2}. {}", index + 1, path.display());
	}

	Ok(())
}
