//! table-shell: apply a script of table commands to an HTML fragment
//!
//! The script is a JSON array of steps. A step either moves the caret into
//! a cell, `{"select": {"table": 0, "row": 1, "column": 0}}`, or is a table
//! command such as `{"command": "insert_row_below"}`. The resulting markup,
//! ready for publishing, is written to stdout.

use clap::Parser;
use html_dom::NodeId;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::ExitCode;
use table_editing::table_editor::select_cell;
use table_editing::{
    logging, EditorHost, EditorSession, Result, SettingsManager, TableCommand, TableEditError, TableEditingManager,
};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Step {
    Select { select: CellAddress },
    Command(TableCommand),
}

/// Zero-based address of a cell: the nth table in the document, then row and column
#[derive(Debug, Deserialize)]
struct CellAddress {
    table: usize,
    row: usize,
    column: usize,
}

/// Apply a script of table commands to an HTML fragment
#[derive(Parser, Debug)]
#[command(name = "table-shell", version, about)]
struct Args {
    /// HTML fragment to edit
    fragment: PathBuf,

    /// JSON array of steps to apply
    script: PathBuf,

    /// Directory holding the table editing settings; remembered table
    /// defaults are written back to it
    #[arg(value_name = "DIR")]
    settings_dir: Option<PathBuf>,
}

fn find_cell(session: &EditorSession, address: &CellAddress) -> Result<NodeId> {
    let doc = session.document();
    let table = doc
        .descendants(doc.root())
        .into_iter()
        .filter(|id| doc.get(*id).is_some_and(|node| node.is_table()))
        .nth(address.table);
    table
        .and_then(|table| doc.table_rows(table).get(address.row).copied())
        .and_then(|row| doc.row_cells(row).get(address.column).copied())
        .ok_or_else(|| {
            TableEditError::InvalidOperation(format!(
                "no cell at table {} row {} column {}",
                address.table, address.row, address.column
            ))
        })
}

fn run(args: Args) -> Result<String> {
    let mut settings = args.settings_dir.as_ref().map(SettingsManager::new);
    if let Some(settings) = settings.as_mut() {
        settings.load()?;
    }

    let html = std::fs::read_to_string(&args.fragment)?;
    let steps: Vec<Step> = serde_json::from_str(&std::fs::read_to_string(&args.script)?)?;

    let mut session = EditorSession::from_html(&html)?;
    if let Some(settings) = settings.as_ref() {
        session = session.with_settings(settings.get().clone());
    }
    let mut manager = TableEditingManager::attach(&mut session);

    for (index, step) in steps.iter().enumerate() {
        match step {
            Step::Select { select } => {
                let cell = find_cell(&session, select)?;
                select_cell(&mut session, cell)?;
            }
            Step::Command(command) => {
                tracing::info!(step = index, ?command, "running table command");
                manager.execute(&mut session, command)?;
                if let (TableCommand::InsertTable(parameters), Some(settings)) = (command, settings.as_mut()) {
                    settings.remember_table_defaults(parameters)?;
                }
            }
        }
        manager.pump(&mut session);
    }

    tracing::info!(
        steps = steps.len(),
        undo_depth = session.history().undo_depth(),
        "script finished"
    );
    Ok(manager.publish_html(&session))
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init("table_editing=info");

    match run(args) {
        Ok(html) => {
            println!("{html}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "table-shell failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
