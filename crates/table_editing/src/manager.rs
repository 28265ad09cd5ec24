//! Table command routing and event dispatch for one editor

use crate::behavior::{fixup_empty_cells_for_publishing, KeyEvent, TableEditingElementBehavior};
use crate::column_sizing::MouseEvent;
use crate::context::TableEditingContext;
use crate::host::EditorHost;
use crate::table_editor::TableEditor;
use crate::table_helper::{containing_table, table_element_is_editable};
use crate::table_selection::TableSelection;
use crate::{CellProperties, ColumnProperties, Result, RowProperties, TableCreationParameters, TableProperties};
use html_dom::NodeId;
use serde::{Deserialize, Serialize};

/// Upper bound on selection-change/continuation rounds in one [`TableEditingManager::pump`]
const MAX_PUMP_ROUNDS: usize = 16;

/// A table command as issued by a menu, ribbon or script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum TableCommand {
    InsertTable(TableCreationParameters),
    SetTableProperties(TableProperties),
    DeleteTable,
    SetRowProperties(RowProperties),
    InsertRowAbove,
    InsertRowBelow,
    MoveRowUp,
    MoveRowDown,
    DeleteRows,
    SetColumnProperties(ColumnProperties),
    InsertColumnLeft,
    InsertColumnRight,
    MoveColumnLeft,
    MoveColumnRight,
    DeleteColumns,
    SetCellProperties(CellProperties),
    ClearCells,
    SelectNextCell,
    SelectPreviousCell,
}

impl TableCommand {
    /// The same command with left and right swapped, for right-to-left
    /// templates where the table is drawn mirrored
    pub fn mirrored(&self) -> Self {
        match self {
            TableCommand::InsertColumnLeft => TableCommand::InsertColumnRight,
            TableCommand::InsertColumnRight => TableCommand::InsertColumnLeft,
            TableCommand::MoveColumnLeft => TableCommand::MoveColumnRight,
            TableCommand::MoveColumnRight => TableCommand::MoveColumnLeft,
            other => other.clone(),
        }
    }
}

/// Enablement of every table command for the current selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommandStates {
    pub insert_table: bool,
    pub table_properties: bool,
    pub delete_table: bool,
    pub row_properties: bool,
    pub insert_row_above: bool,
    pub insert_row_below: bool,
    pub move_row_up: bool,
    pub move_row_down: bool,
    pub delete_rows: bool,
    pub column_properties: bool,
    pub insert_column_left: bool,
    pub insert_column_right: bool,
    pub move_column_left: bool,
    pub move_column_right: bool,
    pub delete_columns: bool,
    pub cell_properties: bool,
    pub clear_cells: bool,
    pub select_cells: bool,
}

impl CommandStates {
    /// Compute enablement from the live selection. Everything is disabled
    /// outside edit mode.
    pub fn compute(host: &dyn EditorHost) -> Self {
        if !host.edit_mode() {
            return Self::default();
        }
        let doc = host.document();
        let selection = TableSelection::new(doc, host.selected_range());
        let table_selected = selection.table().is_some_and(|table| doc.is_content_editable(table));
        let multiple_rows = table_selected && !selection.single_row_selected();
        let multiple_columns = table_selected && !selection.single_column_selected();
        let multiple_cells = table_selected && selection.has_contiguous_selection();

        Self {
            insert_table: true,
            table_properties: table_selected,
            delete_table: table_selected,
            row_properties: table_selected && !multiple_rows,
            insert_row_above: table_selected,
            insert_row_below: table_selected,
            move_row_up: table_selected && !multiple_rows,
            move_row_down: table_selected && !multiple_rows,
            delete_rows: table_selected,
            column_properties: table_selected && !multiple_columns,
            insert_column_left: table_selected,
            insert_column_right: table_selected,
            move_column_left: table_selected && !multiple_columns,
            move_column_right: table_selected && !multiple_columns,
            delete_columns: table_selected,
            cell_properties: table_selected && !multiple_cells,
            clear_cells: table_selected,
            select_cells: table_selected,
        }
    }

    pub fn allows(&self, command: &TableCommand) -> bool {
        match command {
            TableCommand::InsertTable(_) => self.insert_table,
            TableCommand::SetTableProperties(_) => self.table_properties,
            TableCommand::DeleteTable => self.delete_table,
            TableCommand::SetRowProperties(_) => self.row_properties,
            TableCommand::InsertRowAbove => self.insert_row_above,
            TableCommand::InsertRowBelow => self.insert_row_below,
            TableCommand::MoveRowUp => self.move_row_up,
            TableCommand::MoveRowDown => self.move_row_down,
            TableCommand::DeleteRows => self.delete_rows,
            TableCommand::SetColumnProperties(_) => self.column_properties,
            TableCommand::InsertColumnLeft => self.insert_column_left,
            TableCommand::InsertColumnRight => self.insert_column_right,
            TableCommand::MoveColumnLeft => self.move_column_left,
            TableCommand::MoveColumnRight => self.move_column_right,
            TableCommand::DeleteColumns => self.delete_columns,
            TableCommand::SetCellProperties(_) => self.cell_properties,
            TableCommand::ClearCells => self.clear_cells,
            TableCommand::SelectNextCell | TableCommand::SelectPreviousCell => self.select_cells,
        }
    }
}

/// Owns the table behaviors and cell registry of one document and routes
/// commands and input events to them
#[derive(Debug, Default)]
pub struct TableEditingManager {
    context: TableEditingContext,
    behaviors: Vec<TableEditingElementBehavior>,
    command_states: CommandStates,
}

impl TableEditingManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a manager and attach behaviors to the tables already in the document
    pub fn attach(host: &mut dyn EditorHost) -> Self {
        let mut manager = Self::new();
        manager.refresh(host);
        manager.manage_commands(host);
        manager
    }

    pub fn context(&self) -> &TableEditingContext {
        &self.context
    }

    pub fn command_states(&self) -> CommandStates {
        self.command_states
    }

    pub fn behaviors(&self) -> &[TableEditingElementBehavior] {
        &self.behaviors
    }

    pub fn behavior(&self, table: NodeId) -> Option<&TableEditingElementBehavior> {
        self.behaviors.iter().find(|behavior| behavior.table() == table)
    }

    /// Bring the behaviors in line with the document: attach to new tables,
    /// detach from removed ones and register cells added since the last call
    pub fn refresh(&mut self, host: &mut dyn EditorHost) {
        let doc = host.document();
        let tables: Vec<NodeId> = doc
            .descendants(doc.root())
            .into_iter()
            .filter(|id| doc.get(*id).is_some_and(|node| node.is_table()))
            .collect();

        let (kept, removed): (Vec<_>, Vec<_>) = std::mem::take(&mut self.behaviors)
            .into_iter()
            .partition(|behavior| tables.contains(&behavior.table()));
        let detached = !removed.is_empty();
        for behavior in removed {
            behavior.detach(&mut self.context);
        }
        self.behaviors = kept;

        for behavior in self.behaviors.iter().filter(|behavior| behavior.is_editable()) {
            self.context.register_table(host.document(), behavior.table());
        }
        for table in tables {
            if self.behavior(table).is_none() {
                let behavior = TableEditingElementBehavior::attach(host, &mut self.context, table);
                self.behaviors.push(behavior);
            }
        }

        if detached {
            self.manage_commands(host);
        }
    }

    /// Recompute command enablement from the live selection
    pub fn manage_commands(&mut self, host: &dyn EditorHost) {
        self.command_states = CommandStates::compute(host);
    }

    /// Let every table react to a changed selection, then update commands
    pub fn handle_selection_changed(&mut self, host: &mut dyn EditorHost) {
        for behavior in self.behaviors.iter_mut() {
            if let Err(e) = behavior.on_selection_changed(host, &mut self.context) {
                tracing::error!(error = %e, table = %behavior.table(), "selection change handling failed");
            }
        }
        self.manage_commands(host);
    }

    /// Deliver pending selection changes and run posted continuations until
    /// the host is quiet. Returns the number of rounds taken.
    pub fn pump(&mut self, host: &mut dyn EditorHost) -> usize {
        let mut rounds = 0;
        while rounds < MAX_PUMP_ROUNDS {
            let changed = host.take_selection_changed();
            let posted = host.take_posted();
            if !changed && posted.is_empty() {
                return rounds;
            }
            rounds += 1;

            self.refresh(host);
            if changed {
                self.handle_selection_changed(host);
            }
            for continuation in posted {
                continuation(&mut *host);
            }
        }
        tracing::warn!(rounds, "selection changes kept arriving, giving up");
        rounds
    }

    /// Route a key press to the table holding the selection. True when consumed.
    pub fn handle_key_down(&mut self, host: &mut dyn EditorHost, event: KeyEvent) -> bool {
        self.route(host, "key down", |behavior, host| behavior.handle_key_down(host, event))
    }

    pub fn handle_clear(&mut self, host: &mut dyn EditorHost) -> bool {
        self.route(host, "clear", |behavior, host| behavior.handle_clear(host))
    }

    pub fn handle_cut(&mut self, host: &mut dyn EditorHost) -> bool {
        self.route(host, "cut", |behavior, host| behavior.handle_cut(host))
    }

    /// Table whose commands should be brought up after a double-click
    pub fn handle_double_click(&self) -> Option<NodeId> {
        self.behaviors
            .iter()
            .find(|behavior| behavior.handle_double_click())
            .map(|behavior| behavior.table())
    }

    /// Offer a mouse event to the column size editors. A table already
    /// sizing sees the event first. True when the event was consumed.
    pub fn handle_mouse_event(&mut self, host: &mut dyn EditorHost, event: MouseEvent) -> bool {
        let context = &self.context;
        let (active, idle): (Vec<_>, Vec<_>) = self.behaviors.iter_mut().partition(|behavior| behavior.is_sizing());
        active
            .into_iter()
            .chain(idle)
            .any(|behavior| behavior.handle_mouse_event(host, context, event))
    }

    fn route(
        &mut self,
        host: &mut dyn EditorHost,
        event: &str,
        mut handler: impl FnMut(&mut TableEditingElementBehavior, &mut dyn EditorHost) -> Result<bool>,
    ) -> bool {
        for behavior in self.behaviors.iter_mut() {
            match handler(behavior, &mut *host) {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(error = %e, table = %behavior.table(), event, "table event handling failed");
                    return false;
                }
            }
        }
        false
    }

    /// Whether a context menu over `element` should offer the table commands
    pub fn show_table_context_menu_for_element(&self, host: &dyn EditorHost, element: NodeId) -> bool {
        let doc = host.document();
        containing_table(doc, element).is_some_and(|table| table_element_is_editable(doc, table, host.settings()))
    }

    /// Command states for a table context menu, recomputed for the live selection
    pub fn table_context_menu(&mut self, host: &dyn EditorHost) -> CommandStates {
        self.manage_commands(host);
        self.command_states
    }

    /// Run a command against the live selection. Disabled commands are
    /// skipped; left/right column commands are mirrored for right-to-left
    /// templates.
    pub fn execute(&mut self, host: &mut dyn EditorHost, command: &TableCommand) -> Result<()> {
        self.manage_commands(host);
        if !self.command_states.allows(command) {
            tracing::debug!(?command, "table command is disabled for the current selection");
            return Ok(());
        }
        let command = if host.is_rtl_template() {
            command.mirrored()
        } else {
            command.clone()
        };
        tracing::debug!(?command, "executing table command");

        match &command {
            TableCommand::InsertTable(parameters) => {
                TableEditor::insert_table(host, parameters)?;
            }
            TableCommand::SetTableProperties(properties) => TableEditor::new(host).set_table_properties(properties)?,
            TableCommand::DeleteTable => TableEditor::new(host).delete_table()?,
            TableCommand::SetRowProperties(properties) => TableEditor::new(host).set_row_properties(properties)?,
            TableCommand::InsertRowAbove => {
                TableEditor::new(host).insert_row_above()?;
            }
            TableCommand::InsertRowBelow => {
                TableEditor::new(host).insert_row_below()?;
            }
            TableCommand::MoveRowUp => TableEditor::new(host).move_row_up()?,
            TableCommand::MoveRowDown => TableEditor::new(host).move_row_down()?,
            TableCommand::DeleteRows => TableEditor::new(host).delete_rows()?,
            TableCommand::SetColumnProperties(properties) => {
                TableEditor::new(host).set_column_properties(properties)?
            }
            TableCommand::InsertColumnLeft => TableEditor::new(host).insert_column_left()?,
            TableCommand::InsertColumnRight => TableEditor::new(host).insert_column_right()?,
            TableCommand::MoveColumnLeft => TableEditor::new(host).move_column_left()?,
            TableCommand::MoveColumnRight => TableEditor::new(host).move_column_right()?,
            TableCommand::DeleteColumns => TableEditor::new(host).delete_columns()?,
            TableCommand::SetCellProperties(properties) => TableEditor::new(host).set_cell_properties(properties)?,
            TableCommand::ClearCells => TableEditor::new(host).clear_cells()?,
            TableCommand::SelectNextCell => TableEditor::new(host).select_next_cell()?,
            TableCommand::SelectPreviousCell => TableEditor::new(host).select_previous_cell()?,
        }

        self.refresh(host);
        self.manage_commands(host);
        Ok(())
    }

    /// Document markup ready to publish, with empty cells padded
    pub fn publish_html(&self, host: &dyn EditorHost) -> String {
        fixup_empty_cells_for_publishing(&host.document().to_html())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::Key;
    use crate::host::EditorSession;
    use crate::PixelPercent;
    use html_dom::{Position, Range};

    const GRID: &str = "<table unselectable=\"on\"><tr><td>a</td><td>b</td></tr><tr><td>c</td><td>d</td></tr></table>";

    fn setup(html: &str) -> (EditorSession, TableEditingManager) {
        let mut session = EditorSession::from_html(html).unwrap();
        let manager = TableEditingManager::attach(&mut session);
        (session, manager)
    }

    fn first_table(session: &EditorSession) -> NodeId {
        session.document().children(session.document().root())[0]
    }

    fn cells(session: &EditorSession) -> Vec<NodeId> {
        session.document().table_cells(first_table(session))
    }

    fn caret_in(session: &mut EditorSession, cell: NodeId) {
        session.select(Range::collapsed(Position::new(cell, 0)));
    }

    #[test]
    fn test_commands_follow_selection() {
        let (mut session, mut manager) = setup(&format!("<p>x</p>{GRID}"));
        let states = manager.command_states();
        assert!(states.insert_table);
        assert!(!states.delete_table);

        let table = session.document().children(session.document().root())[1];
        let all = session.document().table_cells(table);
        caret_in(&mut session, all[0]);
        manager.pump(&mut session);
        let states = manager.command_states();
        assert!(states.table_properties && states.row_properties && states.column_properties);
        assert!(states.move_row_up && states.cell_properties);

        session.select(Range::new(Position::new(all[0], 0), Position::new(all[2], 1)));
        manager.pump(&mut session);
        let states = manager.command_states();
        assert!(!states.row_properties && !states.move_row_down);
        assert!(!states.column_properties && !states.cell_properties);
        assert!(states.delete_rows && states.clear_cells);
    }

    #[test]
    fn test_edit_mode_off_disables_everything() {
        let (mut session, mut manager) = setup(GRID);
        let all = cells(&session);
        caret_in(&mut session, all[0]);
        session.set_edit_mode(false);
        manager.pump(&mut session);
        assert_eq!(manager.command_states(), CommandStates::default());

        manager.execute(&mut session, &TableCommand::DeleteTable).unwrap();
        assert_eq!(session.document().table_rows(first_table(&session)).len(), 2);
    }

    #[test]
    fn test_execute_registers_new_cells() {
        let (mut session, mut manager) = setup(GRID);
        assert_eq!(manager.context().len(), 4);
        let all = cells(&session);
        caret_in(&mut session, all[3]);
        manager.execute(&mut session, &TableCommand::InsertRowBelow).unwrap();
        assert_eq!(session.document().table_rows(first_table(&session)).len(), 3);
        assert_eq!(manager.context().len(), 6);
    }

    #[test]
    fn test_rtl_mirrors_column_commands() {
        let (mut session, mut manager) = setup(GRID);
        session.set_rtl_template(true);
        let all = cells(&session);
        caret_in(&mut session, all[0]);
        manager.execute(&mut session, &TableCommand::InsertColumnLeft).unwrap();
        let doc = session.document();
        let first_row = doc.table_rows(first_table(&session))[0];
        let row = doc.row_cells(first_row);
        assert_eq!(row.len(), 3);
        assert_eq!(row[0], all[0]);
        assert_eq!(doc.text_content(row[1]), "");
    }

    #[test]
    fn test_delete_table_detaches_behavior() {
        let (mut session, mut manager) = setup(GRID);
        let all = cells(&session);
        caret_in(&mut session, all[0]);
        manager.pump(&mut session);
        manager.execute(&mut session, &TableCommand::DeleteTable).unwrap();
        assert!(manager.behaviors().is_empty());
        assert!(manager.context().is_empty());
        assert!(!manager.command_states().delete_table);
    }

    #[test]
    fn test_pump_expands_selection_over_every_cell() {
        let (mut session, mut manager) = setup(GRID);
        let all = cells(&session);
        let table = first_table(&session);
        session.select(Range::new(Position::new(all[0], 0), Position::new(all[3], 1)));
        assert_eq!(manager.pump(&mut session), 3);
        assert_eq!(session.selection(), session.document().outer_range(table).unwrap());
        assert!(manager.behavior(table).unwrap().draws_selection_border());
        assert_eq!(manager.handle_double_click(), Some(table));
    }

    #[test]
    fn test_key_routing() {
        let (mut session, mut manager) = setup(GRID);
        let all = cells(&session);
        caret_in(&mut session, all[3]);
        assert!(manager.handle_key_down(&mut session, KeyEvent::new(Key::Tab)));
        assert_eq!(session.document().table_rows(first_table(&session)).len(), 3);
        assert!(!manager.handle_key_down(&mut session, KeyEvent::new(Key::Other)));
    }

    #[test]
    fn test_clear_routing() {
        let (mut session, mut manager) = setup(GRID);
        let all = cells(&session);
        session.select(Range::new(Position::new(all[2], 0), Position::new(all[3], 1)));
        assert!(manager.handle_clear(&mut session));
        assert_eq!(session.document().text_content(all[3]), "");
        assert_eq!(session.document().text_content(all[0]), "a");
    }

    #[test]
    fn test_mouse_drag_resizes_through_manager() {
        let (mut session, mut manager) =
            setup("<table unselectable=\"on\"><tr><td width=\"100\">a</td><td width=\"100\">b</td></tr></table>");
        let all = cells(&session);
        let layout = session.layout();
        let first = layout.rect(all[0]).unwrap();
        let edge = first.x + first.width - 1;
        let y = first.y + 5;

        assert!(manager.handle_mouse_event(&mut session, MouseEvent::moved(edge, y)));
        assert!(manager.handle_mouse_event(&mut session, MouseEvent::pressed(edge, y)));
        assert!(manager.handle_mouse_event(&mut session, MouseEvent::moved(edge + 20, y)));
        assert!(manager.handle_mouse_event(&mut session, MouseEvent::released(edge + 20, y)));
        let doc = session.document();
        assert_eq!(doc.attribute(all[0], "width"), Some("120"));
        assert_eq!(doc.attribute(all[1], "width"), Some("80"));
    }

    #[test]
    fn test_context_menu_only_for_editable_tables() {
        let (session, manager) = setup(&format!(
            "{GRID}<table><tr><td>x</td><td>y</td></tr><tr><td>z</td></tr></table><p>p</p>"
        ));
        let root = session.document().root();
        let children = session.document().children(root).to_vec();
        let editable_cell = session.document().table_cells(children[0])[0];
        let ragged_cell = session.document().table_cells(children[1])[0];
        assert!(manager.show_table_context_menu_for_element(&session, editable_cell));
        assert!(!manager.show_table_context_menu_for_element(&session, ragged_cell));
        assert!(!manager.show_table_context_menu_for_element(&session, children[2]));
    }

    #[test]
    fn test_command_script_format() {
        let script = r#"[
            {"command": "insert_row_below"},
            {"command": "set_row_properties", "height": 40, "cell_properties": {
                "background_color": {"value": null},
                "horizontal_alignment": "mixed",
                "vertical_alignment": {"value": "top"}
            }}
        ]"#;
        let commands: Vec<TableCommand> = serde_json::from_str(script).unwrap();
        assert_eq!(commands[0], TableCommand::InsertRowBelow);
        let TableCommand::SetRowProperties(properties) = &commands[1] else {
            panic!("expected row properties, got {:?}", commands[1]);
        };
        assert_eq!(properties.height, 40);
        assert!(properties.cell_properties.horizontal_alignment.is_mixed());

        let command = TableCommand::SetColumnProperties(ColumnProperties {
            width: PixelPercent::pixels(50).into(),
            cell_properties: CellProperties::hands_off(),
        });
        let json = serde_json::to_string(&command).unwrap();
        assert!(json.starts_with(r#"{"command":"set_column_properties""#));
        assert_eq!(serde_json::from_str::<TableCommand>(&json).unwrap(), command);
    }

    #[test]
    fn test_publish_pads_empty_cells() {
        let (session, manager) = setup("<table unselectable=\"on\"><tr><td></td><td>b</td></tr></table>");
        let html = manager.publish_html(&session);
        assert!(html.contains("<td>&nbsp;</td><td>b</td>"), "{html}");
    }
}
