use crate::column::{Row, RowId};

/// Row set and selection state of one column, as shown to the user.
///
/// Rows are replaced wholesale by [`Table::publish`]; selection does not
/// survive a refresh.
#[derive(Debug, Clone, Default)]
pub struct Table {
    rows: Vec<Row>,
    cursor: usize,
    collapsed: bool,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all rows. An empty set collapses the column.
    pub fn publish(&mut self, rows: Vec<Row>) {
        self.collapsed = rows.is_empty();
        self.rows = rows
            .into_iter()
            .map(|mut row| {
                row.selected = false;
                row
            })
            .collect();
        self.clamp_cursor();
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether the last refresh produced no rows.
    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    // -----------------------------------------------------------------------
    // Cursor
    // -----------------------------------------------------------------------

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn move_cursor(&mut self, idx: usize) {
        self.cursor = idx;
        self.clamp_cursor();
    }

    pub fn cursor_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_down(&mut self) {
        self.move_cursor(self.cursor + 1);
    }

    pub fn current_row(&self) -> Option<&Row> {
        self.rows.get(self.cursor)
    }

    fn clamp_cursor(&mut self) {
        self.cursor = self.cursor.min(self.rows.len().saturating_sub(1));
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    /// Toggle the row under the cursor; returns its new state.
    pub fn toggle_current(&mut self) -> Option<bool> {
        self.toggle(self.cursor)
    }

    pub fn toggle(&mut self, idx: usize) -> Option<bool> {
        let row = self.rows.get_mut(idx)?;
        row.selected = !row.selected;
        Some(row.selected)
    }

    pub fn select_all(&mut self) {
        self.rows.iter_mut().for_each(|r| r.selected = true);
    }

    pub fn unselect_all(&mut self) {
        self.rows.iter_mut().for_each(|r| r.selected = false);
    }

    /// Unselect everything if all rows are selected, select everything otherwise.
    pub fn toggle_select_all(&mut self) {
        if self.rows.iter().all(|r| r.selected) {
            self.unselect_all();
        } else {
            self.select_all();
        }
    }

    pub fn invert_selection(&mut self) {
        self.rows.iter_mut().for_each(|r| r.selected = !r.selected);
    }

    /// Toggle the row above the cursor and move onto it.
    pub fn extend_up(&mut self) {
        if self.cursor == 0 || self.rows.is_empty() {
            return;
        }
        self.cursor -= 1;
        self.toggle(self.cursor);
    }

    /// Toggle the row below the cursor and move onto it.
    pub fn extend_down(&mut self) {
        if self.cursor + 1 >= self.rows.len() {
            return;
        }
        self.cursor += 1;
        self.toggle(self.cursor);
    }

    pub fn selected_rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter(|r| r.selected)
    }

    /// Rows an action applies to: the selection, or the cursor row when
    /// nothing is selected.
    pub fn targets(&self) -> Vec<Row> {
        let selected: Vec<Row> = self.selected_rows().cloned().collect();
        if selected.is_empty() {
            self.current_row().cloned().into_iter().collect()
        } else {
            selected
        }
    }

    /// Drop a row, e.g. once its action succeeded. Unknown ids are ignored.
    pub fn remove(&mut self, id: RowId) -> Option<Row> {
        let idx = self.rows.iter().position(|r| r.id == id)?;
        let row = self.rows.remove(idx);
        if idx < self.cursor {
            self.cursor -= 1;
        }
        self.clamp_cursor();
        Some(row)
    }
}
