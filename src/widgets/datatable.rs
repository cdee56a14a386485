//! Table view: header plus sorted, scrollable rows.
//!
//! Widths come from the layout pass stored on the field set; this widget
//! only formats and paints. Rows arrive pre-sorted from the store.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    widgets::StatefulWidget,
};

use crate::schema::{Field, FieldType};
use crate::store::{Record, SortDirection};

/// Gap painted between columns.
const COLUMN_GAP: u16 = 2;

pub struct RecordTable<'a> {
    fields: &'a [Field],
    sort_column: usize,
    direction: SortDirection,
}

#[derive(Debug, Default)]
pub struct RecordTableState {
    pub records: Vec<Record>,
    /// Index of the selected row within `records`.
    pub selected: usize,
    /// First visible row.
    pub offset: usize,
    /// Rows actually painted in the last pass.
    pub rendered: usize,
    /// Identifier of the highlighted row after the last pass; `None` when
    /// the selection is out of range or there are no rows.
    pub highlighted_id: Option<i64>,
}

impl RecordTableState {
    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_next(&mut self) {
        if !self.records.is_empty() {
            self.selected = (self.selected + 1).min(self.records.len() - 1);
        }
    }

    pub fn page_up(&mut self) {
        self.selected = self.selected.saturating_sub(self.rendered.max(1));
    }

    pub fn page_down(&mut self) {
        if !self.records.is_empty() {
            self.selected = (self.selected + self.rendered.max(1)).min(self.records.len() - 1);
        }
    }

    /// Replace the backing rows, keeping the selection in range.
    pub fn set_records(&mut self, records: Vec<Record>) {
        self.records = records;
        if self.selected >= self.records.len() {
            self.selected = self.records.len().saturating_sub(1);
        }
    }

    fn scroll_to_selected(&mut self, visible: usize) {
        if visible == 0 {
            return;
        }
        if self.selected < self.offset {
            self.offset = self.selected;
        } else if self.selected >= self.offset + visible {
            self.offset = self.selected + 1 - visible;
        }
    }
}

impl<'a> RecordTable<'a> {
    pub fn new(fields: &'a [Field], sort_column: usize, direction: SortDirection) -> Self {
        Self {
            fields,
            sort_column,
            direction,
        }
    }

    /// Format one cell to exactly `width` characters: text left-justified
    /// and clipped, numbers right-justified.
    fn cell(field: &Field, value: &str, width: usize) -> String {
        match field.ftype {
            FieldType::Text => {
                let clipped: String = value.chars().take(width).collect();
                format!("{clipped:<width$}")
            }
            FieldType::Integer | FieldType::Real => {
                if value.chars().count() > width {
                    value.chars().take(width).collect()
                } else {
                    format!("{value:>width$}")
                }
            }
        }
    }
}

impl StatefulWidget for RecordTable<'_> {
    type State = RecordTableState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut RecordTableState) {
        state.rendered = 0;
        state.highlighted_id = None;
        if area.height == 0 {
            return;
        }

        // Header line: visible descriptions, sort column emphasized.
        let mut x = area.x;
        for (i, field) in self.fields.iter().enumerate() {
            if field.width == 0 {
                continue;
            }
            let width = field.width as usize;
            let label = if i == self.sort_column {
                // The direction marker always gets the last cell, even when
                // the label fills the column.
                let mut label: String = field
                    .description
                    .chars()
                    .take(width.saturating_sub(1))
                    .collect();
                label.push(match self.direction {
                    SortDirection::Ascending => '^',
                    SortDirection::Descending => 'v',
                });
                label
            } else {
                field.description.chars().take(width).collect()
            };
            let label = format!("{label:<width$}");
            let style = if i == self.sort_column {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            };
            buf.set_stringn(x, area.y, &label, width, style);
            x += field.width + COLUMN_GAP;
        }

        let visible = (area.height - 1) as usize;
        state.scroll_to_selected(visible);

        for (line, row_index) in (state.offset..state.records.len())
            .take(visible)
            .enumerate()
        {
            let record = &state.records[row_index];
            let y = area.y + 1 + line as u16;
            let style = if row_index == state.selected {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            if row_index == state.selected {
                // Full-line emphasis for the selection.
                buf.set_stringn(
                    area.x,
                    y,
                    " ".repeat(area.width as usize),
                    area.width as usize,
                    style,
                );
            }
            let mut x = area.x;
            for (field, value) in self.fields.iter().zip(&record.values) {
                if field.width == 0 {
                    continue;
                }
                let cell = Self::cell(field, value, field.width as usize);
                buf.set_stringn(x, y, &cell, field.width as usize, style);
                x += field.width + COLUMN_GAP;
            }
            state.rendered += 1;
        }

        if state.selected < state.records.len() {
            state.highlighted_id = Some(state.records[state.selected].id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::allocate_widths;
    use crate::schema::{Field, FieldType};

    fn fields() -> Vec<Field> {
        let mut fields = vec![
            Field::new("name".into(), "Name".into(), FieldType::Text, false, 12),
            Field::new("rating".into(), "Rating".into(), FieldType::Integer, true, 2),
        ];
        allocate_widths(&mut fields, 40);
        fields
    }

    fn records() -> Vec<Record> {
        (0..5)
            .map(|i| Record {
                id: 100 + i,
                values: vec![format!("row {i}"), i.to_string()],
            })
            .collect()
    }

    #[test]
    fn test_cell_formatting() {
        let f = Field::new("t".into(), "T".into(), FieldType::Text, true, 8);
        assert_eq!(RecordTable::cell(&f, "abc", 5), "abc  ");
        assert_eq!(RecordTable::cell(&f, "abcdefgh", 5), "abcde");

        let f = Field::new("n".into(), "N".into(), FieldType::Integer, true, 4);
        assert_eq!(RecordTable::cell(&f, "42", 4), "  42");

        let f = Field::new("r".into(), "R".into(), FieldType::Real, true, 7);
        assert_eq!(RecordTable::cell(&f, "9.99", 6), "  9.99");
    }

    #[test]
    fn test_render_reports_count_and_highlight() {
        let fields = fields();
        let mut state = RecordTableState::default();
        state.set_records(records());
        state.selected = 2;

        let area = Rect::new(0, 0, 40, 4); // header + 3 rows
        let mut buf = Buffer::empty(area);
        let table = RecordTable::new(&fields, 0, SortDirection::Ascending);
        StatefulWidget::render(table, area, &mut buf, &mut state);

        assert_eq!(state.rendered, 3);
        assert_eq!(state.highlighted_id, Some(102));
    }

    #[test]
    fn test_render_empty_rows_yields_none_sentinel() {
        let fields = fields();
        let mut state = RecordTableState::default();

        let area = Rect::new(0, 0, 40, 4);
        let mut buf = Buffer::empty(area);
        let table = RecordTable::new(&fields, 0, SortDirection::Ascending);
        StatefulWidget::render(table, area, &mut buf, &mut state);

        assert_eq!(state.rendered, 0);
        assert_eq!(state.highlighted_id, None);
    }

    #[test]
    fn test_scroll_follows_selection() {
        let mut state = RecordTableState::default();
        state.set_records(records());

        state.selected = 4;
        state.scroll_to_selected(2);
        assert_eq!(state.offset, 3);

        state.selected = 0;
        state.scroll_to_selected(2);
        assert_eq!(state.offset, 0);
    }

    #[test]
    fn test_selection_movement_clamps() {
        let mut state = RecordTableState::default();
        state.set_records(records());
        state.select_previous();
        assert_eq!(state.selected, 0);
        for _ in 0..10 {
            state.select_next();
        }
        assert_eq!(state.selected, 4);
    }

    #[test]
    fn test_set_records_clamps_selection() {
        let mut state = RecordTableState::default();
        state.set_records(records());
        state.selected = 4;
        state.set_records(records().into_iter().take(2).collect());
        assert_eq!(state.selected, 1);
        state.set_records(Vec::new());
        assert_eq!(state.selected, 0);
    }
}
