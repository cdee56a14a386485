//! Single-record entry form.
//!
//! One field has focus at a time; keystrokes append to its text, and
//! navigation walks the field set with wraparound. Integer fields get an
//! inline, non-blocking warning when their text will not survive coercion.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    widgets::Widget,
};

use crate::schema::Field;

pub struct EntryForm {
    /// Working copy of the session field set; committed values are read
    /// back out of here.
    pub fields: Vec<Field>,
    /// Index of the field receiving keystrokes.
    pub focus: usize,
    /// Transient coercion warning for the most recently validated field.
    pub warning: Option<String>,
    /// Set once the finish keychord has been seen.
    pub done: bool,
    /// `Some(id)` when editing an existing record, `None` when adding.
    pub record_id: Option<i64>,
}

impl EntryForm {
    /// Form for a new record: every value starts empty.
    pub fn add(fields: &[Field]) -> Self {
        let mut fields = fields.to_vec();
        for field in &mut fields {
            field.value.clear();
        }
        Self {
            fields,
            focus: 0,
            warning: None,
            done: false,
            record_id: None,
        }
    }

    /// Form pre-populated from an existing record.
    pub fn edit(fields: &[Field], id: i64, values: Vec<String>) -> Self {
        let mut fields = fields.to_vec();
        for (field, value) in fields.iter_mut().zip(values) {
            field.value = value;
        }
        Self {
            fields,
            focus: 0,
            warning: None,
            done: false,
            record_id: Some(id),
        }
    }

    /// Lines needed to show the whole form: one per field, a title and a
    /// warning line.
    pub fn required_height(field_count: usize) -> u16 {
        field_count as u16 + 2
    }

    /// Drive the state machine with one key event. Returns `true` once the
    /// form is done and ready for the caller's confirmation step.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        match key.code {
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.fields[self.focus].value.push(c);
                self.validate_focused();
            }
            KeyCode::Backspace => {
                self.fields[self.focus].value.pop();
                self.validate_focused();
            }
            KeyCode::Down | KeyCode::Tab | KeyCode::Enter => {
                self.validate_focused();
                self.focus = (self.focus + 1) % self.fields.len();
            }
            KeyCode::Up => {
                self.validate_focused();
                self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
            }
            KeyCode::Esc => {
                self.validate_focused();
                self.done = true;
            }
            // Everything else is functionally ignored.
            _ => {}
        }
        self.done
    }

    /// Inline validation of the focused field. Never blocks; only feeds the
    /// warning line.
    fn validate_focused(&mut self) {
        let field = &self.fields[self.focus];
        self.warning = match field.ftype.check(&field.value) {
            Ok(()) => None,
            Err(e) => Some(format!("Using: {}", e.stored)),
        };
    }
}

impl Widget for &EntryForm {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }
        let title = match self.record_id {
            Some(id) => format!("Edit record {id}"),
            None => "New record".to_string(),
        };
        buf.set_stringn(
            area.x,
            area.y,
            &title,
            area.width as usize,
            Style::default().add_modifier(Modifier::BOLD),
        );

        let label_width = self
            .fields
            .iter()
            .map(|f| f.description.chars().count())
            .max()
            .unwrap_or(0);

        for (i, field) in self.fields.iter().enumerate() {
            let y = area.y + 1 + i as u16;
            if y >= area.bottom() {
                break;
            }
            let label = format!("{:>label_width$}: ", field.description);
            buf.set_stringn(area.x, y, &label, area.width as usize, Style::default());

            let x = area.x + (label.chars().count() as u16).min(area.width);
            if x >= area.right() {
                continue;
            }
            let entry_width = (area.right() - x) as usize;
            let style = if i == self.focus {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            let value = format!("{:<entry_width$}", field.value);
            buf.set_stringn(x, y, &value, entry_width, style);
        }

        if let Some(warning) = &self.warning {
            let y = area.y + 1 + self.fields.len() as u16;
            if y < area.bottom() {
                buf.set_stringn(
                    area.x,
                    y,
                    warning,
                    area.width as usize,
                    Style::default().add_modifier(Modifier::REVERSED),
                );
            }
        }
    }
}
