use color_eyre::eyre::eyre;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use std::io::Write;
use std::path::{Path, PathBuf};

use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Paragraph, StatefulWidget};
use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};

pub mod cli;
pub mod config;
pub mod layout;
pub mod schema;
pub mod store;
pub mod widgets;

pub use cli::Args;
pub use config::AppConfig;

use schema::Field;
use store::{RecordStore, SortDirection};
use widgets::controls::Controls;
use widgets::datatable::{RecordTable, RecordTableState};
use widgets::entry_form::EntryForm;

/// Application name used for the config directory and other app-specific
/// paths
pub const APP_NAME: &str = "tabedit";

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Open(PathBuf),
    Exit,
    Crash(String),
    Resize(u16, u16), // resized (width, height)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    Browse,
    Entry,
    ConfirmSave,
    ConfirmDelete,
}

/// Session state: the open store, the introspected field set, the table
/// view state and the current input mode. Bundled here rather than held as
/// globals so every render call sees one explicit context.
pub struct App {
    pub config: AppConfig,
    pub input_mode: InputMode,
    pub store: Option<RecordStore>,
    /// Session field set; structure is fixed after introspection, only
    /// widths mutate (every layout pass).
    pub fields: Vec<Field>,
    /// Display name from the metadata table, shown in the title line.
    pub title: String,
    pub table_state: RecordTableState,
    pub sort_column: usize,
    pub direction: SortDirection,
    pub form: Option<EntryForm>,
    pending_delete: Option<i64>,
    status: Option<String>,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            input_mode: InputMode::default(),
            store: None,
            fields: Vec::new(),
            title: String::new(),
            table_state: RecordTableState::default(),
            sort_column: 0,
            direction: SortDirection::default(),
            form: None,
            pending_delete: None,
            status: None,
        }
    }

    /// Handle one application event, optionally producing a follow-up.
    pub fn event(&mut self, event: &AppEvent) -> Option<AppEvent> {
        match event {
            AppEvent::Key(key) => self.key(key),
            AppEvent::Open(path) => match self.open(path) {
                Ok(()) => None,
                Err(e) => Some(AppEvent::Crash(format!("{e:#}"))),
            },
            // Dimensions are re-read at the next render pass.
            AppEvent::Resize(_, _) => None,
            AppEvent::Exit | AppEvent::Crash(_) => None,
        }
    }

    fn open(&mut self, path: &Path) -> Result<()> {
        let store = RecordStore::open(path)?;
        let fields = schema::introspect(&store)?;
        // The entry form shows every field at once; a screen that cannot
        // fit them all is a configuration error, detected up front.
        if let Ok((_, rows)) = crossterm::terminal::size() {
            let needed = EntryForm::required_height(fields.len()) + 2;
            if rows < needed {
                return Err(eyre!(
                    "screen too small: {} lines needed for {} fields, {} available",
                    needed,
                    fields.len(),
                    rows
                ));
            }
        }
        self.title = store.display_name()?;
        self.store = Some(store);
        self.attach_fields(fields)
    }

    /// Install an introspected field set and load the first page of rows.
    /// Split out from [`App::open`] so tests can drive an in-memory store.
    pub fn attach(&mut self, store: RecordStore) -> Result<()> {
        let fields = schema::introspect(&store)?;
        self.title = store.display_name()?;
        self.store = Some(store);
        self.attach_fields(fields)
    }

    fn attach_fields(&mut self, fields: Vec<Field>) -> Result<()> {
        self.fields = fields;
        self.sort_column = 0;
        self.direction = SortDirection::default();
        self.refresh()
    }

    /// Re-query the store sorted by the active sort column.
    fn refresh(&mut self) -> Result<()> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| eyre!("no data source open"))?;
        let sort = self.fields[self.sort_column].name.clone();
        let records = store.query_all_sorted(&self.fields, &sort, self.direction)?;
        self.table_state.set_records(records);
        Ok(())
    }

    fn refresh_event(&mut self) -> Option<AppEvent> {
        match self.refresh() {
            Ok(()) => None,
            Err(e) => Some(AppEvent::Crash(format!("{e:#}"))),
        }
    }

    fn key(&mut self, key: &KeyEvent) -> Option<AppEvent> {
        match self.input_mode {
            InputMode::Browse => self.key_browse(key),
            InputMode::Entry => self.key_entry(key),
            InputMode::ConfirmSave => self.key_confirm_save(key),
            InputMode::ConfirmDelete => self.key_confirm_delete(key),
        }
    }

    fn key_browse(&mut self, key: &KeyEvent) -> Option<AppEvent> {
        if self.fields.is_empty() {
            // Nothing open yet; only quitting makes sense.
            return matches!(key.code, KeyCode::Char('q') | KeyCode::Esc)
                .then_some(AppEvent::Exit);
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Some(AppEvent::Exit),
            KeyCode::Up => {
                self.table_state.select_previous();
                None
            }
            KeyCode::Down => {
                self.table_state.select_next();
                None
            }
            KeyCode::PageUp => {
                self.table_state.page_up();
                None
            }
            KeyCode::PageDown => {
                self.table_state.page_down();
                None
            }
            KeyCode::Left => {
                self.sort_column =
                    (self.sort_column + self.fields.len() - 1) % self.fields.len();
                log::debug!("sort column -> {}", self.fields[self.sort_column].name);
                self.refresh_event()
            }
            KeyCode::Right => {
                self.sort_column = (self.sort_column + 1) % self.fields.len();
                log::debug!("sort column -> {}", self.fields[self.sort_column].name);
                self.refresh_event()
            }
            KeyCode::Char('r') => {
                self.direction.toggle();
                log::debug!("sort direction -> {}", self.direction);
                self.refresh_event()
            }
            KeyCode::Char('a') => {
                self.form = Some(EntryForm::add(&self.fields));
                self.input_mode = InputMode::Entry;
                None
            }
            KeyCode::Char('e') | KeyCode::Enter => self.begin_edit(),
            KeyCode::Char('d') => self.begin_delete(),
            // Unrecognized input is ignored, never fatal.
            _ => None,
        }
    }

    fn key_entry(&mut self, key: &KeyEvent) -> Option<AppEvent> {
        if let Some(form) = self.form.as_mut() {
            if form.handle_key(key) {
                self.status = Some("Save changes? (y/n)".to_string());
                self.input_mode = InputMode::ConfirmSave;
            }
        }
        None
    }

    fn key_confirm_save(&mut self, key: &KeyEvent) -> Option<AppEvent> {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                let result = self.commit_form();
                self.close_form();
                match result {
                    Ok(()) => self.refresh_event(),
                    Err(e) => Some(AppEvent::Crash(format!("{e:#}"))),
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                // Declined: the pending write is dropped, the store is
                // untouched.
                self.close_form();
                None
            }
            _ => None,
        }
    }

    fn key_confirm_delete(&mut self, key: &KeyEvent) -> Option<AppEvent> {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                let id = self.pending_delete.take();
                self.status = None;
                self.input_mode = InputMode::Browse;
                match id {
                    Some(id) => self.delete_now(id),
                    None => None,
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.pending_delete = None;
                self.status = None;
                self.input_mode = InputMode::Browse;
                None
            }
            _ => None,
        }
    }

    fn begin_edit(&mut self) -> Option<AppEvent> {
        let id = self.table_state.highlighted_id?;
        let store = self.store.as_ref()?;
        match store.query_one(&self.fields, id) {
            Ok(record) => {
                self.form = Some(EntryForm::edit(&self.fields, id, record.values));
                self.input_mode = InputMode::Entry;
                None
            }
            Err(e) => Some(AppEvent::Crash(format!("{e:#}"))),
        }
    }

    fn begin_delete(&mut self) -> Option<AppEvent> {
        let id = self.table_state.highlighted_id?;
        if self.config.confirm_delete {
            self.pending_delete = Some(id);
            self.status = Some("Delete record? (y/n)".to_string());
            self.input_mode = InputMode::ConfirmDelete;
            None
        } else {
            self.delete_now(id)
        }
    }

    fn delete_now(&mut self, id: i64) -> Option<AppEvent> {
        let store = self.store.as_ref()?;
        match store.delete(id) {
            Ok(()) => self.refresh_event(),
            Err(e) => Some(AppEvent::Crash(format!("{e:#}"))),
        }
    }

    fn commit_form(&mut self) -> Result<()> {
        let form = self.form.as_ref().ok_or_else(|| eyre!("no form open"))?;
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| eyre!("no data source open"))?;
        match form.record_id {
            Some(id) => store.update(&form.fields, id)?,
            None => {
                store.insert(&form.fields)?;
            }
        }
        Ok(())
    }

    fn close_form(&mut self) {
        self.form = None;
        self.status = None;
        self.input_mode = InputMode::Browse;
    }
}

/// Write the table as plain text: a header line, then one line per record
/// in identifier order, values separated by tabs.
pub fn dump_table<W: Write>(out: &mut W, store: &RecordStore, fields: &[Field]) -> Result<()> {
    let header: Vec<&str> = fields.iter().map(|f| f.description.as_str()).collect();
    writeln!(out, "{}", header.join("\t"))?;
    let records = store.query_all_sorted(fields, store.id_column(), SortDirection::Ascending)?;
    for record in records {
        writeln!(out, "{}", record.values.join("\t"))?;
    }
    Ok(())
}

impl Widget for &mut App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Fill(1),
                Constraint::Length(1),
            ])
            .split(area);

        let title = if self.title.is_empty() {
            APP_NAME.to_string()
        } else {
            format!("{} ({} rows)", self.title, self.table_state.records.len())
        };
        Paragraph::new(title)
            .style(Style::default().add_modifier(Modifier::BOLD))
            .render(chunks[0], buf);

        match self.input_mode {
            InputMode::Entry | InputMode::ConfirmSave => {
                if let Some(form) = &self.form {
                    form.render(chunks[1], buf);
                }
            }
            InputMode::Browse | InputMode::ConfirmDelete => {
                // Widths are recomputed every pass; the screen may have
                // changed size since the last one.
                layout::allocate_widths(&mut self.fields, chunks[1].width);
                let App {
                    fields,
                    table_state,
                    sort_column,
                    direction,
                    ..
                } = self;
                let table = RecordTable::new(fields, *sort_column, *direction);
                StatefulWidget::render(table, chunks[1], buf, table_state);
            }
        }

        match (&self.status, &self.input_mode) {
            (Some(status), _) => {
                Paragraph::new(status.as_str())
                    .style(Style::default().add_modifier(Modifier::REVERSED))
                    .render(chunks[2], buf);
            }
            (None, InputMode::Entry) => {
                Paragraph::new("Enter/Tab next field  Up previous  Esc finish")
                    .style(Style::default().fg(Color::DarkGray))
                    .render(chunks[2], buf);
            }
            _ => {
                let controls = Controls::with_row_count(self.table_state.records.len());
                (&controls).render(chunks[2], buf);
            }
        }
    }
}
