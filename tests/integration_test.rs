use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::widgets::Widget;
use tabedit::store::{RecordStore, SortDirection};
use tabedit::{dump_table, schema, App, AppConfig, AppEvent, InputMode};

fn key(code: KeyCode) -> AppEvent {
    AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

fn type_text(app: &mut App, text: &str) {
    for c in text.chars() {
        app.event(&key(KeyCode::Char(c)));
    }
}

fn draw(app: &mut App, width: u16, height: u16) -> Buffer {
    let area = Rect::new(0, 0, width, height);
    let mut buf = Buffer::empty(area);
    app.render(area, &mut buf);
    buf
}

fn buffer_line(buf: &Buffer, y: u16) -> String {
    let area = buf.area;
    (area.x..area.right())
        .map(|x| buf[(x, y)].symbol().to_string())
        .collect()
}

fn empty_ratings_app() -> App {
    let store = RecordStore::open_in_memory(
        "CREATE TABLE ratings (id INTEGER PRIMARY KEY, name TEXT, rating INTEGER);",
    )
    .unwrap();
    let mut app = App::new(AppConfig::default());
    app.attach(store).unwrap();
    app
}

// Scenario from the design notes: fresh schema, no rows, 40 columns wide.
#[test]
fn test_empty_table_scenario_at_width_40() {
    let mut app = empty_ratings_app();
    let buf = draw(&mut app, 40, 12);

    // Layout spends at most 39 columns including separators.
    let used: usize = app
        .fields
        .iter()
        .map(|f| f.width as usize + 2)
        .sum();
    assert!(used <= 39);
    for f in &app.fields {
        assert!(f.width == 0 || (f.width >= f.minwidth && f.width <= f.maxwidth));
    }

    // Header shows the derived labels, no rows below it.
    let header = buffer_line(&buf, 1);
    assert!(header.contains("Name"));
    assert!(header.contains("Rating"));
    assert_eq!(app.table_state.rendered, 0);
    assert_eq!(app.table_state.highlighted_id, None);
}

#[test]
fn test_add_flow_round_trips_entered_values() {
    let mut app = empty_ratings_app();

    app.event(&key(KeyCode::Char('a')));
    assert_eq!(app.input_mode, InputMode::Entry);
    type_text(&mut app, "Brazil");
    app.event(&key(KeyCode::Tab));
    type_text(&mut app, "9");
    app.event(&key(KeyCode::Esc));
    app.event(&key(KeyCode::Char('y')));

    let store = app.store.as_ref().unwrap();
    assert_eq!(store.count().unwrap(), 1);
    let records = store
        .query_all_sorted(&app.fields, "name", SortDirection::Ascending)
        .unwrap();
    assert_eq!(records[0].values, vec!["Brazil".to_string(), "9".to_string()]);
}

#[test]
fn test_integer_noise_coerces_with_warning() {
    let mut app = empty_ratings_app();

    app.event(&key(KeyCode::Char('a')));
    type_text(&mut app, "Noisy");
    app.event(&key(KeyCode::Tab));
    type_text(&mut app, "12a");
    assert_eq!(
        app.form.as_ref().unwrap().warning.as_deref(),
        Some("Using: 12")
    );

    app.event(&key(KeyCode::Esc));
    app.event(&key(KeyCode::Char('y')));

    let store = app.store.as_ref().unwrap();
    let records = store
        .query_all_sorted(&app.fields, "name", SortDirection::Ascending)
        .unwrap();
    assert_eq!(records[0].values[1], "12");
}

#[test]
fn test_navigation_wraparound_in_form() {
    let mut app = empty_ratings_app();
    app.event(&key(KeyCode::Char('a')));

    // Forward past the last field lands on the first.
    app.event(&key(KeyCode::Down));
    app.event(&key(KeyCode::Down));
    assert_eq!(app.form.as_ref().unwrap().focus, 0);

    // Backward from the first field lands on the last.
    app.event(&key(KeyCode::Up));
    assert_eq!(app.form.as_ref().unwrap().focus, 1);
}

#[test]
fn test_delete_removes_exactly_one_record() {
    let store = RecordStore::open_in_memory(
        "CREATE TABLE ratings (id INTEGER PRIMARY KEY, name TEXT, rating INTEGER);
         INSERT INTO ratings (name, rating) VALUES ('Alien', 8);
         INSERT INTO ratings (name, rating) VALUES ('Stalker', 10);",
    )
    .unwrap();
    let mut app = App::new(AppConfig::default());
    app.attach(store).unwrap();

    draw(&mut app, 60, 12);
    let doomed = app.table_state.highlighted_id.unwrap();
    let before = app.store.as_ref().unwrap().count().unwrap();

    app.event(&key(KeyCode::Char('d')));
    app.event(&key(KeyCode::Char('y')));

    let store = app.store.as_ref().unwrap();
    assert_eq!(store.count().unwrap(), before - 1);
    let records = store
        .query_all_sorted(&app.fields, "name", SortDirection::Ascending)
        .unwrap();
    assert!(records.iter().all(|r| r.id != doomed));
}

#[test]
fn test_sort_indicator_follows_active_column() {
    let store = RecordStore::open_in_memory(
        "CREATE TABLE ratings (id INTEGER PRIMARY KEY, name TEXT, rating INTEGER);
         INSERT INTO ratings (name, rating) VALUES ('Alien', 8);",
    )
    .unwrap();
    let mut app = App::new(AppConfig::default());
    app.attach(store).unwrap();

    let buf = draw(&mut app, 60, 12);
    assert!(buffer_line(&buf, 1).contains("Name^"));

    app.event(&key(KeyCode::Right));
    app.event(&key(KeyCode::Char('r')));
    let buf = draw(&mut app, 60, 12);
    // "Rating" fills its column exactly, so the marker takes the last cell.
    assert!(buffer_line(&buf, 1).contains("Ratinv"));
}

#[test]
fn test_resize_narrower_drops_trailing_columns() {
    let store = RecordStore::open_in_memory(
        "CREATE TABLE wide (id INTEGER PRIMARY KEY,
             a TEXT, b TEXT, c TEXT, d TEXT, e TEXT, f TEXT);",
    )
    .unwrap();
    let mut app = App::new(AppConfig::default());
    app.attach(store).unwrap();

    draw(&mut app, 80, 12);
    assert!(app.fields.iter().all(|f| f.width > 0));

    // Re-render at a width the minimums cannot fit.
    draw(&mut app, 18, 12);
    assert!(app.fields.iter().any(|f| f.width == 0));
    assert!(app.fields[0].width > 0);

    // Growing back restores every column; the pass is stateless.
    draw(&mut app, 80, 12);
    assert!(app.fields.iter().all(|f| f.width > 0));
}

#[test]
fn test_on_disk_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shelf.db");

    {
        let conn = rusqlite_open(&path);
        conn.execute_batch(
            "CREATE TABLE shelf (id INTEGER PRIMARY KEY, name TEXT, price REAL);",
        )
        .unwrap();
    }

    {
        let store = RecordStore::open(&path).unwrap();
        let mut fields = schema::introspect(&store).unwrap();
        fields[0].value = "Tea".to_string();
        fields[1].value = "4.5".to_string();
        store.insert(&fields).unwrap();
    }

    let store = RecordStore::open(&path).unwrap();
    let fields = schema::introspect(&store).unwrap();
    assert_eq!(store.count().unwrap(), 1);
    let records = store
        .query_all_sorted(&fields, "name", SortDirection::Ascending)
        .unwrap();
    assert_eq!(records[0].values, vec!["Tea".to_string(), "4.50".to_string()]);

    let mut out = Vec::new();
    dump_table(&mut out, &store, &fields).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "Name\tPrice\nTea\t4.50\n"
    );
}

fn rusqlite_open(path: &std::path::Path) -> rusqlite::Connection {
    rusqlite::Connection::open(path).unwrap()
}
