use clap::Parser;
use color_eyre::Result;
use ratatui::DefaultTerminal;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use tabedit::{dump_table, schema, store, App, AppConfig, AppEvent, Args};

fn render(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    terminal.draw(|frame| frame.render_widget(app, frame.area()))?;
    Ok(())
}

fn run(mut terminal: DefaultTerminal, path: PathBuf, config: AppConfig) -> Result<()> {
    let (tx, rx) = channel::<AppEvent>();
    let mut app = App::new(config);
    render(&mut terminal, &mut app)?;
    tx.send(AppEvent::Open(path))?;

    loop {
        if crossterm::event::poll(std::time::Duration::from_millis(25))? {
            match crossterm::event::read()? {
                crossterm::event::Event::Key(key) => tx.send(AppEvent::Key(key))?,
                crossterm::event::Event::Resize(cols, rows) => {
                    tx.send(AppEvent::Resize(cols, rows))?
                }
                _ => {}
            }
        }

        let updated = match rx.recv_timeout(std::time::Duration::from_millis(0)) {
            Ok(event) => {
                match event {
                    AppEvent::Exit => break,
                    AppEvent::Crash(msg) => {
                        return Err(color_eyre::eyre::eyre!(msg));
                    }
                    event => {
                        if let Some(event) = app.event(&event) {
                            tx.send(event)?;
                        }
                    }
                }
                true
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => false,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        };

        if updated {
            render(&mut terminal, &mut app)?;
        }
    }
    Ok(())
}

/// `-l`: print the table as plain text and exit without entering the UI.
fn list_table(path: &Path) -> Result<()> {
    let store = store::RecordStore::open(path)?;
    let fields = schema::introspect(&store)?;
    let stdout = std::io::stdout();
    dump_table(&mut stdout.lock(), &store, &fields)
}

fn init_logging() {
    // File logger keeps the alternate screen clean.
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    if let Ok(log_file) = std::fs::File::create("tabedit.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    color_eyre::install()?;

    if args.debug {
        init_logging();
    }

    let config = AppConfig::load();
    let path = match &args.file {
        Some(path) => path.clone(),
        None => {
            let cwd = std::env::current_dir()?;
            match store::discover(&cwd, &config.extension) {
                Ok(path) => path,
                Err(e) => {
                    eprintln!("Error: {e}");
                    std::process::exit(1);
                }
            }
        }
    };

    if args.list {
        return list_table(&path);
    }

    let terminal = ratatui::init();
    let result = run(terminal, path, config);
    ratatui::restore();
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
