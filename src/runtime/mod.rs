use std::sync::mpsc;

use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use log::info;
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::app::App;
use crate::audio::RodioBackend;
use crate::library::{ScanEvent, Scanner};
use crate::player::Player;

mod event_loop;
mod logging;
mod settings;
mod startup;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = settings::load_settings();
    logging::init(&settings.logging);

    let root = startup::library_root();
    info!("starting with library root {}", root.display());

    let backend = RodioBackend::new(settings.audio.clone())?;
    let mut app = App::new(Player::new(backend, startup::player_options(&settings)));
    app.set_current_dir(root.display().to_string());

    let (scan_tx, scan_rx) = mpsc::channel::<ScanEvent>();
    let scan = Scanner::new(settings.library.clone(), settings.metadata.clone())
        .spawn(root, scan_tx)?;

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result: Result<(), Box<dyn std::error::Error>> = (|| {
        let mut state = event_loop::EventLoopState::new();
        event_loop::run(&mut terminal, &settings, &mut app, &scan_rx, &mut state)
    })();

    // An in-flight probe may take up to the metadata timeout; do not wait for it.
    if !scan.is_finished() {
        info!("cancelling library scan");
        scan.cancel();
    }
    app.player.shutdown();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    info!("bye");
    run_result
}
