use color_eyre::Result;
use ember_tui::{
    api::HotspotProvider,
    app::{Action, App, ViewMode},
    config::Config,
    controller::{Controller, ControllerSettings},
    events::{Event, EventHandler},
    location, logging, ui,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{io, sync::Arc};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load();

    // Instrumentation and safety
    let _log_guard = logging::initialize_logging(&config.logging);
    color_eyre::install()?;
    install_panic_hook();

    let source = Arc::new(HotspotProvider::new(&config.api)?);
    let geolocator = location::provider_from_config(&config.location);

    // Ready terminal and state
    let mut terminal = setup_terminal()?;
    let mut app = App::new(ViewMode::from_name(&config.ui.default_view));
    let mut events = EventHandler::new(config.ui.tick_rate_ms);
    let mut controller = Controller::new(
        ControllerSettings::from(&config),
        source,
        geolocator,
        events.tx.clone(),
    );

    controller.activate();

    // Main loop
    while !app.should_quit {
        terminal.draw(|f| ui::render(f, &app, controller.state()))?;

        let Some(event) = events.next().await else {
            break;
        };
        match event {
            Event::Tick => app.on_tick(),
            Event::Input(key) => {
                let list_len = controller.state().ranked().len();
                match app.handle_key(key, list_len) {
                    Some(Action::Search(query)) => {
                        controller.submit_search(&query);
                    }
                    Some(Action::Refresh) => {
                        controller.refresh();
                    }
                    Some(Action::Locate) => controller.activate(),
                    None => {}
                }
            }
            completion => {
                controller.handle(completion);
                app.clamp_selection(controller.state().ranked().len());
            }
        }
    }

    info!("Shutting down.");
    restore_terminal(terminal)?;
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen, crossterm::cursor::Hide)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(terminal.backend_mut(), crossterm::terminal::LeaveAlternateScreen, crossterm::cursor::Show)?;
    Ok(())
}

fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        // Force terminal cleanup!
        crossterm::terminal::disable_raw_mode().ok();
        crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen, crossterm::cursor::Show).ok();
        original_hook(panic_info);
    }));
}
