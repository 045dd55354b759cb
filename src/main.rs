mod app;
mod audio;
mod config;
mod library;
mod observer;
mod playback;
mod player;
mod runtime;
mod ui;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    runtime::run()
}
