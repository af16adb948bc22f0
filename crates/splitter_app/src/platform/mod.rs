mod app;
mod args;
mod config;
mod driver;
mod effects;
mod ui;

pub use app::run_app;
pub use args::Cli;
