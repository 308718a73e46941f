// Library surface for headless/integration tests and reuse.
// The binary in main.rs only adds the CLI and terminal setup.
pub mod app;
pub mod app_dirs;
pub mod audio;
pub mod config;
pub mod corpus;
pub mod logging;
pub mod runtime;
pub mod session;
pub mod stats;
pub mod timer;
pub mod ui;
