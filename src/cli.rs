//! CLI definitions for shoppilot.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Shoppilot CLI.
#[derive(Parser)]
#[command(name = "shoppilot")]
#[command(about = "Browser session controller and tool surface for the shopping agent")]
#[command(version)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Print the function-calling schema of every tool as JSON
    Tools,

    /// Serve tool calls over stdin/stdout (one JSON object per line)
    Run {
        /// Show the browser window instead of running headless
        #[arg(long)]
        show_browser: bool,

        /// Page the session starts on
        #[arg(
            long,
            env = "SHOPPILOT_START_URL",
            default_value = "https://www.wildberries.ru/"
        )]
        start_url: String,

        /// Viewport width in CSS pixels
        #[arg(long, default_value_t = 1366)]
        viewport_width: u32,

        /// Viewport height in CSS pixels
        #[arg(long, default_value_t = 900)]
        viewport_height: u32,

        /// Browser user agent override
        #[arg(long)]
        user_agent: Option<String>,

        /// Directory screenshots are written to
        #[arg(long, default_value = "screenshots")]
        screenshot_dir: PathBuf,

        /// Per-keystroke delay when typing, in milliseconds
        #[arg(long, default_value_t = 10)]
        typing_delay_ms: u64,

        /// Artificial delay before each action, for watching a headful run
        #[arg(long, default_value_t = 0)]
        slow_mo_ms: u64,

        /// Chrome remote debugging port
        #[arg(long, default_value_t = 9222)]
        debug_port: u16,

        /// Chrome profile directory for persistent login state
        #[arg(long)]
        profile_dir: Option<PathBuf>,

        /// Image classification service URL
        #[arg(
            long,
            env = "SHOPPILOT_CLASSIFICATOR_URL",
            default_value = "http://127.0.0.1:8100/classificator"
        )]
        classificator_url: String,
    },
}
