//! Browser session controller for the shopping agent.
//!
//! Owns a single Chrome tab via the Chrome DevTools Protocol (CDP) and
//! exposes a small fixed vocabulary of coordinate-based actions (click,
//! type, scroll, wait, go back, zoom), each of which waits for the page to
//! settle and then captures a screenshot. Pure Rust, no Node.js sidecar.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   tool call    ┌────────────┐    CDP / WebSocket    ┌────────┐
//! │ orchestrator │ ─────────────► │ PageDriver │ ◄───────────────────► │ Chrome │
//! │  (LLM loop)  │ ◄───────────── │ (1 tab)    │                       └────────┘
//! └──────────────┘  screenshot    └────────────┘
//! ```
//!
//! ## Session model
//!
//! One live session per process, managed by [`SessionManager`]:
//! `get_or_create` is idempotent, `reset` re-navigates the warm page to the
//! start URL between conversation turns, `close` releases everything. A
//! real browser engine is expensive, so isolation is traded for resource
//! economy.
//!
//! ## Coordinates
//!
//! All pointer and region actions arrive in a logical 1000×1000 space and
//! are scaled to the configured viewport. Values outside the logical space
//! are rejected, never clamped.

pub mod cdp;
mod driver;
mod manager;
mod stabilize;
mod tools;

pub use cdp::{CdpClient, CdpError, MouseButton, PageSession};
pub use driver::{DriverError, PageDriver, LOGICAL_SPACE};
pub use manager::{find_chrome, SessionConfig, SessionError, SessionManager};
pub use stabilize::StabilizeBudget;
pub use tools::{
    register_page_tools, ClickTool, GetCurrentUrlTool, GoBackTool, ScrollTool, TypeTextTool,
    WaitTool, ZoomTool,
};
