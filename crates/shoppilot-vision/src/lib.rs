//! # Shoppilot Vision
//!
//! Bridge to the external image classification service: sends the current
//! page screenshot plus the user's free-text query, receives an OK/ERROR
//! verdict, and tracks the URLs of accepted candidate products.

mod candidates;
mod client;
mod tool;

pub use candidates::{CandidateList, MAX_CANDIDATES};
pub use client::{Verdict, VisionClient, VisionError};
pub use tool::ValidateCandidateItemTool;
