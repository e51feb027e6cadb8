//! Scripted observation sessions.

pub mod session;

pub use session::{ReplaySummary, ScriptStep, SessionScript};
