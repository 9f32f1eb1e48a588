//! sitepulse: live host-stats dashboard for the blog backend.
//!
//! The pieces with real invariants live in [`frame`] (wire decoding),
//! [`history`] (rolling sample window), [`uptime`] (uptime extrapolation)
//! and [`ws`] (stream session). The rest is glue and presentation.

pub mod api;
pub mod app;
pub mod comments;
pub mod error;
pub mod frame;
pub mod history;
pub mod logging;
pub mod profiles;
pub mod state;
pub mod types;
pub mod ui;
pub mod uptime;
pub mod votes;
pub mod ws;

pub use error::{ClientError, DecodeError};
