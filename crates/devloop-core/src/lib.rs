pub mod config;
pub mod error;
pub mod guard;
pub mod io;
pub mod paths;
pub mod patterns;
pub mod payload;
pub mod resolve;
pub mod whitelist;

pub use error::{DevloopError, Result};
pub use guard::{AllowReason, Blocked, Decision, PathGuard};
