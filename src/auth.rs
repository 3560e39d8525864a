//! Credential model, redacting secrets, and auth-state observers.

pub mod credential;
pub mod events;

pub use credential::*;
pub use events::*;
