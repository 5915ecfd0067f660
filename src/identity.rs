//! Identity-domain types: provider names, redacted secrets, and normalized identity records.

pub mod name;
pub mod record;
pub mod secret;

pub use name::*;
pub use record::*;
pub use secret::*;
