//! Provider-facing descriptors (data) and adapters (behavior).
//!
//! `descriptor` holds the per-provider constants (endpoints, issuer policy, identity claim,
//! authorization quirks). `adapter` defines [`IdentityProvider`] and the descriptor-driven
//! [`ProviderAdapter`], which builds redirects, exchanges codes, and verifies ID tokens against
//! the provider's [`KeySet`].

pub mod adapter;
pub mod authorization;
pub mod descriptor;
pub mod key_set;

mod verify;

pub use adapter::*;
pub use authorization::*;
pub use descriptor::*;
pub use key_set::*;
