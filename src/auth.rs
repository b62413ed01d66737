//! Identifiers, redacted secrets, and the cached access token model.

pub mod id;
pub mod secret;
pub mod token;

pub use id::*;
pub use secret::*;
pub use token::*;
