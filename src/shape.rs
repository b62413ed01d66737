//! Response Shaper: pure conversions from raw Graph payloads into the dashboard's JSON shapes.
//!
//! Nothing here performs I/O, so every shape can be tested with literal payloads and a fixed
//! clock. Field names are camelCase on the wire.

pub mod health;
pub mod licenses;
pub mod signins;
pub mod tenant;

pub use health::*;
pub use licenses::*;
pub use signins::*;
pub use tenant::*;
