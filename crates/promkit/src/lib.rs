//! Top-level facade crate for promkit.
//!
//! Re-exports core types and the server library so users can depend on a single crate.

pub mod core {
    pub use promkit_core::*;
}

pub mod server {
    pub use promkit_server::*;
}
