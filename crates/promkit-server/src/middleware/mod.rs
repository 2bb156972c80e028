//! HTTP middleware.

pub mod inbound;

pub use inbound::{classify, InboundAction, InboundMiddleware, InboundRecord};
