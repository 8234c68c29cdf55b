//! Route handlers. Thin: validate, delegate to a service, shape the reply.

pub mod auth;
pub mod meta;
