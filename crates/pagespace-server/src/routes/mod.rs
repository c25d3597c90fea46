//! HTTP route handlers, one module per endpoint group.

pub mod abort;
pub mod activities;
pub mod chat;
pub mod upload;
