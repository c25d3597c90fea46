//! # pagespace-auth
//!
//! Authentication and request-level security for the PageSpace AI gateway
//! core.
//!
//! ## Architecture
//!
//! - `principal` — the authenticated identity attached to a request (C1's
//!   output) and the claim types it carries.
//! - `token` — bearer-prefix classification and keyed-hash token digesting,
//!   shared by session and MCP validation.
//! - `session` — session credential storage/validation (`ps_sess_*`).
//! - `mcp_token` — MCP machine-token storage/validation (`mcp_*`),
//!   including the fail-closed scoped-drive-deletion rule.
//! - `authenticator` — C1: ties the two credential stores together behind
//!   a single `authenticate` entry point.
//! - `origin_csrf` — C2: origin allow-list check and HMAC-bound CSRF token
//!   issuance/validation for cookie-bound mutating requests.
//! - `scope` — C3: constrains MCP principals to their scoped drives.
//! - `error` — the error types shared across this crate.
//!
//! Nothing in this crate knows about HTTP status codes or response bodies;
//! the server crate maps [`error::AuthError`] and friends onto the wire
//! format described in the gateway's error-handling design.

#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod authenticator;
pub mod error;
pub mod mcp_token;
pub mod origin_csrf;
pub mod principal;
pub mod scope;
pub mod session;
pub mod token;

#[doc(inline)]
pub use authenticator::{AllowedCredentials, Authenticator, IncomingCredentials};
#[doc(inline)]
pub use error::{AuthError, AuthResult, CsrfError, ScopeError};
#[doc(inline)]
pub use origin_csrf::CsrfGuard;
#[doc(inline)]
pub use principal::{McpPrincipal, Principal, Role, SessionPrincipal, SessionSource, VersionClaims};
