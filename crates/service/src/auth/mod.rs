//! Auth module: three-layer architecture (domain, repository, service).
//!
//! Registration, login and token decoding live here; the HTTP layer only moves
//! cookies and headers around.

pub mod domain;
pub mod errors;
pub mod repository;
pub mod service;
pub mod repo;

pub use service::{decode_token, AuthConfig, AuthService};
