//! Service layer providing business operations on top of models.
//! - Separates business logic from data access.
//! - Reuses validation and entity definitions in `models` crate.
//! - Every operation takes the acting user (`rbac::Actor`) and stays inside its tenant.

pub mod errors;
pub mod pagination;
pub mod rbac;
pub mod auth;
pub mod tenant_service;
pub mod user_service;
pub mod category_service;
pub mod status_service;
pub mod forms;
pub mod idea_service;
pub mod plan_action_service;
pub mod tache_service;
pub mod comment_service;
pub mod notification_service;
pub mod file_service;
#[cfg(test)]
pub mod test_support;
