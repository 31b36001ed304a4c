pub mod errors;
pub mod db;
pub mod tenant;
pub mod user;
pub mod user_credentials;
pub mod category;
pub mod status;
pub mod form_model;
pub mod form_variant;
pub mod form_field;
pub mod idea;
pub mod plan_action;
pub mod tache;
pub mod comment;
pub mod notification;
pub mod file_metadata;

#[cfg(test)]
mod tests;
