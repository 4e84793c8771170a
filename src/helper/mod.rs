pub mod auth_helpers;
pub mod feedback_helpers;
pub mod validation_helpers;
