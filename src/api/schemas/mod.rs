pub mod analytics;
pub mod health;
pub mod messages;
pub mod tracking;
