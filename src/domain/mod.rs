pub mod analytics;
pub mod clock;
pub mod record;
pub mod tracking;
