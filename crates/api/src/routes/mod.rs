pub mod health;
pub mod libraries;
pub mod metrics;
pub mod rating;
pub mod reservations;
