//! Clients for the three backend services behind the gateway.
//!
//! Each service is a trait ([`CatalogService`], [`ReservationService`],
//! [`RatingService`]) with two implementations: a reqwest-backed one that
//! talks to the real service and an in-memory one with failure switches for
//! tests.

pub mod config;
pub mod error;
pub mod memory;
pub mod remote;
pub mod service;

pub use config::BackendConfig;
pub use error::{Result, ServiceError};
pub use memory::{
    CallJournal, InMemoryCatalogService, InMemoryRatingService, InMemoryReservationService,
};
pub use remote::{HttpBackends, HttpCatalogService, HttpRatingService, HttpReservationService};
pub use service::{
    BookQuery, CatalogService, LibraryQuery, RatingService, RawResponse, ReservationService,
};
