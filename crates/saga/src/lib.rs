//! Saga orchestration for the library gateway.
//!
//! Two multi-service writes run as sagas with compensating actions:
//! - reserve a book: create reservation → decrement available count
//! - return a book: set status → increment available count → adjust stars
//!
//! When a step fails after an earlier step changed remote state, the applied
//! steps are undone in reverse order and the original request is handed to
//! the retry scheduler. The caller gets a degraded success in the meantime.
//! Reads go through per-operation circuit breakers.

pub mod coordinator;
pub mod error;
pub mod operations;
pub mod replay;
pub mod reserve;
pub mod response;
pub mod returns;
pub mod views;

pub use coordinator::{SagaCoordinator, breaker_registry};
pub use error::{Result, SagaError};
pub use replay::{ReserveReplay, ReturnReplay};
pub use response::{GatewayResponse, ResponseBody};
pub use returns::RESERVATION_UID_PARAM;
pub use views::{ReservationDetails, ReservationEntry, ReservationSummary, StarsView};
