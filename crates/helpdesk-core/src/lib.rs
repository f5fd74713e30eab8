//! helpdesk-core library.
//!
//! Ticket lifecycle rules for a helpdesk: a business-hours calendar, SLA
//! deadlines per category, category-to-group routing, and the state machine
//! that turns a change set into a new ticket snapshot plus audit comments.
//!
//! The machine itself performs no I/O. [`service::TicketService`] wraps it
//! with access checks and a [`store::TicketRepository`].

pub mod calendar;
pub mod config;
pub mod error;
pub mod intake;
pub mod machine;
pub mod model;
pub mod routing;
pub mod service;
pub mod sla;
pub mod store;

pub use calendar::BusinessCalendar;
pub use error::ErrorCode;
pub use machine::{TicketStateMachine, Transition, TransitionError};
pub use routing::CategoryRouter;
pub use sla::SlaPolicy;

/// # Conventions
///
/// - **Errors**: `thiserror` enums per module, each mapping to an [`ErrorCode`].
///   `anyhow::Result` only at the config-file boundary.
/// - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`) with
///   structured fields; `ticket = %id` for anything ticket-scoped.
/// - **Time**: all instants are `DateTime<Utc>`; callers pass `now`.
pub fn init() {
    tracing::debug!("helpdesk-core initialized");
}
