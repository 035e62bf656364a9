//! # kiosk-session
//!
//! The session state machine of the walk-up health kiosk:
//!
//! - [`admission`]: registration, queue polling, push short-circuit, leave
//! - [`telemetry`]: per-session channel and last-writer-wins reading merge
//! - [`commit`]: at-most-one-in-flight submission with retry and cancel
//! - [`lifecycle`]: bounded device occupancy
//! - [`driver`]: the single-task event loop that ties them together
//!
//! Start a visit with [`Kiosk::start_visit`] and drive it through the
//! returned [`VisitHandle`].

pub mod admission;
pub mod commit;
pub mod driver;
pub mod handle;
pub mod lifecycle;
pub mod reading;
pub mod release;
pub mod session;
pub mod telemetry;
pub mod view;

pub use handle::{Kiosk, VisitHandle, VisitOutcome};
pub use reading::{ReadingSet, ReadingSnapshot};
pub use session::Session;
pub use view::SessionView;
