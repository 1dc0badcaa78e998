//! Time sources for the Coinrush authority.
//!
//! - [`TickScheduler`] wakes the authority actor at a fixed rate while a
//!   session is running and pends forever while it is paused.
//! - [`Cadence`] turns those ticks into "spawn now" firings at a coarser,
//!   configurable interval of session time.
//!
//! The scheduler is designed to sit inside the actor's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         info = scheduler.wait_for_tick() => {
//!             let events = controller.tick(info.dt);
//!             scheduler.record_tick_end();
//!         }
//!     }
//! }
//! ```

mod cadence;
mod scheduler;

pub use cadence::Cadence;
pub use scheduler::{TickConfig, TickInfo, TickMetrics, TickScheduler};
