//! Meeting-area reconciler.
//!
//! Turns a live, noisy stream of participant locations, host edits and
//! search results into one effective circle:
//!
//! - [`MeetingArea`]: the synchronous state machine, driven by explicit
//!   instants so it can be tested without a runtime clock
//! - [`Debouncer`]: the single pending-computation slot it uses
//! - [`spawn_area`] / [`AreaHandle`]: a tokio task that owns a
//!   `MeetingArea` and publishes [`AreaSnapshot`]s on a watch channel
//!
//! # Example
//!
//! ```no_run
//! use rendezvous_area::{spawn_area, AreaConfig};
//! use rendezvous_geometry::GeoPoint;
//!
//! # async fn demo() -> rendezvous_area::Result<()> {
//! let (area, _task) = spawn_area(AreaConfig::default());
//! area.set_locations(vec![GeoPoint::new(52.52, 13.40)]).await?;
//! let mut updates = area.subscribe();
//! updates.changed().await.ok();
//! println!("{}", updates.borrow().selection);
//! # Ok(())
//! # }
//! ```

mod config;
mod debounce;
mod driver;
mod error;
mod reconciler;
mod search;
mod selection;

pub use config::AreaConfig;
pub use debounce::{Debouncer, Ticket};
pub use driver::{spawn_area, AreaHandle};
pub use error::{Error, Result};
pub use reconciler::MeetingArea;
pub use search::{radius_multiplier, SearchArea, SearchQuery};
pub use selection::{AreaEvent, AreaSnapshot, CircleSelection};
