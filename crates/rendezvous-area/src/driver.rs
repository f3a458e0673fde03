//! Async driver for [`MeetingArea`].
//!
//! One task owns the reconciler. Inputs arrive over an mpsc channel, the
//! debounce deadline is awaited with `sleep_until`, and every change is
//! published as an [`AreaSnapshot`] on a watch channel.

use std::time::Duration;

use rendezvous_geometry::{GeoPoint, LatLng};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::reconciler::MeetingArea;
use crate::search::{SearchArea, SearchQuery};
use crate::selection::{AreaEvent, AreaSnapshot};
use crate::AreaConfig;

/// Capacity of the input channel.
const COMMAND_CAPACITY: usize = 64;

/// Stand-in deadline when nothing is pending; the branch is disabled anyway.
const IDLE: Duration = Duration::from_secs(86_400);

enum Command {
    Event(AreaEvent),
    Query {
        keyword: String,
        only_in_circle: bool,
        reply: oneshot::Sender<SearchQuery>,
    },
}

/// Cloneable handle to a running reconciler task.
#[derive(Debug, Clone)]
pub struct AreaHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<AreaSnapshot>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Event(event) => f.debug_tuple("Event").field(event).finish(),
            Self::Query { keyword, .. } => f.debug_struct("Query").field("keyword", keyword).finish(),
        }
    }
}

/// Start a reconciler task.
pub fn spawn_area(config: AreaConfig) -> (AreaHandle, JoinHandle<()>) {
    let area = MeetingArea::new(config);
    let (commands, rx) = mpsc::channel(COMMAND_CAPACITY);
    let (tx, snapshots) = watch::channel(area.snapshot());
    let task = tokio::spawn(run(area, rx, tx));
    (AreaHandle { commands, snapshots }, task)
}

async fn run(
    mut area: MeetingArea,
    mut commands: mpsc::Receiver<Command>,
    snapshots: watch::Sender<AreaSnapshot>,
) {
    info!("Area reconciler started");
    loop {
        let deadline = area.deadline();
        tokio::select! {
            cmd = commands.recv() => match cmd {
                Some(Command::Event(event)) => {
                    area.handle(event, Instant::now());
                }
                Some(Command::Query { keyword, only_in_circle, reply }) => {
                    let _ = reply.send(area.search_query(keyword, only_in_circle));
                }
                None => break,
            },
            _ = sleep_until(deadline.unwrap_or_else(|| Instant::now() + IDLE)), if deadline.is_some() => {
                area.poll(Instant::now());
            }
        }

        let next = area.snapshot();
        snapshots.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
    debug!("Area reconciler stopped");
}

impl AreaHandle {
    /// Feed one input to the reconciler.
    pub async fn send(&self, event: AreaEvent) -> Result<()> {
        self.commands
            .send(Command::Event(event))
            .await
            .map_err(|_| Error::Closed)
    }

    /// Replace the participant location set.
    pub async fn set_locations(&self, points: Vec<GeoPoint>) -> Result<()> {
        self.send(AreaEvent::LocationsChanged(points)).await
    }

    /// Set or clear the host-chosen center.
    pub async fn set_custom_center(&self, center: Option<LatLng>) -> Result<()> {
        match center {
            Some(center) => self.send(AreaEvent::CustomCenterSet(center)).await,
            None => self.send(AreaEvent::CustomCenterCleared).await,
        }
    }

    /// Move the radius slider.
    pub async fn set_radius_km(&self, radius_km: f64) -> Result<()> {
        self.send(AreaEvent::RadiusSliderChanged(radius_km)).await
    }

    /// Install the circle confirmed by a venue search.
    pub async fn search_completed(&self, area: SearchArea) -> Result<()> {
        self.send(AreaEvent::SearchCompleted(area)).await
    }

    pub async fn reset(&self) -> Result<()> {
        self.send(AreaEvent::Reset).await
    }

    /// Build a search request from the reconciler's current inputs.
    pub async fn search_query(
        &self,
        keyword: impl Into<String>,
        only_in_circle: bool,
    ) -> Result<SearchQuery> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Query {
                keyword: keyword.into(),
                only_in_circle,
                reply,
            })
            .await
            .map_err(|_| Error::Closed)?;
        rx.await.map_err(|_| Error::Closed)
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> AreaSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<AreaSnapshot> {
        self.snapshots.clone()
    }
}
