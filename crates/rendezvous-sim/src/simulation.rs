//! One simulated meeting session from creation to published decision.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rendezvous_area::{spawn_area, AreaConfig, AreaHandle, AreaSnapshot};
use rendezvous_geometry::fuzz_point;
use rendezvous_sync::{
    Candidate, CandidateId, Collaborators, EventId, HubConfig, MemoryHub, NewEvent,
    NewParticipant, SessionContext, SyncConfig, Synchronizer, Venue, Visibility,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::SimConfig;
use crate::error::{Error, Result};

/// Venue kinds in the generated catalog.
const KINDS: [&str; 6] = ["cafe", "ramen", "pizza", "tacos", "bistro", "bakery"];

/// Pause that lets background stream reloads catch up.
const QUIET: Duration = Duration::from_millis(200);

/// Outcome of a simulated session.
#[derive(Debug, Clone, Serialize)]
pub struct SimReport {
    pub event_id: EventId,
    pub participants: usize,
    pub area: AreaSnapshot,
    /// Candidates in the configured order.
    pub candidates: Vec<Candidate>,
    pub votes_cast: usize,
    pub vote_failures: usize,
    pub tally: Vec<(CandidateId, u32)>,
    pub final_decision: Option<String>,
    /// Completed reloads per client, host first.
    pub reloads: Vec<u64>,
}

fn catalog(config: &SimConfig, rng: &mut StdRng) -> Vec<Venue> {
    (0..config.venue_count)
        .map(|i| {
            let kind = KINDS[i % KINDS.len()];
            let position = fuzz_point(config.center, config.spread_km, rng);
            let rating: f64 = rng.gen_range(3.0..5.0);
            Venue {
                place_id: format!("place-{i:04}-{kind}"),
                name: format!("{kind} #{i}"),
                address: None,
                lat: position.lat,
                lng: position.lng,
                rating: Some((rating * 10.0).round() / 10.0),
                user_ratings_total: rng.gen_range(5..500),
                tags: vec![kind.to_owned()],
            }
        })
        .collect()
}

/// Wait until the reconciler shows a circle for `points` locations with
/// nothing pending.
async fn settled(area: &AreaHandle, points: usize, timeout: Duration) -> Result<AreaSnapshot> {
    let mut updates = area.subscribe();
    let wait = async {
        loop {
            {
                let snapshot = updates.borrow_and_update();
                if snapshot.point_count == points && snapshot.is_settled() {
                    return Ok(snapshot.clone());
                }
            }
            if updates.changed().await.is_err() {
                return Err(Error::Area(rendezvous_area::Error::Closed));
            }
        }
    };
    tokio::time::timeout(timeout, wait)
        .await
        .map_err(|_| Error::Timeout("meeting area"))?
}

/// Run a full session: gather, search, vote, publish.
pub async fn run(config: SimConfig) -> Result<SimReport> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let hub = Arc::new(MemoryHub::new(HubConfig::default().with_seed(config.seed)));
    hub.add_venues(catalog(&config, &mut rng)).await;

    let event = hub
        .create_event(NewEvent::new("Simulated meetup").with_visibility(Visibility::Blur))
        .await;
    info!(event_id = %event.id, clients = config.clients, "Simulation started");

    let (area, _area_task) = spawn_area(AreaConfig::from_env());
    let host = Synchronizer::new(
        Collaborators::shared(hub.clone()),
        SyncConfig::from_env(),
        Some(area.clone()),
    );
    host.enter(SessionContext::host(event.id.clone())).await?;
    host.join(NewParticipant::at(config.center).named("host"))
        .await?;

    let mut clients = Vec::with_capacity(config.clients);
    for i in 0..config.clients {
        let client = Synchronizer::new(
            Collaborators::shared(hub.clone()),
            SyncConfig::from_env(),
            None,
        );
        client
            .enter(SessionContext::participant(event.id.clone(), None))
            .await?;
        let location = fuzz_point(config.center, config.spread_km, &mut rng);
        client
            .join(NewParticipant::at(location).named(format!("guest-{i}")))
            .await?;
        clients.push(client);
    }

    area.set_radius_km(config.radius_km).await?;
    let participants = config.clients + 1;
    let snapshot = settled(&area, participants, config.settle_timeout).await?;
    info!(selection = %snapshot.selection, "Meeting area settled");

    let results = host.search(&config.keyword, config.only_in_circle).await?;
    info!(found = results.candidates.len(), "Search complete");
    tokio::time::sleep(QUIET).await;

    let ids: Vec<CandidateId> = results.candidates.iter().map(|c| c.id.clone()).collect();
    let mut votes_cast = 0;
    let mut vote_failures = 0;
    for client in &clients {
        let picks = rng.gen_range(1..=2).min(ids.len());
        for candidate in ids.choose_multiple(&mut rng, picks) {
            match client.toggle_vote(candidate).await {
                Ok(outcome) => {
                    debug!(candidate = %candidate, ?outcome, "Vote");
                    votes_cast += 1;
                }
                Err(e) => {
                    warn!(candidate = %candidate, error = %e, "Vote failed");
                    vote_failures += 1;
                }
            }
        }
    }
    tokio::time::sleep(QUIET).await;

    let tally = hub.tally(&event.id).await?;
    let mirror = host.mirror().await;
    let winner = tally
        .iter()
        .find(|(_, votes)| *votes > 0)
        .and_then(|(id, _)| mirror.candidates.iter().find(|c| &c.id == id));
    let final_decision = match winner {
        Some(candidate) => host.publish(&candidate.name).await?.final_decision,
        None => None,
    };
    tokio::time::sleep(QUIET).await;

    let mut reloads = vec![host.reload_count()];
    reloads.extend(clients.iter().map(Synchronizer::reload_count));

    let report = SimReport {
        event_id: event.id.clone(),
        participants,
        area: area.snapshot(),
        candidates: host.candidates(config.sort).await,
        votes_cast,
        vote_failures,
        tally,
        final_decision,
        reloads,
    };

    for client in &clients {
        client.leave().await;
    }
    host.leave().await;
    info!(event_id = %event.id, "Simulation finished");
    Ok(report)
}
