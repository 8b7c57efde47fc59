use crate::catalog::StructureCatalog;
use crate::commit::CancelToken;
use crate::config::GeneratorConfig;
use crate::error::VillageError;
use crate::geom::BlockPos;
use crate::orchestrator::Placer;
use crate::store::VillageStore;
use crate::world::WorldProvider;
use fnv::FnvHashMap;
use log::{info, warn};
use std::collections::VecDeque;
use uuid::Uuid;

/// Default cap on queued generation requests.
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// A generation job submitted from anywhere; executed only on the world
/// thread via [`GenerationQueue::tick`].
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationRequest {
    pub culture_id: String,
    pub origin: BlockPos,
    pub seed: u64,
}

/// Handle for a submitted request.
pub type Ticket = u64;

/// Bounded single-writer dispatcher. Background workers may prepare and
/// submit requests freely; all world mutation happens inside `tick`,
/// which the host calls from the thread that owns the world. One village
/// generates per tick, so villages never interleave within a world.
pub struct GenerationQueue {
    pending: VecDeque<(Ticket, GenerationRequest)>,
    completed: FnvHashMap<Ticket, Result<Uuid, VillageError>>,
    capacity: usize,
    next_ticket: Ticket,
    cancel: CancelToken,
}

impl Default for GenerationQueue {
    fn default() -> GenerationQueue {
        GenerationQueue::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }
}

impl GenerationQueue {
    pub fn with_capacity(capacity: usize) -> GenerationQueue {
        GenerationQueue {
            pending: VecDeque::new(),
            completed: FnvHashMap::default(),
            capacity: capacity.max(1),
            next_ticket: 0,
            cancel: CancelToken::new(),
        }
    }

    /// Shared cancel flag: cancelling aborts the in-flight village
    /// between structures and drains nothing further.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Queue a request. Returns `None` when the queue is full.
    pub fn submit(&mut self, request: GenerationRequest) -> Option<Ticket> {
        if self.pending.len() >= self.capacity {
            warn!(
                "[STRUCT] generation queue full ({} pending); rejecting request for '{}'",
                self.pending.len(),
                request.culture_id
            );
            return None;
        }
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.pending.push_back((ticket, request));
        Some(ticket)
    }

    /// Result for a ticket, once its request has been processed.
    pub fn result(&self, ticket: Ticket) -> Option<&Result<Uuid, VillageError>> {
        self.completed.get(&ticket)
    }

    /// Run at most one queued generation against the world. Call from
    /// the world thread; returns the finished ticket, if any.
    pub fn tick(
        &mut self,
        world: &mut dyn WorldProvider,
        store: &VillageStore,
        catalog: &StructureCatalog,
        config: &GeneratorConfig,
    ) -> Option<Ticket> {
        if self.cancel.is_cancelled() {
            while let Some((ticket, request)) = self.pending.pop_front() {
                info!(
                    "[STRUCT] dropping queued generation for '{}' (cancelled)",
                    request.culture_id
                );
                self.completed.insert(ticket, Err(VillageError::Cancelled));
            }
            return None;
        }

        let (ticket, request) = self.pending.pop_front()?;
        let placer = Placer::new(store, catalog, config);
        let outcome = placer
            .place_village(world, request.origin, &request.culture_id, request.seed, &self.cancel)
            .map(|village| village.village_id);
        self.completed.insert(ticket, outcome);
        Some(ticket)
    }
}
