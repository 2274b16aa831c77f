use std::collections::{HashMap, HashSet};

use log::{debug, trace};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use smallvec::SmallVec;

use crate::body::{Body, SpawnRegion};
use crate::frame::{FrameBuffer, FramePublisher};
use crate::EntityId;

pub type IdList = SmallVec<[EntityId; 8]>;

/// Ids whose bodies were started and stopped by one registry operation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub started: IdList,
    pub stopped: IdList,
}

impl ReconcileOutcome {
    pub fn is_empty(&self) -> bool {
        self.started.is_empty() && self.stopped.is_empty()
    }
}

/// Arena of bodies keyed by entity id.
///
/// Bodies live in a slot vector so the scheduler can step them without
/// hashing; `index` maps ids to slots and freed slots are reused. Every
/// mutation republishes the frame so the render path never shows a body
/// that has already been removed.
pub struct Registry {
    slots: Vec<Option<Body>>,
    index: HashMap<EntityId, usize>,
    free: Vec<usize>,
    region: SpawnRegion,
    rng: StdRng,
    publisher: FramePublisher,
    tick: u64,
}

impl Registry {
    pub fn new(region: SpawnRegion, frames: &FrameBuffer) -> Self {
        Self::with_rng(region, frames, StdRng::from_entropy())
    }

    pub fn with_rng(region: SpawnRegion, frames: &FrameBuffer, rng: StdRng) -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
            free: Vec::new(),
            region,
            rng,
            publisher: frames.publisher(),
            tick: 0,
        }
    }

    /// Makes the set of live ids equal to `ids`.
    ///
    /// Bodies whose id is missing from `ids` are stopped and dropped; ids
    /// without a body get a freshly spawned one. Calling this twice with the
    /// same set leaves the second outcome empty.
    pub fn reconcile<I>(&mut self, ids: I) -> ReconcileOutcome
    where
        I: IntoIterator<Item = EntityId>,
    {
        let wanted: HashSet<EntityId> = ids.into_iter().collect();

        let mut stopped: IdList = self
            .index
            .keys()
            .filter(|id| !wanted.contains(id))
            .copied()
            .collect();
        stopped.sort_unstable();
        for &id in &stopped {
            self.detach(id);
        }

        let mut started: IdList = wanted
            .iter()
            .filter(|id| !self.index.contains_key(id))
            .copied()
            .collect();
        started.sort_unstable();
        for &id in &started {
            self.attach(id);
        }

        let outcome = ReconcileOutcome { started, stopped };
        if !outcome.is_empty() {
            debug!(
                "Reconciled registry: {} started, {} stopped, {} live",
                outcome.started.len(),
                outcome.stopped.len(),
                self.len()
            );
            self.republish();
        }
        outcome
    }

    /// Starts a body for `id` unless one is already live.
    pub fn add_one(&mut self, id: EntityId) -> bool {
        if self.index.contains_key(&id) {
            return false;
        }
        self.attach(id);
        self.republish();
        true
    }

    /// Stops and removes the body for `id`, returning it.
    pub fn remove_one(&mut self, id: EntityId) -> Option<Body> {
        let body = self.detach(id)?;
        self.republish();
        Some(body)
    }

    /// Stops every body and empties the arena. Returns how many were live.
    pub fn stop_all(&mut self) -> usize {
        let count = self.index.len();
        for slot in &mut self.slots {
            if let Some(body) = slot.as_mut() {
                body.stop();
            }
        }
        self.slots.clear();
        self.index.clear();
        self.free.clear();
        self.republish();
        debug!("Stopped all {} bodies", count);
        count
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Body> {
        self.index
            .get(&id)
            .and_then(|&slot| self.slots[slot].as_ref())
    }

    /// Live ids in ascending order.
    pub fn ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.index.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn iter(&self) -> impl Iterator<Item = &Body> {
        self.slots.iter().flatten()
    }

    pub fn for_each_running_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut Body),
    {
        self.slots
            .iter_mut()
            .flatten()
            .filter(|body| body.is_running())
            .for_each(|body| f(body));
    }

    pub fn par_for_each_running_mut<F>(&mut self, f: F)
    where
        F: Fn(&mut Body) + Send + Sync,
    {
        self.slots
            .par_iter_mut()
            .filter_map(|slot| slot.as_mut())
            .filter(|body| body.is_running())
            .for_each(f);
    }

    /// Closes the current tick: bumps the counter and publishes a frame.
    pub fn finish_tick(&mut self) -> u64 {
        self.tick += 1;
        self.republish();
        self.tick
    }

    fn republish(&mut self) {
        let bodies = self.slots.iter().flatten().filter(|body| body.is_running());
        self.publisher.publish(self.tick, bodies);
    }

    fn attach(&mut self, id: EntityId) {
        let body = Body::spawn(id, &self.region, &mut self.rng);
        trace!("Starting body {} at {:?}", id, body.position);
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(body);
                slot
            }
            None => {
                self.slots.push(Some(body));
                self.slots.len() - 1
            }
        };
        self.index.insert(id, slot);
    }

    fn detach(&mut self, id: EntityId) -> Option<Body> {
        let slot = self.index.remove(&id)?;
        let mut body = self.slots[slot].take()?;
        self.free.push(slot);
        body.stop();
        trace!("Stopped body {}", id);
        Some(body)
    }
}
