use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rollcall_core::{
    EntityId, FrameBuffer, ReconcileOutcome, Registry, RenderSurface, SpawnRegion, SurfaceSize,
};

use crate::redraw::{redraw_channel, RedrawReceiver};
use crate::scheduler::{SharedRegistry, Simulator, SimulatorHandle, SimulatorSettings};

/// Everything needed to start the ball panel.
#[derive(Clone, Debug, Default)]
pub struct AnimationSettings {
    pub simulator: SimulatorSettings,
    pub spawn: SpawnRegion,
    /// Seed for spawn positions; `None` draws from OS entropy.
    pub seed: Option<u64>,
}

/// The ball panel: registry, scheduler and render surface wired together.
///
/// All methods take `&self` and may be called from any thread while the
/// scheduler runs.
pub struct Animation {
    registry: SharedRegistry,
    render: RenderSurface,
    scheduler: Option<SimulatorHandle>,
}

impl Animation {
    /// Starts the scheduler. The returned receiver yields redraw requests.
    pub fn start(
        settings: AnimationSettings,
        surface: SurfaceSize,
    ) -> io::Result<(Self, RedrawReceiver)> {
        let frames = FrameBuffer::new();
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let registry = Arc::new(Mutex::new(Registry::with_rng(settings.spawn, &frames, rng)));
        let (redraw_tx, redraw_rx) = redraw_channel();

        let render = RenderSurface::new(surface.clone(), frames, settings.simulator.radius);
        let scheduler = Simulator::new(
            settings.simulator,
            Arc::clone(&registry),
            surface,
            redraw_tx,
        )
        .spawn()?;

        let animation = Self {
            registry,
            render,
            scheduler: Some(scheduler),
        };
        Ok((animation, redraw_rx))
    }

    /// Applies a full id snapshot.
    pub fn reconcile<I>(&self, ids: I) -> ReconcileOutcome
    where
        I: IntoIterator<Item = EntityId>,
    {
        self.registry().reconcile(ids)
    }

    pub fn add_one(&self, id: EntityId) -> bool {
        self.registry().add_one(id)
    }

    pub fn remove_one(&self, id: EntityId) -> bool {
        self.registry().remove_one(id).is_some()
    }

    /// Stops every body and signals the scheduler to exit. Never waits for
    /// the scheduler thread.
    pub fn stop_all(&self) -> usize {
        let stopped = self.registry().stop_all();
        if let Some(scheduler) = &self.scheduler {
            scheduler.stop();
        }
        info!("Animation stopped ({} bodies)", stopped);
        stopped
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.registry().ids()
    }

    pub fn len(&self) -> usize {
        self.registry().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry().is_empty()
    }

    pub fn render_surface(&self) -> &RenderSurface {
        &self.render
    }

    pub fn surface(&self) -> &SurfaceSize {
        self.render.size()
    }

    /// Stops everything and waits for the scheduler thread to exit.
    pub fn join(mut self) -> thread::Result<()> {
        self.stop_all();
        match self.scheduler.take() {
            Some(handle) => handle.join(),
            None => Ok(()),
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Animation {
    fn drop(&mut self) {
        if let Some(scheduler) = &self.scheduler {
            scheduler.stop();
        }
    }
}
