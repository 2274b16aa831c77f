use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, info, warn};
use rollcall_core::{Registry, SurfaceSize, DEFAULT_MIN_EXTENT, DEFAULT_RADIUS};

use crate::physics;
use crate::redraw::RedrawSender;

/// Registry shared between the host and the scheduler thread.
pub type SharedRegistry = Arc<Mutex<Registry>>;

/// Timing and geometry of the simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulatorSettings {
    /// Fixed period between two ticks.
    pub tick: Duration,
    pub radius: f32,
    /// Extent substituted for a surface axis that is zero or too small.
    pub min_extent: f32,
    /// Body count from which a tick steps bodies on the rayon pool.
    pub parallel_threshold: usize,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(16),
            radius: DEFAULT_RADIUS,
            min_extent: DEFAULT_MIN_EXTENT,
            parallel_threshold: 512,
        }
    }
}

#[derive(Debug)]
enum Control {
    Stop,
}

/// Single thread driving every body with a fixed timestep.
pub struct Simulator {
    settings: SimulatorSettings,
    registry: SharedRegistry,
    surface: SurfaceSize,
    redraw: RedrawSender,
}

impl Simulator {
    pub fn new(
        settings: SimulatorSettings,
        registry: SharedRegistry,
        surface: SurfaceSize,
        redraw: RedrawSender,
    ) -> Self {
        Self { settings, registry, surface, redraw }
    }

    /// Starts the scheduler thread.
    pub fn spawn(self) -> io::Result<SimulatorHandle> {
        let (control_tx, control_rx) = bounded(1);
        let thread = thread::Builder::new()
            .name("ball-scheduler".to_string())
            .spawn(move || self.run(control_rx))?;
        Ok(SimulatorHandle {
            control: control_tx,
            thread: Some(thread),
        })
    }

    /// Steps every running body once, publishes the frame and requests a
    /// redraw. Returns the tick number just published.
    pub fn tick_once(&self) -> u64 {
        let bounds = self.surface.bounds().effective(self.settings.min_extent);
        let radius = self.settings.radius;

        let tick = {
            let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
            if registry.len() >= self.settings.parallel_threshold {
                registry.par_for_each_running_mut(|body| {
                    physics::step(body, bounds, radius);
                });
            } else {
                registry.for_each_running_mut(|body| {
                    physics::step(body, bounds, radius);
                });
            }
            registry.finish_tick()
        };

        self.redraw.request();
        tick
    }

    fn run(self, control: Receiver<Control>) {
        info!("Scheduler started with a {:?} tick", self.settings.tick);
        let period = self.settings.tick;

        loop {
            let started = Instant::now();
            let tick = self.tick_once();

            let elapsed = started.elapsed();
            if elapsed > period {
                warn!(
                    "Tick {} overran its budget: {:?} > {:?}",
                    tick, elapsed, period
                );
            }

            // The wait doubles as the tick sleep; a stop request cuts it short.
            match control.recv_timeout(period.saturating_sub(elapsed)) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(Control::Stop) => {
                    debug!("Scheduler received stop after tick {}", tick);
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("Scheduler handle dropped after tick {}", tick);
                    break;
                }
            }
        }
        info!("Scheduler stopped");
    }
}

/// Owner's handle on the scheduler thread.
pub struct SimulatorHandle {
    control: Sender<Control>,
    thread: Option<JoinHandle<()>>,
}

impl SimulatorHandle {
    /// Signals the scheduler to stop. Does not wait for it to exit.
    pub fn stop(&self) {
        // A full channel already carries a stop; a closed one means the
        // thread is gone.
        let _ = self.control.try_send(Control::Stop);
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stops the scheduler and waits for the thread to exit.
    pub fn join(mut self) -> thread::Result<()> {
        self.stop();
        match self.thread.take() {
            Some(thread) => thread.join(),
            None => Ok(()),
        }
    }
}

impl Drop for SimulatorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redraw::{redraw_channel, RedrawWait};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rollcall_core::{FrameBuffer, SpawnRegion};

    fn shared(frames: &FrameBuffer) -> SharedRegistry {
        Arc::new(Mutex::new(Registry::with_rng(
            SpawnRegion::default(),
            frames,
            StdRng::seed_from_u64(5),
        )))
    }

    fn settings() -> SimulatorSettings {
        SimulatorSettings {
            tick: Duration::from_millis(2),
            ..SimulatorSettings::default()
        }
    }

    #[test]
    fn tick_moves_bodies_and_requests_redraw() {
        let frames = FrameBuffer::new();
        let registry = shared(&frames);
        registry.lock().unwrap().reconcile([1, 2]);
        let before = frames.latest();
        let (tx, rx) = redraw_channel();

        let simulator = Simulator::new(settings(), registry, SurfaceSize::new(320, 200), tx);
        assert_eq!(simulator.tick_once(), 1);

        let after = frames.latest();
        assert_eq!(after.tick, 1);
        for (a, b) in before.bodies.iter().zip(&after.bodies) {
            assert_eq!(a.id, b.id);
            assert_ne!(a.position, b.position);
        }
        assert!(rx.try_take());
    }

    #[test]
    fn parallel_path_keeps_bodies_inside() {
        let frames = FrameBuffer::new();
        let registry = shared(&frames);
        registry.lock().unwrap().reconcile(0..100);
        let (tx, _rx) = redraw_channel();
        let settings = SimulatorSettings {
            parallel_threshold: 10,
            ..settings()
        };
        let radius = settings.radius;

        let simulator = Simulator::new(settings, registry, SurfaceSize::new(250, 210), tx);
        for _ in 0..300 {
            simulator.tick_once();
        }

        let frame = frames.latest();
        assert_eq!(frame.bodies.len(), 100);
        for body in &frame.bodies {
            assert!(body.position.x >= radius && body.position.x <= 250.0 - radius);
            assert!(body.position.y >= radius && body.position.y <= 210.0 - radius);
        }
    }

    #[test]
    fn zero_sized_surface_falls_back_to_minimum() {
        let frames = FrameBuffer::new();
        let registry = shared(&frames);
        registry.lock().unwrap().reconcile([1]);
        let (tx, _rx) = redraw_channel();

        let simulator = Simulator::new(settings(), registry, SurfaceSize::default(), tx);
        for _ in 0..100 {
            simulator.tick_once();
        }

        let body = frames.latest().bodies[0];
        assert!(body.position.x <= DEFAULT_MIN_EXTENT - DEFAULT_RADIUS);
        assert!(body.position.y <= DEFAULT_MIN_EXTENT - DEFAULT_RADIUS);
    }

    #[test]
    fn thread_ticks_until_stopped() {
        let frames = FrameBuffer::new();
        let registry = shared(&frames);
        registry.lock().unwrap().reconcile([1]);
        let (tx, rx) = redraw_channel();

        let handle = Simulator::new(settings(), registry, SurfaceSize::new(320, 200), tx)
            .spawn()
            .expect("spawn scheduler");
        assert_eq!(rx.wait_timeout(Duration::from_secs(2)), RedrawWait::Requested);
        assert_eq!(rx.wait_timeout(Duration::from_secs(2)), RedrawWait::Requested);

        handle.join().expect("scheduler should exit cleanly");
        let last = frames.latest().tick;
        assert!(last >= 2);

        // The sender died with the thread.
        while rx.try_take() {}
        assert_eq!(rx.wait_timeout(Duration::from_millis(20)), RedrawWait::Closed);
    }

    #[test]
    fn stop_does_not_block() {
        let frames = FrameBuffer::new();
        let (tx, _rx) = redraw_channel();
        let handle = Simulator::new(
            SimulatorSettings {
                tick: Duration::from_secs(60),
                ..SimulatorSettings::default()
            },
            shared(&frames),
            SurfaceSize::new(320, 200),
            tx,
        )
        .spawn()
        .expect("spawn scheduler");

        let started = Instant::now();
        handle.stop();
        handle.stop();
        assert!(started.elapsed() < Duration::from_secs(1));

        // Stop interrupts the one-minute sleep.
        handle.join().expect("scheduler should exit cleanly");
        assert!(started.elapsed() < Duration::from_secs(30));
    }
}
