//! Host loop: feeds record events into the ball panel and ships rendered
//! frames whenever the scheduler asks for a redraw.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use hdrhistogram::Histogram;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rollcall_core::{DrawList, EntityId};
use rollcall_simulation::{Animation, RedrawReceiver, RedrawWait};
use rollcall_transport::{RenderedFrame, TransportController, TransportError};
use thiserror::Error;

use crate::records::{RecordEvent, RecordService, StoreError, Student};

const NAMES: &[&str] = &["Ana", "Budi", "Citra", "Dewi", "Eko", "Fajar", "Gita", "Hadi"];

/// How long the loop waits for a redraw before checking for shutdown.
const IDLE_WAIT: Duration = Duration::from_millis(50);

#[derive(Error, Debug)]
pub enum AppError {
    #[error("transport failed: {0}")]
    Transport(#[from] TransportError),

    #[error("record service failed: {0}")]
    Store(#[from] StoreError),

    #[error("statistics setup failed: {0}")]
    Stats(String),
}

#[derive(Clone, Debug)]
pub struct AppSettings {
    pub max_fps: u32,
    pub log_frequency: Option<u32>,
    pub churn_interval: Option<Duration>,
    /// Churn tries to keep the roster around this size.
    pub target_records: usize,
    pub seed: Option<u64>,
}

/// What a finished run did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_rendered: u64,
    pub frames_sent: u64,
    pub record_events: u64,
    pub final_ids: Vec<EntityId>,
}

pub struct App {
    animation: Animation,
    redraw: RedrawReceiver,
    records: RecordService,
    events: Receiver<RecordEvent>,
    transport: TransportController,
    settings: AppSettings,
    rng: StdRng,
    known: Vec<EntityId>,
    list: DrawList,
    latency: Histogram<u64>,
    summary: RunSummary,
}

impl App {
    pub fn new(
        animation: Animation,
        redraw: RedrawReceiver,
        records: RecordService,
        events: Receiver<RecordEvent>,
        transport: TransportController,
        settings: AppSettings,
    ) -> Result<Self, AppError> {
        let latency = Histogram::new_with_bounds(1, 60_000_000, 3)
            .map_err(|e| AppError::Stats(e.to_string()))?;
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            animation,
            redraw,
            records,
            events,
            transport,
            settings,
            rng,
            known: Vec::new(),
            list: DrawList::new(),
            latency,
            summary: RunSummary {
                frames_rendered: 0,
                frames_sent: 0,
                record_events: 0,
                final_ids: Vec::new(),
            },
        })
    }

    /// Runs until `shutdown` is raised, `deadline` passes or the scheduler
    /// goes away, then tears everything down.
    pub fn run(mut self, shutdown: &AtomicBool, deadline: Option<Instant>) -> Result<RunSummary, AppError> {
        self.records.load()?;

        let frame_budget = Duration::from_secs_f64(1.0 / f64::from(self.settings.max_fps));
        let mut next_churn = self.settings.churn_interval.map(|every| Instant::now() + every);
        let mut last_render: Option<Instant> = None;

        let result = loop {
            if shutdown.load(Ordering::Relaxed) {
                info!("Shutdown requested");
                break Ok(());
            }
            if deadline.map_or(false, |d| Instant::now() >= d) {
                info!("Run duration elapsed");
                break Ok(());
            }

            if let Err(e) = self.drain_events() {
                break Err(e);
            }

            if let (Some(due), Some(every)) = (next_churn, self.settings.churn_interval) {
                if Instant::now() >= due {
                    if let Err(e) = self.churn() {
                        break Err(e);
                    }
                    next_churn = Some(due + every);
                }
            }

            match self.redraw.wait_timeout(IDLE_WAIT) {
                RedrawWait::Requested => {}
                RedrawWait::TimedOut => continue,
                RedrawWait::Closed => {
                    warn!("Scheduler went away; stopping host loop");
                    break Ok(());
                }
            }

            // Cap the render rate; requests arriving meanwhile coalesce.
            if let Some(last) = last_render {
                let since = last.elapsed();
                if since < frame_budget {
                    spin_sleep::sleep(frame_budget - since);
                }
            }
            last_render = Some(Instant::now());

            if let Err(e) = self.render_frame() {
                break Err(e);
            }
        };

        self.shutdown();
        result.map(|()| self.summary.clone())
    }

    /// Applies one record event to the ball panel.
    pub fn apply(&mut self, event: RecordEvent) -> Result<(), AppError> {
        self.summary.record_events += 1;
        match event {
            RecordEvent::Loaded(list) => {
                self.known = list.iter().map(|s| s.id).collect();
                let outcome = self.animation.reconcile(self.known.iter().copied());
                debug!(
                    "Loaded {} records ({} balls started, {} stopped)",
                    list.len(),
                    outcome.started.len(),
                    outcome.stopped.len()
                );
            }
            RecordEvent::Inserted(student) => {
                info!("Inserted record {} ({}, {})", student.id, student.name, student.age);
                if !self.known.contains(&student.id) {
                    self.known.push(student.id);
                }
                self.animation.add_one(student.id);
                self.records.load()?;
            }
            RecordEvent::Updated { id, rows } => {
                debug!("Updated record {} ({} rows)", id, rows);
                self.records.load()?;
            }
            RecordEvent::Deleted { id, rows } => {
                info!("Deleted record {} ({} rows)", id, rows);
                self.known.retain(|&known| known != id);
                self.animation.remove_one(id);
                self.records.load()?;
            }
            RecordEvent::Failed { op, error } => {
                warn!("Record {} failed: {}", op, error);
            }
        }
        Ok(())
    }

    fn drain_events(&mut self) -> Result<(), AppError> {
        while let Ok(event) = self.events.try_recv() {
            self.apply(event)?;
        }
        Ok(())
    }

    /// Inserts, edits or deletes one random record so the roster keeps changing.
    fn churn(&mut self) -> Result<(), AppError> {
        let grow = self.known.len() < self.settings.target_records / 2
            || (self.known.len() < self.settings.target_records * 2 && self.rng.gen_bool(0.5));

        let name = NAMES.choose(&mut self.rng).copied().unwrap_or("Student");
        let age = self.rng.gen_range(17..30);
        if grow {
            self.records.add(name, age)?;
        } else if let Some(&id) = self.known.choose(&mut self.rng) {
            if self.rng.gen_bool(0.25) {
                let student = Student { id, name: name.to_string(), age };
                self.records.update(student)?;
            } else {
                self.records.delete(id)?;
            }
        }
        Ok(())
    }

    fn render_frame(&mut self) -> Result<(), AppError> {
        let started = Instant::now();

        self.list.reset();
        let rendered = self.animation.render_surface().render(&mut self.list);
        self.summary.frames_rendered += 1;

        let frame = RenderedFrame {
            sequence: self.summary.frames_rendered,
            tick: rendered.tick,
            bodies: rendered.bodies,
            commands: &self.list.commands,
        };
        if self.transport.send_frame(&frame)? {
            self.summary.frames_sent += 1;
        }

        let micros = started.elapsed().as_micros().min(u128::from(u64::MAX)) as u64;
        self.latency.saturating_record(micros.max(1));

        if let Some(every) = self.settings.log_frequency {
            if every > 0 && self.summary.frames_rendered % u64::from(every) == 0 {
                debug!(
                    "Frame {}: {} balls, tick {}, clients {:?}",
                    self.summary.frames_rendered,
                    rendered.bodies,
                    rendered.tick,
                    self.transport.client_count()
                );
            }
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        self.summary.final_ids = self.animation.ids();
        self.animation.stop_all();
        self.records.close();
        if let Err(e) = self.transport.flush() {
            warn!("Failed to flush transport: {}", e);
        }

        if self.latency.len() > 0 {
            info!(
                "Rendered {} frames (sent {}): p50 {}us, p99 {}us, max {}us",
                self.summary.frames_rendered,
                self.summary.frames_sent,
                self.latency.value_at_quantile(0.5),
                self.latency.value_at_quantile(0.99),
                self.latency.max()
            );
        }
    }
}
