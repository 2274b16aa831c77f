//! Body simulator for the ball panel: per-tick physics and the single
//! fixed-timestep scheduler thread that drives every body.

pub mod animation;
pub mod physics;
pub mod redraw;
pub mod scheduler;

pub use animation::{Animation, AnimationSettings};
pub use physics::{step, Bounce};
pub use redraw::{redraw_channel, RedrawReceiver, RedrawSender, RedrawWait};
pub use scheduler::{SharedRegistry, Simulator, SimulatorHandle, SimulatorSettings};
