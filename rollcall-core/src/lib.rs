//! Entity registry, frame buffers and render surface for the roster's
//! bouncing-ball panel.

pub mod body;
pub mod color;
pub mod frame;
pub mod registry;
pub mod render;
pub mod surface;

/// Stable identifier of a roster record, assigned by the record store.
pub type EntityId = u32;

pub use body::{Body, BodyState, SpawnRegion};
pub use color::{Rgb, Rgba};
pub use frame::{BodyView, Frame, FrameBuffer, FramePublisher};
pub use registry::{IdList, ReconcileOutcome, Registry};
pub use render::{Canvas, DrawCommand, DrawList, RenderSurface, Rendered, DEFAULT_RADIUS};
pub use surface::{Bounds, SurfaceSize, DEFAULT_MIN_EXTENT};
