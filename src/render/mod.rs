//! Frame-driven hosting of a lab: a shared session handle, the per-frame pollable that
//! advances it, and the small helpers a renderer needs to draw it.

mod color;
mod session;
mod trail;

pub use color::{blend, ghost_color, glow_color, hsl_to_rgb, Rgb, ACCENT, BACKGROUND, GHOST};
pub use session::LabSession;
pub use trail::WaveTrail;

/// The result of polling a frame-driven task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollableState {
    /// Nothing changed since the last poll.
    Unmodified,

    /// The state changed and should be redrawn.
    Modified,

    /// The task finished. Reported once.
    Done,
}

/// Something that is polled once per frame by a render loop.
pub trait Pollable: Send + 'static {
    fn poll(&mut self) -> PollableState;
}
