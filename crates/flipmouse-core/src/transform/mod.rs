// FlipMouse Transform Layer
// Toggle timing and per-event classification

pub mod classifier;
pub mod toggle;

pub use classifier::{Classification, Classifier, PendingAction};
pub use toggle::{ToggleHold, ToggleRelease, ToggleTimer};
