pub mod patch;
pub mod reconciler;
