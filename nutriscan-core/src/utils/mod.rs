pub mod logbook;

pub use logbook::{emit_event, read_events};
