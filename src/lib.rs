//! vitalita - Workout history analytics and adaptive journal rendering
//!
//! Vitalità: a personal training log where every session counts

pub mod history;
pub mod session;
pub mod store;
pub mod window;

pub use history::{ExerciseHistory, TemplateFilter};
pub use session::WorkoutSession;
pub use store::{KeyValueStore, MemoryStore, SqliteStore};
pub use window::{WindowConfig, WindowTuner};
