pub mod config;
pub mod data;
pub mod error;
pub mod layout;
pub mod logging;
pub mod render;
pub mod session;
pub mod source;

pub use data::conflict::{Conflict, Entropy, SeededEntropy};
pub use data::ingest::{ingest, load, IngestOutcome, IngestReport};
pub use session::{SelectionState, SessionController};
