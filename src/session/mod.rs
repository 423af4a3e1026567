pub mod controller;
pub mod state;

pub use controller::SessionController;
pub use state::{apply_event, ArmTimer, Phase, SelectionState, SessionEvent};
