pub mod model;
pub mod status;

pub use model::{Deck, Flow};
pub use status::{DeckStatus, SharedStatus};
