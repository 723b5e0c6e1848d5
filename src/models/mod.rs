pub mod catalog;
pub mod discovery;
pub mod session;

pub use catalog::{BingoItem, Catalog, CatalogError, DEFAULT_ITEMS};
pub use discovery::Discovery;
pub use session::{FinishReason, GameResult, SessionPhase, SessionSnapshot, SessionSummary};
