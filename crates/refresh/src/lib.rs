pub mod coordinator;
pub mod producer;
pub mod state;

pub use coordinator::{RefreshCoordinator, RefreshError};
pub use producer::{CommandProducer, SnapshotProducer, UnconfiguredProducer};
pub use state::{RefreshOutcome, RefreshState};
