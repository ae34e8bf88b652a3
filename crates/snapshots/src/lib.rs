pub mod columns;
pub mod insights;
pub mod rank;
pub mod row;
pub mod store;

pub use columns::{Column, ColumnMap};
pub use insights::{InsightsSummary, ThemeHistoryEntry};
pub use rank::{rank_themes, PreviewSort, RankedTheme};
pub use row::InstrumentRow;
pub use store::SnapshotStore;
