pub mod fix_ledger;
pub mod insights;
pub mod refresh;
pub mod serve;
pub mod themes;
