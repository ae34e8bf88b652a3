pub mod calendar;
pub mod joiner;

pub use calendar::{ForwardWindow, TradingCalendar};
pub use joiner::ForwardReturnJoiner;
