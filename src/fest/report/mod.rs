mod analytics;
mod standings;
pub mod views;

pub use analytics::compute_event_analytics;
pub use standings::compute_standings;
pub use views::{
    AtLimitStudent, CapacityState, EventOccupancy, EventTally, FestAnalytics, Standings,
    StandingsRow, YearOccupancy,
};
