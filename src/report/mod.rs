//! Attendance aggregation: per-student-per-module totals, percentages and
//! status bands. Everything here is pure and synchronous; handlers fetch the
//! rows and hand them in.

pub mod aggregate;
pub mod status;

pub use aggregate::{AttendanceRow, ModuleSummary, StatusCounts, SummaryFilter, Tally, summarize};
pub use status::{StatusBand, ThresholdPolicy, Thresholds};

/// Status shown on a module roster: `pending` until any hours are recorded.
pub fn roster_status(tally: &Tally, thresholds: &Thresholds) -> StatusBand {
    if tally.total() == 0 {
        StatusBand::Pending
    } else {
        thresholds.classify(tally.raw_percentage())
    }
}
