use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::status::{StatusBand, ThresholdPolicy};

/// One attendance record joined with the student, module and instructor it
/// references.
#[derive(Debug, Clone, FromRow)]
pub struct AttendanceRow {
    pub student_user_id: String,
    pub student_name: String,
    pub department: String,
    pub year: String,
    pub module_code: String,
    pub module_name: String,
    pub total_classes: Option<i32>,
    pub requirement: Option<f64>,
    pub instructor_name: Option<String>,
    pub present: Option<i32>,
    pub absent: Option<i32>,
}

/// Present/absent hours accumulated for one (student, module) pair.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub present: u64,
    pub absent: u64,
}

/// NULL or negative hour counts are treated as zero.
fn hours(value: Option<i32>) -> u64 {
    value.map_or(0, |v| u64::try_from(v).unwrap_or(0))
}

impl Tally {
    pub fn add(&mut self, present: Option<i32>, absent: Option<i32>) {
        self.present += hours(present);
        self.absent += hours(absent);
    }

    pub fn total(&self) -> u64 {
        self.present + self.absent
    }

    /// Unrounded percentage of present hours; `0.0` when nothing was recorded.
    pub fn raw_percentage(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.present as f64 / total as f64 * 100.0
    }

    pub fn percentage(&self) -> f64 {
        round_one_decimal(self.raw_percentage())
    }

    pub fn percent_label(&self) -> String {
        format!("{:.1}", self.percentage())
    }
}

pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Per-student-per-module summary returned by the reporting endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "studentId": "02230001",
    "studentName": "Karma Wangmo",
    "department": "IT",
    "year": "2nd",
    "moduleCode": "IT201",
    "moduleName": "Data Structures",
    "instructor": "Sonam Dorji",
    "totalClasses": 40,
    "present": 8,
    "absent": 2,
    "percent": "80.0",
    "status": "warning"
}))]
pub struct ModuleSummary {
    pub student_id: String,
    pub student_name: String,
    pub department: String,
    pub year: String,
    pub module_code: String,
    pub module_name: String,
    pub instructor: String,
    pub total_classes: i32,
    pub present: u64,
    pub absent: u64,
    /// Present share rounded half away from zero, rendered with one decimal.
    pub percent: String,
    /// Band of the unrounded percentage, so `89.96` renders as `"90.0"` but
    /// stays `warning`.
    pub status: StatusBand,
}

/// Exact-match predicates applied to rows before aggregation. Blank values
/// mean "no filter". A module code only narrows once it has been resolved
/// against the catalogue with [`SummaryFilter::with_known_module`].
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SummaryFilter {
    pub department: Option<String>,
    pub year: Option<String>,
    pub module_code: Option<String>,
}

fn active(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl SummaryFilter {
    /// Requested module code, trimmed; `None` when blank.
    pub fn module_code(&self) -> Option<&str> {
        active(&self.module_code)
    }

    /// Replaces the requested code with the module it resolved to. An unknown
    /// code resolves to `None` and stops filtering.
    pub fn with_known_module(mut self, resolved: Option<String>) -> Self {
        self.module_code = resolved;
        self
    }

    pub fn matches(&self, row: &AttendanceRow) -> bool {
        active(&self.department).is_none_or(|d| row.department == d)
            && active(&self.year).is_none_or(|y| row.year == y)
            && active(&self.module_code).is_none_or(|m| row.module_code == m)
    }

    pub fn apply<'a>(&'a self, rows: &'a [AttendanceRow]) -> impl Iterator<Item = &'a AttendanceRow> {
        rows.iter().filter(move |row| self.matches(row))
    }
}

/// Groups rows by (student user id, module code) and computes one summary per
/// pair, in the order each pair first appears.
pub fn summarize<'a, I>(rows: I, policy: &ThresholdPolicy) -> Vec<ModuleSummary>
where
    I: IntoIterator<Item = &'a AttendanceRow>,
{
    let mut index: HashMap<(&'a str, &'a str), usize> = HashMap::new();
    let mut groups: Vec<(&'a AttendanceRow, Tally)> = Vec::new();

    for row in rows {
        let key = (row.student_user_id.as_str(), row.module_code.as_str());
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push((row, Tally::default()));
            groups.len() - 1
        });
        groups[slot].1.add(row.present, row.absent);
    }

    groups
        .into_iter()
        .map(|(first, tally)| {
            let thresholds = policy.for_requirement(first.requirement);
            ModuleSummary {
                student_id: first.student_user_id.clone(),
                student_name: first.student_name.clone(),
                department: first.department.clone(),
                year: first.year.clone(),
                module_code: first.module_code.clone(),
                module_name: first.module_name.clone(),
                instructor: first.instructor_name.clone().unwrap_or_default(),
                total_classes: first.total_classes.unwrap_or(0),
                present: tally.present,
                absent: tally.absent,
                percent: tally.percent_label(),
                status: thresholds.classify(tally.raw_percentage()),
            }
        })
        .collect()
}

/// Number of summaries in each status band.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub good: usize,
    pub warning: usize,
    pub critical: usize,
}

impl StatusCounts {
    pub fn record(&mut self, status: StatusBand) {
        match status {
            StatusBand::Good => self.good += 1,
            StatusBand::Warning => self.warning += 1,
            StatusBand::Critical => self.critical += 1,
            StatusBand::Pending => {}
        }
    }
}

impl<'a> FromIterator<&'a StatusBand> for StatusCounts {
    fn from_iter<T: IntoIterator<Item = &'a StatusBand>>(iter: T) -> Self {
        let mut counts = StatusCounts::default();
        for status in iter {
            counts.record(*status);
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(student: &str, module: &str, present: Option<i32>, absent: Option<i32>) -> AttendanceRow {
        AttendanceRow {
            student_user_id: student.to_string(),
            student_name: format!("Student {student}"),
            department: "IT".to_string(),
            year: "2nd".to_string(),
            module_code: module.to_string(),
            module_name: format!("Module {module}"),
            total_classes: Some(40),
            requirement: Some(90.0),
            instructor_name: Some("Sonam".to_string()),
            present,
            absent,
        }
    }

    fn summarize_all(rows: &[AttendanceRow]) -> Vec<ModuleSummary> {
        summarize(rows, &ThresholdPolicy::default())
    }

    #[test]
    fn empty_input_yields_empty_summary() {
        assert!(summarize_all(&[]).is_empty());
    }

    #[test]
    fn eight_of_ten_is_warning_at_the_boundary() {
        let rows = vec![row("s1", "IT201", Some(8), Some(0)), row("s1", "IT201", Some(0), Some(2))];
        let summary = summarize_all(&rows);

        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].present, 8);
        assert_eq!(summary[0].absent, 2);
        assert_eq!(summary[0].percent, "80.0");
        assert_eq!(summary[0].status, StatusBand::Warning);
    }

    #[test]
    fn nine_of_ten_is_good_at_the_boundary() {
        let rows = vec![row("s1", "IT201", Some(9), Some(1))];
        let summary = summarize_all(&rows);

        assert_eq!(summary[0].percent, "90.0");
        assert_eq!(summary[0].status, StatusBand::Good);
    }

    #[test]
    fn zero_hours_is_zero_percent_not_nan() {
        let rows = vec![row("s1", "IT201", Some(0), Some(0))];
        let summary = summarize_all(&rows);

        assert_eq!(summary[0].percent, "0.0");
        assert_eq!(summary[0].status, StatusBand::Critical);
        assert_eq!(Tally::default().raw_percentage(), 0.0);
    }

    #[test]
    fn missing_and_negative_hours_count_as_zero() {
        let rows = vec![
            row("s1", "IT201", None, Some(2)),
            row("s1", "IT201", Some(3), None),
            row("s1", "IT201", Some(-4), Some(-1)),
        ];
        let summary = summarize_all(&rows);

        assert_eq!(summary[0].present, 3);
        assert_eq!(summary[0].absent, 2);
        assert_eq!(summary[0].percent, "60.0");
    }

    #[test]
    fn groups_by_student_and_module_in_first_seen_order() {
        let rows = vec![
            row("s2", "IT201", Some(2), Some(0)),
            row("s1", "IT201", Some(1), Some(1)),
            row("s2", "IT202", Some(0), Some(2)),
            row("s2", "IT201", Some(1), Some(0)),
        ];
        let summary = summarize_all(&rows);

        let keys: Vec<_> = summary
            .iter()
            .map(|s| (s.student_id.as_str(), s.module_code.as_str()))
            .collect();
        assert_eq!(keys, vec![("s2", "IT201"), ("s1", "IT201"), ("s2", "IT202")]);
        assert_eq!(summary[0].present, 3);
    }

    #[test]
    fn totals_are_preserved_per_pair() {
        let rows = vec![
            row("s1", "IT201", Some(2), Some(0)),
            row("s1", "IT201", Some(0), Some(3)),
            row("s1", "IT202", Some(1), Some(0)),
            row("s1", "IT201", Some(4), Some(0)),
        ];
        let summary = summarize_all(&rows);

        for s in &summary {
            let recorded: u64 = rows
                .iter()
                .filter(|r| r.student_user_id == s.student_id && r.module_code == s.module_code)
                .map(|r| hours(r.present) + hours(r.absent))
                .sum();
            assert_eq!(s.present + s.absent, recorded);
        }
    }

    #[test]
    fn percentage_is_bounded_and_has_one_decimal() {
        for (p, a) in [(0, 7), (1, 2), (2, 1), (1, 6), (5, 0), (123, 7)] {
            let tally = Tally { present: p, absent: a };
            let pct = tally.percentage();
            assert!((0.0..=100.0).contains(&pct), "{pct} out of range");
            let label = tally.percent_label();
            let decimals = label.split('.').nth(1).unwrap();
            assert_eq!(decimals.len(), 1, "{label}");
        }
        assert_eq!(Tally { present: 1, absent: 2 }.percent_label(), "33.3");
        assert_eq!(Tally { present: 2, absent: 1 }.percent_label(), "66.7");
    }

    #[test]
    fn classification_uses_module_requirement_when_enabled() {
        let mut r = row("s1", "IT201", Some(7), Some(3));
        r.requirement = Some(70.0);
        let policy = ThresholdPolicy {
            use_module_requirement: true,
            ..ThresholdPolicy::default()
        };

        let summary = summarize([&r], &policy);
        assert_eq!(summary[0].status, StatusBand::Good);

        let summary = summarize([&r], &ThresholdPolicy::default());
        assert_eq!(summary[0].status, StatusBand::Critical);
    }

    #[test]
    fn missing_instructor_renders_as_empty_name() {
        let mut r = row("s1", "IT201", Some(1), Some(0));
        r.instructor_name = None;
        r.total_classes = None;
        let summary = summarize([&r], &ThresholdPolicy::default());
        assert_eq!(summary[0].instructor, "");
        assert_eq!(summary[0].total_classes, 0);
    }

    #[test]
    fn filter_blank_values_are_ignored() {
        let rows = vec![row("s1", "IT201", Some(1), Some(0))];
        let filter = SummaryFilter {
            department: Some("  ".to_string()),
            year: Some(String::new()),
            module_code: None,
        };
        assert_eq!(filter.apply(&rows).count(), 1);
    }

    #[test]
    fn filter_narrows_rows_before_aggregation() {
        let mut other = row("s2", "SE101", Some(1), Some(0));
        other.department = "SE".to_string();
        let rows = vec![row("s1", "IT201", Some(1), Some(0)), other];

        let by_department = SummaryFilter {
            department: Some("SE".to_string()),
            ..SummaryFilter::default()
        };
        let summary = summarize(by_department.apply(&rows), &ThresholdPolicy::default());
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].student_id, "s2");

        let by_module = SummaryFilter {
            module_code: Some("IT201".to_string()),
            ..SummaryFilter::default()
        }
        .with_known_module(Some("IT201".to_string()));
        let summary = summarize(by_module.apply(&rows), &ThresholdPolicy::default());
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].module_code, "IT201");
    }

    #[test]
    fn unknown_module_code_passes_every_row_through() {
        let rows = vec![row("s1", "IT201", Some(1), Some(0)), row("s2", "IT202", Some(0), Some(1))];
        let requested = SummaryFilter {
            module_code: Some("NOPE999".to_string()),
            ..SummaryFilter::default()
        };
        assert_eq!(requested.module_code(), Some("NOPE999"));

        // the catalogue lookup found nothing
        let filter = requested.with_known_module(None);
        assert_eq!(filter.module_code(), None);
        assert_eq!(summarize(filter.apply(&rows), &ThresholdPolicy::default()).len(), 2);
    }

    #[test]
    fn rounded_percent_keeps_the_unrounded_band() {
        let tally = Tally { present: 8996, absent: 1004 };
        assert_eq!(tally.percent_label(), "90.0");
        assert_eq!(
            ThresholdPolicy::default().for_requirement(None).classify(tally.raw_percentage()),
            StatusBand::Warning
        );
    }

    #[test]
    fn status_counts_ignore_pending() {
        let counts: StatusCounts = [
            StatusBand::Good,
            StatusBand::Good,
            StatusBand::Warning,
            StatusBand::Critical,
            StatusBand::Pending,
        ]
        .iter()
        .collect();
        assert_eq!(
            counts,
            StatusCounts {
                good: 2,
                warning: 1,
                critical: 1
            }
        );
    }
}
