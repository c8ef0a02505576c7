use serde::{Deserialize, Serialize};

/// One KPI observation for one employee in one reporting period.
///
/// Numeric fields are best-effort coerced at import time and default to 0
/// when unparsable; nothing enforces the nominal 0-100 range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiRecord {
    pub name: String,
    pub employee_id: String,
    /// Date of joining, kept as an opaque string (no calendar logic).
    pub date_of_joining: String,
    /// Period label (usually a month name); blank when the source had none.
    pub period: String,
    pub productivity: f64,
    pub quality: f64,
    pub attendance: f64,
    pub late_count: f64,
    pub total_points: f64,
    pub final_points: f64,
}

impl KpiRecord {
    /// Value used when sorting by a numeric field. `Name` has no numeric
    /// projection and is handled separately by the leaderboard sort.
    pub fn metric(&self, field: SortField) -> f64 {
        match field {
            SortField::Name => 0.0,
            SortField::Productivity => self.productivity,
            SortField::Quality => self.quality,
            SortField::Attendance => self.attendance,
            SortField::Late => self.late_count,
            SortField::TotalPoints => self.total_points,
            SortField::FinalPoints => self.final_points,
        }
    }

    /// First whitespace-delimited token of the name, used as a compact
    /// chart label.
    pub fn short_label(&self) -> String {
        self.name
            .split_whitespace()
            .next()
            .unwrap_or(self.name.as_str())
            .to_string()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Name,
    Productivity,
    Quality,
    Attendance,
    Late,
    TotalPoints,
    FinalPoints,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Name => "name",
            SortField::Productivity => "productivity",
            SortField::Quality => "quality",
            SortField::Attendance => "attendance",
            SortField::Late => "late",
            SortField::TotalPoints => "totalPoints",
            SortField::FinalPoints => "finalPoints",
        }
    }
}

impl Default for SortField {
    fn default() -> Self {
        SortField::FinalPoints
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl Default for SortDirection {
    fn default() -> Self {
        SortDirection::Desc
    }
}

/// Bundled demo dataset: ten employees for January, the first five carrying
/// over into February.
pub fn sample_records() -> Vec<KpiRecord> {
    const ROWS: [(&str, &str, &str, &str, f64, f64, f64, f64, f64, f64); 15] = [
        ("Ananya Sharma", "EMP001", "2022-01-15", "January", 95.0, 92.0, 98.0, 1.0, 285.0, 94.0),
        ("Rajesh Kumar", "EMP002", "2021-06-20", "January", 88.0, 90.0, 95.0, 2.0, 273.0, 89.0),
        ("Priya Patel", "EMP003", "2023-03-10", "January", 92.0, 88.0, 100.0, 0.0, 280.0, 92.0),
        ("Vikram Singh", "EMP004", "2020-11-05", "January", 78.0, 82.0, 88.0, 5.0, 248.0, 76.0),
        ("Meera Reddy", "EMP005", "2022-08-25", "January", 91.0, 94.0, 96.0, 1.0, 281.0, 93.0),
        ("Arjun Nair", "EMP006", "2021-02-14", "January", 85.0, 86.0, 92.0, 3.0, 263.0, 85.0),
        ("Deepika Joshi", "EMP007", "2023-07-01", "January", 82.0, 80.0, 90.0, 4.0, 252.0, 79.0),
        ("Karthik Iyer", "EMP008", "2022-04-18", "January", 90.0, 91.0, 97.0, 1.0, 278.0, 91.0),
        ("Sneha Gupta", "EMP009", "2021-09-30", "January", 75.0, 78.0, 85.0, 6.0, 238.0, 72.0),
        ("Rohit Verma", "EMP010", "2020-05-12", "January", 87.0, 85.0, 93.0, 2.0, 265.0, 86.0),
        ("Ananya Sharma", "EMP001", "2022-01-15", "February", 93.0, 94.0, 97.0, 1.0, 284.0, 93.0),
        ("Rajesh Kumar", "EMP002", "2021-06-20", "February", 90.0, 88.0, 96.0, 2.0, 274.0, 90.0),
        ("Priya Patel", "EMP003", "2023-03-10", "February", 94.0, 90.0, 99.0, 0.0, 283.0, 93.0),
        ("Vikram Singh", "EMP004", "2020-11-05", "February", 80.0, 84.0, 90.0, 4.0, 254.0, 79.0),
        ("Meera Reddy", "EMP005", "2022-08-25", "February", 93.0, 95.0, 98.0, 0.0, 286.0, 95.0),
    ];

    ROWS.iter()
        .map(
            |&(name, id, doj, period, productivity, quality, attendance, late, total, fin)| {
                KpiRecord {
                    name: name.to_string(),
                    employee_id: id.to_string(),
                    date_of_joining: doj.to_string(),
                    period: period.to_string(),
                    productivity,
                    quality,
                    attendance,
                    late_count: late,
                    total_points: total,
                    final_points: fin,
                }
            },
        )
        .collect()
}
