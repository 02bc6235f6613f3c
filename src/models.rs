use serde::{Deserialize, Serialize};

/// Day status for one attendance cell. "Off" days (holidays, cancelled
/// classes) are recorded but never count toward the percentage denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Off,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Off => "off",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "present" => Some(AttendanceStatus::Present),
            "absent" => Some(AttendanceStatus::Absent),
            "off" => Some(AttendanceStatus::Off),
            _ => None,
        }
    }
}

/// One persisted attendance cell. Unique per (user_id, subject_id, date);
/// marking the same cell again updates the status in place.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: String,
    pub user_id: String,
    pub subject_id: String,
    pub date: String,
    pub status: AttendanceStatus,
    pub marked_at: String,
}

impl AttendanceRecord {
    /// Composite identity used for upsert reconciliation in cached lists.
    pub fn same_cell(&self, user_id: &str, subject_id: &str, date: &str) -> bool {
        self.user_id == user_id && self.subject_id == subject_id && self.date == date
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub professor_name: String,
}

/// One row of the derived `attendance_stats` view: per-user per-subject day
/// counts and the store-computed percentage.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatRecord {
    pub user_id: String,
    pub subject_id: String,
    pub subject_name: String,
    pub professor_name: String,
    pub present_days: i64,
    pub absent_days: i64,
    pub off_days: i64,
    pub total_days: i64,
    pub attendance_percentage: f64,
}
