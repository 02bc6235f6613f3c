use serde::Serialize;

use crate::models::{AttendanceRecord, StatRecord};
use crate::stats::UserSummary;

/// Named asynchronous operations on the attendance slice. Each has a loading
/// flag and an error cell with begin / fulfill / reject transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceOp {
    Mark,
    Remove,
    FetchToday,
    FetchHistory,
    Reset,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceLoading {
    pub marking: bool,
    pub removing: bool,
    pub fetching_today: bool,
    pub fetching_history: bool,
    pub resetting: bool,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceErrors {
    pub mark: Option<String>,
    pub remove: Option<String>,
    pub fetch_today: Option<String>,
    pub fetch_history: Option<String>,
    pub reset: Option<String>,
}

/// Last-known attendance results plus per-operation flags. The UI reads this
/// back verbatim through the `attendance.state` selector.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSlice {
    pub today_date: Option<String>,
    pub today: Vec<AttendanceRecord>,
    pub history: Vec<AttendanceRecord>,
    pub loading: AttendanceLoading,
    pub errors: AttendanceErrors,
}

impl AttendanceSlice {
    fn cell(&mut self, op: AttendanceOp) -> (&mut bool, &mut Option<String>) {
        match op {
            AttendanceOp::Mark => (&mut self.loading.marking, &mut self.errors.mark),
            AttendanceOp::Remove => (&mut self.loading.removing, &mut self.errors.remove),
            AttendanceOp::FetchToday => {
                (&mut self.loading.fetching_today, &mut self.errors.fetch_today)
            }
            AttendanceOp::FetchHistory => (
                &mut self.loading.fetching_history,
                &mut self.errors.fetch_history,
            ),
            AttendanceOp::Reset => (&mut self.loading.resetting, &mut self.errors.reset),
        }
    }

    pub fn begin(&mut self, op: AttendanceOp) {
        let (flag, error) = self.cell(op);
        *flag = true;
        *error = None;
    }

    pub fn fulfill(&mut self, op: AttendanceOp) {
        let (flag, _) = self.cell(op);
        *flag = false;
    }

    pub fn reject(&mut self, op: AttendanceOp, message: impl Into<String>) {
        let (flag, error) = self.cell(op);
        *flag = false;
        *error = Some(message.into());
    }

    /// Insert-or-replace in the today list by composite key. Returns the
    /// displaced record so an optimistic update can be rolled back.
    pub fn upsert_today(&mut self, record: AttendanceRecord) -> Option<AttendanceRecord> {
        if let Some(pos) = self
            .today
            .iter()
            .position(|r| r.same_cell(&record.user_id, &record.subject_id, &record.date))
        {
            let displaced = self.today[pos].clone();
            self.today[pos] = record;
            Some(displaced)
        } else {
            self.today.push(record);
            None
        }
    }

    pub fn remove_today(&mut self, user_id: &str, subject_id: &str, date: &str) {
        self.today.retain(|r| !r.same_cell(user_id, subject_id, date));
    }

    pub fn remove_history(&mut self, user_id: &str, subject_id: &str, date: &str) {
        self.history
            .retain(|r| !r.same_cell(user_id, subject_id, date));
    }

    /// Undo an optimistic today-list mutation: drop the provisional entry and
    /// restore whatever it displaced.
    pub fn rollback_today(
        &mut self,
        user_id: &str,
        subject_id: &str,
        date: &str,
        displaced: Option<AttendanceRecord>,
    ) {
        self.remove_today(user_id, subject_id, date);
        if let Some(previous) = displaced {
            self.today.push(previous);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsOp {
    FetchAll,
    Summarize,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsLoading {
    pub fetching: bool,
    pub summarizing: bool,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsErrors {
    pub fetch: Option<String>,
    pub summarize: Option<String>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSlice {
    pub records: Vec<StatRecord>,
    pub summary: Option<UserSummary>,
    pub loading: StatsLoading,
    pub errors: StatsErrors,
}

impl StatsSlice {
    fn cell(&mut self, op: StatsOp) -> (&mut bool, &mut Option<String>) {
        match op {
            StatsOp::FetchAll => (&mut self.loading.fetching, &mut self.errors.fetch),
            StatsOp::Summarize => (&mut self.loading.summarizing, &mut self.errors.summarize),
        }
    }

    pub fn begin(&mut self, op: StatsOp) {
        let (flag, error) = self.cell(op);
        *flag = true;
        *error = None;
    }

    pub fn fulfill(&mut self, op: StatsOp) {
        let (flag, _) = self.cell(op);
        *flag = false;
    }

    pub fn reject(&mut self, op: StatsOp, message: impl Into<String>) {
        let (flag, error) = self.cell(op);
        *flag = false;
        *error = Some(message.into());
    }
}
