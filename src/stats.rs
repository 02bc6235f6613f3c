use serde::Serialize;
use std::collections::HashMap;

use crate::models::StatRecord;

/// Percentage from raw day counts. Off days are excluded before this is
/// called, so the denominator is present + absent only.
pub fn fallback_percentage(present_days: i64, absent_days: i64) -> f64 {
    let valid = present_days + absent_days;
    if valid <= 0 {
        return 0.0;
    }
    round2(present_days as f64 * 100.0 / valid as f64)
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Smallest number of additional attended classes that lifts the percentage
/// to `target`. Never negative. A target of 100 with any absence on record is
/// unreachable and saturates.
pub fn classes_needed(present_days: i64, absent_days: i64, target: f64) -> i64 {
    let present = present_days.max(0) as f64;
    let valid = present + absent_days.max(0) as f64;
    if valid > 0.0 && present * 100.0 / valid >= target {
        return 0;
    }
    if 100.0 - target <= f64::EPSILON {
        return if absent_days.max(0) == 0 { 0 } else { i64::MAX };
    }
    let needed = ((target * valid - 100.0 * present) / (100.0 - target)).ceil();
    if needed.is_finite() {
        (needed as i64).max(0)
    } else {
        i64::MAX
    }
}

/// Largest number of classes that can still be missed without dropping below
/// `target`. Never negative.
pub fn can_miss(present_days: i64, absent_days: i64, target: f64) -> i64 {
    if target <= 0.0 {
        return 0;
    }
    let present = present_days.max(0) as f64;
    let valid = present + absent_days.max(0) as f64;
    let allowed = (100.0 * present / target - valid).floor();
    if allowed.is_finite() {
        (allowed as i64).max(0)
    } else {
        0
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStats {
    pub key: String,
    pub label: String,
    pub record_count: usize,
    pub average_percentage: f64,
    pub min_percentage: f64,
    pub max_percentage: f64,
    pub present_days: i64,
    pub absent_days: i64,
    pub off_days: i64,
    pub total_days: i64,
}

struct GroupAcc {
    label: String,
    count: usize,
    sum_percentage: f64,
    min_percentage: f64,
    max_percentage: f64,
    present_days: i64,
    absent_days: i64,
    off_days: i64,
    total_days: i64,
}

fn group_by<F>(records: &[StatRecord], mut key_of: F) -> Vec<GroupStats>
where
    F: FnMut(&StatRecord) -> (String, String),
{
    let mut groups: HashMap<String, GroupAcc> = HashMap::new();

    for rec in records {
        let (key, label) = key_of(rec);
        let acc = groups.entry(key).or_insert_with(|| GroupAcc {
            label,
            count: 0,
            sum_percentage: 0.0,
            min_percentage: f64::INFINITY,
            max_percentage: f64::NEG_INFINITY,
            present_days: 0,
            absent_days: 0,
            off_days: 0,
            total_days: 0,
        });
        acc.count += 1;
        acc.sum_percentage += rec.attendance_percentage;
        acc.min_percentage = acc.min_percentage.min(rec.attendance_percentage);
        acc.max_percentage = acc.max_percentage.max(rec.attendance_percentage);
        acc.present_days += rec.present_days;
        acc.absent_days += rec.absent_days;
        acc.off_days += rec.off_days;
        acc.total_days += rec.total_days;
    }

    let mut out: Vec<GroupStats> = groups
        .into_iter()
        .map(|(key, acc)| GroupStats {
            key,
            label: acc.label,
            record_count: acc.count,
            // Unweighted mean of member percentages, not weighted by day counts.
            average_percentage: round2(acc.sum_percentage / acc.count as f64),
            min_percentage: acc.min_percentage,
            max_percentage: acc.max_percentage,
            present_days: acc.present_days,
            absent_days: acc.absent_days,
            off_days: acc.off_days,
            total_days: acc.total_days,
        })
        .collect();
    out.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.key.cmp(&b.key)));
    out
}

pub fn subject_wise(records: &[StatRecord]) -> Vec<GroupStats> {
    group_by(records, |r| (r.subject_id.clone(), r.subject_name.clone()))
}

pub fn professor_wise(records: &[StatRecord]) -> Vec<GroupStats> {
    group_by(records, |r| {
        (r.professor_name.clone(), r.professor_name.clone())
    })
}

/// Stat records strictly below the threshold.
pub fn below_threshold(records: &[StatRecord], threshold: f64) -> Vec<StatRecord> {
    records
        .iter()
        .filter(|r| r.attendance_percentage < threshold)
        .cloned()
        .collect()
}

/// Stat records at or above the threshold. Exactly-equal belongs here.
pub fn at_or_above_threshold(records: &[StatRecord], threshold: f64) -> Vec<StatRecord> {
    records
        .iter()
        .filter(|r| r.attendance_percentage >= threshold)
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectSummary {
    pub subject_id: String,
    pub subject_name: String,
    pub professor_name: String,
    pub present_days: i64,
    pub absent_days: i64,
    pub off_days: i64,
    pub total_days: i64,
    pub attendance_percentage: f64,
    pub classes_needed: i64,
    pub can_miss: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub target: f64,
    pub subject_count: usize,
    pub present_days: i64,
    pub absent_days: i64,
    pub off_days: i64,
    pub total_days: i64,
    pub overall_percentage: f64,
    pub subjects: Vec<SubjectSummary>,
}

/// Per-user rollup over that user's stat records, with the classes-needed /
/// can-miss projections for the given target percentage.
pub fn user_summary(records: &[StatRecord], target: f64) -> UserSummary {
    let mut present_days = 0i64;
    let mut absent_days = 0i64;
    let mut off_days = 0i64;
    let mut total_days = 0i64;

    let mut subjects: Vec<SubjectSummary> = records
        .iter()
        .map(|r| {
            present_days += r.present_days;
            absent_days += r.absent_days;
            off_days += r.off_days;
            total_days += r.total_days;
            SubjectSummary {
                subject_id: r.subject_id.clone(),
                subject_name: r.subject_name.clone(),
                professor_name: r.professor_name.clone(),
                present_days: r.present_days,
                absent_days: r.absent_days,
                off_days: r.off_days,
                total_days: r.total_days,
                attendance_percentage: r.attendance_percentage,
                classes_needed: classes_needed(r.present_days, r.absent_days, target),
                can_miss: can_miss(r.present_days, r.absent_days, target),
            }
        })
        .collect();
    subjects.sort_by(|a, b| a.subject_name.cmp(&b.subject_name));

    UserSummary {
        target,
        subject_count: subjects.len(),
        present_days,
        absent_days,
        off_days,
        total_days,
        overall_percentage: fallback_percentage(present_days, absent_days),
        subjects,
    }
}
