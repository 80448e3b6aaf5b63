use crate::config::Goals;
use crate::store::ExerciseRecord;
use chrono::{Duration, NaiveDate};
use itertools::Itertools;

/// Progress toward a single-number goal (walking minutes, eye-gaze reps)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalProgress {
    pub completed: u32,
    pub target: u32,
    pub achieved: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FistRaiseProgress {
    pub completed_sets: u32,
    pub completed_reps: u32,
    pub target_sets: u32,
    pub target_reps: u32,
    pub achieved: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyProgress {
    pub date: NaiveDate,
    pub walking: GoalProgress,
    pub fist_raise: FistRaiseProgress,
    pub eye_gaze: GoalProgress,
    pub overall_achieved: bool,
}

/// Aggregate one day's records against the configured goals
pub fn daily_progress(records: &[ExerciseRecord], goals: &Goals, date: NaiveDate) -> DailyProgress {
    let day = records.iter().filter(|r| r.date == date);

    let mut walking_total = 0u32;
    let mut fist_sets = 0u32;
    let mut fist_reps = 0u32;
    let mut eye_gaze_total = 0u32;
    for record in day {
        walking_total += record.entry.walking_minutes.unwrap_or(0);
        fist_sets += record.entry.fist_raise_sets.unwrap_or(0);
        fist_reps += record.entry.fist_raise_reps.unwrap_or(0);
        eye_gaze_total += record.entry.eye_gaze_count.unwrap_or(0);
    }

    let walking = GoalProgress {
        completed: walking_total,
        target: goals.walking_minutes,
        achieved: walking_total >= goals.walking_minutes,
    };
    let fist_raise = FistRaiseProgress {
        completed_sets: fist_sets,
        completed_reps: fist_reps,
        target_sets: goals.fist_raise_sets,
        target_reps: goals.fist_raise_reps,
        achieved: fist_sets >= goals.fist_raise_sets && fist_reps >= goals.fist_raise_reps,
    };
    let eye_gaze = GoalProgress {
        completed: eye_gaze_total,
        target: goals.eye_gaze_count,
        achieved: eye_gaze_total >= goals.eye_gaze_count,
    };

    DailyProgress {
        date,
        overall_achieved: walking.achieved && fist_raise.achieved && eye_gaze.achieved,
        walking,
        fist_raise,
        eye_gaze,
    }
}

/// Encouragement line for the home screen, tiered by goals met
pub fn encouragement(progress: &DailyProgress) -> &'static str {
    if progress.overall_achieved {
        return "Fantastic! All of today's goals are done. Keep it up!";
    }

    let achieved = [
        progress.walking.achieved,
        progress.fist_raise.achieved,
        progress.eye_gaze.achieved,
    ]
    .iter()
    .filter(|a| **a)
    .count();

    match achieved {
        0 => "A new day. Time to start today's training!",
        1 => "One exercise done. Keep going!",
        2 => "Two down, just one more to hit every goal!",
        _ => "Almost there. Steady wins the recovery!",
    }
}

/// Completion ratio clamped to [0, 1] for gauge widgets
pub fn ratio(completed: u32, target: u32) -> f64 {
    if target == 0 {
        return if completed > 0 { 1.0 } else { 0.0 };
    }
    (completed as f64 / target as f64).min(1.0)
}

/// Overview numbers for the statistics screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSummary {
    pub training_days: usize,
    pub total_records: usize,
    pub last_week_records: usize,
}

pub fn summarize(records: &[ExerciseRecord], today: NaiveDate) -> StatsSummary {
    let week_ago = today - Duration::days(7);
    StatsSummary {
        training_days: records.iter().map(|r| r.date).unique().count(),
        total_records: records.len(),
        last_week_records: records.iter().filter(|r| r.date >= week_ago).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ExerciseEntry, RecordsDb};
    use chrono::Local;

    fn seeded_records() -> Vec<ExerciseRecord> {
        let db = RecordsDb::in_memory().unwrap();
        let now = Local::now();
        db.save_entry_at(
            &ExerciseEntry {
                walking_minutes: Some(20),
                ..Default::default()
            },
            now,
        )
        .unwrap();
        db.save_entry_at(
            &ExerciseEntry {
                walking_minutes: Some(15),
                fist_raise_sets: Some(3),
                fist_raise_reps: Some(10),
                ..Default::default()
            },
            now,
        )
        .unwrap();
        db.save_entry_at(&ExerciseEntry::eye_gaze_only(12), now).unwrap();
        db.all_records().unwrap()
    }

    #[test]
    fn sums_each_exercise_for_the_day() {
        let records = seeded_records();
        let today = Local::now().date_naive();
        let progress = daily_progress(&records, &Goals::default(), today);

        assert_eq!(progress.walking.completed, 35);
        assert!(progress.walking.achieved);
        assert_eq!(progress.fist_raise.completed_sets, 3);
        assert_eq!(progress.fist_raise.completed_reps, 10);
        assert!(progress.fist_raise.achieved);
        assert_eq!(progress.eye_gaze.completed, 12);
        assert!(!progress.eye_gaze.achieved);
        assert!(!progress.overall_achieved);
    }

    #[test]
    fn overall_achieved_requires_every_goal() {
        let records = seeded_records();
        let today = Local::now().date_naive();
        let goals = Goals {
            eye_gaze_count: 10,
            ..Goals::default()
        };
        let progress = daily_progress(&records, &goals, today);
        assert!(progress.overall_achieved);
    }

    #[test]
    fn other_days_do_not_leak_into_today() {
        let db = RecordsDb::in_memory().unwrap();
        let now = Local::now();
        db.save_entry_at(
            &ExerciseEntry {
                walking_minutes: Some(60),
                ..Default::default()
            },
            now - Duration::days(1),
        )
        .unwrap();
        let records = db.all_records().unwrap();

        let progress = daily_progress(&records, &Goals::default(), now.date_naive());
        assert_eq!(progress.walking.completed, 0);
    }

    #[test]
    fn fist_raise_needs_both_sets_and_reps() {
        let db = RecordsDb::in_memory().unwrap();
        db.save_entry(&ExerciseEntry {
            fist_raise_sets: Some(5),
            fist_raise_reps: Some(2),
            ..Default::default()
        })
        .unwrap();
        let records = db.all_records().unwrap();

        let progress = daily_progress(&records, &Goals::default(), Local::now().date_naive());
        assert!(!progress.fist_raise.achieved);
    }

    #[test]
    fn encouragement_tiers() {
        let records = seeded_records();
        let today = Local::now().date_naive();

        let none = daily_progress(&[], &Goals::default(), today);
        assert_eq!(encouragement(&none), "A new day. Time to start today's training!");

        let partial = daily_progress(&records, &Goals::default(), today);
        assert!(encouragement(&partial).contains("one more"));

        let goals = Goals {
            eye_gaze_count: 10,
            ..Goals::default()
        };
        let all = daily_progress(&records, &goals, today);
        assert!(encouragement(&all).starts_with("Fantastic"));
    }

    #[test]
    fn ratio_clamps_and_handles_zero_target() {
        assert_eq!(ratio(15, 30), 0.5);
        assert_eq!(ratio(45, 30), 1.0);
        assert_eq!(ratio(0, 0), 0.0);
        assert_eq!(ratio(1, 0), 1.0);
    }

    #[test]
    fn summary_counts_distinct_days_and_recent_records() {
        let db = RecordsDb::in_memory().unwrap();
        let now = Local::now();
        db.save_entry_at(&ExerciseEntry::eye_gaze_only(1), now).unwrap();
        db.save_entry_at(&ExerciseEntry::eye_gaze_only(2), now).unwrap();
        db.save_entry_at(&ExerciseEntry::eye_gaze_only(3), now - Duration::days(10))
            .unwrap();
        let records = db.all_records().unwrap();

        let summary = summarize(&records, now.date_naive());
        assert_eq!(summary.training_days, 2);
        assert_eq!(summary.total_records, 3);
        assert_eq!(summary.last_week_records, 2);
    }
}
