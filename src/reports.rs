//! Report snapshots computed from the current collections. Nothing here
//! touches storage; callers hand in borrowed slices and the current time.

use std::collections::HashSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::models::*;
use crate::repo::{RepoError, RepoResult};

const WEEKLY_TOP: usize = 3;
const MONTHLY_TOP: usize = 5;
const DASHBOARD_TOP: usize = 5;

/// Borrowed view of the collections a report reads.
#[derive(Clone, Copy)]
pub struct ReportInputs<'a> {
    pub students: &'a [Student],
    pub attendance: &'a [Attendance],
    pub behaviors: &'a [Behavior],
    pub tasks: &'a [Task],
    pub replies: &'a [TaskReply],
}

/// Students of one class plus the records attributed to them in `[start, end)`.
struct ClassPeriod<'a> {
    students: Vec<&'a Student>,
    ids: HashSet<&'a str>,
    attendance: Vec<&'a Attendance>,
    behaviors: Vec<&'a Behavior>,
}

impl<'a> ClassPeriod<'a> {
    fn collect(inputs: ReportInputs<'a>, class_id: &str, start: NaiveDate, end: NaiveDate) -> Self {
        let students: Vec<&Student> = inputs.students.iter().filter(|s| s.class_id == class_id).collect();
        let ids: HashSet<&str> = students.iter().copied().map(|s| s.id.as_str()).collect();
        let in_window = |d: NaiveDate| d >= start && d < end;
        let attendance = inputs
            .attendance
            .iter()
            .filter(|a| ids.contains(a.student_id.as_str()) && in_window(a.date))
            .collect();
        let behaviors = inputs
            .behaviors
            .iter()
            .filter(|b| ids.contains(b.student_id.as_str()) && in_window(b.date))
            .collect();
        Self { students, ids, attendance, behaviors }
    }

    fn count_status(&self, status: AttendanceStatus) -> usize {
        self.attendance.iter().filter(|a| a.status == status).count()
    }

    fn count_kind(&self, kind: BehaviorKind) -> usize {
        self.behaviors.iter().filter(|b| b.kind == kind).count()
    }

    /// Share of attendance records that are not absences; no records counts as full attendance.
    fn attendance_rate(&self) -> f64 {
        let total = self.attendance.len();
        if total == 0 {
            return 100.0;
        }
        let absent = self.count_status(AttendanceStatus::Absent);
        (total - absent) as f64 / total as f64 * 100.0
    }

    fn name_of(&self, student_id: &str) -> &'a str {
        self.students
            .iter()
            .copied()
            .find(|s| s.id == student_id)
            .map(|s| s.full_name.as_str())
            .unwrap_or("N/A")
    }

    /// Event counts of `kind` grouped by student display name, most frequent first.
    /// Students sharing a name are merged into one entry.
    fn top_by_name(&self, kind: BehaviorKind, limit: usize) -> Vec<NameCount> {
        let mut tally: Vec<NameCount> = Vec::new();
        for b in self.behaviors.iter().filter(|b| b.kind == kind) {
            let name = self.name_of(&b.student_id);
            match tally.iter_mut().find(|e| e.name == name) {
                Some(e) => e.count += 1,
                None => tally.push(NameCount { name: name.to_string(), count: 1 }),
            }
        }
        // stable: ties keep first-seen order
        tally.sort_by(|a, b| b.count.cmp(&a.count));
        tally.truncate(limit);
        tally
    }
}

fn midnight(d: NaiveDate) -> DateTime<Utc> {
    d.and_time(chrono::NaiveTime::MIN).and_utc()
}

fn top_scores<'a>(students: impl Iterator<Item = &'a Student>, limit: usize) -> Vec<NameScore> {
    let mut ranked: Vec<NameScore> = students
        .map(|s| NameScore { name: s.full_name.clone(), score: s.behavior_score })
        .collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked.truncate(limit);
    ranked
}

pub fn weekly(inputs: ReportInputs<'_>, class_id: &str, week_start: NaiveDate, now: DateTime<Utc>) -> WeeklyReport {
    let end = week_start + Duration::days(7);
    let period = ClassPeriod::collect(inputs, class_id, week_start, end);

    let absent_count = period.count_status(AttendanceStatus::Absent);
    let late_count = period.count_status(AttendanceStatus::Late);
    let attendance_rate = period.attendance_rate();

    let start_ts = midnight(week_start);
    let overdue_tasks_count = inputs
        .tasks
        .iter()
        .filter(|t| t.class_id == class_id && t.due_date < now && t.due_date >= start_ts)
        .count();

    // any reply on record, not only this week's
    let replied: HashSet<&str> = inputs
        .replies
        .iter()
        .filter(|r| period.ids.contains(r.student_id.as_str()))
        .map(|r| r.student_id.as_str())
        .collect();

    WeeklyReport {
        id: format!("weekly-{class_id}-{week_start}"),
        kind: ReportKind::Weekly,
        period: format!("Week of {}", week_start.format("%d/%m/%Y")),
        summary: format!(
            "This week the class recorded {absent_count} absences and {late_count} late arrivals. Attendance rate: {attendance_rate:.1}%."
        ),
        generated_at: now,
        attendance_rate,
        absent_count,
        late_count,
        top_praise: period.top_by_name(BehaviorKind::Praise, WEEKLY_TOP),
        top_warn: period.top_by_name(BehaviorKind::Warning, WEEKLY_TOP),
        overdue_tasks_count,
        replied_parents_count: replied.len(),
        total_students: period.students.len(),
    }
}

/// Parses `YYYY-MM` (single-digit months allowed).
pub fn parse_month(month: &str) -> RepoResult<(i32, u32)> {
    let bad = || RepoError::InvalidInput(format!("month must be YYYY-MM, got '{month}'"));
    let (y, m) = month.trim().split_once('-').ok_or_else(bad)?;
    let year: i32 = y.parse().map_err(|_| bad())?;
    let month_num: u32 = m.parse().map_err(|_| bad())?;
    if !(1..=12).contains(&month_num) {
        return Err(bad());
    }
    Ok((year, month_num))
}

/// `[first day of month, first day of next month)`.
pub fn month_window(year: i32, month: u32) -> RepoResult<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| RepoError::InvalidInput(format!("no such month {year}-{month}")))?;
    let (ny, nm) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let end = NaiveDate::from_ymd_opt(ny, nm, 1)
        .ok_or_else(|| RepoError::InvalidInput(format!("no such month {ny}-{nm}")))?;
    Ok((start, end))
}

pub fn monthly(inputs: ReportInputs<'_>, class_id: &str, month: &str, now: DateTime<Utc>) -> RepoResult<MonthlyReport> {
    let (year, month_num) = parse_month(month)?;
    let (start, end) = month_window(year, month_num)?;
    let period = ClassPeriod::collect(inputs, class_id, start, end);

    let absent_count = period.count_status(AttendanceStatus::Absent);
    let late_count = period.count_status(AttendanceStatus::Late);
    let attendance_rate = period.attendance_rate();
    let praise_count = period.count_kind(BehaviorKind::Praise);
    let warn_count = period.count_kind(BehaviorKind::Warning);

    // replies received vs. expected for reply-required tasks due this month
    let (start_ts, end_ts) = (midnight(start), midnight(end));
    let due: HashSet<&str> = inputs
        .tasks
        .iter()
        .filter(|t| t.class_id == class_id && t.require_reply && t.due_date >= start_ts && t.due_date < end_ts)
        .map(|t| t.id.as_str())
        .collect();
    let expected = due.len() * period.students.len();
    let received: HashSet<(&str, &str)> = inputs
        .replies
        .iter()
        .filter(|r| due.contains(r.task_id.as_str()) && period.ids.contains(r.student_id.as_str()))
        .map(|r| (r.task_id.as_str(), r.student_id.as_str()))
        .collect();
    let task_completion_rate = if expected == 0 {
        100.0
    } else {
        received.len() as f64 / expected as f64 * 100.0
    };

    Ok(MonthlyReport {
        id: format!("monthly-{class_id}-{month}"),
        kind: ReportKind::Monthly,
        period: format!("Month {month_num}/{year}"),
        summary: format!(
            "Month {month_num} closed with an attendance rate of {attendance_rate:.1}%, {praise_count} praises and {warn_count} warnings."
        ),
        generated_at: now,
        attendance_rate,
        absent_count,
        late_count,
        praise_count,
        warn_count,
        task_completion_rate,
        // running totals, not points earned this month
        top_students: top_scores(period.students.iter().copied(), MONTHLY_TOP),
    })
}

pub fn dashboard(students: &[Student], behaviors: &[Behavior], tasks: &[Task]) -> DashboardStats {
    DashboardStats {
        active_students: students.iter().filter(|s| s.status == StudentStatus::Studying).count(),
        total_students: students.len(),
        praise_count: behaviors.iter().filter(|b| b.kind == BehaviorKind::Praise).count(),
        warn_count: behaviors.iter().filter(|b| b.kind == BehaviorKind::Warning).count(),
        task_count: tasks.len(),
        top_students: top_scores(students.iter(), DASHBOARD_TOP),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn student(id: &str, class_id: &str, name: &str, score: i64) -> Student {
        let mut s = NewStudent {
            class_id: class_id.into(),
            full_name: name.into(),
            dob: None,
            gender: Gender::Male,
            address: String::new(),
            parent_id: String::new(),
            status: StudentStatus::Studying,
            ethnicity: None,
            parent_name: None,
            phone_number: None,
            family_background: None,
            registry_number: None,
            investigation_number: None,
        }
        .into_student(id.into());
        s.behavior_score = score;
        s
    }

    fn att(student_id: &str, date: NaiveDate, status: AttendanceStatus) -> Attendance {
        Attendance {
            id: format!("att-{student_id}-{date}"),
            class_id: "c-1".into(),
            student_id: student_id.into(),
            date,
            status,
            note: None,
        }
    }

    fn bh(student_id: &str, date: NaiveDate, kind: BehaviorKind) -> Behavior {
        Behavior {
            id: format!("bh-{student_id}-{date}"),
            student_id: student_id.into(),
            date,
            kind,
            content: String::new(),
            points: 1,
        }
    }

    fn task(id: &str, due: DateTime<Utc>, require_reply: bool) -> Task {
        Task {
            id: id.into(),
            class_id: "c-1".into(),
            title: id.into(),
            description: String::new(),
            due_date: due,
            require_reply,
            created_at: due,
        }
    }

    fn reply(task_id: &str, student_id: &str) -> TaskReply {
        TaskReply {
            id: format!("r-{task_id}-{student_id}"),
            task_id: task_id.into(),
            student_id: student_id.into(),
            parent_id: None,
            reply_text: "ok".into(),
            attachments: vec![],
            created_at: midnight(day(2024, 1, 1)),
        }
    }

    #[test]
    fn weekly_window_excludes_following_monday_and_other_classes() {
        let students = vec![student("a", "c-1", "An", 100), student("b", "c-1", "Binh", 100), student("x", "c-2", "Xuan", 100)];
        let attendance = vec![
            att("a", day(2024, 1, 8), AttendanceStatus::Present),
            att("b", day(2024, 1, 8), AttendanceStatus::Absent),
            att("b", day(2024, 1, 9), AttendanceStatus::Late),
            att("b", day(2024, 1, 15), AttendanceStatus::Absent),
            att("x", day(2024, 1, 8), AttendanceStatus::Absent),
        ];
        let inputs = ReportInputs { students: &students, attendance: &attendance, behaviors: &[], tasks: &[], replies: &[] };
        let r = weekly(inputs, "c-1", day(2024, 1, 8), midnight(day(2024, 1, 20)));
        assert_eq!(r.absent_count, 1);
        assert_eq!(r.late_count, 1);
        assert!((r.attendance_rate - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(r.total_students, 2);
        assert_eq!(r.id, "weekly-c-1-2024-01-08");
        assert_eq!(r.kind, ReportKind::Weekly);
    }

    #[test]
    fn weekly_without_attendance_is_fully_attended() {
        let students = vec![student("a", "c-1", "An", 100)];
        let inputs = ReportInputs { students: &students, attendance: &[], behaviors: &[], tasks: &[], replies: &[] };
        let r = weekly(inputs, "c-1", day(2024, 1, 8), Utc::now());
        assert_eq!(r.attendance_rate, 100.0);
    }

    #[test]
    fn weekly_top_lists_group_by_name() {
        let students = vec![
            student("a", "c-1", "An", 100),
            student("a2", "c-1", "An", 100),
            student("b", "c-1", "Binh", 100),
            student("c", "c-1", "Chi", 100),
            student("d", "c-1", "Dung", 100),
        ];
        let behaviors = vec![
            bh("b", day(2024, 1, 8), BehaviorKind::Praise),
            bh("a", day(2024, 1, 9), BehaviorKind::Praise),
            bh("a2", day(2024, 1, 10), BehaviorKind::Praise),
            bh("c", day(2024, 1, 10), BehaviorKind::Praise),
            bh("d", day(2024, 1, 11), BehaviorKind::Praise),
            bh("d", day(2024, 1, 12), BehaviorKind::Warning),
            bh("d", day(2024, 1, 16), BehaviorKind::Warning),
        ];
        let inputs = ReportInputs { students: &students, attendance: &[], behaviors: &behaviors, tasks: &[], replies: &[] };
        let r = weekly(inputs, "c-1", day(2024, 1, 8), Utc::now());
        assert_eq!(
            r.top_praise,
            vec![
                NameCount { name: "An".into(), count: 2 },
                NameCount { name: "Binh".into(), count: 1 },
                NameCount { name: "Chi".into(), count: 1 },
            ]
        );
        assert_eq!(r.top_warn, vec![NameCount { name: "Dung".into(), count: 1 }]);
    }

    #[test]
    fn weekly_overdue_and_replied_counts() {
        let students = vec![student("a", "c-1", "An", 100), student("b", "c-1", "Binh", 100)];
        let now = midnight(day(2024, 1, 10));
        let tasks = vec![
            task("before-week", midnight(day(2024, 1, 5)), false),
            task("overdue", midnight(day(2024, 1, 9)), false),
            task("future", midnight(day(2024, 1, 12)), false),
        ];
        let replies = vec![reply("before-week", "a"), reply("overdue", "a"), reply("x", "outsider")];
        let inputs = ReportInputs { students: &students, attendance: &[], behaviors: &[], tasks: &tasks, replies: &replies };
        let r = weekly(inputs, "c-1", day(2024, 1, 8), now);
        assert_eq!(r.overdue_tasks_count, 1);
        assert_eq!(r.replied_parents_count, 1);
    }

    #[test]
    fn month_parsing() {
        assert_eq!(parse_month("2024-02").unwrap(), (2024, 2));
        assert_eq!(parse_month("2024-2").unwrap(), (2024, 2));
        assert!(matches!(parse_month("2024-13"), Err(RepoError::InvalidInput(_))));
        assert!(matches!(parse_month("Feb 2024"), Err(RepoError::InvalidInput(_))));
        assert_eq!(month_window(2023, 12).unwrap(), (day(2023, 12, 1), day(2024, 1, 1)));
    }

    #[test]
    fn monthly_counts_and_rankings() {
        let students = vec![
            student("a", "c-1", "An", 110),
            student("b", "c-1", "Binh", 95),
            student("c", "c-1", "Chi", 120),
        ];
        let attendance = vec![
            att("a", day(2024, 2, 1), AttendanceStatus::Absent),
            att("b", day(2024, 2, 29), AttendanceStatus::Present),
            att("c", day(2024, 3, 1), AttendanceStatus::Absent),
        ];
        let behaviors = vec![
            bh("a", day(2024, 2, 3), BehaviorKind::Praise),
            bh("b", day(2024, 2, 4), BehaviorKind::Warning),
            bh("c", day(2024, 1, 31), BehaviorKind::Praise),
        ];
        let tasks = vec![task("t1", midnight(day(2024, 2, 10)), true), task("t2", midnight(day(2024, 2, 12)), false)];
        let replies = vec![reply("t1", "a"), reply("t1", "b"), reply("t2", "c")];
        let inputs = ReportInputs { students: &students, attendance: &attendance, behaviors: &behaviors, tasks: &tasks, replies: &replies };
        let r = monthly(inputs, "c-1", "2024-02", Utc::now()).unwrap();
        assert_eq!(r.absent_count, 1);
        assert_eq!(r.attendance_rate, 50.0);
        assert_eq!(r.praise_count, 1);
        assert_eq!(r.warn_count, 1);
        assert!((r.task_completion_rate - 200.0 / 3.0).abs() < 1e-9);
        let names: Vec<_> = r.top_students.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Chi", "An", "Binh"]);
        assert_eq!(r.period, "Month 2/2024");
    }

    #[test]
    fn dashboard_counts_active_students() {
        let mut students = vec![student("a", "c-1", "An", 104), student("b", "c-1", "Binh", 99)];
        students[1].status = StudentStatus::Transferred;
        let behaviors = vec![bh("a", day(2024, 1, 8), BehaviorKind::Praise)];
        let d = dashboard(&students, &behaviors, &[]);
        assert_eq!(d.active_students, 1);
        assert_eq!(d.total_students, 2);
        assert_eq!(d.praise_count, 1);
        assert_eq!(d.top_students[0].name, "An");
    }
}
