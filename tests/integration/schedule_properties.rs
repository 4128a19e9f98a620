use dayfill_lib::models::schedule::{BreakInterval, DayWindow};
use dayfill_lib::models::task::Priority;
use dayfill_lib::services::schedule_optimizer::{SchedulableTask, ScheduleOptimizer};
use dayfill_lib::services::schedule_utils::{self, format_clock};
use proptest::prelude::*;

fn priority_strategy() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::High),
        Just(Priority::Medium),
        Just(Priority::Low),
    ]
}

fn window_strategy() -> impl Strategy<Value = DayWindow> {
    (0i64..1200, 1i64..240).prop_map(|(start, len)| DayWindow::new(start, (start + len).min(1439)))
}

fn fixed_strategy() -> impl Strategy<Value = Vec<(i64, i64)>> {
    prop::collection::vec(
        (0i64..1439, 1i64..180).prop_map(|(start, len)| (start, (start + len).min(1439))),
        0..6,
    )
}

fn flexible_strategy() -> impl Strategy<Value = Vec<(i64, Priority)>> {
    prop::collection::vec((0i64..200, priority_strategy()), 0..10)
}

fn build_tasks(fixed: &[(i64, i64)], flexible: &[(i64, Priority)]) -> Vec<SchedulableTask> {
    let mut tasks: Vec<SchedulableTask> = fixed
        .iter()
        .enumerate()
        .map(|(idx, (start, end))| SchedulableTask::fixed(format!("fixed-{idx}"), *start, *end))
        .collect();
    tasks.extend(
        flexible
            .iter()
            .enumerate()
            .map(|(idx, (duration, priority))| {
                SchedulableTask::flexible(format!("flex-{idx}"), *duration, *priority)
            }),
    );
    tasks
}

fn overlaps(a: (i64, i64), b: (i64, i64)) -> bool {
    a.0 < b.1 && b.0 < a.1
}

proptest! {
    #[test]
    fn placements_never_double_book(
        window in window_strategy(),
        fixed in fixed_strategy(),
        breaks in fixed_strategy(),
        flexible in flexible_strategy()
    ) {
        let tasks = build_tasks(&fixed, &flexible);
        let break_intervals: Vec<BreakInterval> = breaks
            .iter()
            .map(|(start, end)| BreakInterval::new(format_clock(*start), format_clock(*end)))
            .collect();

        let plan = ScheduleOptimizer::default()
            .plan_day(&tasks, &break_intervals, window)
            .expect("plan");

        let placed: Vec<(i64, i64)> = plan
            .placements
            .iter()
            .map(|p| (p.new_start, p.new_end))
            .collect();

        for (i, a) in placed.iter().enumerate() {
            for b in placed.iter().skip(i + 1) {
                prop_assert!(!overlaps(*a, *b), "placements {:?} and {:?} overlap", a, b);
            }
            for block in fixed.iter().chain(breaks.iter()) {
                prop_assert!(!overlaps(*a, *block), "placement {:?} overlaps block {:?}", a, block);
            }
        }
    }

    #[test]
    fn placements_stay_inside_the_window(
        window in window_strategy(),
        fixed in fixed_strategy(),
        flexible in flexible_strategy()
    ) {
        let tasks = build_tasks(&fixed, &flexible);
        let plan = ScheduleOptimizer::default()
            .plan_day(&tasks, &[], window)
            .expect("plan");

        for placement in &plan.placements {
            prop_assert!(window.start <= placement.new_start);
            prop_assert!(placement.new_end <= window.end);
            prop_assert!(placement.new_end > placement.new_start);
        }
        prop_assert_eq!(
            plan.placements.len() + plan.outcome.unplaced.len(),
            flexible.len()
        );
    }

    #[test]
    fn fully_booked_day_places_nothing(
        window in window_strategy(),
        flexible in flexible_strategy()
    ) {
        let tasks = build_tasks(&[(window.start, window.end)], &flexible);
        let plan = ScheduleOptimizer::default()
            .plan_day(&tasks, &[], window)
            .expect("plan");
        prop_assert!(plan.placements.is_empty());
        prop_assert_eq!(plan.outcome.unplaced.len(), flexible.len());
    }

    #[test]
    fn higher_priority_wins_a_contested_gap(
        window in window_strategy(),
        split in 1i64..100,
        high_first in any::<bool>()
    ) {
        let len = window.len();
        prop_assume!(len >= 2);
        // each fits alone, both together do not
        let high_duration = (len * split / 100).max(1);
        let low_duration = len - high_duration + 1;
        prop_assume!(low_duration <= len);

        let high = SchedulableTask::flexible("high", high_duration, Priority::High);
        let low = SchedulableTask::flexible("low", low_duration, Priority::Low);
        let tasks = if high_first { vec![high, low] } else { vec![low, high] };

        let plan = ScheduleOptimizer::default()
            .plan_day(&tasks, &[], window)
            .expect("plan");
        prop_assert_eq!(plan.placements.len(), 1);
        prop_assert_eq!(plan.placements[0].task_id.as_str(), "high");
        prop_assert_eq!(plan.placements[0].new_start, window.start);
    }

    #[test]
    fn window_resolution_never_inverts(start in 0i64..1440, end in 0i64..1440) {
        let window = schedule_utils::resolve_window(
            &format_clock(start),
            &format_clock(end),
            DayWindow::DEFAULT,
        );
        prop_assert!(window.start < window.end);
        if end > start {
            prop_assert_eq!(window, DayWindow::new(start, end));
        } else {
            prop_assert_eq!(window, DayWindow::DEFAULT);
        }
    }
}
