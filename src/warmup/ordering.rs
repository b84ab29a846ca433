//! Dependency-aware execution order for warmup tasks
//!
//! Level-by-level Kahn ordering: each round schedules every task whose
//! dependencies are already scheduled, highest priority first. A round with
//! nothing ready (cycle, or a dependency outside the input) appends the
//! remaining tasks in their current order and stops.

use super::task::WarmupTask;
use std::collections::HashSet;

/// Order `tasks` so dependencies precede dependents where possible
///
/// Every input task appears exactly once in the output. Ties in priority keep
/// the input order.
pub fn order_tasks(tasks: &[WarmupTask]) -> Vec<WarmupTask> {
    let mut ordered = Vec::with_capacity(tasks.len());
    let mut scheduled: HashSet<String> = HashSet::with_capacity(tasks.len());
    let mut remaining: Vec<&WarmupTask> = tasks.iter().collect();

    while !remaining.is_empty() {
        let (mut ready, blocked): (Vec<&WarmupTask>, Vec<&WarmupTask>) =
            remaining.into_iter().partition(|task| {
                task.dependencies
                    .iter()
                    .all(|dependency| scheduled.contains(dependency))
            });

        if ready.is_empty() {
            ordered.extend(blocked.into_iter().cloned());
            break;
        }

        // Stable sort keeps registration order within a priority
        ready.sort_by(|a, b| b.priority.cmp(&a.priority));
        for task in ready {
            scheduled.insert(task.key.clone());
            ordered.push(task.clone());
        }
        remaining = blocked;
    }

    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warmup::task::{warmup_fn, WarmupPriority};
    use proptest::prelude::*;

    fn task(key: &str, priority: WarmupPriority, deps: &[&str]) -> WarmupTask {
        WarmupTask::new(key, priority, warmup_fn(|| async { Ok(()) }))
            .depends_on(deps.iter().copied())
    }

    fn keys(tasks: &[WarmupTask]) -> Vec<&str> {
        tasks.iter().map(|t| t.key.as_str()).collect()
    }

    #[test]
    fn test_dependencies_beat_priority() {
        let tasks = vec![
            task("c", WarmupPriority::High, &["b"]),
            task("b", WarmupPriority::Medium, &["a"]),
            task("a", WarmupPriority::Low, &[]),
        ];
        assert_eq!(keys(&order_tasks(&tasks)), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_priority_within_a_round_is_stable() {
        let tasks = vec![
            task("low", WarmupPriority::Low, &[]),
            task("high_1", WarmupPriority::High, &[]),
            task("medium", WarmupPriority::Medium, &[]),
            task("high_2", WarmupPriority::High, &[]),
        ];
        assert_eq!(
            keys(&order_tasks(&tasks)),
            vec!["high_1", "high_2", "medium", "low"]
        );
    }

    #[test]
    fn test_cycle_is_flushed_in_input_order() {
        let tasks = vec![
            task("ready", WarmupPriority::Low, &[]),
            task("x", WarmupPriority::High, &["y"]),
            task("y", WarmupPriority::High, &["x"]),
        ];
        assert_eq!(keys(&order_tasks(&tasks)), vec!["ready", "x", "y"]);
    }

    #[test]
    fn test_missing_dependency_is_never_satisfied() {
        let tasks = vec![
            task("users_active", WarmupPriority::Medium, &["roles_active"]),
            task("books_popular", WarmupPriority::Medium, &[]),
        ];
        assert_eq!(
            keys(&order_tasks(&tasks)),
            vec!["books_popular", "users_active"]
        );
    }

    fn arb_priority() -> impl Strategy<Value = WarmupPriority> {
        prop_oneof![
            Just(WarmupPriority::High),
            Just(WarmupPriority::Medium),
            Just(WarmupPriority::Low),
        ]
    }

    proptest! {
        #[test]
        fn prop_every_task_appears_once(
            specs in prop::collection::vec((arb_priority(), prop::collection::vec(0usize..12, 0..3)), 0..12)
        ) {
            let tasks: Vec<WarmupTask> = specs
                .iter()
                .enumerate()
                .map(|(i, (priority, deps))| {
                    let deps: Vec<String> = deps.iter().map(|d| format!("t{d}")).collect();
                    WarmupTask::new(format!("t{i}"), *priority, warmup_fn(|| async { Ok(()) }))
                        .depends_on(deps)
                })
                .collect();

            let ordered = order_tasks(&tasks);
            prop_assert_eq!(ordered.len(), tasks.len());

            let mut seen: Vec<&str> = keys(&ordered);
            seen.sort_unstable();
            let mut expected: Vec<&str> = keys(&tasks);
            expected.sort_unstable();
            prop_assert_eq!(seen, expected);
        }

        #[test]
        fn prop_acyclic_dependencies_come_first(
            specs in prop::collection::vec((arb_priority(), prop::collection::vec(0usize..12, 0..3)), 1..12)
        ) {
            // Only depend on lower indices, so the graph is acyclic
            let tasks: Vec<WarmupTask> = specs
                .iter()
                .enumerate()
                .map(|(i, (priority, deps))| {
                    let deps: Vec<String> = deps
                        .iter()
                        .filter(|d| **d < i)
                        .map(|d| format!("t{d}"))
                        .collect();
                    WarmupTask::new(format!("t{i}"), *priority, warmup_fn(|| async { Ok(()) }))
                        .depends_on(deps)
                })
                .collect();

            let ordered = order_tasks(&tasks);
            let position = |key: &str| ordered.iter().position(|t| t.key == key);

            for task in &tasks {
                for dependency in &task.dependencies {
                    prop_assert!(position(dependency) < position(&task.key));
                }
            }
        }
    }
}
