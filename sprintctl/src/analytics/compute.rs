//! Pure aggregation math over sprint/story records.
//!
//! Everything in this module is deterministic in its inputs; the store-facing
//! wrappers live in the parent module.

use chrono::NaiveDate;

use super::{BurndownPoint, BurndownReport, EpicProgress, SprintMetrics, TeamMetrics, VelocityPoint, WorkloadItem};
use crate::store::models::{Epic, Sprint, Story, StoryStatus};

fn points_of(stories: &[Story]) -> (i64, i64) {
    let planned = stories.iter().map(|s| s.points as i64).sum();
    let completed = stories
        .iter()
        .filter(|s| s.status == StoryStatus::Done)
        .map(|s| s.points as i64)
        .sum();
    (planned, completed)
}

pub fn sprint_metrics(sprint: &Sprint, stories: &[Story]) -> SprintMetrics {
    let (planned_points, completed_points) = points_of(stories);
    let total_stories = stories.len() as i64;
    let completed_stories = stories.iter().filter(|s| s.status == StoryStatus::Done).count() as i64;

    // Rate counts stories, not points: a sprint is "half done" when half its
    // stories are done, regardless of their sizes.
    let completion_rate = if total_stories > 0 {
        (completed_stories as f64 / total_stories as f64) * 100.0
    } else {
        0.0
    };

    SprintMetrics {
        sprint_id: sprint.id,
        name: sprint.name.clone(),
        status: sprint.status,
        start_date: sprint.start_date,
        end_date: sprint.end_date,
        capacity_points: sprint.capacity_points,
        planned_points,
        completed_points,
        total_stories,
        completed_stories,
        completion_rate,
    }
}

pub fn velocity_point(sprint: &Sprint, stories: &[Story]) -> VelocityPoint {
    let (planned_points, completed_points) = points_of(stories);
    VelocityPoint {
        sprint_id: sprint.id,
        name: sprint.name.clone(),
        start_date: sprint.start_date,
        planned_points,
        completed_points,
    }
}

/// Build the burndown series for a sprint as of `today`.
///
/// The ideal line decreases linearly from the sprint's total points to zero
/// across its duration. The actual line is an approximation: no daily
/// snapshots exist, so remaining work is reconstructed from a constant
/// per-day rate of `completed_points / elapsed-or-duration days`. Days after
/// `today` carry no actual value.
pub fn burndown(sprint: &Sprint, stories: &[Story], today: NaiveDate) -> BurndownReport {
    let (total_points, completed_points) = points_of(stories);
    let total = total_points as f64;

    // Number of day-steps from start to end; a same-day sprint still gets one
    // step so the ideal line reaches zero.
    let duration = (sprint.end_date - sprint.start_date).num_days().max(1);

    let elapsed = if today < sprint.start_date {
        None
    } else {
        Some((today - sprint.start_date).num_days().min(duration))
    };

    let daily_rate = match elapsed {
        Some(elapsed_days) => completed_points as f64 / (elapsed_days.max(1)) as f64,
        None => 0.0,
    };

    let points = (0..=duration)
        .map(|day_index| {
            let day = sprint.start_date + chrono::Duration::days(day_index);
            let ideal_remaining = total * (1.0 - day_index as f64 / duration as f64);

            let actual_remaining = match elapsed {
                Some(elapsed_days) if day_index <= elapsed_days => Some((total - daily_rate * day_index as f64).max(0.0)),
                _ => None,
            };

            BurndownPoint {
                day,
                ideal_remaining,
                actual_remaining,
            }
        })
        .collect();

    BurndownReport {
        sprint_id: sprint.id,
        total_points,
        points,
    }
}

pub fn team_metrics(per_sprint: &[SprintMetrics]) -> TeamMetrics {
    let count = per_sprint.len() as i64;
    if count == 0 {
        return TeamMetrics {
            sprints_completed: 0,
            average_velocity: 0.0,
            average_completion_rate: 0.0,
        };
    }

    let velocity_sum: i64 = per_sprint.iter().map(|m| m.completed_points).sum();
    let rate_sum: f64 = per_sprint.iter().map(|m| m.completion_rate).sum();

    TeamMetrics {
        sprints_completed: count,
        average_velocity: velocity_sum as f64 / count as f64,
        average_completion_rate: rate_sum / count as f64,
    }
}

pub fn epic_progress(epic: &Epic, stories: &[Story]) -> EpicProgress {
    let (total_points, completed_points) = points_of(stories);
    let total_stories = stories.len() as i64;
    let completed_stories = stories.iter().filter(|s| s.status == StoryStatus::Done).count() as i64;

    let progress_percentage = if total_points > 0 {
        (completed_points as f64 / total_points as f64) * 100.0
    } else {
        0.0
    };

    EpicProgress {
        epic_id: epic.id,
        name: epic.name.clone(),
        total_stories,
        completed_stories,
        total_points,
        completed_points,
        progress_percentage,
    }
}

pub fn workload(stories: &[Story]) -> Vec<WorkloadItem> {
    let mut buckets: std::collections::HashMap<Option<crate::types::UserId>, WorkloadItem> = std::collections::HashMap::new();

    for story in stories {
        let item = buckets.entry(story.assignee).or_insert_with(|| WorkloadItem {
            assignee: story.assignee,
            story_count: 0,
            total_points: 0,
            completed_points: 0,
        });
        item.story_count += 1;
        item.total_points += story.points as i64;
        if story.status == StoryStatus::Done {
            item.completed_points += story.points as i64;
        }
    }

    // Heaviest load first; the unassigned bucket sorts by its totals like any other
    let mut items: Vec<WorkloadItem> = buckets.into_values().collect();
    items.sort_by(|a, b| b.total_points.cmp(&a.total_points).then(b.story_count.cmp(&a.story_count)));
    items
}
