//! Turns a time window into the layered overview/summary/details digest.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use vulnwatch_model::{
    CategoryCounts, EventDigest, EventGroup, Overview, Project, ProjectDetails, ProjectSummary,
};

use crate::store::{EventStore, StoreError};

/// Aggregation failure — the store was unreachable mid-window. There is no
/// partial aggregation; the caller aborts the run.
#[derive(Debug, thiserror::Error)]
#[error("event aggregation failed: {source}")]
pub struct AggregationError {
    #[from]
    source: StoreError,
}

/// Pure read + transform over the event store for the duration of one
/// query. Deterministic for a fixed window and store snapshot.
pub struct EventAggregator<'a> {
    store: &'a dyn EventStore,
}

impl<'a> EventAggregator<'a> {
    pub fn new(store: &'a dyn EventStore) -> Self {
        Self { store }
    }

    /// Aggregate one group's events since `window_start` over the rule's
    /// resolved projects.
    ///
    /// - `Overview.new_count` counts non-suppressed window events across
    ///   all projects; suppressed events never contribute to it.
    /// - Summaries carry, per category: new window events, the project's
    ///   cumulative total regardless of window, and suppressed window
    ///   events (only populated when `include_suppressed` is set).
    /// - Details keep the store's query order per project; project order
    ///   follows the input slice.
    pub async fn aggregate(
        &self,
        projects: &[Project],
        window_start: DateTime<Utc>,
        group: EventGroup,
        include_suppressed: bool,
    ) -> Result<EventDigest, AggregationError> {
        let mut overview = Overview::default();
        let mut summaries = Vec::with_capacity(projects.len());
        let mut details = Vec::with_capacity(projects.len());

        for project in projects {
            let window_events = self
                .store
                .events_since(project.id, group, include_suppressed, window_start)
                .await?;
            let all_events = self
                .store
                .events_since(
                    project.id,
                    group,
                    include_suppressed,
                    DateTime::<Utc>::MIN_UTC,
                )
                .await?;

            let mut categories: BTreeMap<_, CategoryCounts> = BTreeMap::new();
            for event in &all_events {
                categories.entry(event.category).or_default().total += 1;
            }

            let mut new_here = 0usize;
            for event in &window_events {
                let counts = categories.entry(event.category).or_default();
                if event.suppressed {
                    counts.suppressed_new += 1;
                } else {
                    counts.new += 1;
                    new_here += 1;
                }
            }

            overview.new_count += new_here;
            if new_here > 0 {
                overview.affected_project_count += 1;
            }

            summaries.push(ProjectSummary {
                project: project.clone(),
                categories,
            });
            details.push(ProjectDetails {
                project: project.clone(),
                events: window_events,
            });
        }

        Ok(EventDigest {
            overview,
            summaries,
            details,
        })
    }
}
