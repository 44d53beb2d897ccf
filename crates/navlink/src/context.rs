//! Run context providing stage timing and oracle call accounting
//!
//! Messages go through the `log` facade; the context only keeps what a
//! caller may want to inspect after a run: how long each stage took and how
//! many host queries were issued.

use std::collections::HashMap;
use std::time::Duration;
use web_time::Instant;

/// Timer categories for the analysis stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerCategory {
    /// Whole analysis run
    Total,
    /// Triangle collection
    Collect,
    /// Surface sampling
    Sample,
    /// Grid construction and binning
    Grid,
    /// Flood-fill clustering
    Cluster,
    /// Oracle-driven region merging
    Merge,
    /// Class probing and link selection
    Link,
}

/// Accumulated timing for one category
#[derive(Debug, Clone, Copy, Default)]
pub struct TimerEntry {
    /// Total time spent
    pub duration: Duration,
    /// Number of times the timer was stopped
    pub count: usize,
}

/// Counters of work performed during a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisStats {
    /// Triangles kept after collection
    pub triangles: usize,
    /// Sample attempts made
    pub sample_attempts: usize,
    /// Triangles needing more than [`LARGE_TRIANGLE_SAMPLES`] attempts
    ///
    /// [`LARGE_TRIANGLE_SAMPLES`]: crate::sampler::LARGE_TRIANGLE_SAMPLES
    pub large_triangles: usize,
    /// Samples that snapped onto the surface
    pub samples: usize,
    /// Grid cells holding a sample
    pub occupied_cells: usize,
    /// Regions found by flood fill
    pub initial_regions: usize,
    /// Regions absorbed by merging
    pub merges: usize,
    /// Regions touching both classes
    pub qualifying_regions: usize,
    /// Link pairs emitted
    pub links: usize,
    /// Surface snap queries issued to the host
    pub snap_queries: usize,
    /// Path status queries issued to the host
    pub path_queries: usize,
}

/// Context for one analysis run
#[derive(Debug)]
pub struct AnalysisContext {
    active_timers: HashMap<TimerCategory, Instant>,
    timers: HashMap<TimerCategory, TimerEntry>,
    /// Work counters
    pub stats: AnalysisStats,
}

impl Default for AnalysisContext {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisContext {
    /// Creates an empty context
    pub fn new() -> Self {
        Self {
            active_timers: HashMap::new(),
            timers: HashMap::new(),
            stats: AnalysisStats::default(),
        }
    }

    /// Starts a timer for the given category
    pub fn start_timer(&mut self, category: TimerCategory) {
        self.active_timers.insert(category, Instant::now());
    }

    /// Stops a timer and accumulates its duration
    pub fn stop_timer(&mut self, category: TimerCategory) {
        if let Some(start_time) = self.active_timers.remove(&category) {
            let entry = self.timers.entry(category).or_default();
            entry.duration += start_time.elapsed();
            entry.count += 1;
        }
    }

    /// Starts a timer that stops when the guard is dropped
    pub fn timer(&mut self, category: TimerCategory) -> TimerGuard<'_> {
        self.start_timer(category);
        TimerGuard {
            context: self,
            category,
        }
    }

    /// Accumulated duration for a category
    pub fn timer_duration(&self, category: TimerCategory) -> Option<Duration> {
        self.timers.get(&category).map(|t| t.duration)
    }

    /// All recorded timers
    pub fn timers(&self) -> &HashMap<TimerCategory, TimerEntry> {
        &self.timers
    }

    /// Writes a one-line summary of the run to the log
    pub fn log_summary(&self) {
        let s = &self.stats;
        log::info!(
            "analysis: {} triangles, {}/{} samples, {} cells, {} regions ({} merged), {} qualifying, {} links",
            s.triangles,
            s.samples,
            s.sample_attempts,
            s.occupied_cells,
            s.initial_regions,
            s.merges,
            s.qualifying_regions,
            s.links
        );
        log::info!(
            "host queries: {} snap, {} path",
            s.snap_queries,
            s.path_queries
        );
        if let Some(total) = self.timer_duration(TimerCategory::Total) {
            log::info!("total time: {:.2} ms", total.as_secs_f64() * 1000.0);
        }
    }
}

/// Stops its timer on drop
pub struct TimerGuard<'a> {
    context: &'a mut AnalysisContext,
    category: TimerCategory,
}

impl TimerGuard<'_> {
    /// Access to the context while the timer runs
    pub fn context(&mut self) -> &mut AnalysisContext {
        self.context
    }
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.context.stop_timer(self.category);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_accumulates() {
        let mut ctx = AnalysisContext::new();
        ctx.start_timer(TimerCategory::Merge);
        ctx.stop_timer(TimerCategory::Merge);
        ctx.start_timer(TimerCategory::Merge);
        ctx.stop_timer(TimerCategory::Merge);

        let entry = ctx.timers().get(&TimerCategory::Merge).unwrap();
        assert_eq!(entry.count, 2);
        assert!(ctx.timer_duration(TimerCategory::Link).is_none());
    }

    #[test]
    fn test_timer_guard() {
        let mut ctx = AnalysisContext::new();
        {
            let mut guard = ctx.timer(TimerCategory::Grid);
            guard.context().stats.occupied_cells = 3;
        }
        assert_eq!(ctx.timers()[&TimerCategory::Grid].count, 1);
        assert_eq!(ctx.stats.occupied_cells, 3);
    }
}
