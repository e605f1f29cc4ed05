//! Allocation schedule: which jobs reach which traders, and when.
//!
//! The schedule is the external collaborator that (re)populates trader job
//! queues at (day, timestep) boundaries. Entries either address a specific
//! day or apply to every day at the given timestep — the latter is how the
//! common "same allocation every morning" setup is expressed.

use std::collections::HashMap;

use types::{Day, Timestep, TraderId, TraderOrder};

/// One trader's job list within a schedule entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub trader: TraderId,
    pub jobs: Vec<TraderOrder>,
}

/// Mapping of (day, timestep) to the assignments due at that point.
#[derive(Debug, Clone, Default)]
pub struct AllocationSchedule {
    every_day: HashMap<Timestep, Vec<Assignment>>,
    by_day: HashMap<(Day, Timestep), Vec<Assignment>>,
}

impl AllocationSchedule {
    /// Create an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an assignment due every day at the given timestep.
    pub fn add_every_day(&mut self, timestep: Timestep, assignment: Assignment) {
        self.every_day.entry(timestep).or_default().push(assignment);
    }

    /// Register an assignment due once, at the given day and timestep.
    pub fn add_for_day(&mut self, day: Day, timestep: Timestep, assignment: Assignment) {
        self.by_day.entry((day, timestep)).or_default().push(assignment);
    }

    /// All assignments due at (day, timestep): the every-day entries first,
    /// then the day-specific ones.
    pub fn assignments_for(&self, day: Day, timestep: Timestep) -> impl Iterator<Item = &Assignment> {
        self.every_day
            .get(&timestep)
            .into_iter()
            .flatten()
            .chain(self.by_day.get(&(day, timestep)).into_iter().flatten())
    }

    /// The uniform schedule: every trader re-receives the same single job
    /// at the start of every trading day.
    pub fn uniform(jobs: impl IntoIterator<Item = (TraderId, TraderOrder)>) -> Self {
        let mut schedule = Self::new();
        for (trader, job) in jobs {
            schedule.add_every_day(
                0,
                Assignment {
                    trader,
                    jobs: vec![job],
                },
            );
        }
        schedule
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::Side;

    fn job(limit: f64) -> TraderOrder {
        TraderOrder::new(Side::Bid, limit, 1)
    }

    #[test]
    fn test_every_day_entries_fire_each_day() {
        let schedule = AllocationSchedule::uniform(vec![
            (TraderId(1), job(10.0)),
            (TraderId(2), job(11.0)),
        ]);

        for day in 0..3 {
            let due: Vec<_> = schedule.assignments_for(day, 0).collect();
            assert_eq!(due.len(), 2);
        }
        assert_eq!(schedule.assignments_for(0, 1).count(), 0);
    }

    #[test]
    fn test_day_specific_entries() {
        let mut schedule = AllocationSchedule::new();
        schedule.add_for_day(
            1,
            50,
            Assignment {
                trader: TraderId(3),
                jobs: vec![job(20.0)],
            },
        );

        assert_eq!(schedule.assignments_for(0, 50).count(), 0);
        assert_eq!(schedule.assignments_for(1, 50).count(), 1);
        assert_eq!(schedule.assignments_for(2, 50).count(), 0);
    }

    #[test]
    fn test_every_day_and_specific_combine() {
        let mut schedule = AllocationSchedule::uniform(vec![(TraderId(1), job(10.0))]);
        schedule.add_for_day(
            2,
            0,
            Assignment {
                trader: TraderId(1),
                jobs: vec![job(30.0)],
            },
        );

        let due: Vec<_> = schedule.assignments_for(2, 0).collect();
        assert_eq!(due.len(), 2);
        // Day-specific entries come after the every-day ones, so the last
        // assignment applied wins for the same trader.
        assert_eq!(due[1].jobs[0].limit_price, 30.0);
    }
}
