//! Step budget for one orchestrator run.

use thiserror::Error;

/// Node executions in one full cycle: router, retriever, plan, tools, plan,
/// verify, observe.
pub const MIN_STEP_BUDGET: u32 = 7;
pub const DEFAULT_STEP_BUDGET: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "recursion limit {budget} is too small: one plan/act cycle needs {required} steps"
)]
pub struct StepBudgetError {
    pub budget: u32,
    pub required: u32,
}

/// Refuse budgets that cannot complete a single plan/act cycle.
pub fn check_step_budget(budget: u32) -> Result<(), StepBudgetError> {
    if budget < MIN_STEP_BUDGET {
        return Err(StepBudgetError {
            budget,
            required: MIN_STEP_BUDGET,
        });
    }
    Ok(())
}

/// Fewest steps that let a run reach `max_loops` when no action is ever
/// requested: router and retriever, then plan, verify and observe per loop.
pub fn steps_for_loops(max_loops: u32) -> u32 {
    max_loops.saturating_mul(3).saturating_add(2)
}

/// Counts node executions against a fixed budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepCounter {
    used: u32,
    budget: u32,
}

impl StepCounter {
    pub fn new(budget: u32) -> Self {
        Self { used: 0, budget }
    }

    /// Consume one step. Returns `false` once the budget is spent.
    pub fn take(&mut self) -> bool {
        if self.used >= self.budget {
            return false;
        }
        self.used += 1;
        true
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_steps_count_router_and_retriever_once() {
        assert_eq!(steps_for_loops(1), 5);
        assert_eq!(steps_for_loops(10), 32);
        assert_eq!(steps_for_loops(u32::MAX), u32::MAX);
    }

    #[test]
    fn budget_below_one_cycle_is_rejected() {
        let err = check_step_budget(6).expect_err("too small");
        assert_eq!(err.required, MIN_STEP_BUDGET);
        assert!(check_step_budget(MIN_STEP_BUDGET).is_ok());
    }

    #[test]
    fn counter_stops_at_budget() {
        let mut counter = StepCounter::new(2);
        assert!(counter.take());
        assert!(counter.take());
        assert!(!counter.take());
        assert_eq!(counter.used(), 2);
    }
}
