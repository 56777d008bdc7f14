mod engine;
mod solver;
mod types;

pub use engine::{amortization_schedule, monthly_payment, project};
pub use solver::{
    BreakEvenConfig, BreakEvenIteration, BreakEvenResult, GoalType, SolveError, break_even_year,
    solve_break_even,
};
pub use types::{AmortizationYear, Inputs, Projection, YearSnapshot};
