use serde::Serialize;
use thiserror::Error;

use super::{Inputs, Projection, project};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoalType {
    /// Highest home price at which buying still beats renting.
    MaxHomePrice,
    /// Lowest starting rent at which buying beats renting.
    MinMonthlyRent,
}

#[derive(Debug, Clone, Copy)]
pub struct BreakEvenConfig {
    pub goal_type: GoalType,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakEvenIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_value: f64,
    pub gap: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakEvenResult {
    pub goal_type: GoalType,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
    pub solved_value: Option<f64>,
    pub achieved_buy_cost: Option<f64>,
    pub achieved_rent_cost: Option<f64>,
    pub iterations: Vec<BreakEvenIteration>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum SolveError {
    #[error("search bounds must be finite")]
    NonFiniteBounds,
    #[error("search_max must be greater than search_min")]
    EmptySearchRange,
    #[error("search_min must be >= 0")]
    NegativeSearchMin,
    #[error("tolerance must be > 0")]
    InvalidTolerance,
    #[error("max_iterations must be > 0")]
    NoIterations,
}

/// First year whose snapshot shows buying strictly cheaper than renting.
pub fn break_even_year(projection: &Projection) -> Option<u32> {
    projection
        .yearly_data
        .iter()
        .find(|snapshot| snapshot.buy_cost < snapshot.rent_cost)
        .map(|snapshot| snapshot.year)
}

pub fn solve_break_even(
    inputs: &Inputs,
    config: BreakEvenConfig,
) -> Result<BreakEvenResult, SolveError> {
    validate_config(config)?;

    let mut iterations = Vec::with_capacity(config.max_iterations as usize);
    let low_buying_wins =
        evaluate_candidate(inputs, config.goal_type, config.search_min).buying_wins();
    let high_buying_wins =
        evaluate_candidate(inputs, config.goal_type, config.search_max).buying_wins();

    let mut solved_value = None;
    let mut converged = false;
    let feasible;
    let message;

    match config.goal_type {
        GoalType::MaxHomePrice => {
            if !low_buying_wins {
                feasible = false;
                message = "Renting is cheaper even at the lowest home price searched.".to_string();
            } else if high_buying_wins {
                solved_value = Some(config.search_max);
                converged = true;
                feasible = true;
                message =
                    "Buying is still cheaper at the upper price bound; increase search max."
                        .to_string();
            } else {
                let (value, done) = bisect(inputs, config, &mut iterations, true);
                solved_value = Some(value);
                converged = done;
                feasible = true;
                message = if converged {
                    "Solved maximum home price where buying wins.".to_string()
                } else {
                    "Reached max iterations before tolerance was met; returning best estimate."
                        .to_string()
                };
            }
        }
        GoalType::MinMonthlyRent => {
            if low_buying_wins {
                solved_value = Some(config.search_min);
                converged = true;
                feasible = true;
                message = "Buying already wins at the lower rent bound.".to_string();
            } else if !high_buying_wins {
                feasible = false;
                message = "Renting is cheaper even at the highest rent searched.".to_string();
            } else {
                let (value, done) = bisect(inputs, config, &mut iterations, false);
                solved_value = Some(value);
                converged = done;
                feasible = true;
                message = if converged {
                    "Solved minimum monthly rent where buying wins.".to_string()
                } else {
                    "Reached max iterations before tolerance was met; returning best estimate."
                        .to_string()
                };
            }
        }
    }

    let mut achieved_buy_cost = None;
    let mut achieved_rent_cost = None;
    if let Some(value) = solved_value {
        let eval = evaluate_candidate(inputs, config.goal_type, value);
        achieved_buy_cost = Some(eval.buy_cost);
        achieved_rent_cost = Some(eval.rent_cost);
    }

    Ok(BreakEvenResult {
        goal_type: config.goal_type,
        search_min: config.search_min,
        search_max: config.search_max,
        tolerance: config.tolerance,
        max_iterations: config.max_iterations,
        solved_value,
        achieved_buy_cost,
        achieved_rent_cost,
        iterations,
        converged,
        feasible,
        message,
    })
}

/// Narrows `[search_min, search_max]` onto the point where buying stops
/// (or starts) winning and returns the bound on the buying side.
fn bisect(
    inputs: &Inputs,
    config: BreakEvenConfig,
    iterations: &mut Vec<BreakEvenIteration>,
    buying_wins_below: bool,
) -> (f64, bool) {
    let mut lo = config.search_min;
    let mut hi = config.search_max;
    let pick = |lo: f64, hi: f64| if buying_wins_below { lo } else { hi };

    for it in 1..=config.max_iterations {
        let mid = (lo + hi) * 0.5;
        let eval = evaluate_candidate(inputs, config.goal_type, mid);
        iterations.push(BreakEvenIteration {
            iteration: it,
            lower_bound: lo,
            upper_bound: hi,
            candidate_value: mid,
            gap: eval.gap(),
        });

        if eval.buying_wins() == buying_wins_below {
            lo = mid;
        } else {
            hi = mid;
        }

        if (hi - lo).abs() <= config.tolerance {
            return (pick(lo, hi), true);
        }
    }
    (pick(lo, hi), false)
}

#[derive(Debug, Clone, Copy)]
struct CandidateEval {
    buy_cost: f64,
    rent_cost: f64,
}

impl CandidateEval {
    fn buying_wins(self) -> bool {
        self.buy_cost < self.rent_cost
    }

    fn gap(self) -> f64 {
        self.rent_cost - self.buy_cost
    }
}

fn evaluate_candidate(
    base_inputs: &Inputs,
    goal_type: GoalType,
    candidate_value: f64,
) -> CandidateEval {
    let mut inputs = base_inputs.clone();
    match goal_type {
        GoalType::MaxHomePrice => inputs.home_price = candidate_value.max(0.0),
        GoalType::MinMonthlyRent => inputs.monthly_rent = candidate_value.max(0.0),
    }

    let projection = project(&inputs);
    CandidateEval {
        buy_cost: projection.final_buy_cost,
        rent_cost: projection.final_rent_cost,
    }
}

fn validate_config(config: BreakEvenConfig) -> Result<(), SolveError> {
    if !config.search_min.is_finite() || !config.search_max.is_finite() {
        return Err(SolveError::NonFiniteBounds);
    }
    if config.search_min < 0.0 {
        return Err(SolveError::NegativeSearchMin);
    }
    if config.search_max <= config.search_min {
        return Err(SolveError::EmptySearchRange);
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err(SolveError::InvalidTolerance);
    }
    if config.max_iterations == 0 {
        return Err(SolveError::NoIterations);
    }
    Ok(())
}
