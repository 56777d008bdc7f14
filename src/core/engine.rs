use super::types::{AmortizationYear, Inputs, Projection, YearSnapshot};

const MONTHS_PER_YEAR: u32 = 12;

#[derive(Debug, Clone, Copy, Default)]
struct MortgageYear {
    interest_paid: f64,
    principal_paid: f64,
}

impl MortgageYear {
    fn total_paid(self) -> f64 {
        self.interest_paid + self.principal_paid
    }
}

#[derive(Debug)]
struct Loan {
    balance: f64,
    monthly_rate: f64,
    payment: f64,
    payments_made: u32,
    scheduled_payments: u32,
}

impl Loan {
    fn new(amount: f64, annual_rate_percent: f64, loan_term_years: u32) -> Self {
        Self {
            balance: amount,
            monthly_rate: monthly_rate(annual_rate_percent),
            payment: monthly_payment(amount, annual_rate_percent, loan_term_years),
            payments_made: 0,
            scheduled_payments: scheduled_payment_count(loan_term_years),
        }
    }

    /// Applies one monthly payment and returns `(interest, principal)`, or
    /// `None` once the loan is paid off.
    fn pay_month(&mut self) -> Option<(f64, f64)> {
        if self.balance <= 0.0 {
            return None;
        }

        let interest = self.balance * self.monthly_rate;
        let mut principal = (self.payment - interest).max(0.0);
        self.payments_made += 1;

        // The last scheduled payment settles whatever float drift left behind.
        if principal > self.balance || self.payments_made >= self.scheduled_payments {
            principal = self.balance;
        }

        self.balance = (self.balance - principal).max(0.0);
        Some((interest, principal))
    }

    fn pay_year(&mut self) -> MortgageYear {
        let mut year = MortgageYear::default();
        for _ in 0..MONTHS_PER_YEAR {
            let Some((interest, principal)) = self.pay_month() else {
                break;
            };
            year.interest_paid += interest;
            year.principal_paid += principal;
        }
        year
    }
}

#[derive(Debug)]
struct ProjectionState {
    loan: Loan,
    down_payment: f64,
    home_value: f64,
    current_rent: f64,
    investment_balance: f64,
    cumulative_buy_cost: f64,
    cumulative_rent_cost: f64,
    total_interest_paid: f64,
    total_principal_paid: f64,
    total_ownership_costs: f64,
}

impl ProjectionState {
    fn new(inputs: &Inputs) -> Self {
        let down_payment = inputs.home_price * inputs.down_payment_percent / 100.0;
        let loan_amount = inputs.home_price - down_payment;

        Self {
            loan: Loan::new(loan_amount, inputs.interest_rate, inputs.loan_term),
            down_payment,
            home_value: inputs.home_price,
            current_rent: inputs.monthly_rent,
            investment_balance: down_payment,
            cumulative_buy_cost: down_payment,
            cumulative_rent_cost: 0.0,
            total_interest_paid: 0.0,
            total_principal_paid: 0.0,
            total_ownership_costs: 0.0,
        }
    }

    fn advance_year(&mut self, inputs: &Inputs, year: u32) -> AmortizationYear {
        self.home_value *= growth_factor(inputs.market_growth_rate);

        let mortgage = self.loan.pay_year();
        self.total_interest_paid += mortgage.interest_paid;
        self.total_principal_paid += mortgage.principal_paid;

        let ownership_costs = self.home_value * inputs.ownership_costs_rate / 100.0;
        self.total_ownership_costs += ownership_costs;
        self.cumulative_buy_cost += mortgage.total_paid() + ownership_costs;

        let rent_paid = self.current_rent * MONTHS_PER_YEAR as f64;
        self.cumulative_rent_cost += rent_paid;

        self.investment_balance *= growth_factor(inputs.investment_return);
        self.current_rent *= growth_factor(inputs.market_growth_rate);

        AmortizationYear {
            year,
            interest_paid: mortgage.interest_paid,
            principal_paid: mortgage.principal_paid,
            mortgage_paid: mortgage.total_paid(),
            ownership_costs,
            rent_paid,
            ending_balance: self.loan.balance,
            home_value: self.home_value,
            equity: self.equity(),
            investment_balance: self.investment_balance,
        }
    }

    fn equity(&self) -> f64 {
        self.home_value - self.loan.balance
    }

    fn net_investment_gain(&self) -> f64 {
        self.investment_balance - self.down_payment
    }

    fn opening_snapshot(&self) -> YearSnapshot {
        YearSnapshot {
            year: 0,
            buy_cost: self.down_payment.round(),
            rent_cost: 0.0,
        }
    }

    fn snapshot(&self, year: u32) -> YearSnapshot {
        YearSnapshot {
            year,
            buy_cost: (self.cumulative_buy_cost - self.equity()).round(),
            rent_cost: (self.cumulative_rent_cost - self.net_investment_gain()).round(),
        }
    }
}

/// Level monthly payment that fully amortizes `loan_amount` over
/// `loan_term_years`. A zero rate amortizes in a straight line.
pub fn monthly_payment(loan_amount: f64, annual_rate_percent: f64, loan_term_years: u32) -> f64 {
    let payments = scheduled_payment_count(loan_term_years) as f64;
    let rate = monthly_rate(annual_rate_percent);
    if rate == 0.0 {
        return loan_amount / payments;
    }

    let compounded = (1.0 + rate).powf(payments);
    let denom = compounded - 1.0;
    if denom == 0.0 {
        return loan_amount / payments;
    }
    loan_amount * rate * compounded / denom
}

pub fn project(inputs: &Inputs) -> Projection {
    let mut state = ProjectionState::new(inputs);
    let mut yearly_data = Vec::with_capacity(inputs.years_to_compare as usize + 1);

    let mut last = state.opening_snapshot();
    let mut equity_built = 0.0;
    yearly_data.push(last);

    for year in 1..=inputs.years_to_compare {
        let row = state.advance_year(inputs, year);
        equity_built = row.equity;
        last = state.snapshot(year);
        yearly_data.push(last);
    }

    let net_investment_gain = if inputs.years_to_compare == 0 {
        0.0
    } else {
        state.net_investment_gain()
    };

    Projection {
        yearly_data,
        monthly_mortgage: state.loan.payment,
        final_buy_cost: last.buy_cost,
        final_rent_cost: last.rent_cost,
        difference: (last.buy_cost - last.rent_cost).abs(),
        is_buying_cheaper: last.buy_cost < last.rent_cost,
        equity_built,
        down_payment: state.down_payment,
        loan_amount: inputs.home_price - state.down_payment,
        total_mortgage_paid: state.total_interest_paid + state.total_principal_paid,
        total_interest_paid: state.total_interest_paid,
        total_principal_paid: state.total_principal_paid,
        total_ownership_costs_paid: state.total_ownership_costs,
        total_buy_cash_out: state.cumulative_buy_cost,
        total_rent_paid: state.cumulative_rent_cost,
        net_investment_gain,
        final_home_value: state.home_value,
        remaining_loan_balance: state.loan.balance,
    }
}

pub fn amortization_schedule(inputs: &Inputs) -> Vec<AmortizationYear> {
    let mut state = ProjectionState::new(inputs);
    (1..=inputs.years_to_compare)
        .map(|year| state.advance_year(inputs, year))
        .collect()
}

fn monthly_rate(annual_rate_percent: f64) -> f64 {
    annual_rate_percent / 100.0 / MONTHS_PER_YEAR as f64
}

fn scheduled_payment_count(loan_term_years: u32) -> u32 {
    loan_term_years.saturating_mul(MONTHS_PER_YEAR).max(1)
}

fn growth_factor(rate_percent: f64) -> f64 {
    1.0 + rate_percent / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn sample_inputs() -> Inputs {
        Inputs {
            home_price: 400_000.0,
            down_payment_percent: 20.0,
            interest_rate: 6.5,
            loan_term: 30,
            monthly_rent: 2_000.0,
            ownership_costs_rate: 2.0,
            market_growth_rate: 3.0,
            investment_return: 7.0,
            years_to_compare: 20,
        }
    }

    #[test]
    fn sample_scenario_matches_annuity_payment_and_length() {
        let inputs = sample_inputs();
        let projection = project(&inputs);

        assert_approx_tol(projection.monthly_mortgage, 2_022.62, 0.01);
        assert_eq!(projection.yearly_data.len(), 21);
        assert_approx(projection.down_payment, 80_000.0);
        assert_approx(projection.loan_amount, 320_000.0);

        let schedule = amortization_schedule(&inputs);
        for pair in schedule.windows(2) {
            assert!(pair[1].rent_paid > pair[0].rent_paid);
        }
        let total_rent: f64 = schedule.iter().map(|row| row.rent_paid).sum();
        assert_approx_tol(projection.total_rent_paid, total_rent, 1e-6);
    }

    #[test]
    fn sample_scenario_summary_is_consistent_with_running_totals() {
        let projection = project(&sample_inputs());
        let last = projection.yearly_data[projection.yearly_data.len() - 1];

        assert_approx(projection.final_buy_cost, last.buy_cost);
        assert_approx(projection.final_rent_cost, last.rent_cost);
        assert_approx(
            projection.difference,
            (last.buy_cost - last.rent_cost).abs(),
        );
        assert_eq!(
            projection.is_buying_cheaper,
            last.buy_cost < last.rent_cost
        );
        assert_approx_tol(
            projection.total_buy_cash_out,
            projection.down_payment
                + projection.total_mortgage_paid
                + projection.total_ownership_costs_paid,
            1e-6,
        );
        assert_approx_tol(
            projection.equity_built,
            projection.final_home_value - projection.remaining_loan_balance,
            1e-6,
        );
        assert_approx_tol(
            projection.final_buy_cost,
            (projection.total_buy_cash_out - projection.equity_built).round(),
            EPS,
        );
        assert_approx_tol(
            projection.final_rent_cost,
            (projection.total_rent_paid - projection.net_investment_gain).round(),
            EPS,
        );
        assert_approx_tol(
            projection.net_investment_gain,
            80_000.0 * 1.07_f64.powi(20) - 80_000.0,
            1e-6,
        );
    }

    #[test]
    fn zero_interest_uses_straight_line_payment() {
        assert_eq!(monthly_payment(100_000.0, 0.0, 10), 100_000.0 / 120.0);

        let mut inputs = sample_inputs();
        inputs.home_price = 125_000.0;
        inputs.interest_rate = 0.0;
        inputs.loan_term = 10;
        let projection = project(&inputs);
        assert_approx(projection.loan_amount, 100_000.0);
        assert_eq!(projection.monthly_mortgage, 100_000.0 / 120.0);
        assert_approx_tol(projection.total_interest_paid, 0.0, EPS);
    }

    #[test]
    fn zero_horizon_reports_only_the_down_payment() {
        let mut inputs = sample_inputs();
        inputs.years_to_compare = 0;
        let projection = project(&inputs);

        assert_eq!(
            projection.yearly_data,
            vec![YearSnapshot {
                year: 0,
                buy_cost: 80_000.0,
                rent_cost: 0.0,
            }]
        );
        assert_approx(projection.total_mortgage_paid, 0.0);
        assert_approx(projection.total_ownership_costs_paid, 0.0);
        assert_approx(projection.total_rent_paid, 0.0);
        assert_approx(projection.net_investment_gain, 0.0);
        assert_approx(projection.equity_built, 0.0);
        assert_approx(projection.total_buy_cash_out, 80_000.0);
        assert!(!projection.is_buying_cheaper);
        assert!(amortization_schedule(&inputs).is_empty());
    }

    #[test]
    fn single_year_applies_every_step_once() {
        let inputs = Inputs {
            home_price: 100_000.0,
            down_payment_percent: 20.0,
            interest_rate: 0.0,
            loan_term: 10,
            monthly_rent: 1_000.0,
            ownership_costs_rate: 1.0,
            market_growth_rate: 10.0,
            investment_return: 5.0,
            years_to_compare: 1,
        };
        let projection = project(&inputs);

        assert_eq!(projection.yearly_data.len(), 2);
        assert_eq!(projection.yearly_data[0].buy_cost, 20_000.0);
        assert_eq!(projection.yearly_data[0].rent_cost, 0.0);

        // 20k down + 8k mortgage + 1.1k ownership - (110k value - 72k balance)
        assert_eq!(projection.yearly_data[1].buy_cost, -8_900.0);
        // 12k rent - 1k investment gain
        assert_eq!(projection.yearly_data[1].rent_cost, 11_000.0);

        assert_approx_tol(projection.total_mortgage_paid, 8_000.0, 1e-6);
        assert_approx_tol(projection.total_ownership_costs_paid, 1_100.0, 1e-6);
        assert_approx_tol(projection.equity_built, 38_000.0, 1e-6);
        assert_approx_tol(projection.net_investment_gain, 1_000.0, 1e-6);
        assert!(projection.is_buying_cheaper);
        assert_approx(projection.difference, 19_900.0);
    }

    #[test]
    fn ownership_costs_track_appreciated_value() {
        let mut inputs = sample_inputs();
        inputs.years_to_compare = 3;
        let schedule = amortization_schedule(&inputs);

        for row in &schedule {
            assert_approx_tol(row.ownership_costs, row.home_value * 0.02, 1e-9);
        }
        assert_approx_tol(schedule[0].home_value, 412_000.0, 1e-6);
        assert_approx_tol(schedule[2].home_value, 400_000.0 * 1.03_f64.powi(3), 1e-6);
    }

    #[test]
    fn rent_grows_after_it_is_paid() {
        let mut inputs = sample_inputs();
        inputs.years_to_compare = 2;
        let schedule = amortization_schedule(&inputs);

        assert_approx(schedule[0].rent_paid, 24_000.0);
        assert_approx_tol(schedule[1].rent_paid, 24_720.0, 1e-6);
    }

    #[test]
    fn loan_is_paid_off_exactly_at_term() {
        let mut inputs = sample_inputs();
        inputs.years_to_compare = 35;
        let schedule = amortization_schedule(&inputs);

        assert!(schedule[28].ending_balance > 0.0);
        assert_eq!(schedule[29].ending_balance, 0.0);
        for row in &schedule[30..] {
            assert_eq!(row.ending_balance, 0.0);
            assert_eq!(row.mortgage_paid, 0.0);
        }

        let projection = project(&inputs);
        assert_eq!(projection.remaining_loan_balance, 0.0);
        assert_approx_tol(projection.total_principal_paid, 320_000.0, 1e-6);
    }

    #[test]
    fn monthly_simulation_matches_closed_form_interest_over_full_term() {
        let mut inputs = sample_inputs();
        inputs.years_to_compare = inputs.loan_term;
        let projection = project(&inputs);

        let closed_form_interest = projection.monthly_mortgage * 360.0 - projection.loan_amount;
        assert_approx_tol(projection.total_interest_paid, closed_form_interest, 1e-4);
    }

    #[test]
    fn full_down_payment_means_no_mortgage() {
        let mut inputs = sample_inputs();
        inputs.down_payment_percent = 100.0;
        let projection = project(&inputs);

        assert_approx(projection.monthly_mortgage, 0.0);
        assert_approx(projection.total_mortgage_paid, 0.0);
        assert_approx(projection.remaining_loan_balance, 0.0);
        assert_approx(projection.equity_built, projection.final_home_value);
    }

    #[test]
    fn zero_term_loan_is_due_in_first_payment() {
        let mut inputs = sample_inputs();
        inputs.loan_term = 0;
        inputs.years_to_compare = 2;
        let schedule = amortization_schedule(&inputs);

        assert!(schedule[0].mortgage_paid.is_finite());
        assert_eq!(schedule[0].ending_balance, 0.0);
        assert_approx_tol(schedule[0].principal_paid, 320_000.0, 1e-6);
        assert_eq!(schedule[1].mortgage_paid, 0.0);
    }

    #[test]
    fn negative_growth_shrinks_home_value_and_rent() {
        let mut inputs = sample_inputs();
        inputs.market_growth_rate = -2.0;
        inputs.years_to_compare = 5;
        let schedule = amortization_schedule(&inputs);

        for pair in schedule.windows(2) {
            assert!(pair[1].home_value < pair[0].home_value);
            assert!(pair[1].rent_paid < pair[0].rent_paid);
        }
    }

    #[test]
    fn ties_report_renting_as_cheaper() {
        let inputs = Inputs {
            home_price: 0.0,
            down_payment_percent: 20.0,
            interest_rate: 6.5,
            loan_term: 30,
            monthly_rent: 0.0,
            ownership_costs_rate: 2.0,
            market_growth_rate: 3.0,
            investment_return: 7.0,
            years_to_compare: 10,
        };
        let projection = project(&inputs);

        assert_eq!(projection.final_buy_cost, projection.final_rent_cost);
        assert!(!projection.is_buying_cheaper);
        assert_approx(projection.difference, 0.0);
    }

    #[test]
    fn repeated_projection_is_bit_identical() {
        let inputs = sample_inputs();
        assert_eq!(project(&inputs), project(&inputs));
        assert_eq!(amortization_schedule(&inputs), amortization_schedule(&inputs));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_projection_shape_and_balance_invariants(
            home_price in 0u32..2_000_000,
            down_bp in 0u32..=10_000,
            rate_bp in 0u32..1_500,
            loan_term in 1u32..41,
            rent in 0u32..10_000,
            ownership_bp in 0u32..500,
            growth_bp in -500i32..1_000,
            return_bp in -500i32..1_500,
            years in 0u32..50
        ) {
            let inputs = Inputs {
                home_price: home_price as f64,
                down_payment_percent: down_bp as f64 / 100.0,
                interest_rate: rate_bp as f64 / 100.0,
                loan_term,
                monthly_rent: rent as f64,
                ownership_costs_rate: ownership_bp as f64 / 100.0,
                market_growth_rate: growth_bp as f64 / 100.0,
                investment_return: return_bp as f64 / 100.0,
                years_to_compare: years,
            };
            let projection = project(&inputs);

            prop_assert_eq!(projection.yearly_data.len(), years as usize + 1);
            for (idx, snapshot) in projection.yearly_data.iter().enumerate() {
                prop_assert_eq!(snapshot.year, idx as u32);
                prop_assert!(snapshot.buy_cost.is_finite());
                prop_assert!(snapshot.rent_cost.is_finite());
            }
            prop_assert_eq!(projection.yearly_data[0].buy_cost, projection.down_payment.round());
            prop_assert_eq!(projection.yearly_data[0].rent_cost, 0.0);
            if projection.final_buy_cost == projection.final_rent_cost {
                prop_assert!(!projection.is_buying_cheaper);
            }

            let schedule = amortization_schedule(&inputs);
            let mut previous_balance = projection.loan_amount;
            for row in &schedule {
                prop_assert!(row.ending_balance >= 0.0);
                prop_assert!(row.ending_balance <= previous_balance);
                previous_balance = row.ending_balance;
            }
            if years >= loan_term {
                prop_assert_eq!(projection.remaining_loan_balance, 0.0);
            }
        }
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(48))]

        #[test]
        fn prop_non_negative_growth_is_monotonic(
            home_price in 50_000u32..2_000_000,
            rent in 0u32..10_000,
            growth_bp in 0u32..1_000,
            years in 0u32..40
        ) {
            let mut inputs = Inputs {
                home_price: home_price as f64,
                down_payment_percent: 20.0,
                interest_rate: 6.5,
                loan_term: 30,
                monthly_rent: rent as f64,
                ownership_costs_rate: 2.0,
                market_growth_rate: growth_bp as f64 / 100.0,
                investment_return: 7.0,
                years_to_compare: years,
            };
            let shorter = project(&inputs);
            inputs.years_to_compare = years + 1;
            let longer = project(&inputs);
            prop_assert!(longer.total_rent_paid >= shorter.total_rent_paid);

            let schedule = amortization_schedule(&inputs);
            let mut previous_value = inputs.home_price;
            for row in &schedule {
                prop_assert!(row.home_value >= previous_value);
                previous_value = row.home_value;
            }
        }
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(32))]

        #[test]
        fn prop_monthly_interest_matches_closed_form_over_full_term(
            loan in 1_000u32..2_000_000,
            rate_bp in 1u32..1_500,
            loan_term in 1u32..41
        ) {
            let inputs = Inputs {
                home_price: loan as f64,
                down_payment_percent: 0.0,
                interest_rate: rate_bp as f64 / 100.0,
                loan_term,
                monthly_rent: 0.0,
                ownership_costs_rate: 0.0,
                market_growth_rate: 0.0,
                investment_return: 0.0,
                years_to_compare: loan_term,
            };
            let projection = project(&inputs);
            let closed_form = projection.monthly_mortgage * (loan_term * 12) as f64
                - projection.loan_amount;
            let tol = 1e-6 * projection.loan_amount.max(1.0);
            prop_assert!(
                (projection.total_interest_paid - closed_form).abs() <= tol,
                "monthly {} vs closed form {}",
                projection.total_interest_paid,
                closed_form
            );
            prop_assert_eq!(projection.remaining_loan_balance, 0.0);
        }
    }
}
