use serde::Serialize;

/// Assumptions for one buy-versus-rent projection. Rates are in percent.
#[derive(Debug, Clone, PartialEq)]
pub struct Inputs {
    pub home_price: f64,
    pub down_payment_percent: f64,
    pub interest_rate: f64,
    pub loan_term: u32,
    pub monthly_rent: f64,
    pub ownership_costs_rate: f64,
    pub market_growth_rate: f64,
    pub investment_return: f64,
    pub years_to_compare: u32,
}

/// Cumulative net cost of each path at the end of `year`, rounded to whole units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearSnapshot {
    pub year: u32,
    pub buy_cost: f64,
    pub rent_cost: f64,
}

/// Unrounded breakdown of a single projected year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationYear {
    pub year: u32,
    pub interest_paid: f64,
    pub principal_paid: f64,
    pub mortgage_paid: f64,
    pub ownership_costs: f64,
    pub rent_paid: f64,
    pub ending_balance: f64,
    pub home_value: f64,
    pub equity: f64,
    pub investment_balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub yearly_data: Vec<YearSnapshot>,
    pub monthly_mortgage: f64,
    pub final_buy_cost: f64,
    pub final_rent_cost: f64,
    pub difference: f64,
    pub is_buying_cheaper: bool,
    pub equity_built: f64,
    pub down_payment: f64,
    pub loan_amount: f64,
    pub total_mortgage_paid: f64,
    pub total_interest_paid: f64,
    pub total_principal_paid: f64,
    pub total_ownership_costs_paid: f64,
    pub total_buy_cash_out: f64,
    pub total_rent_paid: f64,
    pub net_investment_gain: f64,
    pub final_home_value: f64,
    pub remaining_loan_balance: f64,
}
