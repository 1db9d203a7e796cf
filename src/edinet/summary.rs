use crate::edinet::parsing::TitleValue;
use serde::{Deserialize, Serialize};

/// Identity and unit shared by every statement summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementMeta {
    pub company_name: String,
    pub period_start: String,
    pub period_end: String,
    pub unit_string: String,
}

impl StatementMeta {
    pub fn new(company_name: &str, period_start: &str, period_end: &str) -> Self {
        Self {
            company_name: company_name.to_string(),
            period_start: period_start.to_string(),
            period_end: period_end.to_string(),
            unit_string: String::new(),
        }
    }

    pub fn is_identified(&self) -> bool {
        !self.company_name.is_empty() && !self.period_start.is_empty() && !self.period_end.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BsSummary {
    #[serde(flatten)]
    pub meta: StatementMeta,
    pub current_assets: TitleValue,
    pub tangible_assets: TitleValue,
    pub intangible_assets: TitleValue,
    pub investments_and_other_assets: TitleValue,
    pub current_liabilities: TitleValue,
    pub fixed_liabilities: TitleValue,
    pub net_assets: TitleValue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlSummary {
    #[serde(flatten)]
    pub meta: StatementMeta,
    pub cost_of_goods_sold: TitleValue,
    pub sg_and_a: TitleValue,
    pub sales: TitleValue,
    pub operating_profit: TitleValue,
    pub operating_revenue: TitleValue,
    pub has_operating_revenue: bool,
    pub operating_cost: TitleValue,
    pub has_operating_cost: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfSummary {
    #[serde(flatten)]
    pub meta: StatementMeta,
    pub operating_cf: TitleValue,
    pub investing_cf: TitleValue,
    pub financing_cf: TitleValue,
    pub start_cash: TitleValue,
    pub end_cash: TitleValue,
}

/// Current-period figures collected across all three statements of a filing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fundamental {
    pub company_name: String,
    pub period_start: String,
    pub period_end: String,
    pub sales: i64,
    pub operating_profit: i64,
    pub operating_revenue: i64,
    pub has_operating_revenue: bool,
    pub operating_cost: i64,
    pub has_operating_cost: bool,
    pub liabilities: i64,
    pub net_assets: i64,
}

impl Fundamental {
    pub fn new(company_name: &str, period_start: &str, period_end: &str) -> Self {
        Self {
            company_name: company_name.to_string(),
            period_start: period_start.to_string(),
            period_end: period_end.to_string(),
            ..Default::default()
        }
    }
}
