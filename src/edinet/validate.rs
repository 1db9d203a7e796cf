use crate::edinet::statement::ArtifactKind;
use crate::edinet::summary::{BsSummary, CfSummary, Fundamental, PlSummary};
use serde::Serialize;

pub fn balance_sheet_is_valid(summary: &BsSummary) -> bool {
    summary.meta.is_identified()
        && [
            summary.current_assets,
            summary.tangible_assets,
            summary.intangible_assets,
            summary.investments_and_other_assets,
            summary.current_liabilities,
            summary.fixed_liabilities,
            summary.net_assets,
        ]
        .iter()
        .all(|value| value.is_present())
}

/// Statements laid out as operating revenue / operating cost only need those
/// two lines. Everything else needs the classic sales-to-operating-profit set.
pub fn income_statement_is_valid(summary: &PlSummary) -> bool {
    if summary.has_operating_revenue && summary.has_operating_cost {
        return summary.operating_revenue.is_present() && summary.operating_cost.is_present();
    }
    summary.meta.is_identified()
        && summary.cost_of_goods_sold.is_present()
        && summary.sg_and_a.is_present()
        && summary.sales.is_present()
        && summary.operating_profit.is_present()
}

/// Opening and closing cash balances are not required.
pub fn cash_flow_is_valid(summary: &CfSummary) -> bool {
    summary.meta.is_identified()
        && summary.operating_cf.is_present()
        && summary.investing_cf.is_present()
        && summary.financing_cf.is_present()
}

pub fn fundamental_is_valid(fundamental: &Fundamental) -> bool {
    let identified = !fundamental.company_name.is_empty()
        && !fundamental.period_start.is_empty()
        && !fundamental.period_end.is_empty();
    if !identified || fundamental.operating_profit == 0 {
        return false;
    }
    if fundamental.liabilities == 0 || fundamental.net_assets == 0 {
        return false;
    }
    if fundamental.has_operating_revenue && fundamental.has_operating_cost {
        fundamental.operating_revenue != 0 && fundamental.operating_cost != 0
    } else {
        fundamental.sales != 0
    }
}

/// Diagnostic record of one validation decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub kind: ArtifactKind,
    pub valid: bool,
    pub detail: String,
}

impl ValidationOutcome {
    pub fn new<T: Serialize>(kind: ArtifactKind, valid: bool, summary: &T) -> Self {
        let detail = serde_json::to_string_pretty(summary).unwrap_or_default();
        Self {
            kind,
            valid,
            detail,
        }
    }

    pub fn log(&self, company_name: &str) {
        if self.valid {
            log::info!("{} {} summary is valid", company_name, self.kind);
        } else {
            log::warn!(
                "{} {} summary is incomplete:\n{}",
                company_name,
                self.kind,
                self.detail
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edinet::parsing::TitleValue;
    use crate::edinet::statement::StatementKind;
    use crate::edinet::summary::StatementMeta;

    fn meta() -> StatementMeta {
        StatementMeta::new("テスト株式会社", "2023-04-01", "2024-03-31")
    }

    fn full_balance_sheet() -> BsSummary {
        let v = TitleValue::new(1, 2);
        BsSummary {
            meta: meta(),
            current_assets: v,
            tangible_assets: v,
            intangible_assets: v,
            investments_and_other_assets: v,
            current_liabilities: v,
            fixed_liabilities: v,
            net_assets: v,
        }
    }

    #[test]
    fn test_balance_sheet_needs_every_total() {
        assert!(balance_sheet_is_valid(&full_balance_sheet()));

        let mut missing = full_balance_sheet();
        missing.intangible_assets = TitleValue::default();
        assert!(!balance_sheet_is_valid(&missing));

        let mut anonymous = full_balance_sheet();
        anonymous.meta.company_name.clear();
        assert!(!balance_sheet_is_valid(&anonymous));
    }

    #[test]
    fn test_income_statement_revenue_cost_path() {
        let summary = PlSummary {
            has_operating_revenue: true,
            has_operating_cost: true,
            operating_revenue: TitleValue::new(0, 10),
            operating_cost: TitleValue::new(0, 8),
            ..Default::default()
        };
        // Only the two lines matter, not even the company name.
        assert!(income_statement_is_valid(&summary));

        let without_cost = PlSummary {
            operating_cost: TitleValue::default(),
            ..summary
        };
        assert!(!income_statement_is_valid(&without_cost));
    }

    #[test]
    fn test_income_statement_classic_path() {
        let v = TitleValue::new(5, 6);
        let summary = PlSummary {
            meta: meta(),
            cost_of_goods_sold: v,
            sg_and_a: v,
            sales: v,
            operating_profit: v,
            has_operating_revenue: true,
            ..Default::default()
        };
        assert!(income_statement_is_valid(&summary));

        let no_sga = PlSummary {
            sg_and_a: TitleValue::default(),
            ..summary
        };
        assert!(!income_statement_is_valid(&no_sga));
    }

    #[test]
    fn test_cash_flow_ignores_cash_balances() {
        let v = TitleValue::new(-3, 4);
        let summary = CfSummary {
            meta: meta(),
            operating_cf: v,
            investing_cf: v,
            financing_cf: v,
            ..Default::default()
        };
        assert!(cash_flow_is_valid(&summary));

        let no_financing = CfSummary {
            financing_cf: TitleValue::default(),
            ..summary
        };
        assert!(!cash_flow_is_valid(&no_financing));
    }

    #[test]
    fn test_fundamentals_both_paths() {
        let mut fundamental = Fundamental::new("テスト株式会社", "2023-04-01", "2024-03-31");
        fundamental.operating_profit = 10;
        fundamental.liabilities = 20;
        fundamental.net_assets = 30;
        assert!(!fundamental_is_valid(&fundamental));

        fundamental.sales = 100;
        assert!(fundamental_is_valid(&fundamental));

        fundamental.has_operating_revenue = true;
        fundamental.has_operating_cost = true;
        assert!(!fundamental_is_valid(&fundamental));

        fundamental.operating_revenue = 90;
        fundamental.operating_cost = 80;
        assert!(fundamental_is_valid(&fundamental));
    }

    #[test]
    fn test_outcome_carries_json_detail() {
        let outcome = ValidationOutcome::new(
            StatementKind::CashFlow.into(),
            false,
            &CfSummary::default(),
        );
        assert!(outcome.detail.contains("\"operating_cf\""));
        assert_eq!(outcome.kind.code(), "CF");
    }
}
