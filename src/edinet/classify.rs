use crate::edinet::parsing::{parse_rows, AmountError, Fragment, Row, TitleValue};
use crate::edinet::statement::StatementKind;
use crate::edinet::summary::{BsSummary, CfSummary, Fundamental, PlSummary, StatementMeta};
use crate::edinet::validate;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{kind} row {title:?} could not be read: {source}")]
pub struct ExtractError {
    pub kind: StatementKind,
    pub title: String,
    #[source]
    pub source: AmountError,
}

/// A statement summary that can be filled from parsed table rows.
pub trait Statement: Serialize + Sized {
    const KIND: StatementKind;

    /// Scratch state that lives for one pass over a table.
    type Pass: Default;

    fn with_meta(meta: StatementMeta) -> Self;

    fn meta_mut(&mut self) -> &mut StatementMeta;

    fn apply(
        &mut self,
        pass: &mut Self::Pass,
        title: &str,
        value: TitleValue,
        fundamental: &mut Fundamental,
    );

    fn is_valid(&self) -> bool;
}

impl Statement for BsSummary {
    const KIND: StatementKind = StatementKind::BalanceSheet;
    type Pass = ();

    fn with_meta(meta: StatementMeta) -> Self {
        Self {
            meta,
            ..Default::default()
        }
    }

    fn meta_mut(&mut self) -> &mut StatementMeta {
        &mut self.meta
    }

    fn apply(&mut self, _: &mut (), title: &str, value: TitleValue, fundamental: &mut Fundamental) {
        match title {
            "流動資産合計" => self.current_assets = value,
            "有形固定資産合計" => self.tangible_assets = value,
            "無形固定資産合計" => self.intangible_assets = value,
            "投資その他の資産合計" => self.investments_and_other_assets = value,
            "流動負債合計" => self.current_liabilities = value,
            "固定負債合計" => self.fixed_liabilities = value,
            "純資産合計" => {
                self.net_assets = value;
                fundamental.net_assets = value.current;
            }
            "負債合計" => fundamental.liabilities = value.current,
            _ => {}
        }
    }

    fn is_valid(&self) -> bool {
        validate::balance_sheet_is_valid(self)
    }
}

/// Once a table's total line has been read, later lines with the same label
/// fragment (breakdowns, other items) no longer overwrite it.
#[derive(Debug, Default)]
pub struct IncomePass {
    revenue_total_seen: bool,
    cost_total_seen: bool,
}

impl Statement for PlSummary {
    const KIND: StatementKind = StatementKind::IncomeStatement;
    type Pass = IncomePass;

    fn with_meta(meta: StatementMeta) -> Self {
        Self {
            meta,
            ..Default::default()
        }
    }

    fn meta_mut(&mut self) -> &mut StatementMeta {
        &mut self.meta
    }

    fn apply(
        &mut self,
        pass: &mut IncomePass,
        title: &str,
        value: TitleValue,
        fundamental: &mut Fundamental,
    ) {
        if title.contains("売上原価") {
            self.cost_of_goods_sold = value;
        }
        if title.contains("販売費及び一般管理費") {
            self.sg_and_a = value;
        }
        if title.contains("売上高") {
            self.sales = value;
            fundamental.sales = value.current;
        }
        if title.contains("営業利益") {
            self.operating_profit = value;
            fundamental.operating_profit = value.current;
        }
        // Loss-only label: fills whatever the profit line left empty.
        if title == "営業損失（△）" {
            if self.operating_profit.previous == 0 {
                self.operating_profit.previous = value.previous;
            }
            if self.operating_profit.current == 0 {
                self.operating_profit.current = value.current;
            }
            if fundamental.operating_profit == 0 {
                fundamental.operating_profit = value.current;
            }
        }
        if (title.contains("営業収益") || title.contains("売上収益")) && !pass.revenue_total_seen {
            self.operating_revenue = value;
            self.has_operating_revenue = true;
            fundamental.operating_revenue = value.current;
            fundamental.has_operating_revenue = true;
            pass.revenue_total_seen = title == "営業収益合計";
        }
        if title.contains("営業費用") && !pass.cost_total_seen {
            self.operating_cost = value;
            self.has_operating_cost = true;
            fundamental.operating_cost = value.current;
            fundamental.has_operating_cost = true;
            pass.cost_total_seen = title == "営業費用合計";
        }
    }

    fn is_valid(&self) -> bool {
        validate::income_statement_is_valid(self)
    }
}

impl Statement for CfSummary {
    const KIND: StatementKind = StatementKind::CashFlow;
    type Pass = ();

    fn with_meta(meta: StatementMeta) -> Self {
        Self {
            meta,
            ..Default::default()
        }
    }

    fn meta_mut(&mut self) -> &mut StatementMeta {
        &mut self.meta
    }

    fn apply(&mut self, _: &mut (), title: &str, value: TitleValue, _: &mut Fundamental) {
        if title.contains("営業活動による") {
            self.operating_cf = value;
        }
        if title.contains("投資活動による") {
            self.investing_cf = value;
        }
        if title.contains("財務活動による") {
            self.financing_cf = value;
        }
        if title.contains("期首残高") {
            self.start_cash = value;
        }
        if title.contains("期末残高") {
            self.end_cash = value;
        }
    }

    fn is_valid(&self) -> bool {
        validate::cash_flow_is_valid(self)
    }
}

/// Reads the unit out of captions such as `（単位：百万円）`.
pub fn parse_unit(caption: &str) -> Option<String> {
    if !caption.contains("単位：") {
        return None;
    }
    let stripped: String = caption
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | '（' | '）'))
        .collect();
    stripped
        .split('：')
        .nth(1)
        .map(|unit| unit.trim().to_string())
}

/// Folds table rows into a statement summary.
///
/// `fundamental` only receives this pass's projections if the whole table was
/// read without a hard amount error.
pub fn classify<S, I>(
    rows: I,
    meta: StatementMeta,
    fundamental: &mut Fundamental,
) -> Result<S, ExtractError>
where
    S: Statement,
    I: IntoIterator<Item = Row>,
{
    let mut summary = S::with_meta(meta);
    let mut pass = S::Pass::default();
    let mut projected = fundamental.clone();

    for row in rows {
        match row {
            Row::Unit(caption) => {
                let meta = summary.meta_mut();
                if meta.unit_string.is_empty() {
                    if let Some(unit) = parse_unit(&caption) {
                        meta.unit_string = unit;
                    }
                }
            }
            Row::Data(parsed) => match parsed.title_value() {
                Ok(value) => summary.apply(&mut pass, &parsed.title, value, &mut projected),
                Err(err) if err.is_absent() => continue,
                Err(source) => {
                    return Err(ExtractError {
                        kind: S::KIND,
                        title: parsed.title,
                        source,
                    })
                }
            },
        }
    }

    *fundamental = projected;
    Ok(summary)
}

/// Parses and classifies a selected fragment.
pub fn extract<S: Statement>(
    fragment: &Fragment,
    meta: StatementMeta,
    fundamental: &mut Fundamental,
) -> Result<S, ExtractError> {
    debug_assert_eq!(fragment.kind, S::KIND);
    classify(parse_rows(&fragment.html), meta, fundamental)
}
