use crate::edinet::statement::{Scope, StatementKind, Taxonomy};
use once_cell::sync::Lazy;
use regex::Regex;

/// The statement table embedded in a filing, still entity-escaped as it
/// appears inside the XBRL text block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub kind: StatementKind,
    pub scope: Scope,
    pub taxonomy: Taxonomy,
    pub element: &'static str,
    pub html: String,
}

/// Picks the one statement fragment to extract for a statement kind.
pub trait FragmentSelector: Send + Sync {
    fn select(&self, body: &str, kind: StatementKind) -> Option<Fragment>;
}

struct Candidate {
    kind: StatementKind,
    scope: Scope,
    taxonomy: Taxonomy,
    element: &'static str,
    pattern: Regex,
}

// Listed in priority order within each kind.
const TEXT_BLOCKS: &[(StatementKind, Scope, Taxonomy, &str)] = &[
    (
        StatementKind::BalanceSheet,
        Scope::Consolidated,
        Taxonomy::Ifrs,
        "jpigp_cor:ConsolidatedStatementOfFinancialPositionIFRSTextBlock",
    ),
    (
        StatementKind::BalanceSheet,
        Scope::Consolidated,
        Taxonomy::Domestic,
        "jpcrp_cor:ConsolidatedBalanceSheetTextBlock",
    ),
    (
        StatementKind::BalanceSheet,
        Scope::Solo,
        Taxonomy::Domestic,
        "jpcrp_cor:BalanceSheetTextBlock",
    ),
    (
        StatementKind::IncomeStatement,
        Scope::Consolidated,
        Taxonomy::Ifrs,
        "jpigp_cor:ConsolidatedStatementOfProfitOrLossIFRSTextBlock",
    ),
    (
        StatementKind::IncomeStatement,
        Scope::Consolidated,
        Taxonomy::Domestic,
        "jpcrp_cor:ConsolidatedStatementOfIncomeTextBlock",
    ),
    (
        StatementKind::IncomeStatement,
        Scope::Solo,
        Taxonomy::Domestic,
        "jpcrp_cor:StatementOfIncomeTextBlock",
    ),
    (
        StatementKind::CashFlow,
        Scope::Consolidated,
        Taxonomy::Ifrs,
        "jpigp_cor:ConsolidatedStatementOfCashFlowsIFRSTextBlock",
    ),
    (
        StatementKind::CashFlow,
        Scope::Consolidated,
        Taxonomy::Domestic,
        "jpcrp_cor:ConsolidatedStatementOfCashFlowsTextBlock",
    ),
    (
        StatementKind::CashFlow,
        Scope::Solo,
        Taxonomy::Ifrs,
        "jpcrp_cor:StatementOfCashFlowsIFRSTextBlock",
    ),
    (
        StatementKind::CashFlow,
        Scope::Solo,
        Taxonomy::Domestic,
        "jpcrp_cor:StatementOfCashFlowsTextBlock",
    ),
];

static CANDIDATES: Lazy<Vec<Candidate>> = Lazy::new(|| {
    TEXT_BLOCKS
        .iter()
        .map(|&(kind, scope, taxonomy, element)| {
            let tag = regex::escape(element);
            let pattern = Regex::new(&format!(
                r#"(?s)<{tag}\s[^>]*contextRef="CurrentYearDuration"[^>]*>(.*?)</{tag}>"#
            ))
            .unwrap();
            Candidate {
                kind,
                scope,
                taxonomy,
                element,
                pattern,
            }
        })
        .collect()
});

static SECURITY_CODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<jpdei_cor:SecurityCodeDEI[^>]*>([0-9]+)</jpdei_cor:SecurityCodeDEI>").unwrap()
});

/// Regex-driven selector over the current-year text blocks of the filing.
///
/// IFRS consolidated wins over domestic consolidated, which wins over the solo
/// statements (IFRS solo only exists for cash flows).
#[derive(Debug, Default, Clone, Copy)]
pub struct PatternSelector;

impl FragmentSelector for PatternSelector {
    fn select(&self, body: &str, kind: StatementKind) -> Option<Fragment> {
        CANDIDATES
            .iter()
            .filter(|candidate| candidate.kind == kind)
            .find_map(|candidate| {
                let caps = candidate.pattern.captures(body)?;
                log::debug!(
                    "Selected {} fragment {} ({} {})",
                    kind,
                    candidate.element,
                    candidate.scope,
                    candidate.taxonomy
                );
                Some(Fragment {
                    kind,
                    scope: candidate.scope,
                    taxonomy: candidate.taxonomy,
                    element: candidate.element,
                    html: caps[1].to_string(),
                })
            })
    }
}

/// Securities code declared in the DEI header, if the filer is listed.
pub fn security_code(body: &str) -> Option<String> {
    SECURITY_CODE_RE
        .captures(body)
        .map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edinet::parsing::tests::FilingBuilder;

    #[test]
    fn test_missing_statement_returns_none() {
        let body = FilingBuilder::new().build();
        for kind in StatementKind::all() {
            assert!(PatternSelector.select(&body, kind).is_none());
        }
    }

    #[test]
    fn test_ifrs_consolidated_beats_domestic() {
        let body = FilingBuilder::new()
            .block("jpcrp_cor:ConsolidatedBalanceSheetTextBlock", "domestic")
            .block(
                "jpigp_cor:ConsolidatedStatementOfFinancialPositionIFRSTextBlock",
                "ifrs",
            )
            .block("jpcrp_cor:BalanceSheetTextBlock", "solo")
            .build();

        let fragment = PatternSelector
            .select(&body, StatementKind::BalanceSheet)
            .unwrap();
        assert_eq!(fragment.scope, Scope::Consolidated);
        assert_eq!(fragment.taxonomy, Taxonomy::Ifrs);
        assert_eq!(fragment.html, "ifrs");
    }

    #[test]
    fn test_consolidated_beats_solo() {
        let body = FilingBuilder::new()
            .block("jpcrp_cor:StatementOfIncomeTextBlock", "solo")
            .block("jpcrp_cor:ConsolidatedStatementOfIncomeTextBlock", "consolidated")
            .build();

        let fragment = PatternSelector
            .select(&body, StatementKind::IncomeStatement)
            .unwrap();
        assert_eq!(fragment.html, "consolidated");
    }

    #[test]
    fn test_ifrs_solo_cash_flow_beats_domestic_solo() {
        let body = FilingBuilder::new()
            .block("jpcrp_cor:StatementOfCashFlowsTextBlock", "domestic solo")
            .block("jpcrp_cor:StatementOfCashFlowsIFRSTextBlock", "ifrs solo")
            .build();

        let fragment = PatternSelector.select(&body, StatementKind::CashFlow).unwrap();
        assert_eq!(fragment.scope, Scope::Solo);
        assert_eq!(fragment.taxonomy, Taxonomy::Ifrs);
        assert_eq!(fragment.html, "ifrs solo");
    }

    #[test]
    fn test_prior_year_context_is_ignored() {
        let body = FilingBuilder::new()
            .block_with_context(
                "jpcrp_cor:BalanceSheetTextBlock",
                "Prior1YearDuration",
                "prior",
            )
            .build();
        assert!(PatternSelector
            .select(&body, StatementKind::BalanceSheet)
            .is_none());
    }

    #[test]
    fn test_selection_is_deterministic_across_lines() {
        let body = FilingBuilder::new()
            .block("jpcrp_cor:BalanceSheetTextBlock", "line one\nline two")
            .build();
        let first = PatternSelector.select(&body, StatementKind::BalanceSheet);
        let second = PatternSelector.select(&body, StatementKind::BalanceSheet);
        assert_eq!(first, second);
        assert_eq!(first.unwrap().html, "line one\nline two");
    }

    #[test]
    fn test_security_code() {
        let body = FilingBuilder::new().security_code("72030").build();
        assert_eq!(security_code(&body).as_deref(), Some("72030"));
        assert_eq!(security_code("<xbrli:xbrl/>"), None);
    }
}
