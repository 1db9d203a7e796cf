use super::types::{ParsedRow, Row};
use html_escape::decode_html_entities;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static TABLE_OPEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<table[^>]*>").unwrap());
static WIDTH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)width\s*:[^;"']*;?"#).unwrap());
static COLGROUP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<colgroup.*?</colgroup>").unwrap());

static ROW_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static CELL_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("td, th").unwrap());

/// Turns an escaped text block into displayable HTML: entities decoded, fixed
/// table widths and column groups removed.
pub fn format_fragment(raw: &str) -> String {
    let decoded = decode_html_entities(raw).into_owned();
    // Text blocks are sometimes escaped twice.
    let decoded = decoded.replace("&apos;", "'").replace("&nbsp;", " ");
    strip_table_styling(&decoded)
}

fn strip_table_styling(html: &str) -> String {
    let html = match TABLE_OPEN_RE.find(html) {
        Some(open) => {
            let tag = WIDTH_RE.replace_all(open.as_str(), "");
            format!("{}{}{}", &html[..open.start()], tag, &html[open.end()..])
        }
        None => html.to_string(),
    };
    COLGROUP_RE.replace_all(&html, "").into_owned()
}

/// Splits a table row into its non-blank text segments, cell boundaries and
/// embedded line breaks both acting as separators.
fn row_segments(row: ElementRef<'_>) -> Vec<String> {
    let text = row
        .select(&CELL_SELECTOR)
        .map(|cell| cell.text().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n");

    text.split('\n')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

fn classify_segments(mut segments: Vec<String>) -> Option<Row> {
    let (previous, current) = match segments.len() {
        0 | 2 => return None,
        1 => return segments.pop().map(Row::Unit),
        3 => (1, 2),
        _ => (2, 3),
    };
    Some(Row::Data(ParsedRow {
        title: segments[0].clone(),
        previous: segments[previous].clone(),
        current: segments[current].clone(),
    }))
}

/// Parses a statement fragment into its rows, in document order.
///
/// Rows with three segments read as `title, previous, current`. Wider rows
/// carry note references in the second column, so the third and fourth
/// segments hold the figures. Single-segment rows are surfaced as unit
/// captions and two-segment rows are dropped.
pub fn parse_rows(fragment: &str) -> impl Iterator<Item = Row> {
    let html = format_fragment(fragment);
    let document = Html::parse_fragment(&html);
    let rows = document
        .select(&ROW_SELECTOR)
        .filter_map(|row| classify_segments(row_segments(row)))
        .collect::<Vec<_>>();
    rows.into_iter()
}
