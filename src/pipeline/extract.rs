use crate::app::ports::PageSource;
use crate::constants::PREVIEW_ROWS;
use crate::error::{EtlError, Result};
use crate::table::{clean_text, Table, Value};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

static ROW_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());

/// How the wanted table is picked among the candidates on a page.
#[derive(Debug, Clone, PartialEq)]
pub enum TableSelector {
    /// Zero-based position among the candidates, in document order.
    Position(usize),
    /// First candidate whose header contains every listed name.
    Headers(Vec<String>),
}

impl TableSelector {
    pub fn select(&self, candidates: Vec<Table>) -> Result<Table> {
        match self {
            TableSelector::Position(index) => {
                let found = candidates.len();
                candidates
                    .into_iter()
                    .nth(*index)
                    .ok_or(EtlError::TableIndexOutOfRange {
                        index: *index,
                        found,
                    })
            }
            TableSelector::Headers(headers) => candidates
                .into_iter()
                .find(|t| t.has_columns(headers))
                .ok_or_else(|| EtlError::NoTableWithHeaders {
                    headers: headers.clone(),
                }),
        }
    }
}

/// Fetch `url`, preview every candidate table on stdout and return the selected one.
#[instrument(skip(source, selector))]
pub fn extract(
    source: &dyn PageSource,
    url: &str,
    table_class: &str,
    selector: &TableSelector,
) -> Result<Table> {
    let body = source.fetch(url)?;
    let candidates = find_tables(&body, table_class)?;
    info!("Found {} tables with class '{}'", candidates.len(), table_class);

    for (i, table) in candidates.iter().enumerate() {
        println!("Table {}:\n{}\n", i, table.head(PREVIEW_ROWS));
    }

    let table = selector.select(candidates)?;
    info!(
        "Selected table with {} rows and columns {:?}",
        table.num_rows(),
        table.columns()
    );
    Ok(table)
}

/// Parse every `<table class="...">` in `html` into a [`Table`], in document order.
pub fn find_tables(html: &str, table_class: &str) -> Result<Vec<Table>> {
    let selector = Selector::parse(&format!("table.{}", table_class)).map_err(|e| {
        EtlError::Config(format!("invalid table class '{}': {:?}", table_class, e))
    })?;
    let document = Html::parse_document(html);
    Ok(document.select(&selector).map(parse_table).collect())
}

/// Header comes from `<thead>` when present, otherwise from the first row made
/// only of `<th>` cells. Remaining rows with at least one `<td>` are data.
/// Rows of tables nested inside `element` are not part of it.
fn parse_table(element: ElementRef<'_>) -> Table {
    let mut header: Option<Vec<String>> = None;
    let mut body: Vec<Vec<Value>> = Vec::new();

    // Row spans stop at the end of their row group (thead, tbody, tfoot)
    let mut grid = SpanGrid::default();
    let mut group = None;

    for row in own_rows(element) {
        let parent = row.parent().map(|p| p.id());
        if parent != group {
            grid = SpanGrid::default();
            group = parent;
        }

        let cells = grid.place(row_cells(row));
        if cells.is_empty() {
            continue;
        }
        if in_thead(row, element) {
            if header.is_none() {
                header = Some(header_names(&cells));
            }
            continue;
        }
        let all_th = cells.iter().all(|(tag, _)| *tag == "th");
        if header.is_none() && body.is_empty() && all_th {
            header = Some(header_names(&cells));
            continue;
        }
        if all_th {
            debug!("Skipping header-only row inside table body");
            continue;
        }
        body.push(cells.iter().map(|(_, text)| Value::parse_cell(text)).collect());
    }

    let columns = match header {
        Some(names) => dedupe_columns(names),
        None => {
            let width = body.iter().map(Vec::len).max().unwrap_or(0);
            (0..width).map(|i| i.to_string()).collect()
        }
    };
    if body.iter().any(|r| r.len() != columns.len()) {
        warn!("Table rows do not all match the header width of {}", columns.len());
    }

    let mut table = Table::new(columns);
    for row in body {
        table.push_row(row);
    }
    table
}

/// `<tr>` elements whose nearest enclosing table is `table`.
fn own_rows<'a>(table: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    table.select(&ROW_SELECTOR).filter(move |row| {
        row.ancestors()
            .filter_map(ElementRef::wrap)
            .find(|a| a.value().name() == "table")
            .map_or(false, |t| t.id() == table.id())
    })
}

fn in_thead(row: ElementRef<'_>, table: ElementRef<'_>) -> bool {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .take_while(|a| a.id() != table.id())
        .any(|a| a.value().name() == "thead")
}

fn header_names(cells: &[(&'static str, String)]) -> Vec<String> {
    cells.iter().map(|(_, text)| clean_text(text)).collect()
}

struct Cell {
    tag: &'static str,
    text: String,
    rowspan: usize,
}

/// Direct `<th>`/`<td>` children of a row, expanded by `colspan`.
fn row_cells(row: ElementRef<'_>) -> Vec<Cell> {
    let mut cells = Vec::new();
    for child in row.children().filter_map(ElementRef::wrap) {
        let tag = match child.value().name() {
            "th" => "th",
            "td" => "td",
            _ => continue,
        };
        let colspan = span_attr(child, "colspan");
        let rowspan = span_attr(child, "rowspan");
        let text: String = child.text().collect();
        for _ in 0..colspan {
            cells.push(Cell {
                tag,
                text: text.clone(),
                rowspan,
            });
        }
    }
    cells
}

fn span_attr(cell: ElementRef<'_>, name: &str) -> usize {
    cell.value()
        .attr(name)
        .and_then(|s| s.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .max(1)
}

/// Cells with `rowspan > 1` still owed to the rows below, by column.
#[derive(Default)]
struct SpanGrid {
    pending: Vec<Option<(usize, &'static str, String)>>,
}

impl SpanGrid {
    /// Lay out one row: carried cells keep their column, the row's own cells
    /// fill the remaining columns left to right.
    fn place(&mut self, cells: Vec<Cell>) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        let mut own = cells.into_iter();
        let mut col = 0;
        loop {
            if let Some(slot) = self.pending.get_mut(col) {
                if let Some((left, tag, text)) = slot.take() {
                    out.push((tag, text.clone()));
                    if left > 1 {
                        *slot = Some((left - 1, tag, text));
                    }
                    col += 1;
                    continue;
                }
            }
            match own.next() {
                Some(cell) => {
                    if cell.rowspan > 1 {
                        if self.pending.len() <= col {
                            self.pending.resize(col + 1, None);
                        }
                        self.pending[col] = Some((cell.rowspan - 1, cell.tag, cell.text.clone()));
                    }
                    out.push((cell.tag, cell.text));
                }
                None => {
                    // A short row still gets the carried cells to its right
                    if !self.pending.iter().skip(col).any(Option::is_some) {
                        break;
                    }
                    out.push(("td", String::new()));
                }
            }
            col += 1;
        }
        out
    }
}

/// Repeated names get `.1`, `.2`, ... suffixes.
fn dedupe_columns(names: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    names
        .into_iter()
        .map(|name| {
            let count = seen.entry(name.clone()).or_insert(0);
            let out = if *count == 0 {
                name
            } else {
                format!("{}.{}", name, count)
            };
            *count += 1;
            out
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::StaticPage;

    fn page() -> String {
        r#"
        <html><body>
          <table class="wikitable"><tr><th>A</th></tr><tr><td>1</td></tr></table>
          <table class="infobox"><tr><th>Ignored</th></tr></table>
          <table class="wikitable sortable">
            <thead><tr><th>Rank</th><th>Bank name</th><th>Total assets</th></tr></thead>
            <tbody><tr><td>1</td><td>ICBC</td><td>6,303.44</td></tr></tbody>
          </table>
          <table class="wikitable">
            <tbody>
              <tr><th>Rank</th><th>Bank name</th><th>Market cap(US$ billion)</th></tr>
              <tr><td>1</td><td>JPMorgan Chase<sup>[1]</sup></td><td>432.92</td></tr>
              <tr><td>2</td><td>Bank of America</td><td>231.52</td></tr>
              <tr><td>3</td><td>Industrial and Commercial Bank of China</td><td>194.56</td></tr>
            </tbody>
          </table>
        </body></html>
        "#
        .to_string()
    }

    #[test]
    fn test_find_tables_by_class() {
        let tables = find_tables(&page(), "wikitable").unwrap();
        assert_eq!(tables.len(), 3);
        assert_eq!(tables[0].columns(), &["A".to_string()]);
        assert_eq!(tables[1].get(0, "Total assets"), Some(&Value::Float(6303.44)));
    }

    #[test]
    fn test_extract_by_position() {
        let source = StaticPage::new(page());
        let table = extract(&source, "http://x", "wikitable", &TableSelector::Position(2)).unwrap();

        assert_eq!(
            table.columns(),
            &["Rank", "Bank name", "Market cap(US$ billion)"]
        );
        assert_eq!(table.num_rows(), 3);
        assert_eq!(
            table.get(0, "Bank name"),
            Some(&Value::Text("JPMorgan Chase".to_string()))
        );
        assert_eq!(table.get(2, "Rank"), Some(&Value::Int(3)));
        assert_eq!(
            table.get(1, "Market cap(US$ billion)"),
            Some(&Value::Float(231.52))
        );
    }

    #[test]
    fn test_position_out_of_range_fails() {
        let html = r#"<table class="wikitable"><tr><th>A</th></tr></table>
                      <table class="wikitable"><tr><th>B</th></tr></table>"#;
        let source = StaticPage::new(html);
        let err = extract(&source, "http://x", "wikitable", &TableSelector::Position(2)).unwrap_err();
        assert!(matches!(
            err,
            EtlError::TableIndexOutOfRange { index: 2, found: 2 }
        ));
    }

    #[test]
    fn test_select_by_headers() {
        let selector = TableSelector::Headers(vec![
            "Bank name".to_string(),
            "Market cap(US$ billion)".to_string(),
        ]);
        let table = selector.select(find_tables(&page(), "wikitable").unwrap()).unwrap();
        assert_eq!(table.num_rows(), 3);

        let missing = TableSelector::Headers(vec!["Country".to_string()]);
        let err = missing.select(find_tables(&page(), "wikitable").unwrap()).unwrap_err();
        assert!(matches!(err, EtlError::NoTableWithHeaders { .. }));
    }

    #[test]
    fn test_colspan_and_duplicate_headers() {
        let html = r#"<table class="wikitable">
            <tr><th colspan="2">Cap</th><th>Name</th></tr>
            <tr><td>1</td><td>2</td><td>x</td></tr>
        </table>"#;
        let tables = find_tables(html, "wikitable").unwrap();
        assert_eq!(tables[0].columns(), &["Cap", "Cap.1", "Name"]);
        assert_eq!(tables[0].get(0, "Cap.1"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_rowspan_repeats_cell_in_covered_rows() {
        let html = r#"<table class="wikitable">
            <tr><th>Rank</th><th>Bank name</th><th>Cap</th></tr>
            <tr><td rowspan="2">1</td><td>A</td><td>100</td></tr>
            <tr><td>B</td><td>90</td></tr>
            <tr><td>3</td><td rowspan="2">C</td><td>80</td></tr>
            <tr><td>4</td><td>70</td></tr>
        </table>"#;
        let tables = find_tables(html, "wikitable").unwrap();
        let table = &tables[0];

        assert_eq!(table.num_rows(), 4);
        assert_eq!(
            table.rows()[1],
            vec![Value::Int(1), Value::Text("B".to_string()), Value::Int(90)]
        );
        assert_eq!(
            table.rows()[3],
            vec![Value::Int(4), Value::Text("C".to_string()), Value::Int(70)]
        );
    }

    #[test]
    fn test_rowspan_does_not_leak_from_header_into_body() {
        let html = r#"<table class="wikitable">
            <thead><tr><th rowspan="2">Rank</th><th>Bank name</th></tr></thead>
            <tbody><tr><td>1</td><td>A</td></tr></tbody>
        </table>"#;
        let tables = find_tables(html, "wikitable").unwrap();
        assert_eq!(tables[0].columns(), &["Rank", "Bank name"]);
        assert_eq!(
            tables[0].rows()[0],
            vec![Value::Int(1), Value::Text("A".to_string())]
        );
    }

    #[test]
    fn test_nested_table_rows_are_not_rows_of_outer_table() {
        let html = r#"<table class="wikitable">
            <tr><th>Bank name</th><th>Notes</th></tr>
            <tr><td>A</td><td><table><tr><td>inner</td><td>x</td></tr></table></td></tr>
            <tr><td>B</td><td>plain</td></tr>
        </table>"#;
        let tables = find_tables(html, "wikitable").unwrap();

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].num_rows(), 2);
        assert_eq!(tables[0].get(0, "Bank name"), Some(&Value::Text("A".to_string())));
        assert_eq!(tables[0].get(1, "Notes"), Some(&Value::Text("plain".to_string())));
    }

    #[test]
    fn test_headerless_table_gets_positional_names() {
        let html = r#"<table class="wikitable"><tr><td>a</td><td>b</td></tr></table>"#;
        let tables = find_tables(html, "wikitable").unwrap();
        assert_eq!(tables[0].columns(), &["0", "1"]);
        assert_eq!(tables[0].num_rows(), 1);
    }
}
