use crate::error::Result;
use crate::pivot::types::PivotResponse;

const TOTAL: &str = "Total";

pub fn to_json(resp: &PivotResponse) -> Result<String> {
    Ok(serde_json::to_string_pretty(resp)?)
}

/// Render the pivot as CSV: one column per dimension (display names), one
/// per time bucket (labels), then `Total`. The last line holds the column
/// totals and the grand total.
pub fn to_csv(resp: &PivotResponse) -> String {
    let mut out = String::new();
    for line in lines(resp) {
        let escaped: Vec<String> = line.iter().map(|cell| csv_escape(cell)).collect();
        out.push_str(&escaped.join(","));
        out.push('\n');
    }
    out
}

/// Render the pivot as an aligned plain-text table. Dimension columns are
/// left-aligned, numbers right-aligned.
pub fn to_table(resp: &PivotResponse) -> String {
    let lines = lines(resp);
    let dim_count = resp.meta.group_by.len();
    let columns = lines.first().map_or(0, Vec::len);

    let widths: Vec<usize> = (0..columns)
        .map(|i| {
            lines
                .iter()
                .map(|line| line[i].chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    for (n, line) in lines.iter().enumerate() {
        let cells: Vec<String> = line
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let pad = widths[i].saturating_sub(cell.chars().count());
                if i < dim_count {
                    format!("{cell}{}", " ".repeat(pad))
                } else {
                    format!("{}{cell}", " ".repeat(pad))
                }
            })
            .collect();
        out.push_str(cells.join("  ").trim_end());
        out.push('\n');

        // Rule under the header and above the totals
        if n == 0 || n + 2 == lines.len() {
            let width = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
            out.push_str(&"-".repeat(width));
            out.push('\n');
        }
    }
    out
}

/// Header, one line per row, then the totals line.
fn lines(resp: &PivotResponse) -> Vec<Vec<String>> {
    let buckets = &resp.meta.time_buckets;
    let dim_count = resp.meta.group_by.len();
    let mut lines = Vec::with_capacity(resp.rows.len() + 2);

    let mut header: Vec<String> = resp
        .meta
        .group_by
        .iter()
        .map(|d| d.as_str().to_string())
        .collect();
    header.extend(buckets.iter().map(|b| b.label.clone()));
    header.push(TOTAL.to_string());
    lines.push(header);

    for row in &resp.rows {
        let mut line: Vec<String> = row.dimensions.iter().map(|d| d.name.clone()).collect();
        line.extend(
            buckets
                .iter()
                .map(|b| format_value(row.buckets.get(&b.key).copied().unwrap_or(0.0))),
        );
        line.push(format_value(row.total));
        lines.push(line);
    }

    let mut totals = vec![String::new(); dim_count];
    if let Some(first) = totals.first_mut() {
        *first = TOTAL.to_string();
    }
    totals.extend(
        buckets
            .iter()
            .map(|b| format_value(resp.column_totals.get(&b.key).copied().unwrap_or(0.0))),
    );
    totals.push(format_value(resp.grand_total));
    lines.push(totals);

    lines
}

fn format_value(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.2}")
    }
}

fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::pivot::project::empty_response;
    use crate::pivot::types::{
        Dimension, Metric, PivotDimension, PivotFilters, PivotRequest, PivotRow, TimeGrain,
    };
    use crate::query::period::ReportPeriod;

    fn response() -> PivotResponse {
        let req = PivotRequest {
            period: ReportPeriod::Quarter(2025, 1),
            group_by: vec![Dimension::Company, Dimension::Employee],
            time_grain: TimeGrain::Month,
            metric: Metric::Hours,
            filters: PivotFilters::default(),
        };
        let mut resp = empty_response(&req, req.period.time_buckets(req.time_grain));
        let row = |company: &str, employee: &str, values: [f64; 3]| PivotRow {
            dimensions: vec![
                PivotDimension {
                    id: "x".into(),
                    name: company.into(),
                    dim_type: Dimension::Company,
                },
                PivotDimension {
                    id: "y".into(),
                    name: employee.into(),
                    dim_type: Dimension::Employee,
                },
            ],
            buckets: ["2025-01", "2025-02", "2025-03"]
                .into_iter()
                .map(String::from)
                .zip(values)
                .collect(),
            total: values.iter().sum(),
            planned_total: 0.0,
            planned_buckets: None,
        };
        resp.rows = vec![
            row("Acme, Inc.", "Ivan", [10.0, 2.5, 0.0]),
            row("Globex", "Anna \"A\"", [1.0, 0.0, 0.25]),
        ];
        resp.column_totals = BTreeMap::from([
            ("2025-01".to_string(), 11.0),
            ("2025-02".to_string(), 2.5),
            ("2025-03".to_string(), 0.25),
        ]);
        resp.grand_total = 13.75;
        resp
    }

    #[test]
    fn test_csv_layout_and_escaping() {
        let csv = to_csv(&response());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "company,employee,Янв,Фев,Мар,Total");
        assert_eq!(lines[1], "\"Acme, Inc.\",Ivan,10,2.50,0,12.50");
        assert_eq!(lines[2], "Globex,\"Anna \"\"A\"\"\",1,0,0.25,1.25");
        assert_eq!(lines[3], "Total,,11,2.50,0.25,13.75");
    }

    #[test]
    fn test_table_aligns_columns() {
        let table = to_table(&response());
        let lines: Vec<&str> = table.lines().collect();
        // header, rule, two rows, rule, totals
        assert_eq!(lines.len(), 6);
        assert!(lines[1].chars().all(|c| c == '-'));
        assert!(lines[4].chars().all(|c| c == '-'));
        assert!(lines[0].starts_with("company"));
        assert!(lines[5].starts_with("Total"));
        assert!(lines[2].ends_with("12.50"));
        assert_eq!(lines[2].chars().count(), lines[3].chars().count());
    }

    #[test]
    fn test_empty_response_renders_header_and_totals() {
        let req = PivotRequest {
            period: ReportPeriod::Month(2025, 2),
            group_by: vec![Dimension::Company],
            time_grain: TimeGrain::Month,
            metric: Metric::Hours,
            filters: PivotFilters::default(),
        };
        let resp = empty_response(&req, req.period.time_buckets(req.time_grain));
        assert_eq!(to_csv(&resp), "company,Фев,Total\nTotal,0,0\n");
    }

    #[test]
    fn test_json_is_camel_case() {
        let json = to_json(&response()).unwrap();
        assert!(json.contains("\"columnTotals\""));
        assert!(json.contains("\"grandTotal\": 13.75"));
        assert!(json.contains("\"dimType\": \"employee\""));
    }
}
