//! CSV/TSV parsing for KPI exports. Tolerant by design: header names are
//! fuzzy-matched, short rows are skipped, and unparsable numbers become 0.

use tracing::debug;

use crate::models::record::KpiRecord;

/// Column indices resolved from the header row. `None` means the column
/// was not present in the upload.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct ColumnMap {
    name: Option<usize>,
    employee_id: Option<usize>,
    date_of_joining: Option<usize>,
    period: Option<usize>,
    productivity: Option<usize>,
    quality: Option<usize>,
    attendance: Option<usize>,
    late_count: Option<usize>,
    total_points: Option<usize>,
    final_points: Option<usize>,
}

/// Parses a KPI export into records. Blank lines are ignored everywhere;
/// the first non-blank line is the header. Fewer than two non-blank lines
/// yields an empty vec rather than an error.
pub fn parse_csv(text: &str) -> Vec<KpiRecord> {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.len() < 2 {
        return Vec::new();
    }

    let delimiter = sniff_delimiter(lines[0]);
    let columns = map_columns(lines[0], delimiter);
    debug!(
        target: "app::csv",
        delimiter = %if delimiter == '\t' { "tab" } else { "comma" },
        columns = ?columns,
        "resolved csv header"
    );

    let mut records = Vec::new();
    for (row, line) in lines.iter().enumerate().skip(1) {
        let fields = tokenize_line(line, delimiter);
        if fields.len() < 3 {
            continue;
        }

        let text_at = |idx: Option<usize>| -> Option<String> {
            idx.and_then(|i| fields.get(i)).map(|v| v.trim().to_string())
        };
        let number_at = |idx: Option<usize>| -> f64 {
            text_at(idx)
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or(0.0)
        };

        records.push(KpiRecord {
            name: text_at(columns.name).unwrap_or_else(|| format!("Employee {row}")),
            employee_id: text_at(columns.employee_id)
                .unwrap_or_else(|| format!("EMP{row:03}")),
            date_of_joining: text_at(columns.date_of_joining).unwrap_or_default(),
            period: text_at(columns.period).unwrap_or_default(),
            productivity: number_at(columns.productivity),
            quality: number_at(columns.quality),
            attendance: number_at(columns.attendance),
            late_count: number_at(columns.late_count),
            total_points: number_at(columns.total_points),
            final_points: number_at(columns.final_points),
        });
    }

    records
}

/// Tab-separated exports are detected from the header line alone.
fn sniff_delimiter(header_line: &str) -> char {
    if header_line.contains('\t') {
        '\t'
    } else {
        ','
    }
}

/// Lowercases a header cell and strips everything but letters, digits and
/// spaces, so "Final Points (%)" and "final_points" both match.
fn normalize_header(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == ' ')
        .collect()
}

/// Assigns each header cell to at most one field. The first rule that
/// matches wins, and earlier columns win over later ones.
fn map_columns(header_line: &str, delimiter: char) -> ColumnMap {
    let mut map = ColumnMap::default();
    for (i, cell) in header_line.split(delimiter).enumerate() {
        let h = normalize_header(cell);
        if h.contains("employee") && h.contains("name") {
            map.name = Some(i);
        } else if h == "name" && map.name.is_none() {
            map.name = Some(i);
        } else if h.contains("emp") && h.contains("id") {
            map.employee_id = Some(i);
        } else if h == "doj" || h.contains("date of") || h.contains("joining") {
            map.date_of_joining = Some(i);
        } else if h == "month" {
            map.period = Some(i);
        } else if h.contains("productivity") {
            map.productivity = Some(i);
        } else if h.contains("quality") {
            map.quality = Some(i);
        } else if h.contains("attendance") {
            map.attendance = Some(i);
        } else if h.contains("late") {
            map.late_count = Some(i);
        } else if h.contains("final") && h.contains("point") {
            map.final_points = Some(i);
        } else if h.contains("total") && h.contains("point") {
            map.total_points = Some(i);
        }
    }
    map
}

/// Splits one data row on the delimiter, honoring double-quoted fields
/// with `""` as an escaped quote. An unterminated quote swallows the rest
/// of the line into the current field.
fn tokenize_line(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '"' {
            if in_quotes && chars.peek() == Some(&'"') {
                current.push('"');
                chars.next();
            } else {
                in_quotes = !in_quotes;
            }
        } else if ch == delimiter && !in_quotes {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_handles_quoted_delimiter() {
        assert_eq!(tokenize_line("a,\"b,c\",d", ','), vec!["a", "b,c", "d"]);
    }

    #[test]
    fn tokenize_handles_escaped_quote() {
        assert_eq!(tokenize_line("a,\"b\"\"c\",d", ','), vec!["a", "b\"c", "d"]);
    }

    #[test]
    fn tokenize_unterminated_quote_runs_to_end_of_line() {
        assert_eq!(tokenize_line("a,\"b,c", ','), vec!["a", "b,c"]);
    }

    #[test]
    fn sniff_prefers_tab_when_present() {
        assert_eq!(sniff_delimiter("name\tempId"), '\t');
        assert_eq!(sniff_delimiter("name,empId"), ',');
    }

    #[test]
    fn normalize_strips_punctuation() {
        assert_eq!(normalize_header(" Final Points (%) "), "final points ");
        assert_eq!(normalize_header("Emp_ID"), "empid");
    }

    #[test]
    fn header_only_input_is_empty() {
        assert!(parse_csv("name,empId,productivity\n\n\n").is_empty());
    }

    #[test]
    fn short_rows_are_dropped() {
        let text = "name,empId,productivity\nAlice,E1\nBob,E2,88\n";
        let records = parse_csv(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Bob");
        assert_eq!(records[0].productivity, 88.0);
    }

    #[test]
    fn missing_columns_get_row_based_defaults() {
        let text = "a,b,c\nx,y,z\nq,r,s\n";
        let records = parse_csv(text);
        assert_eq!(records[0].name, "Employee 1");
        assert_eq!(records[0].employee_id, "EMP001");
        assert_eq!(records[1].employee_id, "EMP002");
        assert_eq!(records[0].productivity, 0.0);
    }

    #[test]
    fn fuzzy_headers_resolve() {
        let text = "Employee Name,EMP_ID,DOJ,Month,Productivity %,Quality Score,\
                    Attendance,Late Arrivals,Total Points,Final Points\n\
                    Ana,E9,2020-01-01,March,91,87,99,1,277,92\n";
        let records = parse_csv(text);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.name, "Ana");
        assert_eq!(r.employee_id, "E9");
        assert_eq!(r.date_of_joining, "2020-01-01");
        assert_eq!(r.period, "March");
        assert_eq!(r.productivity, 91.0);
        assert_eq!(r.quality, 87.0);
        assert_eq!(r.attendance, 99.0);
        assert_eq!(r.late_count, 1.0);
        assert_eq!(r.total_points, 277.0);
        assert_eq!(r.final_points, 92.0);
    }

    #[test]
    fn plain_name_header_does_not_shadow_employee_name() {
        let text = "Employee Name,Name,Score\nAlice,nickname,1\n";
        let records = parse_csv(text);
        assert_eq!(records[0].name, "Alice");
    }

    #[test]
    fn unparsable_numbers_default_to_zero() {
        let text = "name,empId,productivity\nAlice,E1,n/a\n";
        let records = parse_csv(text);
        assert_eq!(records[0].productivity, 0.0);
    }

    #[test]
    fn tab_delimited_input_parses() {
        let text = "name\tempId\tproductivity\nAlice\tE1\t77\n";
        let records = parse_csv(text);
        assert_eq!(records[0].name, "Alice");
        assert_eq!(records[0].productivity, 77.0);
    }
}
