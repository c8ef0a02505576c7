//! Prompt assembly for the agent gateway. Prompts are plain text; the
//! structured reply shape is negotiated on the agent side.

use crate::models::record::KpiRecord;

/// Canned questions surfaced as chat shortcuts.
pub const SUGGESTED_QUESTIONS: [&str; 5] = [
    "Who improved the most?",
    "Any attendance issues?",
    "Compare top 2 performers",
    "Team strengths and weaknesses?",
    "Who needs coaching?",
];

/// One pipe-delimited line per record. Empty dataset yields an empty
/// string, which callers treat as "nothing to analyze".
pub fn build_data_context(records: &[KpiRecord]) -> String {
    records
        .iter()
        .map(|r| {
            format!(
                "{} ({}) | Month: {} | Productivity: {} | Quality: {} | Attendance: {} | Late: {} | Total: {} | Final: {}",
                r.name,
                r.employee_id,
                r.period,
                fmt_number(r.productivity),
                fmt_number(r.quality),
                fmt_number(r.attendance),
                fmt_number(r.late_count),
                fmt_number(r.total_points),
                fmt_number(r.final_points),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_insights_prompt(data_context: &str) -> String {
    format!(
        "Analyze this team's KPI data and provide comprehensive insights including top/bottom performers, attendance flags, trends, and recommendations:\n\n{data_context}"
    )
}

/// Questions go out with the dataset attached when one is loaded, bare
/// otherwise.
pub fn build_chat_prompt(data_context: &str, question: &str) -> String {
    if data_context.is_empty() {
        question.to_string()
    } else {
        format!("Based on this KPI data:\n{data_context}\n\nQuestion: {question}")
    }
}

/// Whole numbers print without a decimal point, matching how the scores
/// appear in the source spreadsheets.
fn fmt_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::sample_records;

    #[test]
    fn data_context_lines_are_pipe_delimited() {
        let records = sample_records();
        let context = build_data_context(&records[..1]);
        assert_eq!(
            context,
            "Ananya Sharma (EMP001) | Month: January | Productivity: 95 | Quality: 92 | Attendance: 98 | Late: 1 | Total: 285 | Final: 94"
        );
    }

    #[test]
    fn empty_dataset_yields_empty_context() {
        assert_eq!(build_data_context(&[]), "");
    }

    #[test]
    fn chat_prompt_omits_context_when_absent() {
        assert_eq!(build_chat_prompt("", "Who is on track?"), "Who is on track?");
        let with_context = build_chat_prompt("line1", "Who is on track?");
        assert!(with_context.starts_with("Based on this KPI data:\nline1"));
        assert!(with_context.ends_with("Question: Who is on track?"));
    }

    #[test]
    fn fractional_scores_keep_their_decimals() {
        assert_eq!(fmt_number(95.0), "95");
        assert_eq!(fmt_number(87.5), "87.5");
    }
}
