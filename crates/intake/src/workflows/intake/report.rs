use chrono::NaiveDateTime;
use std::fmt::Write as _;

use super::domain::{readable_label, FieldRecord, SubmissionCategory};

const REPORT_STYLE: &str = "\
body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; }
.container { width: 100%; max-width: 600px; margin: 0 auto; }
.header { background-color: #f8f9fa; padding: 20px; text-align: center; border-bottom: 3px solid #dc3545; }
h2 { margin: 0; color: #dc3545; }
.meta { color: #777; font-size: 0.9em; margin-bottom: 20px; text-align: center; }
table { border-collapse: collapse; width: 100%; margin-top: 20px; }
th, td { padding: 12px; text-align: left; border-bottom: 1px solid #ddd; }
th { background-color: #f8f9fa; font-weight: bold; width: 35%; color: #555; }
tr:hover { background-color: #f1f1f1; }
";

/// Renders the staff-facing HTML summary of a submission.
///
/// The same document is written to disk and used as the notification body.
pub fn render_report(
    record: &FieldRecord,
    category: &SubmissionCategory,
    generated_at: NaiveDateTime,
) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<style>\n");
    html.push_str(REPORT_STYLE);
    html.push_str("</style>\n</head>\n<body>\n<div class=\"container\">\n");

    writeln!(
        html,
        "<div class=\"header\"><h2>New Submission: {}</h2></div>",
        escape_html(&category.display_name())
    )
    .expect("write header");
    writeln!(
        html,
        "<div class=\"meta\">Received on: {}</div>",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    )
    .expect("write received stamp");

    html.push_str("<table>\n");
    for (name, value) in record.iter() {
        writeln!(
            html,
            "<tr><th>{}</th><td>{}</td></tr>",
            escape_html(&readable_label(name)),
            escape_html(value)
        )
        .expect("write field row");
    }
    html.push_str("</table>\n</div>\n</body>\n</html>\n");
    html
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::intake::domain::RawSubmission;
    use crate::workflows::intake::normalizer::RecordNormalizer;
    use chrono::NaiveDate;

    fn generated_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 18)
            .and_then(|date| date.and_hms_opt(14, 30, 5))
            .expect("valid timestamp")
    }

    #[test]
    fn report_lists_fields_in_record_order_with_readable_labels() {
        let raw = RawSubmission::new()
            .with_field("phone_number", "555-0100")
            .with_field("date_of_incident", "2026-10-01");
        let record = RecordNormalizer::default().normalize(&raw);
        let category = SubmissionCategory::new("personal_injury").expect("valid category");

        let html = render_report(&record, &category, generated_at());

        assert!(html.contains("<h2>New Submission: Personal Injury</h2>"));
        assert!(html.contains("Received on: 2026-10-18 14:30:05"));
        let phone = html
            .find("<tr><th>Phone Number</th><td>555-0100</td></tr>")
            .expect("phone row present");
        let incident = html
            .find("<tr><th>Date Of Incident</th><td>2026-10-01</td></tr>")
            .expect("incident row present");
        assert!(phone < incident);
    }

    #[test]
    fn report_escapes_markup_in_values() {
        let raw = RawSubmission::new().with_field("message", "<script>alert('x')</script> & more");
        let record = RecordNormalizer::default().normalize(&raw);
        let category = SubmissionCategory::new("general_contact").expect("valid category");

        let html = render_report(&record, &category, generated_at());

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; more"));
    }
}
