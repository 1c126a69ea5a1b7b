//! HTML-страницы панели анализа

use std::fmt::Write as _;

use uuid::Uuid;

use crate::charts::{self, Category, ChartSettings, FRAUD_COLOR, LEGIT_COLOR};
use crate::config::ServerConfig;
use crate::error::Result;
use crate::models::FRAUD;
use crate::scoring::{Analysis, EXPORT_FILE_NAME};
use crate::table::Table;

pub const UPLOAD_PROMPT: &str = "Please upload a CSV file to get started.";
pub const NO_FRAUD_NOTICE: &str = "No Fraudulent Transactions Detected";

const FRAUD_ROW_STYLE: &str = "background-color: red; color: white;";

const STYLE: &str = "body { font-family: sans-serif; margin: 2rem; color: #222; }\n\
table { border-collapse: collapse; font-size: 0.85rem; }\n\
th, td { border: 1px solid #ddd; padding: 0.25rem 0.5rem; text-align: right; }\n\
th { background: #f5f5f5; }\n\
.scroll { max-height: 28rem; overflow: auto; margin-bottom: 1.5rem; }\n\
.success { background: #e8f5e9; border-left: 4px solid #66bb6a; padding: 0.75rem; }\n\
.info { background: #e3f2fd; border-left: 4px solid #42a5f5; padding: 0.75rem; }\n\
.warning { background: #fff8e1; border-left: 4px solid #ffb300; padding: 0.75rem; }\n\
.error { background: #ffebee; border-left: 4px solid #ef5350; padding: 0.75rem; }\n\
.metrics, .charts { display: flex; gap: 2rem; }\n\
.metric .value { font-size: 2rem; font-weight: bold; }\n\
.swatch { display: inline-block; width: 0.8rem; height: 0.8rem; margin-right: 0.3rem; }";

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n<style>\n{style}\n</style>\n</head>\n<body>\n\
         <h1>Fraud Detection Dashboard</h1>\n{body}\n</body>\n</html>\n",
        title = escape(title),
        style = STYLE,
        body = body
    )
}

fn upload_form() -> &'static str {
    "<p>Upload a CSV file of transactions to analyze. \
     The system will predict <strong>fraudulent transactions</strong> and highlight them.</p>\n\
     <form action=\"/analyze\" method=\"post\" enctype=\"multipart/form-data\">\n\
     <input type=\"file\" name=\"file\" accept=\".csv,text/csv\">\n\
     <button type=\"submit\">Analyze</button>\n</form>\n"
}

/// Начальное состояние: форма загрузки и приглашение
pub fn upload_page() -> String {
    let body = format!("{}<p class=\"info\">{}</p>", upload_form(), UPLOAD_PROMPT);
    layout("Fraud Detection Dashboard", &body)
}

pub fn error_page(title: &str, detail: Option<&str>) -> String {
    let mut body = format!("<p class=\"error\">{}</p>\n", escape(title));
    if let Some(detail) = detail {
        let _ = writeln!(body, "<pre>{}</pre>", escape(detail));
    }
    body.push_str(upload_form());
    layout("Analysis failed", &body)
}

/// Таблица; строки с предсказанием 1 подсвечиваются, если переданы предсказания
pub fn render_table(table: &Table, predictions: Option<&[usize]>) -> String {
    let mut html = String::from("<div class=\"scroll\"><table>\n<thead><tr>");
    for header in table.headers() {
        let _ = write!(html, "<th>{}</th>", escape(header));
    }
    html.push_str("</tr></thead>\n<tbody>\n");

    for (i, record) in table.records().iter().enumerate() {
        let flagged = predictions
            .and_then(|p| p.get(i))
            .map_or(false, |&p| p == FRAUD);
        if flagged {
            let _ = write!(html, "<tr style=\"{}\">", FRAUD_ROW_STYLE);
        } else {
            html.push_str("<tr>");
        }
        for field in record.iter() {
            let _ = write!(html, "<td>{}</td>", escape(field));
        }
        html.push_str("</tr>\n");
    }

    html.push_str("</tbody>\n</table></div>\n");
    html
}

fn legend_entry(label: &str, share: f64, color: &str) -> String {
    format!(
        "<li><span class=\"swatch\" style=\"background: {}\"></span>{}: {:.1}%</li>",
        color, label, share
    )
}

/// Страница результатов анализа
pub fn results_page(
    analysis: &Analysis,
    settings: &ServerConfig,
    export_id: Option<Uuid>,
) -> Result<String> {
    let summary = &analysis.summary;
    let mut body = String::new();

    let _ = writeln!(
        body,
        "<p class=\"success\">Analysis Complete: {} fraudulent transactions out of {}</p>",
        summary.fraud, summary.total
    );
    let _ = writeln!(
        body,
        "<div class=\"metrics\">\
         <div class=\"metric\"><div>Fraudulent Transactions</div><div class=\"value\">{}</div></div>\
         <div class=\"metric\"><div>Legitimate Transactions</div><div class=\"value\">{}</div></div>\
         </div>",
        summary.fraud, summary.legit
    );

    if !analysis.excluded_columns.is_empty() {
        let names: Vec<String> = analysis.excluded_columns.iter().map(|c| escape(c)).collect();
        let _ = writeln!(
            body,
            "<p class=\"warning\">Non-numeric columns excluded from analysis: {}</p>",
            names.join(", ")
        );
    }

    body.push_str("<h2>Uploaded Data (Preview)</h2>\n");
    body.push_str(&render_table(
        &analysis.uploaded.head(settings.preview_rows),
        None,
    ));

    body.push_str("<h2>Transactions with Fraud Highlighted</h2>\n");
    body.push_str(&render_table(
        &analysis.annotated.head(settings.highlight_rows),
        Some(analysis.predictions.as_slice()),
    ));

    let categories = [
        Category::new("Not Fraud", summary.legit as f64, LEGIT_COLOR),
        Category::new("Fraud", summary.fraud as f64, FRAUD_COLOR),
    ];
    let pie = charts::pie_chart(
        &categories,
        &ChartSettings::new("Fraud vs Non-Fraud Distribution", 420, 420),
    )?;
    let bars = charts::bar_chart(
        &categories,
        &ChartSettings::new("Fraud vs Non-Fraud Counts", 560, 420)
            .labels("", "Number of Transactions"),
    )?;

    body.push_str("<h2>Fraud Analysis Charts</h2>\n<div class=\"charts\">\n<div>\n");
    body.push_str(&pie);
    let _ = writeln!(
        body,
        "<ul class=\"legend\">{}{}</ul>",
        legend_entry("Not Fraud", summary.legit_share(), &charts::hex(&LEGIT_COLOR)),
        legend_entry("Fraud", summary.fraud_share(), &charts::hex(&FRAUD_COLOR))
    );
    body.push_str("</div>\n<div>\n");
    body.push_str(&bars);
    body.push_str("</div>\n</div>\n");

    match export_id {
        Some(id) if summary.fraud > 0 => {
            body.push_str("<h2>Fraudulent Transactions Detected</h2>\n");
            body.push_str(&render_table(&analysis.flagged(), None));
            let _ = writeln!(
                body,
                "<p><a href=\"/exports/{}\" download=\"{}\">Download Fraud Transactions as CSV</a></p>",
                id, EXPORT_FILE_NAME
            );
        }
        _ => {
            let _ = writeln!(body, "<p class=\"success\">{}</p>", NO_FRAUD_NOTICE);
        }
    }

    body.push_str("<h2>Analyze another file</h2>\n");
    body.push_str(upload_form());

    Ok(layout("Fraud Analysis Results", &body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape("<a href=\"x\">&'</a>"),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_upload_page_prompts_for_file() {
        let page = upload_page();
        assert!(page.contains(UPLOAD_PROMPT));
        assert!(page.contains("name=\"file\""));
    }

    #[test]
    fn test_render_table_highlights_fraud_rows() {
        let table = Table::from_reader("a,b\n1,x\n2,<y>\n3,z\n".as_bytes()).unwrap();
        let html = render_table(&table, Some(&[0usize, 1, 0][..]));
        assert_eq!(html.matches(FRAUD_ROW_STYLE).count(), 1);
        assert!(html.contains("<td>&lt;y&gt;</td>"));

        let plain = render_table(&table, None);
        assert!(!plain.contains(FRAUD_ROW_STYLE));
    }

    #[test]
    fn test_error_page_escapes_detail() {
        let page = error_page("Bad upload", Some("<script>"));
        assert!(page.contains("&lt;script&gt;"));
        assert!(!page.contains("<script>"));
    }
}
