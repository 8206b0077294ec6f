//! HTML pages: the upload form and the receipts table.

use axum::response::Html;
use receiptforge_core::ReceiptRecord;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>Receipt Uploader</title>
</head>
<body>
<h2>AI Receipt Uploader</h2>
<form action="/upload" method="post" enctype="multipart/form-data">
  <input type="file" name="receipt" accept="image/*,application/pdf" required>
  <button type="submit">Upload &amp; Extract</button>
</form>
<br>
<a href="/receipts">View All Receipts</a>
</body>
</html>
"#;

/// Handler for `GET /`.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Render the receipts table. `skipped` is the number of entries that could
/// not be decoded.
pub fn render_receipts(records: &[ReceiptRecord], skipped: usize) -> String {
    let rows = records.iter().map(render_row).collect::<String>();

    let notice = if skipped > 0 {
        format!(
            "<p class=\"notice\">{skipped} stored {} could not be read and {} skipped.</p>\n",
            if skipped == 1 { "entry" } else { "entries" },
            if skipped == 1 { "was" } else { "were" },
        )
    } else {
        String::new()
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>Receipts</title>
</head>
<body>
<h2>Receipts Table</h2>
{notice}<table border="1" cellpadding="4">
<tr>
  <th>ID</th>
  <th>Vendor</th>
  <th>Date</th>
  <th>Amount</th>
  <th>Currency</th>
  <th>Raw Text</th>
  <th>Receipt</th>
</tr>
{rows}</table>
<br><a href="/">Go Back</a>
</body>
</html>
"#
    )
}

fn render_row(record: &ReceiptRecord) -> String {
    let field = |value: &Option<String>| html_escape(value.as_deref().unwrap_or(""));
    let link = if record.has_file() {
        format!("<a href=\"/receipt/{}\">View</a>", record.id)
    } else {
        String::new()
    };

    format!(
        "<tr>\n  <td>{id}</td>\n  <td>{vendor}</td>\n  <td>{date}</td>\n  <td>{amount}</td>\n  <td>{currency}</td>\n  <td>{excerpt}</td>\n  <td>{link}</td>\n</tr>\n",
        id = record.id,
        vendor = field(&record.fields.vendor),
        date = field(&record.fields.date),
        amount = field(&record.fields.amount),
        currency = field(&record.fields.currency),
        excerpt = html_escape(&record.excerpt()),
    )
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
