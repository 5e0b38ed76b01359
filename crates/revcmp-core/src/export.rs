//! CSV rendering of analysed reviews for download.

use crate::reviews::StoredReview;

const HEADER: [&str; 9] = [
    "id", "brand", "product", "source", "title", "snippet", "link", "label", "fetched_at",
];

/// Renders `reviews` as RFC 4180 CSV with a header row. Unlabeled rows have
/// an empty `label` column.
#[must_use]
pub fn reviews_to_csv(reviews: &[StoredReview]) -> String {
    let mut out = HEADER.join(",");
    out.push_str("\r\n");

    for r in reviews {
        let id = r.id.to_string();
        let fetched_at = r.fetched_at.to_rfc3339();
        let fields = [
            id.as_str(),
            r.brand.as_str(),
            r.product.as_str(),
            r.source.as_str(),
            r.title.as_str(),
            r.snippet.as_str(),
            r.link.as_deref().unwrap_or_default(),
            r.label.as_deref().unwrap_or_default(),
            fetched_at.as_str(),
        ];
        let line: Vec<String> = fields.iter().map(|f| escape(f)).collect();
        out.push_str(&line.join(","));
        out.push_str("\r\n");
    }
    out
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
