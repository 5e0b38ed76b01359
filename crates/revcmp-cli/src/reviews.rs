//! `revcmp reviews` and `revcmp export` handlers.

use std::path::Path;

use revcmp_core::{reviews_to_csv, StoredReview};
use revcmp_db::ReviewDb;

/// Prints stored reviews for `product`, optionally for one brand.
///
/// # Errors
///
/// Returns an error if the query fails.
pub(crate) async fn run_list(db: &ReviewDb, product: &str, brand: Option<&str>) -> anyhow::Result<()> {
    let rows = revcmp_db::list_reviews(db.pool(), product, brand).await?;
    if rows.is_empty() {
        println!("no stored reviews for '{product}'");
        return Ok(());
    }

    for row in &rows {
        println!(
            "{:>5}  {:<12} {:<9} {}",
            row.id,
            truncate(&row.brand, 12),
            row.label.as_deref().unwrap_or("-"),
            truncate(&row.snippet.replace('\n', " "), 80)
        );
    }
    println!("{} review(s)", rows.len());
    Ok(())
}

/// Writes the reviews for `product` as CSV to `out`, or stdout.
///
/// # Errors
///
/// Returns an error if the query fails or the file cannot be written.
pub(crate) async fn run_export(
    db: &ReviewDb,
    product: &str,
    brands: &[String],
    out: Option<&Path>,
) -> anyhow::Result<()> {
    let reviews = load_for_export(db, product, brands).await?;
    let csv = reviews_to_csv(&reviews);

    match out {
        Some(path) => {
            tokio::fs::write(path, csv.as_bytes()).await?;
            println!("wrote {} review(s) to {}", reviews.len(), path.display());
        }
        None => print!("{csv}"),
    }
    Ok(())
}

async fn load_for_export(
    db: &ReviewDb,
    product: &str,
    brands: &[String],
) -> anyhow::Result<Vec<StoredReview>> {
    if brands.is_empty() {
        let rows = revcmp_db::list_reviews(db.pool(), product, None).await?;
        return Ok(rows.into_iter().map(StoredReview::from).collect());
    }

    let mut all = Vec::new();
    for brand in brands {
        let rows = revcmp_db::fetch_reviews(db.pool(), brand, product).await?;
        all.extend(rows.into_iter().map(StoredReview::from));
    }
    Ok(all)
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}
