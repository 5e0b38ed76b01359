//! `revcmp analyze`: run one analysis and print the per-brand summary.

use std::future::Future;

use anyhow::Context;
use revcmp_core::{AppConfig, LabelCount, TracingNotifier};
use revcmp_db::ReviewDb;
use revcmp_inference::{HfClassifier, MistralClient};
use revcmp_reviews::{
    AnalysisRequest, AnalysisSettings, Analyzer, CancelFlag, FullTextSource, LlmClient,
};
use revcmp_search::{PageFetcher, SerpApiClient};

#[derive(Debug)]
pub(crate) struct AnalyzeArgs {
    pub product: String,
    pub brands: Option<Vec<String>>,
    pub max_snippets: usize,
    pub fulltext: bool,
}

/// Builds the remote clients from `config` and runs the analysis.
///
/// Search and classification credentials are required. The Mistral key is
/// only needed when brands are not given.
///
/// # Errors
///
/// Returns an error if a required credential is missing, the analysis fails,
/// or the database is unreachable.
pub(crate) async fn run_analyze(
    config: &AppConfig,
    store: &ReviewDb,
    args: AnalyzeArgs,
) -> anyhow::Result<()> {
    let search = SerpApiClient::new(config.serpapi_api_key.as_deref(), config.request_timeout_secs)
        .context("search client")?;
    let classifier = HfClassifier::new(
        config.hf_api_token.as_deref(),
        &config.hf_model,
        config.request_timeout_secs,
    )
    .context("sentiment classifier")?;

    // An absent key only matters if brands have to be inferred.
    let llm = match MistralClient::new(
        config.mistral_api_key.as_deref(),
        &config.mistral_model,
        config.request_timeout_secs,
    ) {
        Ok(client) => Some(client),
        Err(e) => {
            tracing::debug!(error = %e, "brand inference disabled");
            None
        }
    };
    let fetcher = if args.fulltext {
        Some(PageFetcher::new().context("page fetcher")?)
    } else {
        None
    };

    let cancel = CancelFlag::new();
    let interrupt = cancel_on(tokio::signal::ctrl_c(), cancel.clone());
    let notifier = TracingNotifier;
    let analyzer = Analyzer::new(store, &search, &classifier, &cancel, &notifier)
        .with_llm(llm.as_ref().map(|c| c as &dyn LlmClient))
        .with_fulltext(fetcher.as_ref().map(|f| f as &dyn FullTextSource))
        .with_settings(AnalysisSettings::from_app_config(config));

    let request = AnalysisRequest {
        product: args.product,
        brands: args.brands.unwrap_or_default(),
        max_snippets: args.max_snippets,
        use_fulltext: args.fulltext,
    };

    let result = analyzer.run_analysis(&request).await;
    interrupt.abort();
    let report = result?;

    println!(
        "{} reviews for '{}' across {} brand(s)",
        report.reviews.len(),
        report.product,
        report.brands.len()
    );
    for line in summary_lines(&report.counts) {
        println!("{line}");
    }
    if report.cancelled {
        println!("interrupted: results are partial");
    }
    if report.unlabeled > 0 {
        println!("{} review(s) remain unlabeled; rerun to retry", report.unlabeled);
    }
    Ok(())
}

/// Raises `cancel` once `signal` resolves successfully. Abort the handle
/// when the work it guards is done.
pub(crate) fn cancel_on<F>(signal: F, cancel: CancelFlag) -> tokio::task::JoinHandle<()>
where
    F: Future<Output = std::io::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        match signal.await {
            Ok(()) => {
                tracing::warn!("interrupt received, stopping after the current step");
                cancel.cancel();
            }
            Err(e) => tracing::debug!(error = %e, "interrupt handler unavailable"),
        }
    })
}

/// One `brand: label=count, ...` line per brand, in input order.
pub(crate) fn summary_lines(counts: &[LabelCount]) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current: Option<&str> = None;
    for count in counts {
        let part = format!("{}={}", count.label, count.count);
        if current == Some(count.brand.as_str()) {
            if let Some(last) = lines.last_mut() {
                last.push_str(", ");
                last.push_str(&part);
            }
        } else {
            current = Some(count.brand.as_str());
            lines.push(format!("  {}: {part}", count.brand));
        }
    }
    lines
}
