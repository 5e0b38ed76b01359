//! Analysis endpoints. An analysis runs inside the request; the caller waits
//! for the report. Progress notices are returned alongside it.

use std::sync::Mutex;

use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};

use revcmp_core::{AppConfig, Notice, Notifier};
use revcmp_inference::{HfClassifier, MistralClient};
use revcmp_reviews::{
    parse_brand_list, AnalysisError, AnalysisReport, AnalysisRequest, AnalysisSettings, Analyzer,
    FullTextSource, LlmClient,
};
use revcmp_search::{PageFetcher, SerpApiClient};

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct AnalysisBody {
    pub product: String,
    /// Comma-separated brands; inferred when absent or blank.
    #[serde(default)]
    pub brands: Option<String>,
    pub max_snippets: Option<usize>,
    #[serde(default)]
    pub use_fulltext: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct AnalysisData {
    pub report: AnalysisReport,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Serialize)]
pub(super) struct CancelData {
    pub cancelled: bool,
}

/// Collects notices for the response body and mirrors them to the log.
#[derive(Debug, Default)]
pub(super) struct RecordingNotifier(Mutex<Vec<Notice>>);

impl RecordingNotifier {
    pub(super) fn into_notices(self) -> Vec<Notice> {
        self.0.into_inner().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        revcmp_core::TracingNotifier.notify(notice.clone());
        self.0
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(notice);
    }
}

struct Clients {
    search: SerpApiClient,
    classifier: HfClassifier,
    llm: Option<MistralClient>,
    fetcher: Option<PageFetcher>,
}

impl Clients {
    fn from_config(config: &AppConfig, use_fulltext: bool) -> Result<Self, String> {
        let search = SerpApiClient::new(config.serpapi_api_key.as_deref(), config.request_timeout_secs)
            .map_err(|e| e.to_string())?;
        let classifier = HfClassifier::new(
            config.hf_api_token.as_deref(),
            &config.hf_model,
            config.request_timeout_secs,
        )
        .map_err(|e| e.to_string())?;
        let llm = optional_llm(config);
        let fetcher = if use_fulltext {
            Some(PageFetcher::new().map_err(|e| e.to_string())?)
        } else {
            None
        };
        Ok(Self {
            search,
            classifier,
            llm,
            fetcher,
        })
    }
}

/// Client for brand inference; `None` when it cannot be built.
pub(super) fn optional_llm(config: &AppConfig) -> Option<MistralClient> {
    match MistralClient::new(
        config.mistral_api_key.as_deref(),
        &config.mistral_model,
        config.request_timeout_secs,
    ) {
        Ok(client) => Some(client),
        Err(e) => {
            tracing::debug!(error = %e, "brand inference disabled");
            None
        }
    }
}

fn map_analysis_error(request_id: String, error: &AnalysisError) -> ApiError {
    let code = match error {
        AnalysisError::EmptyProduct => "validation_error",
        AnalysisError::BrandInferenceUnavailable => "not_configured",
        AnalysisError::NoBrands | AnalysisError::NoReviews => "unprocessable",
        AnalysisError::Store(e) => {
            tracing::error!(error = %e, "analysis aborted by store failure");
            return ApiError::new(request_id, "internal_error", "database operation failed");
        }
    };
    ApiError::new(request_id, code, error.to_string())
}

pub(super) async fn create_analysis(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<AnalysisBody>,
) -> Result<Json<ApiResponse<AnalysisData>>, ApiError> {
    if body.product.trim().is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "product is required",
        ));
    }

    let Ok(_running) = state.analysis_lock.try_lock() else {
        return Err(ApiError::new(
            req_id.0,
            "conflict",
            "an analysis is already running",
        ));
    };
    state.cancel.reset();

    let clients = Clients::from_config(&state.config, body.use_fulltext)
        .map_err(|message| ApiError::new(req_id.0.clone(), "not_configured", message))?;

    let notifier = RecordingNotifier::default();
    let request = AnalysisRequest {
        product: body.product,
        brands: body
            .brands
            .as_deref()
            .map(parse_brand_list)
            .unwrap_or_default(),
        max_snippets: body
            .max_snippets
            .unwrap_or(state.config.default_max_snippets),
        use_fulltext: body.use_fulltext,
    };

    let result = Analyzer::new(
        &state.db,
        &clients.search,
        &clients.classifier,
        &state.cancel,
        &notifier,
    )
    .with_llm(clients.llm.as_ref().map(|c| c as &dyn LlmClient))
    .with_fulltext(clients.fetcher.as_ref().map(|f| f as &dyn FullTextSource))
    .with_settings(AnalysisSettings::from_app_config(&state.config))
    .run_analysis(&request)
    .await;

    match result {
        Ok(report) => Ok(Json(ApiResponse {
            data: AnalysisData {
                report,
                notices: notifier.into_notices(),
            },
            meta: ResponseMeta::new(req_id.0),
        })),
        Err(e) => Err(map_analysis_error(req_id.0, &e)),
    }
}

pub(super) async fn cancel_analysis(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<CancelData>> {
    state.cancel.cancel();
    tracing::info!("analysis cancellation requested");
    Json(ApiResponse {
        data: CancelData { cancelled: true },
        meta: ResponseMeta::new(req_id.0),
    })
}
