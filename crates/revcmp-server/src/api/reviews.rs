use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use revcmp_core::{reviews_to_csv, LabelCount, StoredReview};
use revcmp_reviews::parse_brand_list;

use crate::middleware::RequestId;

use super::{map_db_error, required_product, ApiError, ApiResponse, AppState, ResponseMeta};

const EXPORT_FILE_NAME: &str = "analyzed_reviews.csv";

#[derive(Debug, Deserialize)]
pub(super) struct ReviewsQuery {
    pub product: Option<String>,
    pub brand: Option<String>,
}

/// `brands` is comma-separated; absent or blank means every brand.
#[derive(Debug, Deserialize)]
pub(super) struct ProductBrandsQuery {
    pub product: Option<String>,
    pub brands: Option<String>,
}

impl ProductBrandsQuery {
    fn brand_list(&self) -> Vec<String> {
        self.brands
            .as_deref()
            .map(parse_brand_list)
            .unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ClearCacheData {
    pub removed: u64,
}

pub(super) async fn list_reviews(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ReviewsQuery>,
) -> Result<Json<ApiResponse<Vec<StoredReview>>>, ApiError> {
    let product = required_product(&req_id.0, query.product.as_deref())?;
    let brand = query
        .brand
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty());

    let rows = revcmp_db::list_reviews(state.db.pool(), &product, brand)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(StoredReview::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn sentiment_distribution(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ProductBrandsQuery>,
) -> Result<Json<ApiResponse<Vec<LabelCount>>>, ApiError> {
    let product = required_product(&req_id.0, query.product.as_deref())?;

    let counts = revcmp_db::label_counts(state.db.pool(), &product, &query.brand_list())
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: counts,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn export_csv(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ProductBrandsQuery>,
) -> Result<Response, ApiError> {
    let product = required_product(&req_id.0, query.product.as_deref())?;
    let brands = query.brand_list();

    let rows = revcmp_db::list_reviews(state.db.pool(), &product, None)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let reviews: Vec<StoredReview> = rows
        .into_iter()
        .filter(|r| brands.is_empty() || brands.contains(&r.brand))
        .map(StoredReview::from)
        .collect();

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{EXPORT_FILE_NAME}\""),
            ),
        ],
        reviews_to_csv(&reviews),
    )
        .into_response())
}

pub(super) async fn clear_cache(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<ClearCacheData>>, ApiError> {
    if state.analysis_lock.try_lock().is_err() {
        return Err(ApiError::new(
            req_id.0,
            "conflict",
            "cannot clear the cache while an analysis is running",
        ));
    }

    let removed = revcmp_db::clear_reviews(state.db.pool())
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: ClearCacheData { removed },
        meta: ResponseMeta::new(req_id.0),
    }))
}
