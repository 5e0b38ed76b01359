use thiserror::Error;

use revcmp_core::StoreError;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("product name is required")]
    EmptyProduct,

    #[error("cannot infer brands without an LLM client (MISTRAL_API_KEY is not set)")]
    BrandInferenceUnavailable,

    #[error("could not determine any brands; provide them explicitly")]
    NoBrands,

    #[error("no reviews available for analysis")]
    NoReviews,

    #[error(transparent)]
    Store(#[from] StoreError),
}
