//! Remote model clients: sentiment classification on the Hugging Face
//! inference API and yes/no brand checks on the Mistral chat API.

pub mod classifier;
pub mod error;
pub mod mistral;

pub use classifier::{HfClassifier, MAX_INPUT_CHARS};
pub use error::InferenceError;
pub use mistral::MistralClient;
