#[derive(thiserror::Error, Debug, serde::Deserialize, serde::Serialize)]
pub enum Error {
    #[error("Generic {0}")]
    Generic(String),

    #[error("Translation API error: {0}")]
    Api(String),

    #[error("Translation memory error: {0}")]
    Memory(String),

    #[error("Invalid response from translation API: {0}")]
    InvalidResponse(String),
}
