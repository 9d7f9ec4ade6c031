use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum WisdomError {
    #[error("File '{}' not found", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to decode image '{}': {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Image processing error: {0}")]
    ImageError(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<Box<dyn std::error::Error>> for WisdomError {
    fn from(err: Box<dyn std::error::Error>) -> Self {
        WisdomError::ImageError(err.to_string())
    }
}
