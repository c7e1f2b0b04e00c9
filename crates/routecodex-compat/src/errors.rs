use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompatError {
    #[error("mapping entry {source_path} -> {target_path} references a non-object path segment")]
    BadPath {
        source_path: String,
        target_path: String,
    },
    #[error("tool schema at index {index} is not an object")]
    BadToolSchema { index: usize },
}

pub type CompatResult<T> = Result<T, CompatError>;
