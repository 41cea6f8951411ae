use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DloError {
    #[error("not_found")]
    NotFound,
}
