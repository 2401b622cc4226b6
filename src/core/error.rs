use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    #[error("invalid input: {value} has no finite conversion")]
    InvalidInput { value: f64 },
    #[error("invalid tax schedule: {0}")]
    InvalidSchedule(String),
}

pub type Result<T> = std::result::Result<T, CalcError>;
