use thiserror::Error;

pub type Result<T> = std::result::Result<T, AalenError>;

#[derive(Error, Debug, Clone)]
pub enum AalenError {
    #[error("bad parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },

    #[error("dimensions don't match: {message}")]
    InvalidDimensions { message: String },

    #[error("survival data is broken: {message}")]
    InvalidSurvivalData { message: String },

    #[error("linear algebra error: {message}")]
    LinearAlgebra { message: String },

    #[error("numerical issues: {message}")]
    Numerical { message: String },

    #[error("model not fitted yet - call fit() first")]
    ModelNotFitted,
}

impl AalenError {
    pub fn invalid_parameter(parameter: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
        }
    }

    pub fn invalid_dimensions(message: impl Into<String>) -> Self {
        Self::InvalidDimensions { message: message.into() }
    }

    pub fn invalid_survival_data(message: impl Into<String>) -> Self {
        Self::InvalidSurvivalData { message: message.into() }
    }

    pub fn linear_algebra(message: impl Into<String>) -> Self {
        Self::LinearAlgebra { message: message.into() }
    }

    pub fn numerical(message: impl Into<String>) -> Self {
        Self::Numerical { message: message.into() }
    }
}
