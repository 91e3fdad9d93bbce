//! Single tagged result type for the application boundary.
//!
//! ```json
//! {"status": "ok", "data": {...}}
//! {"status": "error", "category": "not_found", "code": 404, "message": "..."}
//! ```

use serde::{Deserialize, Serialize};

use stockledger_infra::ServiceError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    NotFound,
    InvalidArgument,
    Conflict,
    InsufficientStock,
    NegativeStockRace,
    DependencyFailure,
}

impl ErrorCategory {
    pub fn of(err: &ServiceError) -> Self {
        match err {
            ServiceError::NotFound(_) => ErrorCategory::NotFound,
            ServiceError::InvalidArgument(_) => ErrorCategory::InvalidArgument,
            ServiceError::Conflict(_) => ErrorCategory::Conflict,
            ServiceError::InsufficientStock { .. } => ErrorCategory::InsufficientStock,
            ServiceError::NegativeStockRace { .. } => ErrorCategory::NegativeStockRace,
            ServiceError::Dependency(_) => ErrorCategory::DependencyFailure,
        }
    }

    /// HTTP status an HTTP-facing adapter should use.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorCategory::NotFound => 404,
            ErrorCategory::InvalidArgument => 400,
            ErrorCategory::Conflict => 409,
            ErrorCategory::InsufficientStock => 422,
            ErrorCategory::NegativeStockRace => 409,
            ErrorCategory::DependencyFailure => 502,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome<T> {
    Ok {
        data: T,
    },
    Error {
        category: ErrorCategory,
        code: u16,
        message: String,
    },
}

impl<T> Outcome<T> {
    pub fn from_error(err: &ServiceError) -> Self {
        let category = ErrorCategory::of(err);
        if category == ErrorCategory::DependencyFailure {
            tracing::error!(error = %err, "dependency failure");
        }
        Outcome::Error {
            category,
            code: category.status_code(),
            message: err.to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok { .. })
    }

    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            Outcome::Ok { .. } => None,
            Outcome::Error { category, .. } => Some(*category),
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            Outcome::Ok { data } => Some(data),
            Outcome::Error { .. } => None,
        }
    }
}

impl<T> From<Result<T, ServiceError>> for Outcome<T> {
    fn from(value: Result<T, ServiceError>) -> Self {
        match value {
            Ok(data) => Outcome::Ok { data },
            Err(err) => Outcome::from_error(&err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ok_outcome_wraps_data() {
        let outcome: Outcome<u32> = Ok(7).into();
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({"status": "ok", "data": 7})
        );
    }

    #[test]
    fn error_outcomes_carry_category_and_code() {
        let cases = [
            (ServiceError::NotFound("p1".into()), "not_found", 404),
            (ServiceError::InvalidArgument("x".into()), "invalid_argument", 400),
            (ServiceError::Conflict("dup".into()), "conflict", 409),
            (
                ServiceError::InsufficientStock {
                    available: 1,
                    requested: 2,
                },
                "insufficient_stock",
                422,
            ),
            (ServiceError::Dependency("down".into()), "dependency_failure", 502),
        ];

        for (err, category, code) in cases {
            let outcome: Outcome<()> = Err(err).into();
            let json = serde_json::to_value(&outcome).unwrap();
            assert_eq!(json["status"], "error");
            assert_eq!(json["category"], category);
            assert_eq!(json["code"], code);
        }
    }
}
