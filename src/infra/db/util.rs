use sqlx::error::ErrorKind;

use crate::application::repos::RepoError;

/// SQLSTATE raised when `statement_timeout` cancels a query.
const QUERY_CANCELED: &str = "57014";
/// SQLSTATE for malformed literals such as a non-numeric id.
const INVALID_TEXT_REPRESENTATION: &str = "22P02";

/// Classify a sqlx failure by SQLSTATE rather than by message text.
pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    let db = match err {
        sqlx::Error::RowNotFound => return RepoError::NotFound,
        sqlx::Error::PoolTimedOut => return RepoError::Timeout,
        sqlx::Error::Database(db) => db,
        other => return RepoError::from_persistence(other),
    };

    let constraint = db.constraint().unwrap_or("unknown").to_string();
    let code = db.code().map(|code| code.into_owned());
    match db.kind() {
        ErrorKind::UniqueViolation => RepoError::Duplicate { constraint },
        ErrorKind::ForeignKeyViolation => RepoError::InvalidInput {
            message: format!("`{constraint}`: {}", db.message()),
        },
        ErrorKind::CheckViolation | ErrorKind::NotNullViolation => RepoError::Integrity {
            message: format!("`{constraint}`: {}", db.message()),
        },
        _ => match code.as_deref() {
            Some(QUERY_CANCELED) => RepoError::Timeout,
            Some(INVALID_TEXT_REPRESENTATION) => RepoError::InvalidInput {
                message: db.message().to_string(),
            },
            _ => RepoError::from_persistence(db),
        },
    }
}

pub fn convert_count(value: i64) -> Result<u64, RepoError> {
    u64::try_from(value).map_err(|_| RepoError::from_persistence("negative row count"))
}
