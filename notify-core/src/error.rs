use thiserror::Error;

pub type NotifyResult<T> = Result<T, NotifyError>;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("malformed event payload: {0}")]
    Decode(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for NotifyError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => NotifyError::NotFound("row not found".to_string()),
            other => NotifyError::Database(other.to_string()),
        }
    }
}
