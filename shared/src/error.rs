//! Error types for the campaign Lambda functions.
//!
//! Every variant maps to one code of the public error taxonomy and to one
//! HTTP status. Postgres constraint failures are classified by SQLSTATE when
//! the `sqlx::Error` is converted.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const INVALID_TEXT_REPRESENTATION: &str = "22P02";

/// Errors that can occur in the campaign Lambda functions.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed input
    #[error("{0}")]
    BadRequest(String),

    /// No usable principal on the request
    #[error("Authentication required: {0}")]
    Auth(String),

    /// Caller is not owner, member, or admin
    #[error("{0}")]
    Forbidden(String),

    /// Not found error
    #[error("{0}")]
    NotFound(String),

    /// An unaccepted invitation already exists for the campaign and email
    #[error("an invitation is already pending for this email")]
    DuplicateInvite,

    /// No invitation matches the presented secret
    #[error("invalid or used token")]
    InvalidToken,

    /// The invitation was redeemed before
    #[error("invitation already accepted")]
    AlreadyAccepted,

    /// The invitation is past its expiry
    #[error("invitation expired")]
    Expired,

    /// Unique constraint rejected the write
    #[error("Unique violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint rejected the write
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// The store could not interpret an identifier
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Unclassified database error
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// AWS SDK error
    #[error("AWS error: {0}")]
    Aws(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        let classified = match &err {
            sqlx::Error::Database(db) => match db.code().as_deref() {
                Some(UNIQUE_VIOLATION) => Some(Error::UniqueViolation(db.message().to_string())),
                Some(FOREIGN_KEY_VIOLATION) => {
                    Some(Error::ForeignKeyViolation(db.message().to_string()))
                }
                Some(INVALID_TEXT_REPRESENTATION) => {
                    Some(Error::InvalidIdentifier(db.message().to_string()))
                }
                _ => None,
            },
            _ => None,
        };

        classified.unwrap_or(Error::Database(err))
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .keys()
            .map(|k| k.to_string())
            .collect();
        fields.sort();
        Error::BadRequest(format!("invalid fields: {}", fields.join(", ")))
    }
}

impl Error {
    /// Stable taxonomy code reported in the `error` field of the body.
    pub fn code(&self) -> &'static str {
        match self {
            Error::BadRequest(_) => "bad_request",
            Error::Auth(_) => "unauthorized",
            Error::Forbidden(_) => "forbidden",
            Error::NotFound(_) => "not_found",
            Error::DuplicateInvite => "duplicate_invite",
            Error::InvalidToken => "invalid_token",
            Error::AlreadyAccepted => "already_accepted",
            Error::Expired => "expired",
            Error::UniqueViolation(_) => "unique_violation",
            Error::ForeignKeyViolation(_) => "foreign_key_violation",
            Error::InvalidIdentifier(_) => "invalid_identifier",
            Error::Database(_) => "database_error",
            Error::Aws(_) | Error::Config(_) | Error::Serialization(_) | Error::Internal(_) => {
                "internal_error"
            }
        }
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::BadRequest(_)
            | Error::InvalidToken
            | Error::ForeignKeyViolation(_)
            | Error::InvalidIdentifier(_) => 400,
            Error::Auth(_) => 401,
            Error::Forbidden(_) | Error::DuplicateInvite => 403,
            Error::NotFound(_) => 404,
            Error::AlreadyAccepted | Error::UniqueViolation(_) => 409,
            Error::Expired => 410,
            _ => 500,
        }
    }

    /// Whether the message describes the caller's mistake and is safe to show.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Error::UniqueViolation(_)
                | Error::ForeignKeyViolation(_)
                | Error::InvalidIdentifier(_)
                | Error::Database(_)
                | Error::Aws(_)
                | Error::Config(_)
                | Error::Serialization(_)
                | Error::Internal(_)
        )
    }

    /// Message for the response body. Store and infrastructure details are
    /// withheld unless `verbose` is set.
    pub fn public_message(&self, verbose: bool) -> String {
        if verbose || self.is_client_error() {
            return self.to_string();
        }
        match self {
            Error::UniqueViolation(_) => "record already exists".to_string(),
            Error::ForeignKeyViolation(_) => "referenced record does not exist".to_string(),
            Error::InvalidIdentifier(_) => "invalid identifier".to_string(),
            Error::Database(_) => "database error".to_string(),
            _ => "internal server error".to_string(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Error::BadRequest(message.into())
    }

    pub fn forbidden() -> Self {
        Error::Forbidden("forbidden".to_string())
    }
}
