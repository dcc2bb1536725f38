use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;
use validator::ValidationErrors;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("Nome e email são obrigatórios")]
    MissingFields,

    #[error("Email inválido")]
    InvalidEmail,

    #[error("Email já cadastrado")]
    DuplicateEmail(String),

    #[error("Usuário não encontrado")]
    NotFound(u64),

    /// Path segment that can never name a user (not an unsigned integer)
    #[error("Usuário não encontrado")]
    InvalidId(String),

    #[error("Erro interno: {0}")]
    Internal(String),
}

pub type UserResult<T> = Result<T, UserError>;

impl From<ValidationErrors> for UserError {
    fn from(errors: ValidationErrors) -> Self {
        let missing = errors
            .field_errors()
            .values()
            .flat_map(|errs| errs.iter())
            .any(|err| err.code == "required");

        if missing {
            UserError::MissingFields
        } else {
            UserError::InvalidEmail
        }
    }
}

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        let message = err.to_string();
        match err {
            UserError::MissingFields | UserError::InvalidEmail => AppError::validation(message),
            UserError::DuplicateEmail(email) => {
                tracing::debug!(%email, "Rejected duplicate email");
                AppError::conflict(message)
            }
            UserError::NotFound(id) => {
                tracing::debug!(user_id = id, "User not found");
                AppError::NotFound(message)
            }
            UserError::InvalidId(raw) => {
                tracing::debug!(raw_id = %raw, "Unparseable user id");
                AppError::NotFound(message)
            }
            UserError::Internal(details) => AppError::InternalServerError(details),
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}
