use std::path::PathBuf;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use thiserror::Error;

use crate::importer::ImportPhase;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Fatal import failures. Per-record insert errors never surface here.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("failed to connect to database: {0}")]
    Connect(#[source] BoxError),

    #[error("failed to create tables: {0}")]
    Schema(#[source] BoxError),

    #[error("failed to read JSON file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to import data: {0}")]
    Load(#[source] BoxError),
}

impl ImportError {
    /// The phase the run had reached when it failed.
    pub fn phase(&self) -> ImportPhase {
        match self {
            ImportError::Connect(_) => ImportPhase::Disconnected,
            ImportError::Schema(_) => ImportPhase::Connected,
            ImportError::Read { .. } | ImportError::Parse(_) => ImportPhase::SchemaReset,
            ImportError::Load(_) => ImportPhase::Loading,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("invalid schema name {0:?}")]
    InvalidSchema(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("blocking task failed: {0}")]
    Blocking(#[from] actix_web::error::BlockingError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Pool(_) | AppError::Blocking(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            AppError::BadRequest(_) => "Invalid request",
            AppError::NotFound(_) => "Not found",
            _ => "Internal server error",
        };

        if self.status_code().is_server_error() {
            log::error!("{}", self);
        }

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error,
            message: self.to_string(),
        })
    }
}
