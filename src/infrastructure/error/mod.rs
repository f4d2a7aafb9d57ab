//! Error taxonomy for the template store.
//!
//! Every failure produced by a backend or by the manager is a
//! [`TemplateStoreError`]: a closed [`ErrorCode`] (which fixes the
//! [`ErrorKind`]), a human readable message and an optional wrapped cause.

use std::fmt;

use thiserror::Error;

/// Coarse classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller supplied input is invalid.
    Client,
    /// Existing state prevents the operation; the caller can recover.
    Conflict,
    /// Storage layer failure.
    Server,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Client => "client",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Server => "server",
        };
        f.write_str(name)
    }
}

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Client
    EmptyTemplateName,
    InvalidCharactersInTemplateName,
    EmptyLocale,
    InvalidCharactersInLocale,
    InvalidEmailTemplate,
    InvalidSmsTemplate,
    ExtraneousSmsTemplateContent,

    // Conflict
    DuplicateTemplateType,
    DuplicateTemplate,
    TemplateTypeNotFound,

    // Server
    NoTemplateFound,
    InvalidTenant,
    Database,
    ResourceStore,
    InvalidEmailTemplateContent,
    InvalidSmsTemplateContent,
    TemplateDeserializationFailed,
    NoContentInTemplate,
    ErrorAddingTemplateType,
    ErrorAddingTemplate,
    PartiallyApplied,
    Configuration,
}

impl ErrorCode {
    /// The kind this code belongs to.
    pub fn kind(self) -> ErrorKind {
        use ErrorCode::*;
        match self {
            EmptyTemplateName
            | InvalidCharactersInTemplateName
            | EmptyLocale
            | InvalidCharactersInLocale
            | InvalidEmailTemplate
            | InvalidSmsTemplate
            | ExtraneousSmsTemplateContent => ErrorKind::Client,
            DuplicateTemplateType | DuplicateTemplate | TemplateTypeNotFound => ErrorKind::Conflict,
            NoTemplateFound
            | InvalidTenant
            | Database
            | ResourceStore
            | InvalidEmailTemplateContent
            | InvalidSmsTemplateContent
            | TemplateDeserializationFailed
            | NoContentInTemplate
            | ErrorAddingTemplateType
            | ErrorAddingTemplate
            | PartiallyApplied
            | Configuration => ErrorKind::Server,
        }
    }

    /// Stable string form of the code.
    pub fn as_str(self) -> &'static str {
        use ErrorCode::*;
        match self {
            EmptyTemplateName => "EMPTY_TEMPLATE_NAME",
            InvalidCharactersInTemplateName => "INVALID_CHARACTERS_IN_TEMPLATE_NAME",
            EmptyLocale => "EMPTY_LOCALE",
            InvalidCharactersInLocale => "INVALID_CHARACTERS_IN_LOCALE",
            InvalidEmailTemplate => "INVALID_EMAIL_TEMPLATE",
            InvalidSmsTemplate => "INVALID_SMS_TEMPLATE",
            ExtraneousSmsTemplateContent => "EXTRANEOUS_SMS_TEMPLATE_CONTENT",
            DuplicateTemplateType => "DUPLICATE_TEMPLATE_TYPE",
            DuplicateTemplate => "DUPLICATE_TEMPLATE",
            TemplateTypeNotFound => "TEMPLATE_TYPE_NOT_FOUND",
            NoTemplateFound => "NO_TEMPLATE_FOUND",
            InvalidTenant => "INVALID_TENANT",
            Database => "DATABASE_ERROR",
            ResourceStore => "RESOURCE_STORE_ERROR",
            InvalidEmailTemplateContent => "INVALID_EMAIL_TEMPLATE_CONTENT",
            InvalidSmsTemplateContent => "INVALID_SMS_TEMPLATE_CONTENT",
            TemplateDeserializationFailed => "TEMPLATE_DESERIALIZATION_FAILED",
            NoContentInTemplate => "NO_CONTENT_IN_TEMPLATE",
            ErrorAddingTemplateType => "ERROR_ADDING_TEMPLATE_TYPE",
            ErrorAddingTemplate => "ERROR_ADDING_TEMPLATE",
            PartiallyApplied => "PARTIALLY_APPLIED",
            Configuration => "CONFIG_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error returned by every template store operation.
#[derive(Debug, Error)]
#[error("[{code}] {message}")]
pub struct TemplateStoreError {
    code: ErrorCode,
    message: String,
    #[source]
    source: Option<BoxError>,
}

/// Result type for template store operations
pub type StoreResult<T> = std::result::Result<T, TemplateStoreError>;

impl TemplateStoreError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Wrap a SQL failure.
    pub fn database(message: impl Into<String>, source: sqlx::Error) -> Self {
        Self::with_source(ErrorCode::Database, message, source)
    }

    /// Wrap a resource service failure.
    pub fn resource(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::with_source(ErrorCode::ResourceStore, message, source)
    }

    /// The secondary write of a dual-write failed after the primary committed.
    pub fn partially_applied(operation: &str, source: TemplateStoreError) -> Self {
        Self::with_source(
            ErrorCode::PartiallyApplied,
            format!(
                "{} was applied to the database but replication to the registry failed",
                operation
            ),
            source,
        )
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_client(&self) -> bool {
        self.kind() == ErrorKind::Client
    }

    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    pub fn is_server(&self) -> bool {
        self.kind() == ErrorKind::Server
    }

    pub fn is_partially_applied(&self) -> bool {
        self.code == ErrorCode::PartiallyApplied
    }

    /// Re-label a failure with a new code and message, keeping this error as the cause.
    pub fn wrap(self, code: ErrorCode, message: impl Into<String>) -> Self {
        Self::with_source(code, message, self)
    }
}

impl From<config::ConfigError> for TemplateStoreError {
    fn from(e: config::ConfigError) -> Self {
        Self::with_source(ErrorCode::Configuration, "Invalid configuration", e)
    }
}
