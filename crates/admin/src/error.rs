//! Unified error handling for the back-office client.

use thiserror::Error;

/// Errors returned by backend calls and the services built on them.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not reach the backend (DNS, refused, timeout...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend failed (5xx).
    #[error("Server error: {status} - {message}")]
    Server { status: u16, message: String },

    /// Missing or expired credentials (401).
    #[error("Unauthorized: authentication required")]
    Unauthorized,

    /// Authenticated but not allowed (403).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend refused the request (validation or business rule), either
    /// with a 4xx status or a `success: false` envelope.
    #[error("Rejected: {message}")]
    Rejected { status: u16, message: String },

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Failed to parse a response body.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The request was refused before being sent.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// What the user is told about an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Backend unreachable.
    Connection,
    /// Backend failed; try again shortly.
    Server,
    /// Re-authentication required.
    AccessDenied,
    /// Anything else, shown with the error's own message.
    Other,
}

impl ErrorKind {
    /// Short heading.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Connection => "Problème de connexion",
            Self::Server => "Erreur",
            Self::AccessDenied => "Accès refusé",
            Self::Other => "Une erreur est survenue",
        }
    }

    /// Longer explanation.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Connection => {
                "Impossible de se connecter au serveur. Vérifiez votre connexion internet."
            }
            Self::Server => "Veuillez réessayer dans quelques instants.",
            Self::AccessDenied => {
                "Vous n'avez pas les permissions nécessaires pour accéder à ces données."
            }
            Self::Other => "Impossible de charger les données.",
        }
    }

    /// Whether a retry action should be offered.
    #[must_use]
    pub const fn offers_retry(self) -> bool {
        !matches!(self, Self::AccessDenied)
    }
}

impl ApiError {
    /// Classify for display.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Http(_) => ErrorKind::Connection,
            Self::Server { .. } | Self::RateLimited(_) => ErrorKind::Server,
            Self::Unauthorized | Self::Forbidden(_) => ErrorKind::AccessDenied,
            Self::NotFound(_) | Self::Rejected { .. } | Self::Parse(_) | Self::InvalidInput(_) => {
                ErrorKind::Other
            }
        }
    }

    /// Whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Server { .. } | Self::RateLimited(_)
        )
    }

    /// Whether the error should be reported to Sentry.
    #[must_use]
    pub const fn is_reportable(&self) -> bool {
        matches!(self, Self::Server { .. } | Self::Parse(_))
    }

    /// Log the error; server-side failures are also sent to Sentry.
    pub fn report(&self, operation: &str) {
        if self.is_reportable() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                operation,
                sentry_event_id = %event_id,
                "Backend request error"
            );
        } else {
            tracing::warn!(error = %self, operation, "Backend request failed");
        }
    }

    /// Log a failed write and send it to Sentry whatever the backend said.
    ///
    /// Input refused before being sent is only logged.
    pub fn report_mutation(&self, operation: &str) {
        if let Self::InvalidInput(_) = self {
            tracing::warn!(error = %self, operation, "Mutation refused before sending");
            return;
        }
        let event_id = sentry::capture_error(self);
        tracing::error!(
            error = %self,
            operation,
            sentry_event_id = %event_id,
            "Backend mutation failed"
        );
    }
}
