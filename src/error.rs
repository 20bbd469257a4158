// ============================================================================
// Domain Error Taxonomy
// ============================================================================
//
// Every component above the store sees only these five kinds. Postgres error
// codes are translated here and nowhere else; callers inspect errors by kind
// (HTTP status mapping, metric labels) and never by engine-specific detail.
// Context strings accumulate as an error crosses each boundary, so the logged
// message reads as a causal chain while the kind stays stable.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("order not found: {0}")]
    NotFound(String),

    #[error("order already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl OrderError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    /// Prepend a human-readable context string, preserving the kind.
    pub fn context(self, msg: &str) -> Self {
        match self {
            Self::NotFound(s) => Self::NotFound(format!("{msg}: {s}")),
            Self::AlreadyExists(s) => Self::AlreadyExists(format!("{msg}: {s}")),
            Self::InvalidData(s) => Self::InvalidData(format!("{msg}: {s}")),
            Self::Storage(s) => Self::Storage(format!("{msg}: {s}")),
            Self::Cancelled => Self::Cancelled,
        }
    }

    /// Stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::AlreadyExists(_) => "already_exists",
            Self::InvalidData(_) => "invalid_data",
            Self::Storage(_) => "storage",
            Self::Cancelled => "cancelled",
        }
    }

    /// Translate an sqlx error into the domain taxonomy.
    ///
    /// Codes per the PostgreSQL errcodes appendix: constraint violations map
    /// to `AlreadyExists`/`InvalidData`, schema problems and everything
    /// unclassified map to `Storage`.
    pub fn from_sqlx(e: sqlx::Error) -> Self {
        if matches!(e, sqlx::Error::RowNotFound) {
            return Self::NotFound("no matching row".into());
        }

        if let sqlx::Error::Database(db) = &e {
            let detail = match db.code().as_deref() {
                Some("23505") => return Self::AlreadyExists("violation of uniqueness".into()),
                Some("23503") => "foreign key violation",
                Some("23502") => "required field not filled",
                Some("23514") => "check constraint violation",
                Some("22001") => "string data too long",
                Some("22003") => "numeric value out of range",
                Some("22008") => "datetime field overflow",
                Some("42P01") => return Self::Storage("table does not exist".into()),
                Some("42703") => return Self::Storage("column does not exist".into()),
                _ => return Self::Storage(db.message().to_string()),
            };
            return Self::InvalidData(detail.into());
        }

        Self::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_preserves_kind() {
        let err = OrderError::NotFound("no matching row".into())
            .context("delivery retrieval")
            .context("order get");
        assert_eq!(err.kind(), "not_found");
        assert_eq!(
            err.to_string(),
            "order not found: order get: delivery retrieval: no matching row"
        );
    }

    #[test]
    fn cancelled_ignores_context() {
        let err = OrderError::Cancelled.context("consume loop");
        assert_eq!(err, OrderError::Cancelled);
    }

    #[test]
    fn row_not_found_translates_to_not_found() {
        let err = OrderError::from_sqlx(sqlx::Error::RowNotFound);
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn non_database_errors_translate_to_storage() {
        let err = OrderError::from_sqlx(sqlx::Error::PoolTimedOut);
        assert_eq!(err.kind(), "storage");
    }
}
