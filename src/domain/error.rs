//! Domain error types.

/// Top-level error type for wheeler.
#[derive(Debug, thiserror::Error)]
pub enum WheelerError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("symbol is required")]
    EmptySymbol,

    #[error("invalid lot: {reason}")]
    InvalidLot { reason: String },

    #[error("invalid option: {reason}")]
    InvalidOption { reason: String },

    #[error("cost basis recalculation failed for {symbol}: {source}")]
    Recalculation {
        symbol: String,
        #[source]
        source: Box<WheelerError>,
    },

    #[error("json output error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl WheelerError {
    /// Wrap a failure raised while recomputing `symbol`.
    pub fn recalculation(symbol: &str, source: WheelerError) -> Self {
        WheelerError::Recalculation {
            symbol: symbol.to_string(),
            source: Box::new(source),
        }
    }
}

impl From<&WheelerError> for std::process::ExitCode {
    fn from(err: &WheelerError) -> Self {
        let code: u8 = match err {
            WheelerError::Io(_) | WheelerError::Json(_) => 1,
            WheelerError::ConfigParse { .. }
            | WheelerError::ConfigMissing { .. }
            | WheelerError::ConfigInvalid { .. } => 2,
            WheelerError::Database { .. } | WheelerError::DatabaseQuery { .. } => 3,
            WheelerError::EmptySymbol
            | WheelerError::InvalidLot { .. }
            | WheelerError::InvalidOption { .. } => 4,
            WheelerError::NotFound { .. } => 5,
            WheelerError::Recalculation { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
