use std::sync::Arc;

/// Result type alias using RepoError
pub type Result<T> = std::result::Result<T, RepoError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every public repository operation either succeeds or fails with exactly
/// one of these kinds. Each kind maps to a stable error code that can be
/// used for programmatic error handling, testing, and external responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepoErrorKind {
    // Lookup
    NoSuchHandle,
    NoSuchVersion,
    NoSuchFile,
    NoSuchTag,
    NoSuchTagValuePair,

    // Integrity
    /// Master/detail rows disagree (Object.imported vs latest Version)
    InconsistentDatabase,
    ConstraintViolation,
    /// Imported content shares its fingerprint with an existing version
    PotentialDuplicate,

    // Filesystem
    FileError,
    Io,
    FileRenameFailed,

    // Query language
    Expression,
    Parser,

    // Setup
    Configuration,
    Validation,

    // Integration
    Timeout,
    Persistence,

    // Internal
    Unexpected,
}

impl RepoErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            RepoErrorKind::NoSuchHandle => "ERR_NO_SUCH_HANDLE",
            RepoErrorKind::NoSuchVersion => "ERR_NO_SUCH_VERSION",
            RepoErrorKind::NoSuchFile => "ERR_NO_SUCH_FILE",
            RepoErrorKind::NoSuchTag => "ERR_NO_SUCH_TAG",
            RepoErrorKind::NoSuchTagValuePair => "ERR_NO_SUCH_TAG_VALUE_PAIR",
            RepoErrorKind::InconsistentDatabase => "ERR_INCONSISTENT_DATABASE",
            RepoErrorKind::ConstraintViolation => "ERR_CONSTRAINT_VIOLATION",
            RepoErrorKind::PotentialDuplicate => "ERR_POTENTIAL_DUPLICATE",
            RepoErrorKind::FileError => "ERR_FILE",
            RepoErrorKind::Io => "ERR_IO",
            RepoErrorKind::FileRenameFailed => "ERR_FILE_RENAME_FAILED",
            RepoErrorKind::Expression => "ERR_EXPRESSION",
            RepoErrorKind::Parser => "ERR_PARSER",
            RepoErrorKind::Configuration => "ERR_CONFIGURATION",
            RepoErrorKind::Validation => "ERR_VALIDATION",
            RepoErrorKind::Timeout => "ERR_TIMEOUT",
            RepoErrorKind::Persistence => "ERR_PERSISTENCE",
            RepoErrorKind::Unexpected => "ERR_UNEXPECTED",
        }
    }
}

/// Canonical structured error type
///
/// Carries the classification kind, the failing operation, optional
/// entity context and an optional wrapped cause. Parser failures carry the
/// full list of accumulated diagnostics; duplicate rejections carry the
/// handle of the colliding object.
#[derive(Debug, Clone)]
pub struct RepoError {
    kind: RepoErrorKind,
    op: Option<String>,
    handle: Option<i64>,
    message: String,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
    duplicate_of: Option<i64>,
    diagnostics: Vec<String>,
}

impl RepoError {
    /// Create a new error with the specified kind
    pub fn new(kind: RepoErrorKind) -> Self {
        Self {
            kind,
            op: None,
            handle: None,
            message: String::new(),
            source: None,
            duplicate_of: None,
            diagnostics: Vec::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add object handle context
    pub fn with_handle(mut self, handle: i64) -> Self {
        self.handle = Some(handle);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add the lower-level cause
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    /// Name the existing object whose fingerprint collided (PotentialDuplicate)
    pub fn with_duplicate_of(mut self, handle: i64) -> Self {
        self.duplicate_of = Some(handle);
        self
    }

    /// Attach accumulated diagnostics (Parser)
    pub fn with_diagnostics(mut self, diagnostics: Vec<String>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> RepoErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the handle context, if any
    pub fn handle(&self) -> Option<i64> {
        self.handle
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Handle of the object an import collided with
    pub fn duplicate_of(&self) -> Option<i64> {
        self.duplicate_of
    }

    /// Parser diagnostics, in the order they were recorded
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    /// True when the error has the given kind
    pub fn is(&self, kind: RepoErrorKind) -> bool {
        self.kind == kind
    }
}

impl std::fmt::Display for RepoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(handle) = self.handle {
            write!(f, " (handle: {})", handle)?;
        }
        if let Some(other) = self.duplicate_of {
            write!(f, " (duplicate of handle {})", other)?;
        }
        for diagnostic in &self.diagnostics {
            write!(f, "\n  {}", diagnostic)?;
        }
        Ok(())
    }
}

impl std::error::Error for RepoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Shorthand for a NoSuchHandle error
pub fn no_such_handle(op: &str, handle: i64) -> RepoError {
    RepoError::new(RepoErrorKind::NoSuchHandle)
        .with_op(op)
        .with_handle(handle)
        .with_message("No object with this handle")
}

/// Shorthand for an InconsistentDatabase error on one handle
pub fn inconsistent(op: &str, handle: i64, detail: impl Into<String>) -> RepoError {
    RepoError::new(RepoErrorKind::InconsistentDatabase)
        .with_op(op)
        .with_handle(handle)
        .with_message(detail)
}
