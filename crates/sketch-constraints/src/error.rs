use sketch_types::{GeometryError, ObjectId};

/// Errors raised while building, resolving or restoring constraints.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConstraintError {
    #[error("constraint schema '{0}' doesn't exist")]
    UnknownSchema(String),

    #[error("{schema} expects {expected} objects, got {found}")]
    Arity {
        schema: &'static str,
        expected: String,
        found: usize,
    },

    #[error("{schema} expects {expected} parameters, got {found}")]
    ScopeMismatch {
        schema: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("object {0} is not in the object index")]
    UnknownObject(ObjectId),

    #[error("{0} is not a modifier constraint")]
    NotAModifier(&'static str),

    #[error("there can be only one managing modifier for an object: {0}")]
    AlreadyManaged(GeometryError),

    #[error(transparent)]
    Geometry(GeometryError),

    #[error("failed to parse constraint record: {0}")]
    Parse(String),
}

impl From<GeometryError> for ConstraintError {
    fn from(err: GeometryError) -> Self {
        match err {
            GeometryError::AlreadyManaged { .. } => ConstraintError::AlreadyManaged(err),
            other => ConstraintError::Geometry(other),
        }
    }
}
