use crate::geometry::ObjectKind;
use crate::sketch::{ConstraintId, ObjectId};

/// Errors raised by the sketch geometry store.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("object {0} does not exist in the sketch")]
    UnknownObject(ObjectId),

    #[error("object {id} is a {found:?}, expected {expected}")]
    WrongKind {
        id: ObjectId,
        expected: &'static str,
        found: ObjectKind,
    },

    #[error("object {id} is already managed by constraint {owner}")]
    AlreadyManaged { id: ObjectId, owner: ConstraintId },

    #[error("cannot mirror a {source_kind:?} onto a {target_kind:?}")]
    KindMismatch {
        source_kind: ObjectKind,
        target_kind: ObjectKind,
    },

    #[error("degenerate geometry: {0}")]
    Degenerate(String),
}
