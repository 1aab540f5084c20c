use sketch_types::{ObjectId, Reflection, Sketch};
use tracing::debug;

use crate::error::ConstraintError;

/// `[line, src₁…srcₙ, dst₁…dstₙ]` → `([line, src₁…srcₙ], [dst₁…dstₙ])`
pub(super) fn split(objects: &[ObjectId]) -> (&[ObjectId], &[ObjectId]) {
    let n = objects.len();
    let reference = &objects[..((n >> 1) + 1).min(n)];
    let managed = &objects[((n + 1) >> 1).min(n)..];
    (reference, managed)
}

/// Overwrite every target with the reflection of its source across the
/// line's current position.
pub(super) fn modify(sketch: &mut Sketch, reference: &[ObjectId], managed: &[ObjectId]) -> Result<(), ConstraintError> {
    let Some((&line, sources)) = reference.split_first() else {
        return Ok(());
    };
    let reflection = Reflection::across_segment(sketch, line)?;
    for (&source, &target) in sources.iter().zip(managed) {
        sketch.mirror_into(source, target, &reflection)?;
    }
    debug!(%line, count = managed.len(), "mirrored objects");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_keeps_the_line_with_the_sources() {
        let ids: Vec<ObjectId> = (1..=5).map(ObjectId).collect();
        let (reference, managed) = split(&ids);
        assert_eq!(reference, &ids[..3]);
        assert_eq!(managed, &ids[3..]);

        let (reference, managed) = split(&ids[..3]);
        assert_eq!(reference, &ids[..2]);
        assert_eq!(managed, &ids[2..3]);
    }
}
