//! Sequential build execution.

use std::time::Instant;

use crate::domain::{BuildDescriptor, Result};
use crate::obs::{emit_build_failed, emit_build_finished, emit_build_started};
use crate::ports::ImageBuilder;

/// Build every descriptor in order, one at a time.
///
/// Returns the produced references in completion order. The first failure
/// aborts the remaining descriptors and is returned as-is; nothing is retried.
pub async fn execute_matrix(
    builder: &dyn ImageBuilder,
    descriptors: &[BuildDescriptor],
) -> Result<Vec<String>> {
    let total = descriptors.len();
    let mut produced = Vec::with_capacity(total);

    for (index, descriptor) in descriptors.iter().enumerate() {
        let reference = descriptor.image_reference();
        emit_build_started(reference, index + 1, total);
        let start = Instant::now();

        match builder.build(descriptor).await {
            Ok(image) => {
                emit_build_finished(&image, start.elapsed().as_millis() as u64);
                produced.push(image);
            }
            Err(e) => {
                emit_build_failed(reference, &e);
                return Err(e);
            }
        }
    }

    Ok(produced)
}
