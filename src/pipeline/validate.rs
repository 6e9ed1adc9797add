//! Pre-flight upload validation.

use crate::naming;
use crate::pipeline::PipelineError;
use crate::policy::ImageSpec;

/// Validate an upload against its category's policy without reading file
/// contents.
///
/// Checks the filename extension against the category allow-list and the raw
/// byte size against `max_upload_bytes`. A size exactly at the limit passes.
/// No decoding or content sniffing happens here; a mislabeled file is caught
/// later when the transformer fails to decode it.
pub fn validate(filename: &str, byte_size: usize, spec: &ImageSpec) -> Result<(), PipelineError> {
    let extension = naming::file_extension(filename);
    if !spec.allowed_extensions.contains(&extension.as_str()) {
        return Err(PipelineError::UnsupportedExtension {
            extension,
            allowed: spec.allowed_extensions.join(", "),
        });
    }

    if byte_size > spec.max_upload_bytes {
        return Err(PipelineError::FileTooLarge {
            size: byte_size,
            max: spec.max_upload_bytes,
        });
    }

    Ok(())
}
