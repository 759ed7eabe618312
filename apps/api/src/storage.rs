use aws_sdk_s3::primitives::ByteStream;
use tracing::info;

use crate::errors::AppError;

/// Uploads a Markdown document. Keys are caller-built, e.g. `manuals/<company>/v3.md`.
pub async fn put_markdown(
    s3: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    body: String,
) -> Result<(), AppError> {
    s3.put_object()
        .bucket(bucket)
        .key(key)
        .body(ByteStream::from(body.into_bytes()))
        .content_type("text/markdown")
        .send()
        .await
        .map_err(|e| AppError::Storage(format!("S3 upload of {key} failed: {e}")))?;

    info!("Uploaded s3://{bucket}/{key}");
    Ok(())
}
