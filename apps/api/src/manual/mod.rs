// Company manual. Append-only: every create, edit or archive is a new
// section version under a company-wide counter, snapshotted to S3.

pub mod handlers;
pub mod versioning;
