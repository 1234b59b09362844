// dbbackup/src/backup/s3_upload.rs
use aws_sdk_s3 as s3;
use s3::config::Region;
use s3::error::DisplayErrorContext;
use s3::primitives::ByteStream;
use s3::types::ObjectCannedAcl;
use std::path::Path;

use crate::config::UploadTarget;
use crate::errors::{BackupError, Result};

/// Object key to use for `file_path`: `key` itself, or the file's base name
/// when `key` is empty.
pub fn resolve_object_key(key: &str, file_path: &Path) -> String {
    if !key.is_empty() {
        return key.to_string();
    }
    file_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Uploads a file to S3 (or an S3-compatible store) in a single private PutObject.
///
/// Credentials come from the standard AWS provider chain (environment,
/// shared profile, instance role). Returns the key the object was stored under.
pub async fn upload_file_to_s3(target: &UploadTarget, key: &str, file_path: &Path) -> Result<String> {
    let key = resolve_object_key(key, file_path);
    if key.is_empty() {
        return Err(BackupError::Upload(format!(
            "cannot derive an object key from {}",
            file_path.display()
        )));
    }

    tracing::info!(
        bucket = %target.bucket,
        key = %key,
        region = %target.region,
        "Uploading backup to S3"
    );

    let mut loader = aws_config::defaults(s3::config::BehaviorVersion::latest())
        .region(Region::new(target.region.clone()));
    if let Some(endpoint) = &target.endpoint {
        loader = loader.endpoint_url(endpoint);
    }
    let sdk_config = loader.load().await;

    // S3-compatible endpoints generally don't support virtual-hosted buckets.
    let s3_config = s3::config::Builder::from(&sdk_config)
        .force_path_style(target.endpoint.is_some())
        .build();
    let client = s3::Client::from_conf(s3_config);

    let body = ByteStream::from_path(file_path).await.map_err(|e| {
        BackupError::Upload(format!(
            "open file for S3 upload {}: {e}",
            file_path.display()
        ))
    })?;

    client
        .put_object()
        .bucket(&target.bucket)
        .key(&key)
        .body(body)
        .acl(ObjectCannedAcl::Private)
        .send()
        .await
        .map_err(|e| {
            BackupError::Upload(format!(
                "put object s3://{}/{}: {}",
                target.bucket,
                key,
                DisplayErrorContext(&e)
            ))
        })?;

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_key_is_kept() {
        assert_eq!(
            resolve_object_key("nightly/orders.sql.gz", Path::new("/tmp/other.sql")),
            "nightly/orders.sql.gz"
        );
    }

    #[test]
    fn test_empty_key_falls_back_to_base_name() {
        assert_eq!(
            resolve_object_key("", Path::new("/var/backups/orders-20240305-140702.sql.gz.enc")),
            "orders-20240305-140702.sql.gz.enc"
        );
        assert_eq!(resolve_object_key("", Path::new("/")), "");
    }
}
