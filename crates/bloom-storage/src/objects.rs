//! JSON objects in S3. Thin wrapper around the AWS S3 SDK.

use aws_sdk_s3::Client;
use aws_smithy_types::byte_stream::ByteStream;
use serde_json::Value;

use crate::error::StorageError;

const JSON_CONTENT_TYPE: &str = "application/json";

/// A JSON object read from S3 with the ETag it was read at.
pub struct JsonObject {
    pub value: Value,
    pub etag: Option<String>,
}

/// Get and parse a JSON object.
pub async fn get_json(client: &Client, bucket: &str, key: &str) -> Result<JsonObject, StorageError> {
    let resp = client
        .get_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map_err(|e| {
            let err = e.into_service_error();
            if err.is_no_such_key() {
                StorageError::NotFound {
                    key: key.to_string(),
                }
            } else {
                StorageError::GetObject(err.to_string())
            }
        })?;

    let etag = resp.e_tag().map(|s| s.to_string());
    let body = resp
        .body
        .collect()
        .await
        .map_err(|e| StorageError::GetObject(e.to_string()))?
        .into_bytes();

    Ok(JsonObject {
        value: serde_json::from_slice(&body)?,
        etag,
    })
}

/// Write a JSON object. Returns the new ETag.
pub async fn put_json(
    client: &Client,
    bucket: &str,
    key: &str,
    value: &Value,
) -> Result<String, StorageError> {
    let resp = client
        .put_object()
        .bucket(bucket)
        .key(key)
        .content_type(JSON_CONTENT_TYPE)
        .body(ByteStream::from(serde_json::to_vec(value)?))
        .send()
        .await
        .map_err(|e| StorageError::PutObject(e.into_service_error().to_string()))?;

    Ok(resp.e_tag().unwrap_or_default().to_string())
}

/// Write a JSON object only if it still has `expected_etag`.
/// Returns `StorageError::PreconditionFailed` when someone else wrote first.
pub async fn put_json_if_match(
    client: &Client,
    bucket: &str,
    key: &str,
    value: &Value,
    expected_etag: &str,
) -> Result<String, StorageError> {
    let resp = client
        .put_object()
        .bucket(bucket)
        .key(key)
        .content_type(JSON_CONTENT_TYPE)
        .body(ByteStream::from(serde_json::to_vec(value)?))
        .if_match(expected_etag)
        .send()
        .await
        .map_err(|e| {
            let err = e.into_service_error();
            // S3 answers 412 Precondition Failed when If-Match doesn't match
            if err.to_string().contains("PreconditionFailed") {
                StorageError::PreconditionFailed {
                    key: key.to_string(),
                }
            } else {
                StorageError::PutObject(err.to_string())
            }
        })?;

    Ok(resp.e_tag().unwrap_or_default().to_string())
}

/// List every key under a prefix, following continuation tokens.
pub async fn list_keys(client: &Client, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
    let mut keys = Vec::new();
    let mut continuation_token: Option<String> = None;

    loop {
        let mut req = client.list_objects_v2().bucket(bucket).prefix(prefix);

        if let Some(token) = &continuation_token {
            req = req.continuation_token(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| StorageError::ListObjects(e.into_service_error().to_string()))?;

        keys.extend(resp.contents().iter().filter_map(|obj| obj.key().map(str::to_string)));

        if resp.is_truncated() == Some(true) {
            continuation_token = resp.next_continuation_token().map(|s| s.to_string());
        } else {
            break;
        }
    }

    Ok(keys)
}
