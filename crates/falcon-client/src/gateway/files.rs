use bytes::Bytes;
use chrono::Utc;
use falcon_core::file::{storage_path, OrderFile, StoredObject};
use falcon_core::FalconError;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::{check, decode, Query, RestGateway};
use crate::error::Result;

const SLUG_LEN: usize = 8;
const OCTET_STREAM: &str = "application/octet-stream";

/// Random lowercase alphanumeric slug that keeps same-millisecond uploads of
/// the same file name apart.
fn upload_slug() -> String {
    use rand::{distributions::Alphanumeric, Rng};
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SLUG_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

/// Percent-encode each segment of an object key, keeping the `/`s.
fn object_url(base: &str, bucket: &str, path: &str) -> Result<String> {
    let mut url = reqwest::Url::parse(base)
        .map_err(|e| FalconError::Config(format!("invalid storage url '{base}': {e}")))?;
    url.path_segments_mut()
        .map_err(|_| FalconError::Config(format!("storage url '{base}' cannot hold a path")))?
        .pop_if_empty()
        .push(bucket)
        .extend(path.split('/'));
    Ok(url.to_string())
}

#[derive(Deserialize)]
struct SignedUrl {
    #[serde(alias = "signedUrl")]
    #[serde(rename = "signedURL")]
    signed_url: String,
}

impl RestGateway {
    pub async fn list_order_files(&self, order_id: Uuid) -> Result<Vec<OrderFile>> {
        let q = Query::new()
            .select("*")
            .eq("order_id", order_id)
            .order("created_at", false);
        self.select("order_files", &q).await
    }

    /// Store a file under the order and record it in `order_files`.
    ///
    /// The object is written first with `x-upsert: false`, so a key
    /// collision fails instead of overwriting; the metadata row is logged
    /// only after the upload succeeded.
    pub async fn upload_order_file(
        &self,
        order_id: Uuid,
        filename: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> Result<StoredObject> {
        let org = self.my_org_id().await?;
        let bucket = self.config.storage_bucket.clone();
        let path = storage_path(org, order_id, Utc::now(), &upload_slug(), filename);
        let guessed = mime_guess::from_path(filename).first_raw();
        let content_type = content_type.or(guessed);
        let size = data.len() as u64;

        let url = object_url(
            &format!("{}/object", self.config.storage_url()),
            &bucket,
            &path,
        )?;
        tracing::debug!(%bucket, %path, size, "uploading object");
        let resp = self
            .http
            .post(url)
            .header(CONTENT_TYPE, content_type.unwrap_or(OCTET_STREAM))
            .header("x-upsert", "false")
            .body(data)
            .send()
            .await?;
        check(resp).await?;

        let _: serde_json::Value = self
            .rpc(
                "log_file_upload",
                json!({
                    "p_order_id": order_id,
                    "p_bucket": bucket,
                    "p_path": path,
                    "p_filename": filename,
                    "p_content_type": content_type,
                    "p_bytes": size,
                }),
            )
            .await?;
        tracing::info!(%order_id, %path, "file uploaded");
        Ok(StoredObject { bucket, path })
    }

    /// Delete the stored object only; the metadata row stays.
    pub async fn remove_object(&self, bucket: &str, path: &str) -> Result<()> {
        let resp = self
            .storage(Method::DELETE, &format!("object/{bucket}"))
            .json(&json!({ "prefixes": [path] }))
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    /// Delete the metadata row; returns the order it belonged to when the
    /// procedure reports it.
    pub async fn delete_order_file_row(&self, file_id: Uuid) -> Result<Option<Uuid>> {
        let order: Option<Uuid> = self
            .rpc("delete_order_file", json!({ "p_file_id": file_id }))
            .await?;
        Ok(order)
    }

    /// Remove the object, then its row.
    pub async fn delete_order_file(&self, file: &OrderFile) -> Result<()> {
        self.remove_object(&file.bucket, &file.path).await?;
        self.delete_order_file_row(file.id).await?;
        tracing::info!(order_id = %file.order_id, file = %file.filename, "file deleted");
        Ok(())
    }

    /// Time-limited download link for an object.
    pub async fn signed_url(&self, bucket: &str, path: &str, expires_in_secs: u64) -> Result<String> {
        let url = object_url(
            &format!("{}/object/sign", self.config.storage_url()),
            bucket,
            path,
        )?;
        let resp = self
            .http
            .post(url)
            .json(&json!({ "expiresIn": expires_in_secs }))
            .send()
            .await?;
        let signed: SignedUrl = decode("storage/sign", check(resp).await?).await?;
        if signed.signed_url.starts_with("http") {
            return Ok(signed.signed_url);
        }
        Ok(format!(
            "{}/{}",
            self.config.storage_url(),
            signed.signed_url.trim_start_matches('/')
        ))
    }
}
