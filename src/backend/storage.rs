use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::Deserialize;

use crate::types::Outcome;

use super::BackendClient;

#[derive(Deserialize)]
struct Uploaded {
    #[serde(rename = "Key")]
    key: String,
}

impl BackendClient {
    /// Uploads `bytes` to `bucket/path`, replacing any existing object.
    ///
    /// Returns the storage key of the object.
    pub async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Outcome<String> {
        let request = self
            .request(Method::POST, &format!("storage/v1/object/{bucket}/{}", trim(path)))
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(bytes);
        let uploaded: Uploaded = self.call(request, &format!("upload {bucket}")).await?;
        Ok(uploaded.key)
    }

    /// Public URL of an object in a public bucket. No request is made.
    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{bucket}/{}", self.base_url(), trim(path))
    }
}

fn trim(path: &str) -> &str {
    path.trim_start_matches('/')
}
