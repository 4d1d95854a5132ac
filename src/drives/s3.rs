use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use std::path::Path;

use crate::drives::{remote_filename, Drive, UploadedFile};

pub const PROVIDER: &str = "s3";

pub struct S3Params {
    pub label: String,
    pub bucket: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub endpoint: Option<String>,
    pub prefix: String,
    pub force_path_style: bool,
}

pub struct S3Drive {
    label: String,
    bucket: String,
    prefix: String,
    client: aws_sdk_s3::Client,
}

impl S3Drive {
    pub async fn new(params: S3Params) -> Self {
        let mut loader = aws_config::defaults(aws_sdk_s3::config::BehaviorVersion::latest())
            .region(Region::new(params.region.clone()))
            .credentials_provider(Credentials::new(
                params.access_key,
                params.secret_key,
                None,
                None,
                "backupman",
            ));
        if let Some(endpoint) = &params.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if params.force_path_style {
            builder = builder.force_path_style(true);
        }
        let client = aws_sdk_s3::Client::from_conf(builder.build());

        Self {
            label: params.label,
            bucket: params.bucket,
            prefix: params.prefix,
            client,
        }
    }

    fn object_key(&self, src: &Path) -> String {
        let filename = remote_filename(src);
        if self.prefix.is_empty() {
            filename
        } else {
            format!("{}/{}", self.prefix.trim_matches('/'), filename)
        }
    }
}

#[async_trait]
impl Drive for S3Drive {
    async fn upload(&self, src: &Path) -> anyhow::Result<UploadedFile> {
        let key = self.object_key(src);
        let body = ByteStream::from_path(src)
            .await
            .with_context(|| format!("failed to read {}", src.display()))?;

        let resp = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(body)
            .send()
            .await
            .with_context(|| format!("failed to upload {} to s3://{}/{}", src.display(), self.bucket, key))?;

        Ok(UploadedFile {
            path: key,
            checksum: resp.e_tag().map(|t| t.trim_matches('"').to_string()),
        })
    }

    async fn delete(&self, remote_path: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(remote_path)
            .send()
            .await
            .with_context(|| format!("failed to delete s3://{}/{}", self.bucket, remote_path))?;
        Ok(())
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn provider(&self) -> &str {
        PROVIDER
    }

    async fn health(&self) -> anyhow::Result<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .with_context(|| format!("bucket {} not accessible", self.bucket))?;
        Ok(())
    }
}
