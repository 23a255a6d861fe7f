/// Remote destination: a bucket and a key prefix inside it.
///
/// An empty prefix means the bucket root; a non-empty prefix always ends in `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    bucket: String,
    prefix: String,
}

impl RemoteTarget {
    pub fn new(bucket: impl Into<String>, prefix: impl AsRef<str>) -> Self {
        let trimmed = prefix.as_ref().trim_matches('/');
        let prefix = if trimmed.is_empty() {
            String::new()
        } else {
            format!("{}/", trimmed)
        };
        Self {
            bucket: bucket.into(),
            prefix,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// `s3://<bucket>/<prefix><folder>/`
    pub fn url_for_folder(&self, folder: &str) -> String {
        format!("s3://{}/{}{}/", self.bucket, self.prefix, folder)
    }
}
