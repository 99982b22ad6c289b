use crate::config::PublishConfig;
use crate::error::{DatasetError, Result};
use crate::publish::join::{BundleFile, DatasetBundle};
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};

const PREUPLOAD_CHUNK: usize = 256;
const SAMPLE_BYTES: usize = 512;
const LFS_MEDIA_TYPE: &str = "application/vnd.git-lfs+json";

/// Somewhere a finished dataset bundle can be sent.
#[allow(async_fn_in_trait)]
pub trait Publisher {
    async fn publish(&self, repo_id: &str, bundle: &DatasetBundle) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadMode {
    Regular,
    Lfs,
}

#[derive(Serialize)]
struct CreateRepoRequest<'a> {
    #[serde(rename = "type")]
    repo_type: &'static str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    organization: Option<&'a str>,
    private: bool,
}

#[derive(Serialize)]
struct PreuploadRequest {
    files: Vec<PreuploadFile>,
}

#[derive(Serialize)]
struct PreuploadFile {
    path: String,
    size: usize,
    sample: String,
}

#[derive(Deserialize)]
struct PreuploadResponse {
    files: Vec<PreuploadResult>,
}

#[derive(Deserialize)]
struct PreuploadResult {
    path: String,
    #[serde(rename = "uploadMode")]
    upload_mode: UploadMode,
}

#[derive(Serialize)]
struct LfsBatchRequest {
    operation: &'static str,
    transfers: Vec<&'static str>,
    objects: Vec<LfsObject>,
    hash_algo: &'static str,
}

#[derive(Serialize, Debug)]
struct LfsObject {
    oid: String,
    size: usize,
}

#[derive(Deserialize)]
struct LfsBatchResponse {
    objects: Vec<LfsBatchObject>,
}

#[derive(Deserialize)]
struct LfsBatchObject {
    oid: String,
    #[serde(default)]
    actions: Option<LfsActions>,
    #[serde(default)]
    error: Option<LfsObjectError>,
}

#[derive(Deserialize)]
struct LfsActions {
    upload: Option<LfsAction>,
    verify: Option<LfsAction>,
}

#[derive(Deserialize)]
struct LfsAction {
    href: String,
    #[serde(default)]
    header: HashMap<String, String>,
}

#[derive(Deserialize)]
struct LfsObjectError {
    code: u16,
    message: String,
}

#[derive(Serialize)]
#[serde(tag = "key", content = "value")]
enum CommitLine<'a> {
    #[serde(rename = "header")]
    Header { summary: &'a str, description: &'a str },
    #[serde(rename = "file")]
    File {
        content: String,
        path: &'a str,
        encoding: &'static str,
    },
    #[serde(rename = "lfsFile")]
    LfsFile {
        path: &'a str,
        algo: &'static str,
        oid: String,
        size: usize,
    },
}

/// Dataset hub client speaking the Hugging Face HTTP API.
pub struct HubClient {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    revision: String,
    private: bool,
}

impl HubClient {
    pub fn new(config: &PublishConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(600))
            .build()?;
        Self::with_client(config, client)
    }

    pub fn with_client(config: &PublishConfig, client: reqwest::Client) -> Result<Self> {
        if config.hf_token.trim().is_empty() {
            return Err(DatasetError::Config("HF_TOKEN is empty".into()));
        }
        Ok(Self {
            client,
            endpoint: config.hub_endpoint.clone(),
            token: config.hf_token.clone(),
            revision: config.revision.clone(),
            private: config.private,
        })
    }

    /// Create the dataset repo; an existing one is fine.
    pub async fn create_repo(&self, repo_id: &str) -> Result<()> {
        let (organization, name) = split_repo_id(repo_id);
        let request = CreateRepoRequest {
            repo_type: "dataset",
            name,
            organization,
            private: self.private,
        };

        let resp = self
            .client
            .post(format!("{}/api/repos/create", self.endpoint))
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::CONFLICT {
            tracing::debug!("Dataset repo {} already exists", repo_id);
            return Ok(());
        }
        check(resp, "create repo").await?;
        tracing::info!("Created dataset repo {}", repo_id);
        Ok(())
    }

    /// Ask the hub which files must go through LFS.
    pub async fn preupload(
        &self,
        repo_id: &str,
        files: &[BundleFile],
    ) -> Result<HashMap<String, UploadMode>> {
        let mut modes = HashMap::with_capacity(files.len());
        for chunk in files.chunks(PREUPLOAD_CHUNK) {
            let resp = self
                .client
                .post(format!(
                    "{}/api/datasets/{}/preupload/{}",
                    self.endpoint, repo_id, self.revision
                ))
                .bearer_auth(&self.token)
                .json(&preupload_request(chunk))
                .send()
                .await?;
            let data: PreuploadResponse = check(resp, "preupload").await?.json().await?;
            modes.extend(data.files.into_iter().map(|f| (f.path, f.upload_mode)));
        }
        Ok(modes)
    }

    pub async fn upload_lfs(&self, repo_id: &str, files: &[&BundleFile]) -> Result<()> {
        if files.is_empty() {
            return Ok(());
        }

        let request = lfs_batch_request(files);
        let resp = self
            .client
            .post(format!(
                "{}/datasets/{}.git/info/lfs/objects/batch",
                self.endpoint, repo_id
            ))
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, LFS_MEDIA_TYPE)
            .header(reqwest::header::CONTENT_TYPE, LFS_MEDIA_TYPE)
            .body(serde_json::to_vec(&request)?)
            .send()
            .await?;
        let batch: LfsBatchResponse = check(resp, "lfs batch").await?.json().await?;

        let by_oid: HashMap<String, &BundleFile> = request
            .objects
            .iter()
            .map(|o| o.oid.clone())
            .zip(files.iter().copied())
            .collect();

        for object in batch.objects {
            if let Some(err) = object.error {
                return Err(DatasetError::Hub {
                    action: "lfs batch",
                    status: reqwest::StatusCode::from_u16(err.code)
                        .unwrap_or(reqwest::StatusCode::INTERNAL_SERVER_ERROR),
                    body: err.message,
                });
            }
            let Some(file) = by_oid.get(&object.oid) else {
                tracing::warn!("LFS batch answered for unknown object {}", object.oid);
                continue;
            };
            let Some(actions) = object.actions else {
                tracing::debug!("{} already stored", file.path_in_repo);
                continue;
            };

            if let Some(upload) = actions.upload {
                let mut req = self.client.put(&upload.href).body(file.bytes.clone());
                for (k, v) in &upload.header {
                    req = req.header(k.as_str(), v.as_str());
                }
                check(req.send().await?, "lfs upload").await?;
                tracing::info!("Uploaded {} ({}KB)", file.path_in_repo, file.bytes.len() / 1024);
            }
            if let Some(verify) = actions.verify {
                let mut req = self
                    .client
                    .post(&verify.href)
                    .bearer_auth(&self.token)
                    .header(reqwest::header::CONTENT_TYPE, LFS_MEDIA_TYPE)
                    .body(serde_json::to_vec(&LfsObject {
                        oid: object.oid.clone(),
                        size: file.bytes.len(),
                    })?);
                for (k, v) in &verify.header {
                    req = req.header(k.as_str(), v.as_str());
                }
                check(req.send().await?, "lfs verify").await?;
            }
        }
        Ok(())
    }

    pub async fn commit(&self, repo_id: &str, body: String) -> Result<()> {
        let resp = self
            .client
            .post(format!(
                "{}/api/datasets/{}/commit/{}",
                self.endpoint, repo_id, self.revision
            ))
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .await?;
        check(resp, "commit").await?;
        Ok(())
    }
}

impl Publisher for HubClient {
    async fn publish(&self, repo_id: &str, bundle: &DatasetBundle) -> Result<()> {
        self.create_repo(repo_id).await?;

        let modes = self.preupload(repo_id, &bundle.files).await?;
        let lfs: Vec<&BundleFile> = bundle
            .files
            .iter()
            .filter(|f| modes.get(&f.path_in_repo) == Some(&UploadMode::Lfs))
            .collect();
        tracing::info!(
            "Uploading {} files ({} via LFS, {}KB total)",
            bundle.files.len(),
            lfs.len(),
            bundle.total_bytes() / 1024
        );
        self.upload_lfs(repo_id, &lfs).await?;

        let summary = format!(
            "Upload {} captioned images ({})",
            bundle.examples,
            chrono::Utc::now().format("%Y-%m-%d %H:%M UTC")
        );
        let lfs_paths: HashSet<&str> = lfs.iter().map(|f| f.path_in_repo.as_str()).collect();
        self.commit(repo_id, commit_body(&summary, &bundle.files, &lfs_paths)?)
            .await
    }
}

/// `owner/name` -> `(Some(owner), name)`; a bare name has no owner.
pub fn split_repo_id(repo_id: &str) -> (Option<&str>, &str) {
    match repo_id.split_once('/') {
        Some((owner, name)) => (Some(owner), name),
        None => (None, repo_id),
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn preupload_request(files: &[BundleFile]) -> PreuploadRequest {
    let engine = base64::engine::general_purpose::STANDARD;
    PreuploadRequest {
        files: files
            .iter()
            .map(|f| PreuploadFile {
                path: f.path_in_repo.clone(),
                size: f.bytes.len(),
                sample: engine.encode(&f.bytes[..f.bytes.len().min(SAMPLE_BYTES)]),
            })
            .collect(),
    }
}

fn lfs_batch_request(files: &[&BundleFile]) -> LfsBatchRequest {
    LfsBatchRequest {
        operation: "upload",
        transfers: vec!["basic"],
        objects: files
            .iter()
            .map(|f| LfsObject {
                oid: sha256_hex(&f.bytes),
                size: f.bytes.len(),
            })
            .collect(),
        hash_algo: "sha256",
    }
}

/// NDJSON commit payload: a header line, then one line per file.
fn commit_body(summary: &str, files: &[BundleFile], lfs_paths: &HashSet<&str>) -> Result<String> {
    let engine = base64::engine::general_purpose::STANDARD;
    let mut body = serde_json::to_string(&CommitLine::Header {
        summary,
        description: "",
    })?;
    body.push('\n');

    for file in files {
        let line = if lfs_paths.contains(file.path_in_repo.as_str()) {
            CommitLine::LfsFile {
                path: &file.path_in_repo,
                algo: "sha256",
                oid: sha256_hex(&file.bytes),
                size: file.bytes.len(),
            }
        } else {
            CommitLine::File {
                content: engine.encode(&file.bytes),
                path: &file.path_in_repo,
                encoding: "base64",
            }
        };
        body.push_str(&serde_json::to_string(&line)?);
        body.push('\n');
    }
    Ok(body)
}

async fn check(resp: reqwest::Response, action: &'static str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(DatasetError::Hub { action, status, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, bytes: &[u8]) -> BundleFile {
        BundleFile {
            path_in_repo: path.into(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn repo_id_splits_on_the_first_slash() {
        assert_eq!(split_repo_id("yashh123/kasanova"), (Some("yashh123"), "kasanova"));
        assert_eq!(split_repo_id("kasanova"), (None, "kasanova"));
    }

    #[test]
    fn sha256_of_known_input() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn preupload_samples_at_most_512_bytes() {
        let big = vec![7u8; 2000];
        let req = preupload_request(&[
            file("data/a.jpeg", &big),
            file("data/metadata.jsonl", b"{}"),
        ]);
        let json = serde_json::to_value(&req).unwrap();

        assert_eq!(json["files"][0]["size"], 2000);
        let sample = json["files"][0]["sample"].as_str().unwrap();
        let decoded = base64::engine::general_purpose::STANDARD.decode(sample).unwrap();
        assert_eq!(decoded.len(), 512);
        assert_eq!(json["files"][1]["sample"], "e30=");
    }

    #[test]
    fn preupload_response_modes() {
        let data: PreuploadResponse = serde_json::from_str(
            r#"{"files":[
                {"path":"data/a.jpeg","uploadMode":"lfs","shouldIgnore":false},
                {"path":"data/metadata.jsonl","uploadMode":"regular"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(data.files[0].upload_mode, UploadMode::Lfs);
        assert_eq!(data.files[1].upload_mode, UploadMode::Regular);
    }

    #[test]
    fn lfs_batch_names_objects_by_sha256() {
        let a = file("data/a.jpeg", b"abc");
        let req = lfs_batch_request(&[&a]);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["operation"], "upload");
        assert_eq!(json["hash_algo"], "sha256");
        assert_eq!(json["objects"][0]["oid"], sha256_hex(b"abc"));
        assert_eq!(json["objects"][0]["size"], 3);
    }

    #[test]
    fn commit_body_mixes_regular_and_lfs_lines() {
        let files = [file("data/a.jpeg", b"abc"), file("data/metadata.jsonl", b"{}\n")];
        let lfs: HashSet<&str> = ["data/a.jpeg"].into_iter().collect();
        let body = commit_body("Upload 1 captioned images", &files, &lfs).unwrap();
        let lines: Vec<serde_json::Value> = body
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["key"], "header");
        assert_eq!(lines[0]["value"]["summary"], "Upload 1 captioned images");
        assert_eq!(lines[1]["key"], "lfsFile");
        assert_eq!(lines[1]["value"]["oid"], sha256_hex(b"abc"));
        assert_eq!(lines[1]["value"]["size"], 3);
        assert!(lines[1]["value"].get("content").is_none());
        assert_eq!(lines[2]["key"], "file");
        assert_eq!(lines[2]["value"]["encoding"], "base64");
        assert_eq!(lines[2]["value"]["content"], "e30K");
        assert!(body.ends_with('\n'));
    }

    #[test]
    fn lfs_batch_response_with_and_without_actions() {
        let batch: LfsBatchResponse = serde_json::from_str(
            r#"{"objects":[
                {"oid":"aa","size":3,"actions":{
                    "upload":{"href":"https://s3/put","header":{"x-amz":"1"}}
                }},
                {"oid":"bb","size":4}
            ]}"#,
        )
        .unwrap();
        let actions = batch.objects[0].actions.as_ref().unwrap();
        assert_eq!(actions.upload.as_ref().unwrap().header["x-amz"], "1");
        assert!(actions.verify.is_none());
        assert!(batch.objects[1].actions.is_none());
        assert!(batch.objects[1].error.is_none());
    }

    #[test]
    fn empty_token_is_rejected() {
        let config = PublishConfig {
            output_dir: "data_back".into(),
            metadata_table: "data_back/metadata.csv".into(),
            repo_id: "o/n".into(),
            hf_token: "  ".into(),
            hub_endpoint: "https://huggingface.co".into(),
            revision: "main".into(),
            private: false,
            decode_images: false,
        };
        assert!(matches!(HubClient::new(&config), Err(DatasetError::Config(_))));
    }
}
