//! GitHub REST API gateway
//!
//! Endpoints used:
//! - `GET  /orgs/{org}` (authentication probe)
//! - `GET  /repos/{org}/{repo}/contents/{path}?ref={ref}`
//! - `PUT  /repos/{org}/{repo}/contents/{path}`
//! - `GET  /repos/{org}/{repo}/git/ref/heads/{branch}`
//! - `POST /repos/{org}/{repo}/git/refs`
//! - `GET  /repos/{org}/{repo}/pulls?state=open&base={base}&head={org}:{head}`
//! - `POST /repos/{org}/{repo}/pulls`

use crate::error::GatewayError;
use crate::gateway::{
    FileWrite, HttpClient, NewPullRequest, PullRequest, RemoteFile, RepositoryGateway,
};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;

/// Gateway for repositories owned by one GitHub organization
pub struct GitHubGateway {
    client: HttpClient,
    organization: String,
}

/// Response of the contents endpoint for a single file
#[derive(Debug, Deserialize)]
struct ContentResponse {
    #[serde(rename = "type")]
    kind: String,
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

/// Response of the git ref endpoint
#[derive(Debug, Deserialize)]
struct RefResponse {
    object: RefObject,
}

#[derive(Debug, Deserialize)]
struct RefObject {
    sha: String,
}

/// Subset of the pull request resource
#[derive(Debug, Deserialize)]
struct PullResponse {
    number: u64,
    html_url: String,
    head: PullRef,
    base: PullRef,
}

#[derive(Debug, Deserialize)]
struct PullRef {
    #[serde(rename = "ref")]
    name: String,
}

impl From<PullResponse> for PullRequest {
    fn from(pr: PullResponse) -> Self {
        PullRequest {
            number: pr.number,
            head: pr.head.name,
            base: pr.base.name,
            url: pr.html_url,
        }
    }
}

impl GitHubGateway {
    /// Create a gateway without checking credentials
    pub fn new(client: HttpClient, organization: impl Into<String>) -> Self {
        Self {
            client,
            organization: organization.into(),
        }
    }

    /// Authenticate with an access token and verify the organization is reachable.
    ///
    /// The token needs the `repo` and `workflow` scopes to write workflow files.
    pub async fn authenticate(
        client: HttpClient,
        token: &str,
        organization: &str,
    ) -> Result<Self, GatewayError> {
        let gateway = Self::new(client.with_token(token), organization);
        let path = format!("/orgs/{}", organization);
        let probe: Result<serde_json::Value, GatewayError> = gateway
            .client
            .get_json(&path, &[], &format!("organization {}", organization))
            .await;

        match probe {
            Ok(_) => Ok(gateway),
            Err(GatewayError::NotFound { resource }) => Err(GatewayError::AuthFailure {
                message: format!("{} is not visible with this token", resource),
            }),
            Err(GatewayError::PermissionDenied { message }) => {
                Err(GatewayError::AuthFailure { message })
            }
            Err(e) => Err(e),
        }
    }

    /// Organization the gateway operates on
    pub fn organization(&self) -> &str {
        &self.organization
    }

    fn repo_path(&self, repo: &str, rest: &str) -> String {
        format!("/repos/{}/{}/{}", self.organization, repo, rest)
    }

    async fn put_contents(
        &self,
        repo: &str,
        write: FileWrite<'_>,
        sha: Option<&str>,
    ) -> Result<(), GatewayError> {
        let mut body = json!({
            "message": write.message,
            "content": STANDARD.encode(write.content),
            "branch": write.branch,
        });
        if let Some(sha) = sha {
            body["sha"] = json!(sha);
        }
        let resource = format!("{}/{}@{}", repo, write.path, write.branch);
        let _: serde_json::Value = self
            .client
            .send_json(
                Method::PUT,
                &self.repo_path(repo, &format!("contents/{}", write.path)),
                &body,
                &resource,
            )
            .await?;
        Ok(())
    }
}

/// Decode a base64 content payload; GitHub wraps it at 60 columns
fn decode_content(encoded: &str, url: &str) -> Result<String, GatewayError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| GatewayError::invalid_response(url, format!("invalid base64: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| GatewayError::invalid_response(url, format!("invalid UTF-8: {}", e)))
}

#[async_trait]
impl RepositoryGateway for GitHubGateway {
    async fn get_file(
        &self,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<RemoteFile, GatewayError> {
        let api_path = self.repo_path(repo, &format!("contents/{}", path));
        let resource = format!("{}/{}@{}", repo, path, git_ref);
        let response: ContentResponse = self
            .client
            .get_json(&api_path, &[("ref", git_ref)], &resource)
            .await?;

        if response.kind != "file" {
            return Err(GatewayError::invalid_response(
                &api_path,
                format!("expected a file, found {}", response.kind),
            ));
        }
        if response.encoding != "base64" {
            return Err(GatewayError::invalid_response(
                &api_path,
                format!("unsupported content encoding '{}'", response.encoding),
            ));
        }

        Ok(RemoteFile {
            content: decode_content(&response.content, &api_path)?,
            sha: response.sha,
        })
    }

    async fn get_branch_head(&self, repo: &str, branch: &str) -> Result<String, GatewayError> {
        let resource = format!("{} branch {}", repo, branch);
        let response: RefResponse = self
            .client
            .get_json(
                &self.repo_path(repo, &format!("git/ref/heads/{}", branch)),
                &[],
                &resource,
            )
            .await?;
        Ok(response.object.sha)
    }

    async fn create_branch(&self, repo: &str, branch: &str, sha: &str) -> Result<(), GatewayError> {
        let body = json!({
            "ref": format!("refs/heads/{}", branch),
            "sha": sha,
        });
        let resource = format!("{} commit {}", repo, sha);
        let _: serde_json::Value = self
            .client
            .send_json(Method::POST, &self.repo_path(repo, "git/refs"), &body, &resource)
            .await?;
        Ok(())
    }

    async fn create_file(&self, repo: &str, write: FileWrite<'_>) -> Result<(), GatewayError> {
        self.put_contents(repo, write, None).await
    }

    async fn update_file(
        &self,
        repo: &str,
        write: FileWrite<'_>,
        sha: &str,
    ) -> Result<(), GatewayError> {
        self.put_contents(repo, write, Some(sha)).await
    }

    async fn list_open_pull_requests(
        &self,
        repo: &str,
        base: &str,
        head: &str,
    ) -> Result<Vec<PullRequest>, GatewayError> {
        let head = format!("{}:{}", self.organization, head);
        let resource = format!("{} pull requests", repo);
        let response: Vec<PullResponse> = self
            .client
            .get_json(
                &self.repo_path(repo, "pulls"),
                &[("state", "open"), ("base", base), ("head", head.as_str())],
                &resource,
            )
            .await?;
        Ok(response.into_iter().map(PullRequest::from).collect())
    }

    async fn create_pull_request(
        &self,
        repo: &str,
        pull_request: NewPullRequest<'_>,
    ) -> Result<PullRequest, GatewayError> {
        let body = json!({
            "title": pull_request.title,
            "body": pull_request.body,
            "head": pull_request.head,
            "base": pull_request.base,
        });
        let resource = format!("{} pull requests", repo);
        let response: PullResponse = self
            .client
            .send_json(Method::POST, &self.repo_path(repo, "pulls"), &body, &resource)
            .await?;
        Ok(response.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_path() {
        let gateway = GitHubGateway::new(HttpClient::new().unwrap(), "localgovdrupal");
        assert_eq!(
            gateway.repo_path("localgov_news", "git/refs"),
            "/repos/localgovdrupal/localgov_news/git/refs"
        );
        assert_eq!(gateway.organization(), "localgovdrupal");
    }

    #[test]
    fn test_decode_wrapped_content() {
        let encoded = "bmFtZTogVGVz\ndCB3b3JrZmxv\ndwo=\n";
        assert_eq!(decode_content(encoded, "u").unwrap(), "name: Test workflow\n");
    }

    #[test]
    fn test_decode_invalid_base64() {
        let err = decode_content("!!!", "u").unwrap_err();
        assert!(matches!(err, GatewayError::InvalidResponse { .. }));
    }

    #[test]
    fn test_pull_response_conversion() {
        let json = r#"{
            "number": 7,
            "html_url": "https://github.com/org/repo/pull/7",
            "head": {"ref": "fix/workflow"},
            "base": {"ref": "2.x"}
        }"#;
        let pr: PullRequest = serde_json::from_str::<PullResponse>(json).unwrap().into();
        assert_eq!(pr.number, 7);
        assert_eq!(pr.head, "fix/workflow");
        assert_eq!(pr.base, "2.x");
    }
}
