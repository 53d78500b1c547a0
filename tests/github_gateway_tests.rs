//! GitHub gateway tests against a mock HTTP server

use httpmock::prelude::*;
use serde_json::json;
use workflow_sync::error::GatewayError;
use workflow_sync::gateway::{
    FileWrite, GitHubGateway, HttpClient, NewPullRequest, RepositoryGateway,
};

fn client(server: &MockServer) -> HttpClient {
    HttpClient::for_base_url(&server.base_url())
        .unwrap()
        .with_max_retries(0)
}

fn gateway(server: &MockServer) -> GitHubGateway {
    GitHubGateway::new(client(server).with_token("secret"), "org")
}

mod authentication {
    use super::*;

    #[tokio::test]
    async fn test_authenticate_probes_organization() {
        let server = MockServer::start_async().await;
        let probe = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/orgs/org")
                    .header("authorization", "Bearer secret");
                then.status(200).json_body(json!({"login": "org"}));
            })
            .await;

        let gateway = GitHubGateway::authenticate(client(&server), "secret", "org")
            .await
            .unwrap();
        assert_eq!(gateway.organization(), "org");
        probe.assert_async().await;
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/orgs/org");
                then.status(401).json_body(json!({"message": "Bad credentials"}));
            })
            .await;

        let err = GitHubGateway::authenticate(client(&server), "wrong", "org")
            .await
            .err()
            .unwrap();
        match err {
            GatewayError::AuthFailure { message } => assert_eq!(message, "Bad credentials"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_forbidden_organization() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/orgs/org");
                then.status(403).json_body(json!({"message": "SAML enforcement"}));
            })
            .await;

        let err = GitHubGateway::authenticate(client(&server), "secret", "org")
            .await
            .err()
            .unwrap();
        assert!(err.is_auth_failure());
    }

    #[tokio::test]
    async fn test_invisible_organization() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/orgs/org");
                then.status(404).json_body(json!({"message": "Not Found"}));
            })
            .await;

        let err = GitHubGateway::authenticate(client(&server), "secret", "org")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, GatewayError::AuthFailure { .. }));
    }
}

mod reads {
    use super::*;

    #[tokio::test]
    async fn test_get_file_decodes_wrapped_content() {
        let server = MockServer::start_async().await;
        let contents = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/repos/org/localgov_news/contents/.github/workflows/test.yml")
                    .query_param("ref", "2.x");
                then.status(200).json_body(json!({
                    "type": "file",
                    "sha": "abc123",
                    "encoding": "base64",
                    "content": "bmFtZTog\nQ0kK\n"
                }));
            })
            .await;

        let file = gateway(&server)
            .get_file("localgov_news", ".github/workflows/test.yml", "2.x")
            .await
            .unwrap();
        assert_eq!(file.content, "name: CI\n");
        assert_eq!(file.sha, "abc123");
        contents.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_file_not_found() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/repos/org/localgov_news/contents/composer.json");
                then.status(404).json_body(json!({"message": "Not Found"}));
            })
            .await;

        let err = gateway(&server)
            .get_file("localgov_news", "composer.json", "9.x")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_get_file_rejects_directory() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/repos/org/localgov_news/contents/.github");
                then.status(200).json_body(json!({"type": "dir", "sha": "d1"}));
            })
            .await;

        let err = gateway(&server)
            .get_file("localgov_news", ".github", "2.x")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_server_error_is_transport_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/repos/org/localgov_news/git/ref/heads/2.x");
                then.status(502);
            })
            .await;

        let err = gateway(&server)
            .get_branch_head("localgov_news", "2.x")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Transport { .. }));
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn test_forbidden_is_permission_denied() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/repos/org/private_repo/contents/composer.json");
                then.status(403)
                    .header("x-ratelimit-remaining", "4999")
                    .json_body(json!({"message": "Resource not accessible by integration"}));
            })
            .await;

        let err = gateway(&server)
            .get_file("private_repo", "composer.json", "1.x")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::PermissionDenied { .. }));
        assert!(!err.is_auth_failure());
    }

    #[tokio::test]
    async fn test_unauthorized_is_auth_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/repos/org/localgov_news/git/ref/heads/2.x");
                then.status(401).json_body(json!({"message": "Bad credentials"}));
            })
            .await;

        let err = gateway(&server)
            .get_branch_head("localgov_news", "2.x")
            .await
            .unwrap_err();
        assert!(err.is_auth_failure());
    }

    #[tokio::test]
    async fn test_get_branch_head() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/repos/org/localgov_news/git/ref/heads/2.x");
                then.status(200).json_body(json!({
                    "ref": "refs/heads/2.x",
                    "object": {"sha": "c0ffee", "type": "commit"}
                }));
            })
            .await;

        let sha = gateway(&server)
            .get_branch_head("localgov_news", "2.x")
            .await
            .unwrap();
        assert_eq!(sha, "c0ffee");
    }

    #[tokio::test]
    async fn test_list_open_pull_requests_filters_by_refs() {
        let server = MockServer::start_async().await;
        let pulls = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/repos/org/localgov_news/pulls")
                    .query_param("state", "open")
                    .query_param("base", "2.x")
                    .query_param("head", "org:work");
                then.status(200).json_body(json!([{
                    "number": 7,
                    "html_url": "https://github.com/org/localgov_news/pull/7",
                    "head": {"ref": "work"},
                    "base": {"ref": "2.x"}
                }]));
            })
            .await;

        let open = gateway(&server)
            .list_open_pull_requests("localgov_news", "2.x", "work")
            .await
            .unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].number, 7);
        assert_eq!(open[0].head, "work");
        pulls.assert_async().await;
    }
}

mod writes {
    use super::*;

    #[tokio::test]
    async fn test_create_branch() {
        let server = MockServer::start_async().await;
        let refs = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/repos/org/localgov_news/git/refs")
                    .json_body(json!({"ref": "refs/heads/work", "sha": "c0ffee"}));
                then.status(201).json_body(json!({"ref": "refs/heads/work"}));
            })
            .await;

        gateway(&server)
            .create_branch("localgov_news", "work", "c0ffee")
            .await
            .unwrap();
        refs.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_file_sends_sha_and_encoded_content() {
        let server = MockServer::start_async().await;
        let put = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/repos/org/localgov_news/contents/.github/workflows/test.yml")
                    .json_body(json!({
                        "message": "Updated GitHub workflow",
                        "content": "bmFtZTogQ0kK",
                        "branch": "work",
                        "sha": "abc123"
                    }));
                then.status(200).json_body(json!({"content": {"sha": "def456"}}));
            })
            .await;

        let write = FileWrite {
            path: ".github/workflows/test.yml",
            content: "name: CI\n",
            message: "Updated GitHub workflow",
            branch: "work",
        };
        gateway(&server)
            .update_file("localgov_news", write, "abc123")
            .await
            .unwrap();
        put.assert_async().await;
    }

    #[tokio::test]
    async fn test_write_conflict_is_not_retried() {
        let server = MockServer::start_async().await;
        let put = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/repos/org/localgov_news/contents/.github/workflows/test.yml");
                then.status(409).json_body(json!({"message": "sha mismatch"}));
            })
            .await;

        let write = FileWrite {
            path: ".github/workflows/test.yml",
            content: "name: CI\n",
            message: "Updated GitHub workflow",
            branch: "work",
        };
        let err = gateway(&server)
            .create_file("localgov_news", write)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("sha mismatch"));
        assert_eq!(put.hits_async().await, 1);
    }

    #[tokio::test]
    async fn test_create_pull_request() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/repos/org/localgov_news/pulls")
                    .json_body(json!({
                        "title": "Update workflow",
                        "body": "Regenerated",
                        "head": "work",
                        "base": "2.x"
                    }));
                then.status(201).json_body(json!({
                    "number": 12,
                    "html_url": "https://github.com/org/localgov_news/pull/12",
                    "head": {"ref": "work"},
                    "base": {"ref": "2.x"}
                }));
            })
            .await;

        let pull_request = NewPullRequest {
            base: "2.x",
            head: "work",
            title: "Update workflow",
            body: "Regenerated",
        };
        let created = gateway(&server)
            .create_pull_request("localgov_news", pull_request)
            .await
            .unwrap();
        assert_eq!(created.number, 12);
        assert_eq!(created.base, "2.x");
        assert_eq!(created.url, "https://github.com/org/localgov_news/pull/12");
    }
}
