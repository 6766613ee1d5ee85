//! Reads newline-delimited JSON-RPC requests from an `AsyncRead` and
//! writes one response per line to an `AsyncWrite`, dispatching each to
//! an `RpcHandler`. Runs independently of the reconciliation loop; a
//! cycle in progress never blocks a request here.

use crate::handler::RpcHandler;
use crate::protocol::{split_balanced_objects, RpcRequest, RpcResponse};
use log::{error, warn};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

pub async fn serve<R, W>(handler: &RpcHandler, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: tokio::io::AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        for response in handle_line(handler, &line).await {
            let mut bytes = serde_json::to_vec(&response).unwrap_or_else(|_| b"{}".to_vec());
            bytes.push(b'\n');
            writer.write_all(&bytes).await?;
        }
        writer.flush().await?;
    }
    Ok(())
}

async fn handle_line(handler: &RpcHandler, line: &str) -> Vec<RpcResponse> {
    match serde_json::from_str::<RpcRequest>(line) {
        Ok(request) => vec![handle_request(handler, request).await],
        Err(_) => {
            let objects = split_balanced_objects(line);
            if objects.is_empty() {
                error!("could not parse JSON-RPC request: {line}");
                return vec![RpcResponse::err(Value::Null, "invalid JSON-RPC request")];
            }
            let mut responses = Vec::with_capacity(objects.len());
            for object in objects {
                match serde_json::from_str::<RpcRequest>(&object) {
                    Ok(request) => responses.push(handle_request(handler, request).await),
                    Err(err) => {
                        warn!("dropping unparsable recovered object: {err}");
                    }
                }
            }
            responses
        }
    }
}

async fn handle_request(handler: &RpcHandler, request: RpcRequest) -> RpcResponse {
    match handler.dispatch(&request.method, &request.params).await {
        Ok(result) => RpcResponse::ok(request.id, result),
        Err(message) => RpcResponse::err(request.id, message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::RpcHandler;
    use async_trait::async_trait;
    use chrono::Utc;
    use rv_config::AppConfig;
    use rv_plugin::PluginRunner;
    use rv_remote::{CiStatus, NewReviewComment, PullRequest, PullRequestState, RemoteRepo, ReviewComment, ReviewEvent};
    use rv_store::Store;
    use std::io::Cursor;
    use std::sync::Arc;

    struct EmptyRemote;

    #[async_trait]
    impl RemoteRepo for EmptyRemote {
        async fn list_pull_requests(&self, _: &str, _: &str, _: PullRequestState) -> anyhow::Result<Vec<PullRequest>> {
            Ok(vec![])
        }
        async fn fetch_pull_request(&self, _: &str, _: &str, _: u64) -> anyhow::Result<PullRequest> {
            Ok(PullRequest {
                number: 1,
                title: "t".to_string(),
                body: None,
                author: "a".to_string(),
                draft: false,
                labels: vec![],
                comments: 0,
                head_sha: "sha".to_string(),
                base_branch: "main".to_string(),
                head_branch: "feature".to_string(),
                mergeable: None,
                mergeable_state: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
                html_url: String::new(),
                additions: 0,
                deletions: 0,
            })
        }
        async fn fetch_pull_request_diff(&self, _: &str, _: &str, _: u64) -> anyhow::Result<String> {
            Ok(String::new())
        }
        async fn fetch_review_comments(&self, _: &str, _: &str, _: u64) -> anyhow::Result<Vec<ReviewComment>> {
            Ok(vec![])
        }
        async fn fetch_requested_reviewers(&self, _: &str, _: &str, _: u64) -> anyhow::Result<Vec<String>> {
            Ok(vec![])
        }
        async fn fetch_ci_status(&self, _: &str, _: &str, _: &str) -> anyhow::Result<CiStatus> {
            unimplemented!()
        }
        async fn fetch_team_members(&self, _: &str, _: &str) -> anyhow::Result<Vec<String>> {
            Ok(vec![])
        }
        async fn fetch_viewer_login(&self) -> anyhow::Result<String> {
            Ok("me".to_string())
        }
        async fn reply_to_review_comment(&self, _: &str, _: &str, _: u64, _: u64, _: &str) -> anyhow::Result<u64> {
            Ok(1)
        }
        async fn create_review(
            &self,
            _: &str,
            _: &str,
            _: u64,
            _: ReviewEvent,
            _: Option<&str>,
            _: &[NewReviewComment],
        ) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn handler() -> RpcHandler {
        RpcHandler::new(
            Arc::new(EmptyRemote),
            Store::open_in_memory().unwrap(),
            PluginRunner::new(Store::open_in_memory().unwrap(), vec![]),
            &AppConfig::default(),
        )
    }

    #[tokio::test]
    async fn serves_one_response_per_request_line() {
        let h = handler();
        let input = "{\"method\":\"Hello\",\"params\":[],\"id\":1}\n{\"method\":\"Hello\",\"params\":[],\"id\":2}\n";
        let mut output = Vec::new();
        serve(&h, Cursor::new(input.as_bytes()), &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let response: Value = serde_json::from_str(line).unwrap();
            assert!(response["error"].is_null());
            assert_eq!(response["result"]["name"], "rv");
        }
    }

    #[tokio::test]
    async fn unparsable_line_yields_an_error_response() {
        let h = handler();
        let input = "not json at all\n";
        let mut output = Vec::new();
        serve(&h, Cursor::new(input.as_bytes()), &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        let response: Value = serde_json::from_str(text.trim()).unwrap();
        assert!(response["result"].is_null());
        assert!(response["error"]["message"].as_str().unwrap().contains("invalid"));
    }

    #[tokio::test]
    async fn concatenated_requests_on_one_line_both_get_answered() {
        let h = handler();
        let input = "{\"method\":\"Hello\",\"params\":[],\"id\":1}{\"method\":\"Hello\",\"params\":[],\"id\":2}\n";
        let mut output = Vec::new();
        serve(&h, Cursor::new(input.as_bytes()), &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
