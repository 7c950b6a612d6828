//! HTTP gateway client for the AI services.
//!
//! A reference implementation of the service traits against a JSON gateway
//! that fronts the actual model providers. HTTP status codes are folded
//! into the error message so the classifier sees "429" on throttled calls.

use reqwest::{header, Client};
use serde::{Deserialize, Serialize};

use crate::project::model::GroupingStrategy;
use crate::services::{
    AnalysisResponse, AnalyzedGroup, AnalyzedScene, ChatSession, ImageGenerator, PromptEnhancer,
    RenderRequest, ScriptAnalyzer, ServiceError,
};
use async_trait::async_trait;

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeHttpRequest<'a> {
    script_text: &'a str,
    grouping_strategy: String,
}

/// The gateway returns either a flat `scenes` list or named `groups`,
/// depending on the strategy it was asked for.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct AnalyzeHttpResponse {
    scenes: Option<Vec<AnalyzedScene>>,
    groups: Option<Vec<AnalyzedGroup>>,
}

fn into_analysis_response(response: AnalyzeHttpResponse) -> Result<AnalysisResponse, ServiceError> {
    match (response.groups, response.scenes) {
        (Some(groups), _) => Ok(AnalysisResponse::Grouped(groups)),
        (None, Some(scenes)) => Ok(AnalysisResponse::Flat(scenes)),
        (None, None) => Err(ServiceError::bad_response(
            "analysis response carried neither scenes nor groups",
        )),
    }
}

#[derive(Debug, Serialize)]
struct PromptHttpRequest<'a> {
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct PromptHttpResponse {
    prompt: String,
}

#[derive(Debug, Serialize)]
struct RewriteHttpRequest<'a> {
    description: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderHttpResponse {
    image_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatHttpRequest<'a> {
    session_id: Option<&'a str>,
    message: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatHttpResponse {
    session_id: String,
    text: String,
}

// =============================================================================
// CLIENT
// =============================================================================

/// Gateway client implementing the analysis, enhancement, and rendering
/// traits. Cheap to clone; chat sessions are spawned via [`Self::open_chat`].
#[derive(Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
}

impl GatewayClient {
    /// Creates a client with bearer-token auth against the given base URL.
    pub fn new(base_url: &str, token: &str) -> Result<Self, ServiceError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ServiceError::call(e.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ServiceError::call(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Opens a fresh stateful chat session.
    pub fn open_chat(&self) -> GatewayChatSession {
        GatewayChatSession {
            gateway: self.clone(),
            session_id: None,
        }
    }

    async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, ServiceError>
    where
        Req: Serialize + Sync,
        Resp: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ServiceError::call(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(ServiceError::call(format!("HTTP {}: {}", status, message)));
        }

        resp.json()
            .await
            .map_err(|e| ServiceError::bad_response(e.to_string()))
    }
}

#[async_trait]
impl ScriptAnalyzer for GatewayClient {
    async fn analyze(
        &self,
        script: &str,
        strategy: GroupingStrategy,
    ) -> Result<AnalysisResponse, ServiceError> {
        let request = AnalyzeHttpRequest {
            script_text: script,
            grouping_strategy: strategy.to_string(),
        };
        let response: AnalyzeHttpResponse = self.post_json("/v1/analyze", &request).await?;
        into_analysis_response(response)
    }

    async fn rewrite_prompt(&self, description: &str) -> Result<String, ServiceError> {
        let request = RewriteHttpRequest { description };
        let response: PromptHttpResponse = self.post_json("/v1/rewrite", &request).await?;
        Ok(response.prompt)
    }
}

#[async_trait]
impl PromptEnhancer for GatewayClient {
    async fn enhance(&self, prompt: &str) -> Result<String, ServiceError> {
        let request = PromptHttpRequest { prompt };
        let response: PromptHttpResponse = self.post_json("/v1/enhance", &request).await?;
        Ok(response.prompt)
    }
}

#[async_trait]
impl ImageGenerator for GatewayClient {
    async fn render(&self, request: &RenderRequest) -> Result<String, ServiceError> {
        let response: RenderHttpResponse = self.post_json("/v1/render", request).await?;
        Ok(response.image_url)
    }
}

/// Stateful chat session against the gateway. The session id handed back by
/// the first exchange is threaded through every subsequent message.
pub struct GatewayChatSession {
    gateway: GatewayClient,
    session_id: Option<String>,
}

#[async_trait]
impl ChatSession for GatewayChatSession {
    async fn send(&mut self, message: &str) -> Result<String, ServiceError> {
        let request = ChatHttpRequest {
            session_id: self.session_id.as_deref(),
            message,
        };
        let response: ChatHttpResponse = self.gateway.post_json("/v1/chat", &request).await?;
        self.session_id = Some(response.session_id);
        Ok(response.text)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_response_flat() {
        let parsed: AnalyzeHttpResponse = serde_json::from_str(
            r#"{"scenes":[{"sceneNumber":1,"description":"a","visualPrompt":"p"}]}"#,
        )
        .unwrap();
        match into_analysis_response(parsed).unwrap() {
            AnalysisResponse::Flat(scenes) => assert_eq!(scenes.len(), 1),
            other => panic!("expected flat, got {:?}", other),
        }
    }

    #[test]
    fn test_analyze_response_grouped() {
        let parsed: AnalyzeHttpResponse = serde_json::from_str(
            r#"{"groups":[{"name":"Act One","scenes":[{"sceneNumber":1}]}]}"#,
        )
        .unwrap();
        match into_analysis_response(parsed).unwrap() {
            AnalysisResponse::Grouped(groups) => assert_eq!(groups[0].name, "Act One"),
            other => panic!("expected grouped, got {:?}", other),
        }
    }

    #[test]
    fn test_analyze_response_empty_is_bad_response() {
        let parsed: AnalyzeHttpResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            into_analysis_response(parsed),
            Err(ServiceError::BadResponse(_))
        ));
    }

    #[test]
    fn test_analyze_request_serializes_strategy_string() {
        let request = AnalyzeHttpRequest {
            script_text: "s",
            grouping_strategy: GroupingStrategy::Batch(3).to_string(),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"groupingStrategy\":\"batch_3\""));
        assert!(json.contains("\"scriptText\""));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = GatewayClient::new("https://gw.example.com/", "token").unwrap();
        assert_eq!(client.base_url, "https://gw.example.com");
    }
}
