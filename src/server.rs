use std::sync::Arc;
use std::time::Instant;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Implementation, ServerCapabilities, ServerInfo};
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};

use crate::response::{ToolMetadata, ToolResponse};
use crate::service::RefactorService;
use crate::tools::listmodels::{ListModelsRequest, ListModelsResponse};
use crate::tools::refactor::RefactorRequest;
use crate::tools::strategies::ListStrategiesResponse;

#[derive(Clone)]
pub struct RefactoraptorServer {
    service: Arc<RefactorService>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl RefactoraptorServer {
    pub fn new(service: RefactorService) -> Self {
        Self {
            service: Arc::new(service),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        name = "refactor",
        description = "Detect the SOLID principle violation in a source fragment and return a refactored version with an explanation. Use `liststrategies` and `listmodels` for valid names.",
        annotations(read_only_hint = true)
    )]
    async fn refactor(
        &self,
        Parameters(req): Parameters<RefactorRequest>,
    ) -> Result<CallToolResult, McpError> {
        let start = Instant::now();
        let req = req.into_prompt_request();

        let mut metadata = ToolMetadata {
            tool_name: "refactor".to_string(),
            model_used: Some(req.model.clone()),
            backend_used: Some(req.backend.to_string()),
            ..Default::default()
        };

        let response = match self.service.refactor(&req, None).await {
            Ok(outcome) => {
                metadata.strategy_used = Some(outcome.strategy.to_string());
                metadata.attempts_used = Some(outcome.attempts_used());
                metadata.valid = Some(outcome.is_valid());
                metadata.duration_seconds = start.elapsed().as_secs_f64();
                match serde_json::to_value(&outcome.result) {
                    Ok(content) => ToolResponse::success(content, metadata),
                    Err(e) => ToolResponse::error(format!("serialization failed: {e}"), metadata),
                }
            }
            Err(e) => {
                tracing::warn!("refactor failed: {e}");
                metadata.duration_seconds = start.elapsed().as_secs_f64();
                ToolResponse::error(e.user_message(), metadata)
            }
        };

        Ok(response.into_call_tool_result())
    }

    #[tool(
        name = "liststrategies",
        description = "List prompt strategy ids with a one-line description each.",
        annotations(read_only_hint = true)
    )]
    async fn liststrategies(&self) -> Result<CallToolResult, McpError> {
        let list = ListStrategiesResponse::from(self.service.catalog());
        let content = serde_json::to_value(&list)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;

        let response = ToolResponse::success(
            content,
            ToolMetadata {
                tool_name: "liststrategies".to_string(),
                ..Default::default()
            },
        );
        Ok(response.into_call_tool_result())
    }

    #[tool(
        name = "listmodels",
        description = "List the models a backend offers, limited to the configured allow-list.",
        annotations(read_only_hint = true)
    )]
    async fn listmodels(
        &self,
        Parameters(req): Parameters<ListModelsRequest>,
    ) -> Result<CallToolResult, McpError> {
        let start = Instant::now();
        let backend = req.backend.unwrap_or_default();
        let mut metadata = ToolMetadata {
            tool_name: "listmodels".to_string(),
            backend_used: Some(backend.to_string()),
            ..Default::default()
        };

        let response = match self.service.list_models(backend).await {
            Ok(models) => {
                metadata.duration_seconds = start.elapsed().as_secs_f64();
                let list = ListModelsResponse { backend, models };
                let content = serde_json::to_value(&list)
                    .map_err(|e| McpError::internal_error(e.to_string(), None))?;
                ToolResponse::success(content, metadata)
            }
            Err(e) => {
                tracing::warn!("listmodels failed: {e}");
                metadata.duration_seconds = start.elapsed().as_secs_f64();
                ToolResponse::error(e.user_message(), metadata)
            }
        };

        Ok(response.into_call_tool_result())
    }
}

#[tool_handler]
impl ServerHandler for RefactoraptorServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "refactoraptor".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(
                "Refactoraptor: SOLID violation detection and refactoring.\n\n\
                 Workflow:\n\
                 1. Call `liststrategies` to pick how the request is phrased (DEFAULT if unsure).\n\
                 2. Call `listmodels` with backend \"local\" or \"hosted\" for exact model names.\n\
                 3. Call `refactor` with model, strategy, source, language and temperature.\n\
                    - Set `max_attempts` > 1 to retry until the model answers in the expected format.\n\
                    - With strategy KNOWN, pass `violation_hint` (e.g. \"OCP\").\n\
                 The result always has violationType, refactoredCode, explanation and totalDurationNanos; \
                 metadata.valid is false when the model never produced all three parts."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
