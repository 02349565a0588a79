use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::dispatch::BackendKind;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListModelsRequest {
    /// "local" (default) or "hosted".
    pub backend: Option<BackendKind>,
}

#[derive(Debug, Serialize)]
pub struct ListModelsResponse {
    pub backend: BackendKind,
    pub models: Vec<String>,
}
