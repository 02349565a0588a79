use serde::Serialize;

use crate::strategies::StrategyCatalog;

#[derive(Debug, Serialize)]
pub struct StrategyInfo {
    pub id: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ListStrategiesResponse {
    pub default: &'static str,
    pub strategies: Vec<StrategyInfo>,
}

impl From<&StrategyCatalog> for ListStrategiesResponse {
    fn from(catalog: &StrategyCatalog) -> Self {
        Self {
            default: crate::strategies::DEFAULT_STRATEGY,
            strategies: catalog
                .describe()
                .into_iter()
                .map(|(id, description)| StrategyInfo { id, description })
                .collect(),
        }
    }
}
