pub mod listmodels;
pub mod refactor;
pub mod strategies;
