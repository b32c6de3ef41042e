pub mod agent;
pub mod app;
pub mod checks;
pub mod descriptor;
pub mod errors;
pub mod l10n_config;
pub mod llm;
pub mod locks;
pub mod plan;
pub mod ui;
