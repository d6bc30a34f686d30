//! Application State

use std::sync::Arc;

use agent_core::LlmProvider;
use portfolio_tools::{AdvisorVariant, PortfolioAdvisor};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Bound advisor; owns the thread store, so turns on the same
    /// `thread_id` share history across requests
    pub advisor: Arc<PortfolioAdvisor>,

    /// Model backend, kept for health reporting
    pub provider: Arc<dyn LlmProvider>,

    pub variant: AdvisorVariant,
}
