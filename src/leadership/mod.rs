// =============================================================================
// Leadership Evaluator — C4
// =============================================================================

pub mod financial_health;
pub mod industry_peer;
pub mod market_relative;
pub mod profiles;

pub use industry_peer::PeerContract;
pub use profiles::{evaluate_leadership, LeadershipInputs, LeadershipResult, ProfileResult};

#[derive(Debug, Clone, serde::Serialize)]
pub struct CheckResult {
    pub name: &'static str,
    pub passed: bool,
    pub message: String,
}

impl CheckResult {
    pub fn new(name: &'static str, passed: bool, message: String) -> Self {
        CheckResult { name, passed, message }
    }
}
