// =============================================================================
// Leadership Evaluator — industry-peer check
// =============================================================================
//
// Grounded on leadership-service/checks/industry_peer_checks.py. Peers
// failing contract validation (missing revenue or market cap) are excluded
// from ranking rather than defaulted to zero — a zero would unfairly sink a
// real peer below the subject. Composite is an equal-weighted sum of
// revenue and market cap per DESIGN.md Open Question #4.
// =============================================================================

use super::CheckResult;

#[derive(Debug, Clone)]
pub struct PeerContract {
    pub ticker: String,
    pub market_cap: Option<f64>,
    pub total_revenue: Option<f64>,
}

fn composite(market_cap: f64, total_revenue: f64) -> f64 {
    market_cap + total_revenue
}

/// Ranks the subject among `peers` (which must NOT include the subject) by
/// descending composite score; rank <= 3 (1-indexed) passes.
pub fn evaluate_industry_leader(
    subject_ticker: &str,
    subject_market_cap: f64,
    subject_total_revenue: f64,
    peers: &[PeerContract],
) -> CheckResult {
    let mut complete_peers: Vec<(String, f64)> = peers
        .iter()
        .filter_map(|p| match (p.market_cap, p.total_revenue) {
            (Some(mc), Some(rev)) => Some((p.ticker.clone(), composite(mc, rev))),
            _ => None,
        })
        .collect();

    if complete_peers.is_empty() {
        return CheckResult::new("industry_leader", false, "no complete financial data".to_string());
    }

    complete_peers.push((subject_ticker.to_string(), composite(subject_market_cap, subject_total_revenue)));
    complete_peers.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let rank = complete_peers
        .iter()
        .position(|(ticker, _)| ticker == subject_ticker)
        .map(|idx| idx + 1)
        .unwrap_or(usize::MAX);

    let passed = rank <= 3;
    CheckResult::new(
        "industry_leader",
        passed,
        if passed {
            format!("ranked #{rank} of {} by revenue/market-cap composite", complete_peers.len())
        } else {
            format!("ranked #{rank} of {}, outside the top 3", complete_peers.len())
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(ticker: &str, mc: f64, rev: f64) -> PeerContract {
        PeerContract { ticker: ticker.to_string(), market_cap: Some(mc), total_revenue: Some(rev) }
    }

    #[test]
    fn subject_ranked_first_passes() {
        let peers = vec![peer("B", 10.0, 10.0), peer("C", 5.0, 5.0)];
        let result = evaluate_industry_leader("A", 100.0, 100.0, &peers);
        assert!(result.passed);
        assert!(result.message.contains("#1"));
    }

    #[test]
    fn subject_ranked_outside_top_three_fails() {
        let peers = vec![peer("B", 100.0, 100.0), peer("C", 90.0, 90.0), peer("D", 80.0, 80.0)];
        let result = evaluate_industry_leader("A", 1.0, 1.0, &peers);
        assert!(!result.passed);
    }

    #[test]
    fn incomplete_peers_are_excluded_not_zeroed() {
        let peers = vec![PeerContract { ticker: "B".into(), market_cap: None, total_revenue: Some(5.0) }];
        let result = evaluate_industry_leader("A", 1.0, 1.0, &peers);
        assert!(!result.passed);
        assert!(result.message.contains("no complete financial data"));
    }
}
