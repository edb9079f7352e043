//! CLI command implementations.

pub mod build;
pub mod query;
pub mod trial;

use anyhow::{Context, Result};
use cardest_graph::SummaryParam;

/// Resolves the ratio/budget flags into the numeric estimation
/// parameter and the naming-convention tag.
pub fn resolve_param(ratio: &str, budget: Option<u64>) -> Result<(f64, SummaryParam)> {
    if let Some(b) = budget {
        return Ok((b as f64, SummaryParam::Budget(b)));
    }
    let value: f64 = ratio
        .parse()
        .with_context(|| format!("invalid sampling ratio '{ratio}'"))?;
    if !(0.0..=1.0).contains(&value) {
        anyhow::bail!("sampling ratio {value} outside [0, 1]");
    }
    // Keep the command-line spelling: the summary file name must
    // reproduce it exactly for external orchestration scripts.
    Ok((value, SummaryParam::Ratio(ratio.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_ratio_keeps_spelling() {
        let (value, param) = resolve_param("0.030", None).unwrap();
        assert_eq!(value, 0.03);
        assert_eq!(param, SummaryParam::Ratio("0.030".to_string()));
    }

    #[test]
    fn test_resolve_budget_wins() {
        let (value, param) = resolve_param("0.03", Some(4096)).unwrap();
        assert_eq!(value, 4096.0);
        assert_eq!(param, SummaryParam::Budget(4096));
    }

    #[test]
    fn test_rejects_bad_ratio() {
        assert!(resolve_param("lots", None).is_err());
        assert!(resolve_param("1.5", None).is_err());
    }
}
