use serde::{Deserialize, Serialize};

/// Tunables of the ledger engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Reject results whose total is not the sum of the four ballot
    /// categories, or exceeds the junta's registered voters.
    pub strict_totals: bool,
    /// Fresh ids drawn per batch entry before giving up on collisions.
    pub max_id_attempts: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            strict_totals: false,
            max_id_attempts: 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: LedgerConfig = serde_json::from_str(r#"{"strict_totals":true}"#).unwrap();
        assert!(config.strict_totals);
        assert_eq!(config.max_id_attempts, LedgerConfig::default().max_id_attempts);
    }
}
