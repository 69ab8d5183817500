//! Configuration types for validators and transaction construction.

use serde::{Deserialize, Serialize};

use crate::{CcMarketError, Result, Units, constants};

/// Limits applied while validating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Deepest ancestor level the transitive provenance walk may reach.
    pub max_provenance_depth: usize,
    /// Most distinct ancestors one provenance walk may load.
    pub max_provenance_nodes: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_provenance_depth: constants::DEFAULT_MAX_PROVENANCE_DEPTH,
            max_provenance_nodes: constants::DEFAULT_MAX_PROVENANCE_NODES,
        }
    }
}

/// Parameters of the order-book and escrow construction operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderConfig {
    /// Fee paid to miners, also the value of the escrow funding marker.
    pub tx_fee: Units,
    /// Most contract inputs gathered into one transaction.
    pub max_inputs: usize,
    /// Most normal inputs gathered to pay the fee.
    pub max_fee_inputs: usize,
    /// Longest accepted escrow plan name, in bytes.
    pub max_name_len: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            tx_fee: constants::DEFAULT_TX_FEE,
            max_inputs: constants::DEFAULT_MAX_INPUTS,
            max_fee_inputs: constants::DEFAULT_MAX_FEE_INPUTS,
            max_name_len: constants::MAX_PLAN_NAME_LEN,
        }
    }
}

/// Top-level configuration for a node embedding the contract core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractConfig {
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub builder: BuilderConfig,
}

impl ContractConfig {
    /// Check the configuration for values no validator can work with.
    pub fn validate(&self) -> Result<()> {
        if self.validation.max_provenance_depth == 0 {
            return Err(CcMarketError::Configuration(
                "max_provenance_depth must be positive".into(),
            ));
        }
        if self.validation.max_provenance_nodes == 0 {
            return Err(CcMarketError::Configuration(
                "max_provenance_nodes must be positive".into(),
            ));
        }
        if self.builder.max_inputs == 0 || self.builder.max_fee_inputs == 0 {
            return Err(CcMarketError::Configuration(
                "input limits must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Parse from JSON and validate.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| CcMarketError::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
