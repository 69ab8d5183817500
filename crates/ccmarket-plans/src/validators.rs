//! Reusable validators.

use ccmarket_types::{Address, CcMarketError, Result, Transaction};

use crate::{Subject, Validator};

/// Passes when the subject's output pays one of `allowed`.
///
/// For an input the spent output is checked, so this doubles as "input comes
/// from address" and "output goes to address".
#[derive(Debug, Clone)]
pub struct DestinationValidator {
    name: String,
    allowed: Vec<Address>,
}

impl DestinationValidator {
    pub fn new(name: impl Into<String>, allowed: Vec<Address>) -> Self {
        Self {
            name: name.into(),
            allowed,
        }
    }

    #[must_use]
    pub fn allowed(&self) -> &[Address] {
        &self.allowed
    }
}

impl Validator for DestinationValidator {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self, _tx: &Transaction, subject: &Subject<'_>) -> Result<()> {
        let output = subject.output();
        match output.script.address() {
            Some(address) if self.allowed.contains(&address) => Ok(()),
            Some(address) => Err(CcMarketError::InvalidDestination {
                reason: format!("{}: {subject} pays {address}", self.name),
            }),
            None => Err(CcMarketError::InvalidDestination {
                reason: format!("{}: {subject} has no destination", self.name),
            }),
        }
    }
}
