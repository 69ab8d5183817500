//! Transaction construction shared by the order-book and escrow operations.
//!
//! A [`TxBuilder`] accumulates inputs (with the value of the output each one
//! spends) and outputs, then [`TxBuilder::finalize`] appends normal change and
//! the trailing metadata output. Signing happens outside this core.

use crate::{
    CcMarketError, Fulfillment, LedgerView, OutPoint, PubKey, Result, Script, Transaction, TxIn,
    TxOut, Units, plain_address,
};

/// Mutable transaction under construction.
#[derive(Debug, Clone, Default)]
pub struct TxBuilder {
    inputs: Vec<TxIn>,
    outputs: Vec<TxOut>,
    input_total: Units,
}

impl TxBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an input spending `prevout`, which carries `value` units.
    ///
    /// # Errors
    /// - `InvalidArgument` if `prevout` is already an input
    /// - `ArithmeticOverflow` if the input total leaves the 64-bit range
    pub fn add_input(&mut self, prevout: OutPoint, value: Units, fulfillment: Fulfillment) -> Result<()> {
        if self.contains(&prevout) {
            return Err(CcMarketError::invalid_argument(format!(
                "outpoint {}:{} added twice",
                prevout.txid, prevout.vout
            )));
        }
        self.input_total = self
            .input_total
            .checked_add(value)
            .ok_or(CcMarketError::ArithmeticOverflow { context: "input total" })?;
        self.inputs.push(TxIn {
            prevout,
            fulfillment,
        });
        Ok(())
    }

    /// True when `outpoint` is already spent by this builder.
    #[must_use]
    pub fn contains(&self, outpoint: &OutPoint) -> bool {
        self.inputs.iter().any(|input| input.prevout == *outpoint)
    }

    pub fn push_output(&mut self, output: TxOut) {
        self.outputs.push(output);
    }

    #[must_use]
    pub fn inputs(&self) -> &[TxIn] {
        &self.inputs
    }

    #[must_use]
    pub fn outputs(&self) -> &[TxOut] {
        &self.outputs
    }

    #[must_use]
    pub fn input_total(&self) -> Units {
        self.input_total
    }

    pub fn output_total(&self) -> Result<Units> {
        self.outputs.iter().try_fold(0u64, |acc, out| {
            acc.checked_add(out.value)
                .ok_or(CcMarketError::ArithmeticOverflow { context: "output total" })
        })
    }

    /// Append normal change to `change_to` and the metadata output.
    ///
    /// # Errors
    /// Returns [`CcMarketError::InsufficientFunds`] when inputs do not cover
    /// outputs plus `fee`.
    pub fn finalize(mut self, change_to: PubKey, fee: Units, metadata: Vec<u8>) -> Result<Transaction> {
        let spent = self
            .output_total()?
            .checked_add(fee)
            .ok_or(CcMarketError::ArithmeticOverflow { context: "outputs plus fee" })?;
        let change = self
            .input_total
            .checked_sub(spent)
            .ok_or(CcMarketError::InsufficientFunds {
                needed: spent,
                available: self.input_total,
            })?;
        if change > 0 {
            self.outputs
                .push(TxOut::new(change, Script::PayToPubkey(change_to)));
        }
        self.outputs.push(TxOut::metadata(metadata));
        let tx = Transaction::new(self.inputs, self.outputs);
        tracing::debug!(
            txid = %tx.txid(),
            inputs = tx.inputs.len(),
            outputs = tx.outputs.len(),
            change,
            "Finalized transaction"
        );
        Ok(tx)
    }
}

/// Add unspent normal outputs of `owner` until `total` is covered or
/// `max_inputs` inputs were added. Returns the value added.
///
/// Outputs already in the builder or spent in the pending pool are skipped.
/// The caller decides whether the returned amount suffices.
pub fn add_normal_inputs<L: LedgerView + ?Sized>(
    ledger: &L,
    builder: &mut TxBuilder,
    owner: &PubKey,
    total: Units,
    max_inputs: usize,
) -> Result<Units> {
    let mut added: Units = 0;
    let mut count = 0usize;
    for utxo in ledger.find_unspent_outputs(&plain_address(owner)) {
        if added >= total || count >= max_inputs {
            break;
        }
        let outpoint = utxo.outpoint();
        if builder.contains(&outpoint) || ledger.is_spent_in_mempool(&outpoint) {
            continue;
        }
        builder.add_input(outpoint, utxo.value, Fulfillment::Signature { signer: *owner })?;
        added = added
            .checked_add(utxo.value)
            .ok_or(CcMarketError::ArithmeticOverflow { context: "normal inputs" })?;
        count += 1;
    }
    Ok(added)
}
