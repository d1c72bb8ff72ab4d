use crate::{Coins, OutputIndex, Transaction, TransactionOutput, Utxo};
use log::trace;
use std::collections::HashMap;

/// A pool of unspent transaction outputs, indexed by the UTXO that identifies them.
/// The pool doesn't validate anything, it's up to the owner to only insert fresh outputs and
/// remove outputs that exist.
/// Cloning the pool gives an independent copy: changes to one don't affect the other.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct UtxoPool {
    utxos: HashMap<Utxo, TransactionOutput>,
}

impl UtxoPool {
    pub fn new() -> Self {
        Self {
            utxos: HashMap::new(),
        }
    }

    /// Binds the UTXO to the output, replacing the previous binding if any.
    pub fn add_utxo(&mut self, utxo: Utxo, output: TransactionOutput) {
        trace!("Adding UTXO: {} ({})", utxo, output);
        self.utxos.insert(utxo, output);
    }

    /// Adds every output of the transaction to the pool, keyed by the transaction id.
    pub fn add_transaction_outputs(&mut self, transaction: &Transaction) {
        let output_indices = (0..).map(OutputIndex::new);
        for (output_index, output) in output_indices.zip(transaction.outputs()) {
            self.add_utxo(transaction.utxo_for_output(output_index), output.clone());
        }
    }

    /// Removes the UTXO from the pool. Removing a UTXO that isn't in the pool is a no-op.
    pub fn remove_utxo(&mut self, utxo: &Utxo) {
        if self.utxos.remove(utxo).is_some() {
            trace!("Removed UTXO: {}", utxo);
        }
    }

    pub fn contains(&self, utxo: &Utxo) -> bool {
        self.utxos.contains_key(utxo)
    }

    /// Returns the output that the UTXO refers to, if the UTXO is unspent.
    pub fn tx_output(&self, utxo: &Utxo) -> Option<&TransactionOutput> {
        self.utxos.get(utxo)
    }

    /// Returns all UTXOs in the pool in no particular order.
    pub fn all_utxos(&self) -> Vec<Utxo> {
        self.utxos.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.utxos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }

    /// Returns the sum of all unspent outputs, or None if the sum doesn't fit in `Coins`.
    pub fn total_value(&self) -> Option<Coins> {
        Coins::checked_sum(self.utxos.values().map(TransactionOutput::amount))
    }
}
