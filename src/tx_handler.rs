use crate::{OutputIndex, Transaction, TransactionValidator, UtxoPool};
use log::{debug, info};

/// Decides how a batch of transactions is walked during an epoch.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum EpochMode {
    /// Each transaction is considered once, in batch order.
    /// A transaction that depends on a later transaction in the same batch is rejected.
    SinglePass,
    /// Pending transactions are walked in batch order repeatedly until a walk accepts nothing,
    /// so dependent transactions are accepted regardless of their position in the batch.
    FixedPoint,
}

impl Default for EpochMode {
    fn default() -> Self {
        EpochMode::SinglePass
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct TxHandlerParams {
    pub epoch_mode: EpochMode,
}

/// The public ledger: it owns the current UTXO pool and applies batches of proposed
/// transactions to it, one epoch at a time.
pub struct TxHandler {
    params: TxHandlerParams,
    utxo_pool: UtxoPool,
}

impl TxHandler {
    /// Creates a ledger whose UTXO pool is a copy of the given pool.
    pub fn new(utxo_pool: &UtxoPool) -> Self {
        Self::with_params(utxo_pool, TxHandlerParams::default())
    }

    pub fn with_params(utxo_pool: &UtxoPool, params: TxHandlerParams) -> Self {
        Self {
            params,
            utxo_pool: utxo_pool.clone(),
        }
    }

    pub fn utxo_pool(&self) -> &UtxoPool {
        &self.utxo_pool
    }

    pub fn params(&self) -> &TxHandlerParams {
        &self.params
    }

    /// Returns whether the transaction can be applied to the current UTXO pool.
    pub fn is_valid_tx(&self, transaction: &Transaction) -> bool {
        TransactionValidator::is_valid(transaction, &self.utxo_pool)
    }

    /// Handles an epoch: validates the proposed transactions against the current pool,
    /// applies each valid one before looking at the next, and returns the accepted
    /// transactions in the order they were applied.
    /// When two transactions claim the same UTXO, the one that comes first in the batch wins.
    pub fn handle_txs(&mut self, possible_txs: &[Transaction]) -> Vec<Transaction> {
        let accepted = match self.params.epoch_mode {
            EpochMode::SinglePass => self.single_pass(possible_txs.iter().collect()).0,
            EpochMode::FixedPoint => self.fixed_point(possible_txs),
        };
        info!(
            "Epoch accepted {} of {} transactions, {} UTXOs in the pool",
            accepted.len(),
            possible_txs.len(),
            self.utxo_pool.len()
        );
        accepted.into_iter().cloned().collect()
    }

    fn fixed_point<'a>(&mut self, possible_txs: &'a [Transaction]) -> Vec<&'a Transaction> {
        let mut accepted = vec![];
        let mut pending: Vec<&Transaction> = possible_txs.iter().collect();
        loop {
            let (newly_accepted, rejected) = self.single_pass(pending);
            if newly_accepted.is_empty() {
                break;
            }
            accepted.extend(newly_accepted);
            pending = rejected;
        }
        accepted
    }

    /// Walks the transactions once in order.
    /// Returns the accepted transactions and the rejected ones, both in their original order.
    fn single_pass<'a>(
        &mut self,
        transactions: Vec<&'a Transaction>,
    ) -> (Vec<&'a Transaction>, Vec<&'a Transaction>) {
        let mut accepted = vec![];
        let mut rejected = vec![];
        for transaction in transactions {
            let validation = TransactionValidator::validate(transaction, &self.utxo_pool)
                .and_then(|()| self.validate_created_outputs_are_fresh(transaction));
            match validation {
                Ok(()) => {
                    self.apply(transaction);
                    accepted.push(transaction);
                }
                Err(reason) => {
                    debug!("Rejected transaction: {}. Reason: {}", transaction.id(), reason);
                    rejected.push(transaction);
                }
            }
        }
        (accepted, rejected)
    }

    /// Rejects a transaction whose outputs are already in the pool, e.g. the same zero-input
    /// transaction proposed twice. Applying it would add the same UTXOs a second time.
    fn validate_created_outputs_are_fresh(
        &self,
        transaction: &Transaction,
    ) -> Result<(), String> {
        let output_indices = (0..).map(OutputIndex::new).take(transaction.num_outputs());
        for output_index in output_indices {
            let utxo = transaction.utxo_for_output(output_index);
            if self.utxo_pool.contains(&utxo) {
                return Err(format!(
                    "Transaction: {} would create UTXO: {} which is already in the pool",
                    transaction.id(),
                    utxo
                ));
            }
        }
        Ok(())
    }

    /// Spends the claimed UTXOs and adds the new ones.
    /// Preconditions:
    ///   - The transaction is valid against the current pool.
    fn apply(&mut self, transaction: &Transaction) {
        for input in transaction.inputs() {
            self.utxo_pool.remove_utxo(&input.utxo());
        }
        self.utxo_pool.add_transaction_outputs(transaction);
    }
}
