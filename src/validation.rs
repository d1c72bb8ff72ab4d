use crate::{Coins, Crypto, Transaction, TransactionInput, TransactionOutput, UtxoPool};
use std::collections::HashSet;

/// Responsible for deciding whether a transaction can be applied to the given UTXO pool.
/// Validation only reads the pool, so it may be repeated any number of times with the same
/// result.
///
/// A transaction is valid if:
///   - every output it claims is in the UTXO pool,
///   - every input is signed by the owner of the output it claims,
///   - no UTXO is claimed more than once,
///   - all output amounts are non-negative,
///   - the claimed amounts add up to at least the sum of the output amounts.
/// The difference between inputs and outputs is burned.
pub struct TransactionValidator {}

impl TransactionValidator {
    pub fn is_valid(transaction: &Transaction, utxo_pool: &UtxoPool) -> bool {
        Self::validate(transaction, utxo_pool).is_ok()
    }

    /// Checks the transaction against the pool and reports the first rule that it breaks.
    /// Outputs are only read from the pool after their presence has been confirmed.
    pub fn validate(transaction: &Transaction, utxo_pool: &UtxoPool) -> Result<(), String> {
        Self::validate_claimed_outputs_are_unspent(transaction, utxo_pool)?;
        Self::validate_input_signatures(transaction, utxo_pool)?;
        Self::validate_no_output_is_claimed_twice(transaction)?;
        Self::validate_output_amounts_are_non_negative(transaction)?;
        Self::validate_inputs_cover_outputs(transaction, utxo_pool)
    }

    fn validate_claimed_outputs_are_unspent(
        transaction: &Transaction,
        utxo_pool: &UtxoPool,
    ) -> Result<(), String> {
        for input in transaction.inputs() {
            Self::claimed_output(transaction, input, utxo_pool)?;
        }
        Ok(())
    }

    fn validate_input_signatures(
        transaction: &Transaction,
        utxo_pool: &UtxoPool,
    ) -> Result<(), String> {
        for (index, input) in transaction.inputs().iter().enumerate() {
            let claimed_output = Self::claimed_output(transaction, input, utxo_pool)?;
            let message = transaction.raw_data_to_sign(index).ok_or_else(|| {
                format!(
                    "Transaction: {} can't produce the signing data for input: {}",
                    transaction.id(),
                    index
                )
            })?;
            if !Crypto::verify_signature(claimed_output.public_key(), &message, input.signature())
            {
                return Err(format!(
                    "Transaction: {} input: {} isn't signed by the owner: {}",
                    transaction.id(),
                    index,
                    claimed_output.public_key()
                ));
            }
        }
        Ok(())
    }

    fn validate_no_output_is_claimed_twice(transaction: &Transaction) -> Result<(), String> {
        let mut claimed = HashSet::new();
        for input in transaction.inputs() {
            if !claimed.insert(input.utxo()) {
                return Err(format!(
                    "Transaction: {} claims UTXO: {} more than once",
                    transaction.id(),
                    input.utxo()
                ));
            }
        }
        Ok(())
    }

    fn validate_output_amounts_are_non_negative(transaction: &Transaction) -> Result<(), String> {
        match transaction
            .outputs()
            .iter()
            .position(|output| output.amount().is_negative())
        {
            None => Ok(()),
            Some(index) => Err(format!(
                "Transaction: {} output: {} has a negative amount",
                transaction.id(),
                index
            )),
        }
    }

    fn validate_inputs_cover_outputs(
        transaction: &Transaction,
        utxo_pool: &UtxoPool,
    ) -> Result<(), String> {
        let mut input_amounts = Vec::with_capacity(transaction.num_inputs());
        for input in transaction.inputs() {
            input_amounts.push(Self::claimed_output(transaction, input, utxo_pool)?.amount());
        }
        // Both sums are taken in the order in which inputs and outputs appear.
        let total_input = Coins::checked_sum(input_amounts).ok_or_else(|| {
            format!(
                "Transaction: {} input amounts overflow",
                transaction.id()
            )
        })?;
        let total_output = Coins::checked_sum(
            transaction
                .outputs()
                .iter()
                .map(TransactionOutput::amount),
        )
        .ok_or_else(|| {
            format!(
                "Transaction: {} output amounts overflow",
                transaction.id()
            )
        })?;

        if total_input >= total_output {
            Ok(())
        } else {
            Err(format!(
                "Transaction: {} spends: {} but only claims: {}",
                transaction.id(),
                total_output,
                total_input
            ))
        }
    }

    fn claimed_output<'a>(
        transaction: &Transaction,
        input: &TransactionInput,
        utxo_pool: &'a UtxoPool,
    ) -> Result<&'a TransactionOutput, String> {
        utxo_pool.tx_output(&input.utxo()).ok_or_else(|| {
            format!(
                "Transaction: {} claims UTXO: {} which is not in the pool",
                transaction.id(),
                input.utxo()
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{KeyPair, OutputIndex, PublicKey, SEED_BYTE_COUNT};

    fn alice() -> KeyPair {
        KeyPair::from_seed(&[1; SEED_BYTE_COUNT])
    }

    fn bob() -> KeyPair {
        KeyPair::from_seed(&[2; SEED_BYTE_COUNT])
    }

    fn genesis_pool(genesis: &Transaction) -> UtxoPool {
        let mut utxo_pool = UtxoPool::new();
        utxo_pool.add_transaction_outputs(genesis);
        utxo_pool
    }

    /// Spends the given outputs of `from`, signing each input with `signer`.
    fn spend(
        from: &Transaction,
        indices: &[u32],
        outputs: &[(i64, PublicKey)],
        signer: &KeyPair,
    ) -> Transaction {
        let mut transaction = Transaction::empty();
        for index in indices {
            transaction.add_input(*from.id(), OutputIndex::new(*index));
        }
        for (amount, public_key) in outputs {
            transaction.add_output(Coins::new(*amount), *public_key);
        }
        for index in 0..indices.len() {
            transaction.sign_input(index, signer).unwrap();
        }
        transaction.finalize();
        transaction
    }

    #[test]
    fn simple_spend_is_valid() {
        let genesis = Transaction::coinbase(Coins::new(10), alice().public_key());
        let utxo_pool = genesis_pool(&genesis);
        let transaction = spend(&genesis, &[0], &[(10, bob().public_key())], &alice());
        assert_eq!(TransactionValidator::validate(&transaction, &utxo_pool), Ok(()));
        assert!(TransactionValidator::is_valid(&transaction, &utxo_pool));
    }

    #[test]
    fn claiming_unknown_utxo_is_invalid() {
        let genesis = Transaction::coinbase(Coins::new(10), alice().public_key());
        let utxo_pool = genesis_pool(&genesis);
        let transaction = spend(&genesis, &[1], &[(1, bob().public_key())], &alice());
        let error = TransactionValidator::validate(&transaction, &utxo_pool).unwrap_err();
        assert!(error.contains("not in the pool"), "{}", error);
    }

    #[test]
    fn signature_by_wrong_key_is_invalid() {
        let genesis = Transaction::coinbase(Coins::new(10), alice().public_key());
        let utxo_pool = genesis_pool(&genesis);
        let transaction = spend(&genesis, &[0], &[(10, bob().public_key())], &bob());
        let error = TransactionValidator::validate(&transaction, &utxo_pool).unwrap_err();
        assert!(error.contains("isn't signed by the owner"), "{}", error);
    }

    #[test]
    fn signature_over_mutated_body_is_invalid() {
        let genesis = Transaction::coinbase(Coins::new(10), alice().public_key());
        let utxo_pool = genesis_pool(&genesis);
        let mut transaction = spend(&genesis, &[0], &[(5, bob().public_key())], &alice());
        // The signature covers the outputs, so adding one afterwards breaks it.
        transaction.add_output(Coins::new(5), bob().public_key());
        transaction.finalize();
        assert!(!TransactionValidator::is_valid(&transaction, &utxo_pool));
    }

    #[test]
    fn unsigned_input_is_invalid() {
        let genesis = Transaction::coinbase(Coins::new(10), alice().public_key());
        let utxo_pool = genesis_pool(&genesis);
        let mut transaction = Transaction::empty();
        transaction.add_input(*genesis.id(), OutputIndex::new(0));
        transaction.add_output(Coins::new(10), bob().public_key());
        transaction.finalize();
        assert!(!TransactionValidator::is_valid(&transaction, &utxo_pool));
    }

    #[test]
    fn output_locked_to_malformed_key_is_unspendable() {
        let genesis = Transaction::coinbase(Coins::new(10), PublicKey::new([0xff; 32]));
        let utxo_pool = genesis_pool(&genesis);
        let transaction = spend(&genesis, &[0], &[(10, bob().public_key())], &alice());
        let error = TransactionValidator::validate(&transaction, &utxo_pool).unwrap_err();
        assert!(error.contains("isn't signed by the owner"), "{}", error);
    }

    #[test]
    fn claiming_same_utxo_twice_is_invalid() {
        let genesis = Transaction::coinbase(Coins::new(10), alice().public_key());
        let utxo_pool = genesis_pool(&genesis);
        let transaction = spend(
            &genesis,
            &[0, 0],
            &[(5, bob().public_key()), (5, bob().public_key())],
            &alice(),
        );
        let error = TransactionValidator::validate(&transaction, &utxo_pool).unwrap_err();
        assert!(error.contains("more than once"), "{}", error);
    }

    #[test]
    fn negative_output_is_invalid() {
        let genesis = Transaction::coinbase(Coins::new(10), alice().public_key());
        let utxo_pool = genesis_pool(&genesis);
        let transaction = spend(
            &genesis,
            &[0],
            &[(11, bob().public_key()), (-1, alice().public_key())],
            &alice(),
        );
        let error = TransactionValidator::validate(&transaction, &utxo_pool).unwrap_err();
        assert!(error.contains("negative amount"), "{}", error);
    }

    #[test]
    fn zero_output_is_valid() {
        let genesis = Transaction::coinbase(Coins::new(10), alice().public_key());
        let utxo_pool = genesis_pool(&genesis);
        let transaction = spend(
            &genesis,
            &[0],
            &[(10, bob().public_key()), (0, alice().public_key())],
            &alice(),
        );
        assert!(TransactionValidator::is_valid(&transaction, &utxo_pool));
    }

    #[test]
    fn spending_more_than_claimed_is_invalid() {
        let genesis = Transaction::coinbase(Coins::new(1000), alice().public_key());
        let utxo_pool = genesis_pool(&genesis);
        let transaction = spend(&genesis, &[0], &[(1001, bob().public_key())], &alice());
        let error = TransactionValidator::validate(&transaction, &utxo_pool).unwrap_err();
        assert!(error.contains("only claims"), "{}", error);
    }

    #[test]
    fn spending_less_than_claimed_burns_the_difference() {
        let genesis = Transaction::coinbase(Coins::new(10), alice().public_key());
        let utxo_pool = genesis_pool(&genesis);
        let transaction = spend(&genesis, &[0], &[(3, bob().public_key())], &alice());
        assert!(TransactionValidator::is_valid(&transaction, &utxo_pool));
    }

    #[test]
    fn transaction_without_outputs_is_valid() {
        let genesis = Transaction::coinbase(Coins::new(10), alice().public_key());
        let utxo_pool = genesis_pool(&genesis);
        let transaction = spend(&genesis, &[0], &[], &alice());
        assert!(TransactionValidator::is_valid(&transaction, &utxo_pool));
    }

    #[test]
    fn transaction_without_inputs_may_only_create_zero_amounts() {
        let utxo_pool = UtxoPool::new();
        let empty = Transaction::empty();
        assert!(TransactionValidator::is_valid(&empty, &utxo_pool));
        let zero = Transaction::coinbase(Coins::zero(), bob().public_key());
        assert!(TransactionValidator::is_valid(&zero, &utxo_pool));
        let minting = Transaction::coinbase(Coins::new(1), bob().public_key());
        assert!(!TransactionValidator::is_valid(&minting, &utxo_pool));
    }

    #[test]
    fn overflowing_outputs_are_invalid() {
        let genesis = Transaction::coinbase(Coins::new(10), alice().public_key());
        let utxo_pool = genesis_pool(&genesis);
        let transaction = spend(
            &genesis,
            &[0],
            &[(i64::MAX, bob().public_key()), (i64::MAX, bob().public_key())],
            &alice(),
        );
        let error = TransactionValidator::validate(&transaction, &utxo_pool).unwrap_err();
        assert!(error.contains("overflow"), "{}", error);
    }

    #[test]
    fn validation_leaves_pool_unchanged() {
        let genesis = Transaction::coinbase(Coins::new(10), alice().public_key());
        let utxo_pool = genesis_pool(&genesis);
        let snapshot = utxo_pool.clone();
        let transaction = spend(&genesis, &[0], &[(10, bob().public_key())], &alice());
        for _ in 0..3 {
            assert!(TransactionValidator::is_valid(&transaction, &utxo_pool));
        }
        assert_eq!(utxo_pool, snapshot);
    }
}
