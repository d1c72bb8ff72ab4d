use crate::{Coins, KeyPair, PublicKey, Sha256, Utxo};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A double SHA-256 hash of the transaction data.
#[derive(Debug, Hash, Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct TransactionId(Sha256);

impl Display for TransactionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TransactionId {
    pub fn new(data: Sha256) -> Self {
        Self(data)
    }

    pub fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }

    pub fn as_sha256(&self) -> &Sha256 {
        &self.0
    }
}

/// The index of the transaction output.
#[derive(Debug, Hash, Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct OutputIndex(u32);

impl Display for OutputIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OutputIndex {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct TransactionInput {
    // 32 bytes. A pointer to the transaction containing the UTXO to be spent.
    utxo_id: TransactionId,
    // The number of UTXO to be spent, the first one is 0.
    output_index: OutputIndex,
    // Signature over `Transaction::raw_data_to_sign` for this input's position, made by the
    // owner of the referenced output. Empty until the input is signed.
    signature: Vec<u8>,
}

impl Display for TransactionInput {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.utxo_id, self.output_index)
    }
}

impl TransactionInput {
    pub fn new(utxo_id: TransactionId, output_index: OutputIndex) -> Self {
        Self {
            utxo_id,
            output_index,
            signature: vec![],
        }
    }

    pub fn output_index(&self) -> OutputIndex {
        self.output_index
    }

    pub fn utxo_id(&self) -> &TransactionId {
        &self.utxo_id
    }

    /// The unspent output this input claims.
    pub fn utxo(&self) -> Utxo {
        Utxo::new(self.utxo_id, self.output_index)
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct TransactionOutput {
    amount: Coins,
    // Only the owner of the matching private key can spend this output.
    public_key: PublicKey,
}

impl Display for TransactionOutput {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.amount, self.public_key)
    }
}

impl TransactionOutput {
    pub fn new(amount: Coins, public_key: PublicKey) -> Self {
        Self { amount, public_key }
    }

    pub fn amount(&self) -> Coins {
        self.amount
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }
}

/// The data that the signature of a single input commits to.
/// Signatures of the other inputs are excluded, so inputs can be signed in any order.
#[derive(Serialize)]
struct SigningData<'a> {
    utxo_id: &'a TransactionId,
    output_index: OutputIndex,
    outputs: &'a [TransactionOutput],
}

#[derive(Serialize)]
struct RawTransaction<'a> {
    inputs: &'a [TransactionInput],
    outputs: &'a [TransactionOutput],
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    // Cached hash of `raw_tx`. It's only refreshed by `finalize`, so it is stale after the
    // transaction is modified until `finalize` runs again.
    id: TransactionId,
    inputs: Vec<TransactionInput>,
    outputs: Vec<TransactionOutput>,
}

impl Transaction {
    pub fn new(inputs: Vec<TransactionInput>, outputs: Vec<TransactionOutput>) -> Self {
        let mut transaction = Self {
            id: TransactionId::new(Sha256::from_raw([0; 32])),
            inputs,
            outputs,
        };
        transaction.finalize();
        transaction
    }

    /// Creates a transaction with no inputs and no outputs, to be built up with `add_input`,
    /// `add_output` and `finalize`.
    pub fn empty() -> Self {
        Self::new(vec![], vec![])
    }

    /// Creates a transaction that mints `amount` out of thin air, paid to `public_key`.
    /// It has no inputs, so it's only useful to seed the initial UTXO pool.
    pub fn coinbase(amount: Coins, public_key: PublicKey) -> Self {
        Self::new(vec![], vec![TransactionOutput::new(amount, public_key)])
    }

    pub fn id(&self) -> &TransactionId {
        &self.id
    }

    pub fn inputs(&self) -> &Vec<TransactionInput> {
        &self.inputs
    }

    pub fn outputs(&self) -> &Vec<TransactionOutput> {
        &self.outputs
    }

    pub fn input(&self, index: usize) -> Option<&TransactionInput> {
        self.inputs.get(index)
    }

    pub fn output(&self, index: usize) -> Option<&TransactionOutput> {
        self.outputs.get(index)
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    pub fn add_input(&mut self, utxo_id: TransactionId, output_index: OutputIndex) {
        self.inputs.push(TransactionInput::new(utxo_id, output_index));
    }

    pub fn add_output(&mut self, amount: Coins, public_key: PublicKey) {
        self.outputs.push(TransactionOutput::new(amount, public_key));
    }

    pub fn remove_input(&mut self, index: usize) -> Option<TransactionInput> {
        if index < self.inputs.len() {
            Some(self.inputs.remove(index))
        } else {
            None
        }
    }

    /// Removes the first input that claims the given UTXO.
    pub fn remove_input_by_utxo(&mut self, utxo: &Utxo) -> Option<TransactionInput> {
        let index = self.inputs.iter().position(|input| input.utxo() == *utxo)?;
        Some(self.inputs.remove(index))
    }

    pub fn add_signature(&mut self, signature: Vec<u8>, index: usize) -> Result<(), String> {
        let num_inputs = self.inputs.len();
        match self.inputs.get_mut(index) {
            Some(input) => {
                input.signature = signature;
                Ok(())
            }
            None => Err(format!(
                "Transaction: {} has {} inputs, can't sign input at index: {}",
                self.id, num_inputs, index
            )),
        }
    }

    /// Signs the input at the given index with the key pair and stores the signature.
    pub fn sign_input(&mut self, index: usize, key_pair: &KeyPair) -> Result<(), String> {
        let message = self.raw_data_to_sign(index).ok_or_else(|| {
            format!(
                "Transaction: {} has no input at index: {}",
                self.id, index
            )
        })?;
        self.add_signature(key_pair.sign(&message), index)
    }

    /// Returns the bytes that the signature of the input at the given index must cover:
    /// the claimed UTXO followed by all outputs.
    /// Returns None if there is no input at the given index.
    pub fn raw_data_to_sign(&self, index: usize) -> Option<Vec<u8>> {
        let input = self.inputs.get(index)?;
        let data = SigningData {
            utxo_id: &input.utxo_id,
            output_index: input.output_index,
            outputs: &self.outputs,
        };
        bincode::serialize(&data).ok()
    }

    /// Returns the canonical serialization of all inputs, signatures included, and all outputs.
    pub fn raw_tx(&self) -> Vec<u8> {
        let data = RawTransaction {
            inputs: &self.inputs,
            outputs: &self.outputs,
        };
        // Serializing plain in-memory data into a Vec can't fail.
        bincode::serialize(&data).expect("Transaction data must be serializable.")
    }

    /// Recomputes the transaction id from its current contents.
    pub fn finalize(&mut self) {
        self.id = TransactionId::new(Sha256::double_digest(&self.raw_tx()));
    }

    /// Returns the UTXO that the output at the given index will create once the transaction is
    /// applied.
    pub fn utxo_for_output(&self, output_index: OutputIndex) -> Utxo {
        Utxo::new(self.id, output_index)
    }
}
