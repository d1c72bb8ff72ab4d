pub mod coins;
pub mod crypto;
pub mod hash;
pub mod public_key;
pub mod transaction;
pub mod tx_handler;
pub mod utxo;
pub mod utxo_pool;
pub mod validation;

pub use self::{
    coins::*, crypto::*, hash::*, public_key::*, transaction::*, tx_handler::*, utxo::*,
    utxo_pool::*, validation::*,
};
