//! Genesis bootstrap: the first block and the initial emission.

use anyhow::Result;
use slog::Logger;

use ledger::crypto;
use ledger::state::block::Block;
use ledger::state::transaction::{Amount, Transaction, Utxo};
use ledger::state::user::User;
use ledger::storage::{
    BlockchainStore, LedgerStore, TransactionStore, UserStore, UtxoStore,
};

/// Total value minted at genesis.
const GENESIS_EMISSION: u64 = 100_000_000;
const SUPER_USER: &str = "admin";

/// Writes the genesis block and mints the emission to a freshly generated
/// super user. A no-op when the chain already has blocks.
pub fn bootstrap(store: &LedgerStore, logger: &Logger) -> Result<()> {
    let chain = store.blockchain();
    if !chain.keys()?.is_empty() {
        slog::info!(logger, "chain already bootstrapped");
        return Ok(());
    }

    let genesis_block = Block::genesis();
    chain.put(&genesis_block)?;

    let (secret, public) = crypto::generate_keypair();
    let owner_key = crypto::public_key_bytes(&public);

    let mut tx = Transaction::new();
    tx.block_hash = genesis_block.compute_hash();
    tx.add_output(
        Amount {
            value: GENESIS_EMISSION,
            unit: 100,
        },
        owner_key.clone(),
    );
    tx.finalize_hash();
    store.transactions().put(&tx)?;
    store.utxos().put(
        &owner_key,
        &[Utxo {
            tx_hash: tx.hash.clone(),
            index: 0,
        }],
    )?;

    store.users().put(&User {
        username: SUPER_USER.to_string(),
        public_key: owner_key,
        private_key: secret.secret_bytes().to_vec(),
    })?;

    slog::info!(logger, "genesis emission minted";
        "username" => SUPER_USER,
        "amount" => GENESIS_EMISSION,
    );
    slog::warn!(
        logger,
        "super user private key lives in the user store; local-chain trust model only"
    );
    Ok(())
}
