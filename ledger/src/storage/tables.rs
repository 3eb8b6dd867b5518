use redb::TableDefinition;

/// Transactions keyed by their SHA-512 hash.
pub const TRANSACTIONS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("transactions");
/// UUID → transaction hash lookup index.
pub const TX_BY_ID: TableDefinition<&[u8], &[u8]> = TableDefinition::new("tx_by_id");
/// Owner public key → encoded UTXO list.
pub const UTXOS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("utxos");
/// Big-endian block timestamp → encoded block. Big-endian keys keep the
/// table's natural order chronological.
pub const BLOCKS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("blocks");
/// Big-endian block timestamp → encoded transaction list.
pub const BLOCK_TRANSACTIONS: TableDefinition<&[u8], &[u8]> =
    TableDefinition::new("block_transactions");
/// Username → encoded user record.
pub const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");
