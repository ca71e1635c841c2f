//! Read-only, path-routed views over the ledger, answered as JSON.

use serde::Serialize;
use serde_with::{hex::Hex, serde_as, DisplayFromStr};

use crate::{
    error::{Error, Result},
    plasma::{Address, Amount, BlockHeight, Position, TxHash},
    store::{DataStore, KvStore, StoredBlock, StoredOutput, StoredTransaction},
};

/// Most blocks returned by one `blocks` query.
pub const BLOCKS_PAGE: u64 = 10;

#[serde_as]
#[derive(Debug, Serialize)]
pub struct BlockResponse {
    pub height: u64,
    #[serde_as(as = "Hex")]
    pub header: [u8; 32],
    pub tx_count: u16,
    #[serde_as(as = "DisplayFromStr")]
    pub fee_amount: Amount,
    pub host_height: u64,
}

impl BlockResponse {
    fn new(height: BlockHeight, stored: StoredBlock) -> Self {
        BlockResponse {
            height: height.0,
            header: stored.block.header,
            tx_count: stored.block.tx_count,
            fee_amount: stored.block.fee_amount,
            host_height: stored.host_height,
        }
    }
}

#[serde_as]
#[derive(Debug, Serialize)]
pub struct OutputResponse {
    #[serde_as(as = "DisplayFromStr")]
    pub position: Position,
    pub owner: Address,
    #[serde_as(as = "DisplayFromStr")]
    pub amount: Amount,
    pub spent: bool,
    pub spender: Option<TxHash>,
    /// Creating transaction, absent for deposits and fees.
    pub tx_hash: Option<TxHash>,
    #[serde_as(as = "Option<Hex>")]
    pub confirmation_hash: Option<[u8; 32]>,
}

#[serde_as]
#[derive(Debug, Serialize)]
pub struct InputResponse {
    #[serde_as(as = "DisplayFromStr")]
    pub position: Position,
    pub owner: Address,
    #[serde_as(as = "DisplayFromStr")]
    pub amount: Amount,
    pub tx_hash: TxHash,
    #[serde_as(as = "Vec<DisplayFromStr>")]
    pub input_positions: Vec<Position>,
    pub input_owners: Vec<Address>,
}

#[serde_as]
#[derive(Debug, Serialize)]
pub struct TxResponse {
    pub hash: TxHash,
    #[serde_as(as = "DisplayFromStr")]
    pub position: Position,
    #[serde_as(as = "Hex")]
    pub confirmation_hash: [u8; 32],
    #[serde_as(as = "Vec<DisplayFromStr>")]
    pub inputs: Vec<Position>,
    pub outputs: Vec<OutputResponse>,
    #[serde_as(as = "DisplayFromStr")]
    pub fee: Amount,
}

pub struct Querier<K> {
    store: DataStore<K>,
}

impl<K: KvStore> Querier<K> {
    pub fn new(store: DataStore<K>) -> Self {
        Querier { store }
    }

    pub fn query(&self, path: &[&str]) -> Result<Vec<u8>> {
        let Some((route, args)) = path.split_first() else {
            return Err(Error::InvalidPath("path not specified".to_string()));
        };
        match *route {
            "height" => self.height(),
            "block" => self.block(args),
            "blocks" => self.blocks(args),
            "balance" => self.balance(args),
            "info" => self.info(args),
            "output" => self.output(args),
            "input" => self.input(args),
            "tx" => self.tx(args),
            other => Err(Error::InvalidPath(format!(
                "unregistered query path {other:?}"
            ))),
        }
    }

    fn height(&self) -> Result<Vec<u8>> {
        let height = self.store.plasma_block_height()?.unwrap_or_default();
        to_json(&height.0.to_string())
    }

    fn block(&self, args: &[&str]) -> Result<Vec<u8>> {
        let [height] = args else {
            return Err(Error::InvalidPath("expected block/<height>".to_string()));
        };
        let height = parse_height(height)?;
        let Some(block) = self.store.get_block(height)? else {
            return Err(Error::OutputDNE(format!("plasma block {height} does not exist")));
        };
        to_json(&BlockResponse::new(height, block))
    }

    /// `BLOCKS_PAGE` blocks from the given height, or the last ones with `latest`.
    fn blocks(&self, args: &[&str]) -> Result<Vec<u8>> {
        let [start] = args else {
            return Err(Error::InvalidPath(
                "expected blocks/<height> or blocks/latest".to_string(),
            ));
        };
        let start = if *start == "latest" {
            let Some(latest) = self.store.plasma_block_height()? else {
                return Err(Error::OutputDNE("no blocks".to_string()));
            };
            BlockHeight(latest.0.saturating_sub(BLOCKS_PAGE - 1).max(1))
        } else {
            parse_height(start)?
        };

        let mut blocks = Vec::new();
        let end = start.0.saturating_add(BLOCKS_PAGE - 1);
        for height in (start.0..=end).map(BlockHeight) {
            let Some(block) = self.store.get_block(height)? else {
                break;
            };
            blocks.push(BlockResponse::new(height, block));
        }
        if blocks.is_empty() {
            return Err(Error::OutputDNE(format!("no blocks from height {start}")));
        }
        to_json(&blocks)
    }

    fn balance(&self, args: &[&str]) -> Result<Vec<u8>> {
        let address = parse_address(args, "balance")?;
        let Some(wallet) = self.store.get_wallet(&address)? else {
            return Err(Error::OutputDNE(format!("no wallet for {address}")));
        };
        to_json(&wallet.balance.to_string())
    }

    fn info(&self, args: &[&str]) -> Result<Vec<u8>> {
        let address = parse_address(args, "info")?;
        let Some(wallet) = self.store.get_wallet(&address)? else {
            return Err(Error::OutputDNE(format!("no wallet for {address}")));
        };
        let outputs = wallet
            .unspent
            .iter()
            .map(|position| self.output_response(position))
            .collect::<Result<Vec<_>>>()?;
        to_json(&outputs)
    }

    fn output(&self, args: &[&str]) -> Result<Vec<u8>> {
        let position = parse_position(args, "output")?;
        to_json(&self.output_response(&position)?)
    }

    fn input(&self, args: &[&str]) -> Result<Vec<u8>> {
        let position = parse_position(args, "input")?;
        let Some(tx) = self.store.get_transaction_by_position(&position)? else {
            return Err(Error::OutputDNE(format!(
                "no transaction created output {position}"
            )));
        };
        let output = self.existing_output(&position)?;

        let input_positions: Vec<Position> = tx.transaction.input_positions().copied().collect();
        let input_owners = input_positions
            .iter()
            .map(|input| {
                self.store
                    .get_output(input)?
                    .map(|stored| stored.output.owner)
                    .ok_or_else(|| {
                        Error::Corrupted(format!("input {input} of {position} is missing"))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        to_json(&InputResponse {
            position,
            owner: output.output.owner,
            amount: output.output.amount,
            tx_hash: inclusion_hash(&tx)?,
            input_positions,
            input_owners,
        })
    }

    fn tx(&self, args: &[&str]) -> Result<Vec<u8>> {
        let [hash] = args else {
            return Err(Error::InvalidPath("expected tx/<hash>".to_string()));
        };
        let hash: TxHash = hash
            .parse()
            .map_err(|e| Error::InvalidPath(format!("{e:#}")))?;
        let Some(tx) = self.store.get_transaction(&hash)? else {
            return Err(Error::OutputDNE(format!("no transaction {hash}")));
        };

        let outputs = (0..tx.transaction.outputs.len() as u8)
            .filter_map(|i| {
                tx.output(i).map(|stored| {
                    output_response(tx.output_position(i), stored, Some((hash, &tx)))
                })
            })
            .collect();
        to_json(&TxResponse {
            hash,
            position: tx.position,
            confirmation_hash: tx.confirmation_hash,
            inputs: tx.transaction.input_positions().copied().collect(),
            outputs,
            fee: tx.transaction.fee.clone(),
        })
    }

    fn existing_output(&self, position: &Position) -> Result<StoredOutput> {
        self.store
            .get_output(position)?
            .ok_or_else(|| Error::OutputDNE(format!("no output at {position}")))
    }

    fn output_response(&self, position: &Position) -> Result<OutputResponse> {
        let stored = self.existing_output(position)?;
        if position.is_deposit() || position.is_fee() {
            return Ok(output_response(*position, stored, None));
        }
        let Some(tx) = self.store.get_transaction_by_position(position)? else {
            return Err(Error::OutputDNE(format!(
                "no transaction created output {position}"
            )));
        };
        let hash = inclusion_hash(&tx)?;
        Ok(output_response(*position, stored, Some((hash, &tx))))
    }
}

fn output_response(
    position: Position,
    stored: StoredOutput,
    tx: Option<(TxHash, &StoredTransaction)>,
) -> OutputResponse {
    OutputResponse {
        position,
        owner: stored.output.owner,
        amount: stored.output.amount,
        spent: stored.spent,
        spender: stored.spender,
        tx_hash: tx.map(|(hash, _)| hash),
        confirmation_hash: tx.map(|(_, tx)| tx.confirmation_hash),
    }
}

fn inclusion_hash(tx: &StoredTransaction) -> Result<TxHash> {
    tx.transaction
        .inclusion_hash()
        .map_err(|e| Error::Serialization(format!("{e:#}")))
}

fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| Error::Serialization(format!("json: {e}")))
}

fn parse_height(height: &str) -> Result<BlockHeight> {
    match height.parse::<u64>() {
        Ok(height) if height > 0 => Ok(BlockHeight(height)),
        _ => Err(Error::InvalidPath(format!(
            "block height must start from 1 in decimal format, got {height:?}"
        ))),
    }
}

fn parse_address(args: &[&str], route: &str) -> Result<Address> {
    let [address] = args else {
        return Err(Error::InvalidPath(format!("expected {route}/<address>")));
    };
    address
        .parse()
        .map_err(|e| Error::InvalidPath(format!("{e:#}")))
}

fn parse_position(args: &[&str], route: &str) -> Result<Position> {
    let [position] = args else {
        return Err(Error::InvalidPath(format!("expected {route}/<position>")));
    };
    let position: Position = position
        .parse()
        .map_err(|e| Error::InvalidPath(format!("{e:#}")))?;
    position
        .validate_basic()
        .map_err(|e| Error::InvalidPath(format!("{e:#}")))?;
    Ok(position)
}
