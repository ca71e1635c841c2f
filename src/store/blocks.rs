use tracing::info;

use super::{
    keys::{block_key, PLASMA_HEIGHT_KEY},
    types::StoredBlock,
    DataStore, KvStore,
};
use crate::{
    error::Result,
    plasma::{Block, BlockHeight},
};

impl<K: KvStore> DataStore<K> {
    /// `None` until the first block is stored.
    pub fn plasma_block_height(&self) -> Result<Option<BlockHeight>> {
        self.read(PLASMA_HEIGHT_KEY)
    }

    pub fn next_plasma_block_height(&self) -> Result<BlockHeight> {
        Ok(self
            .plasma_block_height()?
            .map_or(BlockHeight(1), BlockHeight::next))
    }

    /// Stores `block` at the next plasma height and advances the height counter.
    pub fn store_block(&mut self, host_height: u64, block: Block) -> Result<BlockHeight> {
        let height = self.next_plasma_block_height()?;
        info!(
            "storing plasma block {} (host height {}, {} txs, fee {})",
            height, host_height, block.tx_count, block.fee_amount
        );
        self.write(block_key(height), &StoredBlock { block, host_height })?;
        self.write(PLASMA_HEIGHT_KEY.to_vec(), &height)?;
        Ok(height)
    }

    pub fn get_block(&self, height: BlockHeight) -> Result<Option<StoredBlock>> {
        self.read(&block_key(height))
    }
}
