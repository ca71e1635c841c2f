//! Glue between the host runtime's block lifecycle and the ledger.
//!
//! The host calls `begin_block`, then `check_tx`/`deliver_tx` for every candidate in order,
//! then `end_block` and `commit`. Everything a block delivers stays in an in-memory write
//! set until `commit`, which lands it in the backing store as one batch.
//!
//! A fatal error (corrupted state or a failing backend) halts the chain. Every later call
//! that would read or write the ledger is refused until the node is restarted.

use anyhow::Context as _;
use num_bigint::BigUint;
use num_traits::Zero;
use tracing::{debug, error, info, warn};

use crate::{
    ante::ante,
    error::{Error, Result},
    handler::handle,
    msgs::Msg,
    plasma::{Address, Block, BlockHeight, Output, MAX_TX_INDEX},
    query::Querier,
    rootchain::RootchainOracle,
    store::{CacheKv, DataStore, KvStore, KvWrites, SledKv},
    utils::{conf::Conf, logger::LogMe},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    /// Speculative validation, nothing is kept.
    Check,
    Deliver,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    pub host_height: u64,
    pub header_hash: [u8; 32],
    pub mode: ExecMode,
}

impl Context {
    pub fn new(host_height: u64, header_hash: [u8; 32], mode: ExecMode) -> Self {
        Context {
            host_height,
            header_hash,
            mode,
        }
    }

    fn with_mode(&self, mode: ExecMode) -> Self {
        Context {
            mode,
            ..self.clone()
        }
    }
}

/// Per-block counters, reset by `end_block`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockSession {
    tx_index: u16,
    fee_amount: BigUint,
}

impl BlockSession {
    pub fn tx_index(&self) -> u16 {
        self.tx_index
    }

    pub fn fee_amount(&self) -> &BigUint {
        &self.fee_amount
    }

    pub fn is_empty(&self) -> bool {
        self.tx_index == 0
    }

    /// Hands out the current index and advances. `MAX_TX_INDEX` is reserved for fees.
    pub fn next_tx_index(&mut self) -> Result<u16> {
        if self.tx_index == MAX_TX_INDEX {
            return Err(Error::InvalidTransaction("block is full".to_string()));
        }
        let index = self.tx_index;
        self.tx_index += 1;
        Ok(index)
    }

    pub fn add_fee(&mut self, fee: &BigUint) {
        self.fee_amount += fee;
    }
}

pub struct PlasmaChain<S, O> {
    store: S,
    pending: KvWrites,
    oracle: O,
    operator: Address,
    ctx: Context,
    session: BlockSession,
    halted: Option<String>,
}

impl<O: RootchainOracle> PlasmaChain<SledKv, O> {
    pub fn open(conf: &Conf, oracle: O) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&conf.data_directory).with_context(|| {
            format!("creating data directory {}", conf.data_directory.display())
        })?;
        let store = SledKv::open(&conf.ledger_path(), "ledger").log_error("opening ledger")?;
        info!(
            "ledger opened at {} (operator {})",
            conf.ledger_path().display(),
            conf.operator_address
        );
        Ok(Self::new(store, oracle, conf.operator_address))
    }
}

impl<S: KvStore, O: RootchainOracle> PlasmaChain<S, O> {
    pub fn new(store: S, oracle: O, operator: Address) -> Self {
        PlasmaChain {
            store,
            pending: KvWrites::new(),
            oracle,
            operator,
            ctx: Context::new(0, [0; 32], ExecMode::Deliver),
            session: BlockSession::default(),
            halted: None,
        }
    }

    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }

    fn ensure_running(&self) -> Result<()> {
        match &self.halted {
            Some(cause) => Err(Error::Corrupted(format!("chain halted: {cause}"))),
            None => Ok(()),
        }
    }

    /// Latches the first fatal error. Non-fatal errors pass through untouched.
    fn halt_on_fatal<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_fatal() && self.halted.is_none() {
                error!("halting at host block {}: {}", self.ctx.host_height, e);
                self.halted = Some(e.to_string());
            }
        }
        result
    }

    pub fn session(&self) -> &BlockSession {
        &self.session
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Committed state only.
    pub fn committed(&mut self) -> DataStore<&mut S> {
        DataStore::new(&mut self.store)
    }

    pub fn querier(&mut self) -> Querier<&mut S> {
        Querier::new(DataStore::new(&mut self.store))
    }

    pub fn begin_block(&mut self, host_height: u64, header_hash: [u8; 32]) {
        debug!("begin host block {}", host_height);
        self.ctx = Context::new(host_height, header_hash, ExecMode::Deliver);
    }

    /// Runs admission against committed state plus this block's deliveries, then forgets it.
    pub fn check_tx(&mut self, msg: &Msg) -> Result<()> {
        self.ensure_running()?;
        let ctx = self.ctx.with_mode(ExecMode::Check);
        let block = CacheKv::resume(&mut self.store, std::mem::take(&mut self.pending));
        let store = DataStore::new(block);
        let mut session = self.session.clone();

        let result = ante(&ctx, &store, &self.oracle, &mut session, msg).map(|_| ());
        self.pending = store.into_inner().into_writes();

        if let Err(e) = &result {
            debug!("check of {} message failed: {}", msg.kind(), e);
        }
        self.halt_on_fatal(result)
    }

    /// Admits and applies `msg`. On rejection nothing it touched survives.
    pub fn deliver_tx(&mut self, msg: &Msg) -> Result<()> {
        self.ensure_running()?;
        let ctx = self.ctx.with_mode(ExecMode::Deliver);
        let block = CacheKv::resume(&mut self.store, std::mem::take(&mut self.pending));
        let mut store = DataStore::new(CacheKv::new(block));
        let mut session = self.session.clone();

        let result = ante(&ctx, &store, &self.oracle, &mut session, msg)
            .and_then(|admission| handle(&ctx, &mut store, &mut session, admission));

        let tx_writes = store.into_inner();
        match result {
            Ok(()) => match tx_writes.write() {
                Ok(block) => {
                    self.pending = block.into_writes();
                    self.session = session;
                    Ok(())
                }
                Err(e) => self.halt_on_fatal(Err(e.into())),
            },
            Err(e) => {
                self.pending = tx_writes.discard().into_writes();
                if e.is_fatal() {
                    error!("delivering {} message: {}", msg.kind(), e);
                } else {
                    warn!("rejected {} message: {}", msg.kind(), e);
                }
                self.halt_on_fatal(Err(e))
            }
        }
    }

    /// Records the plasma block if anything was delivered, and the operator's fee output.
    pub fn end_block(&mut self) -> Result<Option<BlockHeight>> {
        self.ensure_running()?;
        if self.session.is_empty() {
            debug!("host block {} produced no plasma block", self.ctx.host_height);
            return Ok(None);
        }
        let session = std::mem::take(&mut self.session);
        let mut store = DataStore::new(CacheKv::resume(
            &mut self.store,
            std::mem::take(&mut self.pending),
        ));

        let result = finalize_block(&mut store, &self.ctx, &session, self.operator);
        self.pending = store.into_inner().into_writes();
        if let Err(e) = &result {
            error!("finalizing host block {}: {}", self.ctx.host_height, e);
        }
        self.halt_on_fatal(result).map(Some)
    }

    pub fn commit(&mut self) -> Result<()> {
        self.ensure_running()?;
        let writes = std::mem::take(&mut self.pending);
        if writes.is_empty() {
            return Ok(());
        }
        let count = writes.len();
        let written = self
            .store
            .write_batch(writes)
            .with_context(|| format!("committing host block {}", self.ctx.host_height))
            .map_err(Error::from);
        self.halt_on_fatal(written)?;
        info!(
            "committed host block {} ({} writes)",
            self.ctx.host_height, count
        );
        Ok(())
    }

    /// Drops everything delivered since the last commit.
    pub fn abort_block(&mut self) {
        warn!(
            "aborting host block {}, dropping {} pending writes",
            self.ctx.host_height,
            self.pending.len()
        );
        self.pending.clear();
        self.session = BlockSession::default();
    }
}

fn finalize_block<K: KvStore>(
    store: &mut DataStore<K>,
    ctx: &Context,
    session: &BlockSession,
    operator: Address,
) -> Result<BlockHeight> {
    let block = Block::new(
        ctx.header_hash,
        session.tx_index(),
        session.fee_amount().clone(),
    );
    let height = store.store_block(ctx.host_height, block)?;
    if !session.fee_amount().is_zero() {
        store.store_fee(
            height.0,
            Output::new(operator, session.fee_amount().clone()),
        )?;
    }
    Ok(height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        msgs::IncludeDepositMsg,
        plasma::{Deposit, Position},
        rootchain::MockOracle,
        store::{keys::wallet_key, MemoryKv},
    };

    fn deposit_msg(nonce: u64, owner: Address) -> Msg {
        Msg::IncludeDeposit(IncludeDepositMsg {
            deposit_nonce: nonce,
            owner,
            replay_nonce: 0,
        })
    }

    #[test]
    fn session_fills_up() {
        let mut session = BlockSession {
            tx_index: MAX_TX_INDEX - 1,
            fee_amount: BigUint::default(),
        };
        assert_eq!(session.next_tx_index().unwrap(), MAX_TX_INDEX - 1);
        assert!(matches!(
            session.next_tx_index(),
            Err(Error::InvalidTransaction(_))
        ));
    }

    #[test_log::test]
    fn check_never_mutates() {
        let owner = Address([1; 20]);
        let oracle = MockOracle::new();
        oracle.add_deposit(1, Deposit::new(owner, 10u8, 1u8));
        let mut chain = PlasmaChain::new(MemoryKv::default(), oracle, Address([9; 20]));

        chain.begin_block(1, [1; 32]);
        chain.check_tx(&deposit_msg(1, owner)).unwrap();
        chain.check_tx(&deposit_msg(1, owner)).unwrap();
        assert!(chain.session().is_empty());
        assert_eq!(chain.end_block().unwrap(), None);
        chain.commit().unwrap();
        assert!(chain.committed().get_deposit(1).unwrap().is_none());
    }

    #[test_log::test]
    fn deliver_end_commit() {
        let owner = Address([1; 20]);
        let oracle = MockOracle::new();
        oracle.add_deposit(1, Deposit::new(owner, 10u8, 1u8));
        let mut chain = PlasmaChain::new(MemoryKv::default(), oracle, Address([9; 20]));

        chain.begin_block(5, [1; 32]);
        chain.deliver_tx(&deposit_msg(1, owner)).unwrap();
        // Later checks in the same block see the delivery.
        assert!(matches!(
            chain.check_tx(&deposit_msg(1, owner)),
            Err(Error::InvalidTransaction(_))
        ));
        assert!(chain.deliver_tx(&deposit_msg(2, owner)).is_err());
        assert_eq!(chain.session().tx_index(), 1);

        // Not visible before commit.
        assert!(chain.committed().get_deposit(1).unwrap().is_none());
        assert_eq!(chain.end_block().unwrap(), Some(BlockHeight(1)));
        chain.commit().unwrap();

        let store = chain.committed();
        assert!(store.has_output(&Position::deposit(1)).unwrap());
        let block = store.get_block(BlockHeight(1)).unwrap().unwrap();
        assert_eq!(block.host_height, 5);
        assert_eq!(block.block.tx_count, 1);
        // No fee collected, no fee output.
        assert!(!store.has_output(&Position::fee(1)).unwrap());
    }

    #[test]
    fn abort_drops_deliveries() {
        let owner = Address([1; 20]);
        let oracle = MockOracle::new();
        oracle.add_deposit(1, Deposit::new(owner, 10u8, 1u8));
        let mut chain = PlasmaChain::new(MemoryKv::default(), oracle, Address([9; 20]));

        chain.begin_block(1, [1; 32]);
        chain.deliver_tx(&deposit_msg(1, owner)).unwrap();
        chain.abort_block();
        assert!(chain.session().is_empty());
        chain.commit().unwrap();
        assert!(chain.committed().get_deposit(1).unwrap().is_none());
    }

    #[test]
    fn open_sled_chain() -> anyhow::Result<()> {
        let tmpdir = tempfile::Builder::new().prefix("tests").tempdir()?;
        let conf = Conf {
            data_directory: tmpdir.path().join("node"),
            ..Conf::default()
        };
        let owner = Address([1; 20]);
        let oracle = MockOracle::new();
        oracle.add_deposit(1, Deposit::new(owner, 10u8, 1u8));
        let mut chain = PlasmaChain::open(&conf, oracle)?;
        assert!(conf.ledger_path().exists());

        chain.begin_block(1, [1; 32]);
        chain.deliver_tx(&deposit_msg(1, owner))?;
        chain.end_block()?;
        chain.commit()?;

        assert!(chain.committed().has_deposit(1)?);
        assert_eq!(
            chain.committed().plasma_block_height()?,
            Some(BlockHeight(1))
        );
        Ok(())
    }

    #[test_log::test]
    fn corrupted_wallet_halts_the_chain() {
        let owner = Address([1; 20]);
        let mut kv = MemoryKv::default();
        kv.set(wallet_key(&owner), vec![0xff; 3]).unwrap();
        let oracle = MockOracle::new();
        oracle.add_deposit(1, Deposit::new(owner, 10u8, 1u8));
        oracle.add_deposit(2, Deposit::new(Address([2; 20]), 10u8, 1u8));
        let mut chain = PlasmaChain::new(kv, oracle, Address([9; 20]));

        chain.begin_block(1, [1; 32]);
        assert!(matches!(
            chain.deliver_tx(&deposit_msg(1, owner)),
            Err(Error::Corrupted(_))
        ));
        assert!(chain.is_halted());

        // A healthy message is refused as well, and nothing can be committed.
        let refused = chain.deliver_tx(&deposit_msg(2, Address([2; 20])));
        match refused {
            Err(Error::Corrupted(msg)) => assert!(msg.starts_with("chain halted"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(chain.check_tx(&deposit_msg(2, Address([2; 20]))).is_err());
        assert!(chain.end_block().is_err());
        assert!(chain.commit().is_err());
        assert!(chain.committed().get_deposit(2).unwrap().is_none());
    }
}
