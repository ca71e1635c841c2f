#![allow(unused)]

use anyhow::{Context, Result};
use num_bigint::BigUint;
use tracing::info;

use plasma_ledger::{
    chain::PlasmaChain,
    msgs::{IncludeDepositMsg, Msg},
    plasma::{Address, BlockHeight, Deposit, Input, Output, Position, Signature, Transaction},
    rootchain::MockOracle,
    store::MemoryKv,
    utils::crypto::{sha256, EthCrypto},
};

/// A single in-memory node with a scriptable rootchain.
pub struct LedgerCtx {
    pub chain: PlasmaChain<MemoryKv, MockOracle>,
    pub operator: EthCrypto,
    host_height: u64,
    next_nonce: u64,
}

impl LedgerCtx {
    pub fn new() -> Result<Self> {
        let operator = EthCrypto::new("operator")?;
        let chain = PlasmaChain::new(MemoryKv::default(), MockOracle::new(), operator.address());
        Ok(LedgerCtx {
            chain,
            operator,
            host_height: 0,
            next_nonce: 1,
        })
    }

    pub fn user(name: &str) -> EthCrypto {
        EthCrypto::new(name).unwrap()
    }

    pub fn oracle(&self) -> &MockOracle {
        self.chain.oracle()
    }

    pub fn header_hash(host_height: u64) -> [u8; 32] {
        sha256(&host_height.to_be_bytes())
    }

    pub fn begin(&mut self) {
        self.host_height += 1;
        self.chain
            .begin_block(self.host_height, Self::header_hash(self.host_height));
    }

    pub fn finish(&mut self) -> Result<Option<BlockHeight>> {
        let height = self.chain.end_block()?;
        self.chain.commit()?;
        Ok(height)
    }

    /// Delivers all messages in one host block and returns each outcome.
    pub fn run_block(&mut self, msgs: &[Msg]) -> Result<Vec<plasma_ledger::Result<()>>> {
        self.begin();
        let results = msgs.iter().map(|msg| self.chain.deliver_tx(msg)).collect();
        self.finish()?;
        Ok(results)
    }

    /// Delivers a single message in its own block.
    pub fn deliver(&mut self, msg: Msg) -> Result<plasma_ledger::Result<()>> {
        let mut results = self.run_block(&[msg])?;
        results.pop().context("no result")
    }

    /// Registers a final rootchain deposit and includes it.
    pub fn deposit(&mut self, owner: &EthCrypto, amount: u64) -> Result<Position> {
        let nonce = self.next_nonce;
        self.next_nonce += 1;
        info!("➡️  Depositing {} for {}", amount, owner.address());
        self.oracle()
            .add_deposit(nonce, Deposit::new(owner.address(), amount, 1u8));
        self.deliver(include_deposit(nonce, owner.address()))??;
        Ok(Position::deposit(nonce))
    }

    /// Confirm signatures over the transaction that created `position`.
    pub fn confirm_sigs(&mut self, position: &Position, signers: &[&EthCrypto]) -> Vec<Signature> {
        let tx = self
            .chain
            .committed()
            .get_transaction_by_position(position)
            .unwrap()
            .expect("no transaction at position");
        signers
            .iter()
            .map(|signer| signer.sign_hash(&tx.confirmation_hash))
            .collect()
    }

    pub fn balance(&mut self, owner: &Address) -> BigUint {
        self.chain
            .committed()
            .get_wallet(owner)
            .unwrap()
            .map(|wallet| wallet.balance)
            .unwrap_or_default()
    }

    /// Wallet balance equals the sum of its unspent outputs, and none of them is spent.
    pub fn assert_wallet_consistent(&mut self, owner: &Address) {
        let store = self.chain.committed();
        let Some(wallet) = store.get_wallet(owner).unwrap() else {
            return;
        };
        let mut sum = BigUint::default();
        for position in &wallet.unspent {
            let output = store.get_output(position).unwrap().expect("unspent output missing");
            assert!(!output.spent, "{position} listed unspent but is spent");
            assert_eq!(&output.output.owner, owner);
            sum += output.output.amount;
        }
        for position in &wallet.spent {
            assert!(store.get_output(position).unwrap().unwrap().spent);
        }
        assert_eq!(wallet.balance, sum, "balance of {owner} drifted");
    }
}

pub fn include_deposit(nonce: u64, owner: Address) -> Msg {
    Msg::IncludeDeposit(IncludeDepositMsg {
        deposit_nonce: nonce,
        owner,
        replay_nonce: 0,
    })
}

/// One input to a spend: position, key that signs it, confirm signatures.
pub struct SpendInput<'a> {
    pub position: Position,
    pub signer: &'a EthCrypto,
    pub confirm_sigs: Vec<Signature>,
}

impl<'a> SpendInput<'a> {
    pub fn new(position: Position, signer: &'a EthCrypto) -> Self {
        SpendInput {
            position,
            signer,
            confirm_sigs: vec![],
        }
    }

    pub fn confirmed(mut self, confirm_sigs: Vec<Signature>) -> Self {
        self.confirm_sigs = confirm_sigs;
        self
    }
}

/// Builds a spend where every input owner is its signer, then signs it.
pub fn spend(inputs: Vec<SpendInput>, outputs: Vec<(Address, u64)>, fee: u64) -> Transaction {
    let mut tx = Transaction::new(
        inputs
            .iter()
            .map(|input| {
                Input::new(
                    input.position,
                    input.signer.address(),
                    Signature::EMPTY,
                    input.confirm_sigs.clone(),
                )
            })
            .collect(),
        outputs
            .into_iter()
            .map(|(owner, amount)| Output::new(owner, amount))
            .collect(),
        fee,
    );
    let hash = tx.signing_hash();
    for (input, spend_input) in tx.inputs.iter_mut().zip(&inputs) {
        input.signature = spend_input.signer.sign_hash(&hash);
    }
    tx
}
