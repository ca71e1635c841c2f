//! Admission checks run before any state is touched.
//!
//! The validator only reads the ledger. The single side effect it has is adding the fee
//! of a delivered transaction to the running block total.

use num_bigint::BigUint;
use tracing::debug;

use crate::{
    chain::{BlockSession, Context, ExecMode},
    error::{Error, Result},
    msgs::{IncludeDepositMsg, Msg},
    plasma::{Address, Deposit, Input, Position, Transaction, TxHash},
    rootchain::{DepositStatus, RootchainOracle},
    store::{DataStore, KvStore, StoredOutput},
    utils::crypto::recover_address,
};

/// An accepted message, carrying what the state transition needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Spend { tx: Transaction, hash: TxHash },
    IncludeDeposit { nonce: u64, deposit: Deposit },
}

pub fn ante<K: KvStore, O: RootchainOracle>(
    ctx: &Context,
    store: &DataStore<K>,
    oracle: &O,
    session: &mut BlockSession,
    msg: &Msg,
) -> Result<Admission> {
    let plasma_height = store.plasma_block_height()?.map_or(0, |height| height.0);
    match msg {
        Msg::Spend(tx) => {
            let hash = validate_spend(store, oracle, plasma_height, tx)?;
            if ctx.mode == ExecMode::Deliver {
                session.add_fee(&tx.fee);
            }
            debug!("admitted spend {} ({:?})", hash, ctx.mode);
            Ok(Admission::Spend {
                tx: tx.clone(),
                hash,
            })
        }
        Msg::IncludeDeposit(msg) => {
            let deposit = validate_deposit(store, oracle, plasma_height, msg)?;
            debug!("admitted deposit {} ({:?})", msg.deposit_nonce, ctx.mode);
            Ok(Admission::IncludeDeposit {
                nonce: msg.deposit_nonce,
                deposit,
            })
        }
    }
}

fn validate_spend<K: KvStore, O: RootchainOracle>(
    store: &DataStore<K>,
    oracle: &O,
    plasma_height: u64,
    tx: &Transaction,
) -> Result<TxHash> {
    tx.validate_basic()
        .map_err(|e| Error::InvalidTransaction(format!("{e:#}")))?;

    let signing_hash = tx.signing_hash();
    let signers = tx
        .inputs
        .iter()
        .map(|input| recover_address(&signing_hash, &input.signature))
        .collect::<anyhow::Result<Vec<Address>>>()
        .map_err(|e| Error::InvalidTransaction(format!("recovering signers: {e:#}")))?;
    if signers.len() != tx.inputs.len() {
        return Err(Error::InvalidTransaction(format!(
            "recovered {} signers for {} inputs",
            signers.len(),
            tx.inputs.len()
        )));
    }

    let mut total_input = BigUint::default();
    for (i, (input, signer)) in tx.inputs.iter().zip(&signers).enumerate() {
        let stored = validate_input(store, oracle, plasma_height, input, signer)?;
        if i == 0 && stored.output.amount < tx.fee {
            return Err(Error::InsufficientFee(format!(
                "first input holds {} but the fee is {}",
                stored.output.amount, tx.fee
            )));
        }
        total_input += stored.output.amount;
    }

    let total_spent = tx.total_spent();
    if total_input != total_spent {
        return Err(Error::InvalidTransaction(format!(
            "inputs ({total_input}) do not equal outputs plus fee ({total_spent})"
        )));
    }

    tx.inclusion_hash()
        .map_err(|e| Error::Serialization(format!("{e:#}")))
}

fn validate_input<K: KvStore, O: RootchainOracle>(
    store: &DataStore<K>,
    oracle: &O,
    plasma_height: u64,
    input: &Input,
    signer: &Address,
) -> Result<StoredOutput> {
    let position = input.position;
    let Some(stored) = store.get_output(&position)? else {
        return Err(Error::InvalidInput(format!("input {position} does not exist")));
    };
    if *signer != input.owner {
        return Err(Error::SignatureVerificationFailure(format!(
            "input {position} signed by {signer}, declared owner is {}",
            input.owner
        )));
    }
    if stored.output.owner != *signer {
        return Err(Error::SignatureVerificationFailure(format!(
            "{signer} does not own input {position}, owner is {}",
            stored.output.owner
        )));
    }
    if stored.spent {
        return Err(Error::InvalidInput(format!("input {position} already spent")));
    }

    check_not_exited(oracle, plasma_height, &position)?;

    if input.needs_confirmation() {
        validate_confirm_signatures(store, oracle, plasma_height, input)?;
    }
    Ok(stored)
}

/// Checks that every owner who funded the transaction which created `input` confirmed it,
/// and that none of that transaction's inputs has exited. Only one ancestor level is walked.
fn validate_confirm_signatures<K: KvStore, O: RootchainOracle>(
    store: &DataStore<K>,
    oracle: &O,
    plasma_height: u64,
    input: &Input,
) -> Result<()> {
    let position = input.position;
    let Some(ancestor) = store.get_transaction_by_position(&position)? else {
        return Err(Error::InvalidInput(format!(
            "no transaction created input {position}"
        )));
    };

    let expected = ancestor.transaction.inputs.len();
    if input.confirm_signatures.len() != expected {
        return Err(Error::InvalidTransaction(format!(
            "input {position} carries {} confirm signatures, expected {expected}",
            input.confirm_signatures.len()
        )));
    }

    for (ancestor_input, confirm_sig) in ancestor
        .transaction
        .inputs
        .iter()
        .zip(&input.confirm_signatures)
    {
        let confirmer = recover_address(&ancestor.confirmation_hash, confirm_sig).map_err(|e| {
            Error::SignatureVerificationFailure(format!(
                "confirm signature for {position}: {e:#}"
            ))
        })?;
        if confirmer != ancestor_input.owner {
            return Err(Error::SignatureVerificationFailure(format!(
                "confirm signature for {position} made by {confirmer}, expected {}",
                ancestor_input.owner
            )));
        }
        check_not_exited(oracle, plasma_height, &ancestor_input.position)?;
    }
    Ok(())
}

fn check_not_exited<O: RootchainOracle>(
    oracle: &O,
    plasma_height: u64,
    position: &Position,
) -> Result<()> {
    match oracle.has_exited(plasma_height, position) {
        Ok(false) => Ok(()),
        Ok(true) => Err(Error::ExitedInput(format!(
            "{position} has exited the rootchain"
        ))),
        Err(e) => Err(Error::InvalidInput(format!(
            "could not check exit status of {position}: {e:#}"
        ))),
    }
}

fn validate_deposit<K: KvStore, O: RootchainOracle>(
    store: &DataStore<K>,
    oracle: &O,
    plasma_height: u64,
    msg: &IncludeDepositMsg,
) -> Result<Deposit> {
    msg.validate_basic()
        .map_err(|e| Error::InvalidTransaction(format!("{e:#}")))?;

    let nonce = msg.deposit_nonce;
    if store.has_deposit(nonce)? {
        return Err(Error::InvalidTransaction(format!(
            "deposit {nonce} already included"
        )));
    }

    let deposit = match oracle.get_deposit(plasma_height, nonce) {
        DepositStatus::Final(deposit) => deposit,
        DepositStatus::Pending {
            blocks_remaining, ..
        } => {
            return Err(Error::InvalidTransaction(format!(
                "deposit {nonce} is not final yet: {blocks_remaining} rootchain blocks remaining"
            )))
        }
        DepositStatus::NotFound => {
            return Err(Error::InvalidTransaction(format!(
                "deposit {nonce} does not exist on the rootchain"
            )))
        }
    };

    if deposit.owner != msg.owner {
        return Err(Error::InvalidTransaction(format!(
            "deposit {nonce} belongs to {}, not {}",
            deposit.owner, msg.owner
        )));
    }

    check_not_exited(oracle, plasma_height, &Position::deposit(nonce))?;
    Ok(deposit)
}
