//! Fixed-width encoding of the signed part of a transaction.
//!
//! Every field occupies one 32-byte big-endian word so that the rootchain contract can
//! rebuild the same bytes when a transaction is challenged. Absent input and output slots
//! are encoded as zero words.

use super::{Address, Amount, Input, Output, Position};

pub const WORD_LEN: usize = 32;
pub const WORDS_PER_INPUT: usize = 5;
pub const WORDS_PER_OUTPUT: usize = 2;
pub const SIGNING_WORDS: usize = 2 * WORDS_PER_INPUT + 2 * WORDS_PER_OUTPUT + 1;
pub const SIGNING_BYTES_LEN: usize = SIGNING_WORDS * WORD_LEN;

/// Accumulates 32-byte words.
#[derive(Debug, Default)]
pub struct WordWriter {
    buf: Vec<u8>,
}

impl WordWriter {
    pub fn with_capacity(words: usize) -> Self {
        WordWriter {
            buf: Vec::with_capacity(words * WORD_LEN),
        }
    }

    pub fn put_u64(&mut self, value: u64) {
        let mut word = [0u8; WORD_LEN];
        word[WORD_LEN - 8..].copy_from_slice(&value.to_be_bytes());
        self.buf.extend_from_slice(&word);
    }

    pub fn put_address(&mut self, address: &Address) {
        let mut word = [0u8; WORD_LEN];
        word[WORD_LEN - address.0.len()..].copy_from_slice(&address.0);
        self.buf.extend_from_slice(&word);
    }

    /// Amounts wider than a word keep only their low 256 bits; callers validate
    /// widths beforehand.
    pub fn put_amount(&mut self, amount: &Amount) {
        let bytes = amount.to_bytes_be();
        let bytes = &bytes[bytes.len().saturating_sub(WORD_LEN)..];
        let mut word = [0u8; WORD_LEN];
        word[WORD_LEN - bytes.len()..].copy_from_slice(bytes);
        self.buf.extend_from_slice(&word);
    }

    pub fn put_position(&mut self, position: &Position) {
        self.put_u64(position.block_num);
        self.put_u64(position.tx_index as u64);
        self.put_u64(position.output_index as u64);
        self.put_u64(position.deposit_nonce);
    }

    pub fn put_input(&mut self, input: Option<&Input>) {
        match input {
            Some(input) => {
                self.put_position(&input.position);
                self.put_address(&input.owner);
            }
            None => self.put_zero_words(WORDS_PER_INPUT),
        }
    }

    pub fn put_output(&mut self, output: Option<&Output>) {
        match output {
            Some(output) => {
                self.put_address(&output.owner);
                self.put_amount(&output.amount);
            }
            None => self.put_zero_words(WORDS_PER_OUTPUT),
        }
    }

    pub fn put_zero_words(&mut self, count: usize) {
        self.buf.resize(self.buf.len() + count * WORD_LEN, 0);
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Signing bytes for up to two inputs, up to two outputs and the fee.
pub fn signing_bytes(inputs: &[Input], outputs: &[Output], fee: &Amount) -> Vec<u8> {
    let mut writer = WordWriter::with_capacity(SIGNING_WORDS);
    writer.put_input(inputs.first());
    writer.put_input(inputs.get(1));
    writer.put_output(outputs.first());
    writer.put_output(outputs.get(1));
    writer.put_amount(fee);
    writer.finish()
}
