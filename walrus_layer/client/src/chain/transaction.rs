//   Copyright 2024 The Walrus Project
//   SPDX-License-Identifier: BSD-3-Clause

//! A programmable transaction as a list of command descriptors. Building is pure composition;
//! serialization and signing happen behind [`super::ChainReader::execute_transaction`].

use serde::Serialize;
use walrus_common_types::ObjectId;

/// An argument to a transaction command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CallArg {
    /// An owned or shared object reference.
    Object(ObjectId),
    /// A BCS-encoded pure value.
    Pure(Vec<u8>),
    /// The gas coin.
    Gas,
    /// The result of an earlier command in the same transaction.
    Result(u16),
}

impl CallArg {
    pub fn pure_u8(value: u8) -> Self {
        CallArg::Pure(vec![value])
    }

    pub fn pure_u32(value: u32) -> Self {
        CallArg::Pure(value.to_le_bytes().to_vec())
    }

    pub fn pure_u64(value: u64) -> Self {
        CallArg::Pure(value.to_le_bytes().to_vec())
    }

    pub fn pure_bool(value: bool) -> Self {
        CallArg::Pure(vec![u8::from(value)])
    }

    /// `vector<u8>`: ULEB128 length prefix followed by the raw bytes.
    pub fn pure_bytes(bytes: &[u8]) -> Self {
        let mut encoded = Vec::with_capacity(bytes.len() + 4);
        write_uleb128(&mut encoded, bytes.len() as u64);
        encoded.extend_from_slice(bytes);
        CallArg::Pure(encoded)
    }

    /// A 32-byte address or id value.
    pub fn pure_address(id: &ObjectId) -> Self {
        CallArg::Pure(id.as_bytes().to_vec())
    }

    /// `vector<string>` of UTF-8 strings.
    pub fn pure_string_vec(values: &[String]) -> Self {
        let mut encoded = Vec::new();
        write_uleb128(&mut encoded, values.len() as u64);
        for value in values {
            write_uleb128(&mut encoded, value.len() as u64);
            encoded.extend_from_slice(value.as_bytes());
        }
        CallArg::Pure(encoded)
    }

    pub fn pure_string(value: &str) -> Self {
        let mut encoded = Vec::with_capacity(value.len() + 4);
        write_uleb128(&mut encoded, value.len() as u64);
        encoded.extend_from_slice(value.as_bytes());
        CallArg::Pure(encoded)
    }
}

fn write_uleb128(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveCall {
    pub package: ObjectId,
    pub module: String,
    pub function: String,
    pub type_arguments: Vec<String>,
    pub arguments: Vec<CallArg>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Command {
    MoveCall(MoveCall),
    SplitCoins { coin: CallArg, amounts: Vec<CallArg> },
    TransferObjects { objects: Vec<CallArg>, recipient: CallArg },
}

/// Handle to a command's result, usable as an argument of later commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandResult(pub u16);

impl From<CommandResult> for CallArg {
    fn from(result: CommandResult) -> Self {
        CallArg::Result(result.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgrammableTransaction {
    commands: Vec<Command>,
}

impl ProgrammableTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_command(&mut self, command: Command) -> CommandResult {
        self.commands.push(command);
        CommandResult((self.commands.len() - 1) as u16)
    }

    pub fn move_call(&mut self, call: MoveCall) -> CommandResult {
        self.add_command(Command::MoveCall(call))
    }

    pub fn split_coin(&mut self, coin: CallArg, amount: u64) -> CommandResult {
        self.add_command(Command::SplitCoins {
            coin,
            amounts: vec![CallArg::pure_u64(amount)],
        })
    }

    pub fn transfer_objects(&mut self, objects: Vec<CallArg>, recipient: CallArg) -> CommandResult {
        self.add_command(Command::TransferObjects { objects, recipient })
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_results_index_in_order() {
        let mut tx = ProgrammableTransaction::new();
        let first = tx.split_coin(CallArg::Gas, 100);
        let second = tx.move_call(MoveCall {
            package: ObjectId::new([1; 32]),
            module: "system".to_string(),
            function: "reserve_space".to_string(),
            type_arguments: vec![],
            arguments: vec![first.into()],
        });
        assert_eq!(first, CommandResult(0));
        assert_eq!(second, CommandResult(1));
        assert_eq!(tx.commands().len(), 2);
    }

    #[test]
    fn uleb128_length_prefixes() {
        let CallArg::Pure(encoded) = CallArg::pure_bytes(&[0u8; 300]) else {
            panic!("expected pure arg");
        };
        // 300 = 0b10_0101100 -> 0xac 0x02
        assert_eq!(&encoded[..2], &[0xac, 0x02]);
        assert_eq!(encoded.len(), 302);
    }
}
