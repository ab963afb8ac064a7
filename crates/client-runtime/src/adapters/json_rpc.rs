//! # JSON-RPC Ledger Gateway
//!
//! Talks to an Ethereum-compatible node over HTTP JSON-RPC.
//!
//! | Port | Methods |
//! |------|---------|
//! | `LogSource` | `eth_blockNumber`, `eth_getLogs` |
//! | `RoomDirectory` | `eth_call` (`getAllRooms`, `getRoomPlayers`) |
//! | `CommandLedger` | `eth_sendTransaction`, `eth_getTransactionReceipt` |
//!
//! Transactions are sent from a node-managed account; no keys are held here.

use async_trait::async_trait;
use rc_01_event_sync::LogSource;
use rc_02_entity_state::{RoomDirectory, RoomOccupant, RoomSummary};
use rc_03_command_submission::{CommandLedger, PendingHandle, Receipt, TransactionRequest};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use shared_types::abi::{self, AbiType, Token};
use shared_types::{Address, BlockNumber, Hash, LedgerError, LogQuery, LogRecord, RoomId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::trace;

/// JSON-RPC request structure.
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a, T: Serialize> {
    jsonrpc: &'static str,
    method: &'a str,
    params: T,
    id: u64,
}

/// JSON-RPC response structure.
#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

/// JSON-RPC error structure.
#[derive(Debug, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

/// A log as the node reports it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
    block_number: String,
    log_index: String,
    address: Address,
    topics: Vec<Hash>,
    data: String,
    transaction_hash: Option<Hash>,
}

impl TryFrom<RpcLog> for LogRecord {
    type Error = LedgerError;

    fn try_from(log: RpcLog) -> Result<Self, Self::Error> {
        Ok(LogRecord {
            block_number: parse_hex_u64(&log.block_number)?,
            log_index: parse_hex_u64(&log.log_index)?,
            address: log.address,
            topics: log.topics,
            data: parse_hex_bytes(&log.data)?,
            transaction_hash: log.transaction_hash,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: Hash,
    block_number: String,
    /// `0x1` success, `0x0` reverted. Absent on pre-Byzantium chains.
    status: Option<String>,
    logs: Vec<RpcLog>,
}

/// Ledger gateway over HTTP JSON-RPC.
pub struct JsonRpcLedger {
    http_client: reqwest::Client,
    rpc_url: String,
    request_id: AtomicU64,
    contract: Address,
    account: Address,
    timeout: Duration,
}

impl JsonRpcLedger {
    /// Create a gateway for `contract`, sending from `account`.
    ///
    /// Fails if the HTTP client cannot be built with the requested timeout.
    pub fn new(
        rpc_url: String,
        contract: Address,
        account: Address,
        timeout: Duration,
    ) -> Result<Self, LedgerError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LedgerError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            rpc_url,
            request_id: AtomicU64::new(1),
            contract,
            account,
            timeout,
        })
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn account(&self) -> Address {
        self.account
    }

    /// Make a JSON-RPC call whose result may be `null`.
    async fn call_optional<P: Serialize + Send + Sync, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<Option<R>, LedgerError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id,
        };
        trace!(method, id, "JSON-RPC request");

        let response = self
            .http_client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(method, &e))?;

        let rpc_response: JsonRpcResponse<R> = response
            .json()
            .await
            .map_err(|e| LedgerError::MalformedResponse(format!("{method}: {e}")))?;

        if let Some(error) = rpc_response.error {
            return Err(LedgerError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        Ok(rpc_response.result)
    }

    /// Make a JSON-RPC call that must return a result.
    async fn call<P: Serialize + Send + Sync, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R, LedgerError> {
        self.call_optional(method, params)
            .await?
            .ok_or_else(|| LedgerError::MalformedResponse(format!("{method}: missing result")))
    }

    fn transport_error(&self, method: &str, e: &reqwest::Error) -> LedgerError {
        if e.is_timeout() {
            LedgerError::Timeout {
                operation: method.to_string(),
                millis: self.timeout.as_millis() as u64,
            }
        } else {
            LedgerError::Transport(e.to_string())
        }
    }

    /// `eth_call` against the contract at the latest block.
    async fn eth_call(&self, data: Vec<u8>) -> Result<Vec<u8>, LedgerError> {
        let params = json!([
            { "to": self.contract, "data": to_hex(&data) },
            "latest"
        ]);
        let result: String = self.call("eth_call", params).await?;
        parse_hex_bytes(&result)
    }
}

#[async_trait]
impl LogSource for JsonRpcLedger {
    async fn latest_block(&self) -> Result<BlockNumber, LedgerError> {
        let result: String = self.call("eth_blockNumber", Vec::<()>::new()).await?;
        parse_hex_u64(&result)
    }

    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<LogRecord>, LedgerError> {
        let params = json!([{
            "fromBlock": format!("{:#x}", query.from_block),
            "toBlock": format!("{:#x}", query.to_block),
            "address": query.address,
            "topics": [query.topic],
        }]);
        let logs: Vec<RpcLog> = self.call("eth_getLogs", params).await?;
        let mut records = logs
            .into_iter()
            .map(LogRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        records.sort_by_key(LogRecord::position);
        Ok(records)
    }
}

#[async_trait]
impl RoomDirectory for JsonRpcLedger {
    async fn get_all_rooms(&self) -> Result<Vec<RoomSummary>, LedgerError> {
        let output = self.eth_call(abi::encode_call("getAllRooms()", &[])).await?;
        decode_rooms(&output)
    }

    async fn get_room_players(&self, room: RoomId) -> Result<Vec<RoomOccupant>, LedgerError> {
        let output = self
            .eth_call(abi::encode_call("getRoomPlayers(uint256)", &[Token::Uint(room)]))
            .await?;
        decode_room_players(&output)
    }
}

#[async_trait]
impl CommandLedger for JsonRpcLedger {
    async fn submit(&self, tx: &TransactionRequest) -> Result<PendingHandle, LedgerError> {
        let params = json!([{
            "from": self.account,
            "to": tx.to,
            "data": to_hex(&tx.data),
        }]);
        let tx_hash: Hash = self.call("eth_sendTransaction", params).await?;
        Ok(PendingHandle { tx_hash })
    }

    async fn get_receipt(&self, handle: &PendingHandle) -> Result<Option<Receipt>, LedgerError> {
        let receipt: Option<RpcReceipt> = self
            .call_optional("eth_getTransactionReceipt", json!([handle.tx_hash]))
            .await?;
        let Some(receipt) = receipt else {
            return Ok(None);
        };
        let success = match receipt.status.as_deref() {
            Some(status) => parse_hex_u64(status)? == 1,
            None => true,
        };
        Ok(Some(Receipt {
            tx_hash: receipt.transaction_hash,
            block_number: parse_hex_u64(&receipt.block_number)?,
            success,
            logs: receipt
                .logs
                .into_iter()
                .map(LogRecord::try_from)
                .collect::<Result<_, _>>()?,
        }))
    }
}

/// Decode `getAllRooms() -> (uint256[] ids, string[] names)`.
pub fn decode_rooms(output: &[u8]) -> Result<Vec<RoomSummary>, LedgerError> {
    let mut columns = decode_columns(
        output,
        &[
            AbiType::Array(Box::new(AbiType::Uint256)),
            AbiType::Array(Box::new(AbiType::String)),
        ],
    )?
    .into_iter();
    let (Some(ids), Some(names)) = (columns.next(), columns.next()) else {
        return Err(malformed("getAllRooms: missing columns"));
    };
    ids.into_iter()
        .zip(names)
        .map(|(id, name)| -> Result<RoomSummary, LedgerError> {
            Ok(RoomSummary {
                id: id.into_uint().ok_or_else(|| malformed("room id"))?,
                name: name.into_string().ok_or_else(|| malformed("room name"))?,
            })
        })
        .collect()
}

/// Decode `getRoomPlayers(uint256) -> (address[], string[], uint256[], uint256[])`.
pub fn decode_room_players(output: &[u8]) -> Result<Vec<RoomOccupant>, LedgerError> {
    let mut columns = decode_columns(
        output,
        &[
            AbiType::Array(Box::new(AbiType::Address)),
            AbiType::Array(Box::new(AbiType::String)),
            AbiType::Array(Box::new(AbiType::Uint256)),
            AbiType::Array(Box::new(AbiType::Uint256)),
        ],
    )?
    .into_iter();
    let (Some(addresses), Some(names), Some(xs), Some(ys)) =
        (columns.next(), columns.next(), columns.next(), columns.next())
    else {
        return Err(malformed("getRoomPlayers: missing columns"));
    };

    addresses
        .into_iter()
        .zip(names)
        .zip(xs.into_iter().zip(ys))
        .map(|((address, name), (x, y))| -> Result<RoomOccupant, LedgerError> {
            Ok(RoomOccupant {
                address: address.into_address().ok_or_else(|| malformed("player address"))?,
                name: name.into_string().ok_or_else(|| malformed("player name"))?,
                x: x.into_uint().ok_or_else(|| malformed("player x"))?,
                y: y.into_uint().ok_or_else(|| malformed("player y"))?,
            })
        })
        .collect()
}

/// Decode parallel arrays, rejecting columns of unequal length.
fn decode_columns(output: &[u8], types: &[AbiType]) -> Result<Vec<Vec<Token>>, LedgerError> {
    let columns = abi::decode(types, output)
        .map_err(|e| LedgerError::MalformedResponse(e.to_string()))?
        .into_iter()
        .map(|token| token.into_array().ok_or_else(|| malformed("expected array")))
        .collect::<Result<Vec<_>, _>>()?;
    if let Some(first) = columns.first() {
        if columns.iter().any(|c| c.len() != first.len()) {
            return Err(malformed("array columns differ in length"));
        }
    }
    Ok(columns)
}

fn malformed(what: &str) -> LedgerError {
    LedgerError::MalformedResponse(what.to_string())
}

fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

fn parse_hex_u64(s: &str) -> Result<u64, LedgerError> {
    let digits = s.trim_start_matches("0x");
    u64::from_str_radix(digits, 16)
        .map_err(|e| LedgerError::MalformedResponse(format!("hex number {s:?}: {e}")))
}

fn parse_hex_bytes(s: &str) -> Result<Vec<u8>, LedgerError> {
    hex::decode(s.trim_start_matches("0x"))
        .map_err(|e| LedgerError::MalformedResponse(format!("hex data: {e}")))
}
