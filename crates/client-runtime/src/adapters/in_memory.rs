//! # In-Memory Ledger
//!
//! A simulated rooms contract for tests and `--simulate` mode.
//!
//! Every transaction is mined into its own block immediately, so receipts
//! are available as soon as `submit` returns. Logs use the same topic and
//! data layout a deployed contract emits, and the log query enforces the
//! same 20-block range cap as public RPC providers.

use async_trait::async_trait;
use parking_lot::RwLock;
use rand::Rng;
use rc_01_event_sync::{encode_log, LogSource, MAX_WINDOW_SIZE};
use rc_02_entity_state::{RoomDirectory, RoomOccupant, RoomSummary};
use rc_03_command_submission::{
    CommandLedger, PendingHandle, Receipt, RoomCommand, TransactionRequest,
};
use shared_bus::{DomainEvent, EventPayload, PlayerEntered, PlayerMoved, RoomCreated};
use shared_types::abi::{self, AbiType, Token};
use shared_types::{
    encode_point, keccak256, Address, BlockNumber, EventPosition, Hash, LedgerError, LogQuery,
    LogRecord, RoomId, U256, COORDINATE_OFFSET,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct SimPlayer {
    address: Address,
    name: String,
    x: U256,
    y: U256,
}

struct SimRoom {
    name: String,
    players: Vec<SimPlayer>,
}

#[derive(Default)]
struct LedgerState {
    head: BlockNumber,
    logs: Vec<LogRecord>,
    rooms: BTreeMap<RoomId, SimRoom>,
    next_room_id: u64,
    locations: HashMap<Address, RoomId>,
    receipts: HashMap<Hash, Receipt>,
    nonce: u64,
}

/// Simulated ledger hosting one rooms contract.
#[derive(Clone)]
pub struct InMemoryLedger {
    contract: Address,
    default_sender: Address,
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedger {
    /// Create a ledger for `contract`; `submit` sends from `default_sender`.
    pub fn new(contract: Address, default_sender: Address) -> Self {
        Self {
            contract,
            default_sender,
            state: Arc::new(RwLock::new(LedgerState {
                next_room_id: 1,
                ..LedgerState::default()
            })),
        }
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn head(&self) -> BlockNumber {
        self.state.read().head
    }

    /// Mine `n` empty blocks.
    pub fn mine_empty(&self, n: u64) {
        self.state.write().head += n;
    }

    /// Submit a transaction from `sender`. Mined immediately.
    pub fn submit_as(
        &self,
        sender: Address,
        tx: &TransactionRequest,
    ) -> Result<PendingHandle, LedgerError> {
        if tx.to != self.contract {
            return Err(LedgerError::Rejected(format!("no contract at {}", tx.to)));
        }

        let mut state = self.state.write();
        state.head += 1;
        state.nonce += 1;
        let block = state.head;

        let mut preimage = state.nonce.to_be_bytes().to_vec();
        preimage.extend_from_slice(sender.as_bytes());
        let tx_hash = keccak256(&preimage);

        let receipt = match execute(&mut state, sender, &tx.data) {
            Ok(payloads) => {
                let logs: Vec<LogRecord> = payloads
                    .into_iter()
                    .enumerate()
                    .map(|(index, payload)| {
                        let event = DomainEvent::new(EventPosition::new(block, index as u64), payload)
                            .with_transaction(Some(tx_hash));
                        encode_log(self.contract, &event)
                    })
                    .collect();
                state.logs.extend(logs.iter().cloned());
                Receipt {
                    tx_hash,
                    block_number: block,
                    success: true,
                    logs,
                }
            }
            Err(reason) => {
                debug!(sender = %sender, block, reason = %reason, "Simulated transaction reverted");
                Receipt {
                    tx_hash,
                    block_number: block,
                    success: false,
                    logs: Vec::new(),
                }
            }
        };
        state.receipts.insert(tx_hash, receipt);
        Ok(PendingHandle { tx_hash })
    }

    /// Run `command` as another client and return its receipt.
    pub fn act_as(&self, sender: Address, command: &RoomCommand) -> Result<Receipt, LedgerError> {
        let tx = TransactionRequest {
            to: self.contract,
            data: command.calldata(),
        };
        let handle = self.submit_as(sender, &tx)?;
        self.state
            .read()
            .receipts
            .get(&handle.tx_hash)
            .cloned()
            .ok_or_else(|| LedgerError::MalformedResponse("receipt missing".to_string()))
    }
}

/// Apply one contract call, returning the events it emits.
fn execute(state: &mut LedgerState, sender: Address, data: &[u8]) -> Result<Vec<EventPayload>, String> {
    let (selector, args) = data.split_at_checked(4).ok_or("calldata too short")?;

    if selector == abi::selector("createRoom(string)") {
        let name = decode_args(&[AbiType::String], args)?
            .into_iter()
            .next()
            .and_then(Token::into_string)
            .ok_or("bad createRoom arguments")?;
        let room_id = U256::from(state.next_room_id);
        state.next_room_id += 1;
        state.rooms.insert(
            room_id,
            SimRoom {
                name,
                players: Vec::new(),
            },
        );
        return Ok(vec![EventPayload::RoomCreated(RoomCreated {
            creator: sender,
            room_id,
        })]);
    }

    if selector == abi::selector("enterRoom(uint256,string)") {
        let mut tokens = decode_args(&[AbiType::Uint256, AbiType::String], args)?.into_iter();
        let (Some(room_id), Some(name)) = (
            tokens.next().and_then(Token::into_uint),
            tokens.next().and_then(Token::into_string),
        ) else {
            return Err("bad enterRoom arguments".to_string());
        };
        if !state.rooms.contains_key(&room_id) {
            return Err(format!("room {room_id} does not exist"));
        }
        if let Some(previous) = state.locations.insert(sender, room_id) {
            if let Some(room) = state.rooms.get_mut(&previous) {
                room.players.retain(|p| p.address != sender);
            }
        }
        let origin = U256::from(COORDINATE_OFFSET as u64);
        if let Some(room) = state.rooms.get_mut(&room_id) {
            room.players.push(SimPlayer {
                address: sender,
                name: name.clone(),
                x: origin,
                y: origin,
            });
        }
        return Ok(vec![EventPayload::PlayerEntered(PlayerEntered {
            player: sender,
            room_id,
            name,
        })]);
    }

    if selector == abi::selector("move(uint256,uint256)") {
        let mut tokens = decode_args(&[AbiType::Uint256, AbiType::Uint256], args)?.into_iter();
        let (Some(x), Some(y)) = (
            tokens.next().and_then(Token::into_uint),
            tokens.next().and_then(Token::into_uint),
        ) else {
            return Err("bad move arguments".to_string());
        };
        let room_id = *state.locations.get(&sender).ok_or("sender is not in a room")?;
        let player = state
            .rooms
            .get_mut(&room_id)
            .and_then(|room| room.players.iter_mut().find(|p| p.address == sender))
            .ok_or("sender is not in a room")?;
        player.x = x;
        player.y = y;
        return Ok(vec![EventPayload::PlayerMoved(PlayerMoved {
            player: sender,
            room_id,
            x,
            y,
        })]);
    }

    Err(format!("unknown selector 0x{}", hex::encode(selector)))
}

fn decode_args(types: &[AbiType], args: &[u8]) -> Result<Vec<Token>, String> {
    abi::decode(types, args).map_err(|e| e.to_string())
}

#[async_trait]
impl LogSource for InMemoryLedger {
    async fn latest_block(&self) -> Result<BlockNumber, LedgerError> {
        Ok(self.head())
    }

    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<LogRecord>, LedgerError> {
        if query.span() > MAX_WINDOW_SIZE {
            return Err(LedgerError::RangeTooLarge {
                span: query.span(),
                limit: MAX_WINDOW_SIZE,
            });
        }
        let state = self.state.read();
        let mut logs: Vec<LogRecord> = state
            .logs
            .iter()
            .filter(|log| query.matches(log))
            .cloned()
            .collect();
        logs.sort_by_key(LogRecord::position);
        Ok(logs)
    }
}

#[async_trait]
impl RoomDirectory for InMemoryLedger {
    async fn get_all_rooms(&self) -> Result<Vec<RoomSummary>, LedgerError> {
        Ok(self
            .state
            .read()
            .rooms
            .iter()
            .map(|(id, room)| RoomSummary {
                id: *id,
                name: room.name.clone(),
            })
            .collect())
    }

    async fn get_room_players(&self, room: RoomId) -> Result<Vec<RoomOccupant>, LedgerError> {
        Ok(self
            .state
            .read()
            .rooms
            .get(&room)
            .map(|room| {
                room.players
                    .iter()
                    .map(|p| RoomOccupant {
                        address: p.address,
                        name: p.name.clone(),
                        x: p.x,
                        y: p.y,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl CommandLedger for InMemoryLedger {
    async fn submit(&self, tx: &TransactionRequest) -> Result<PendingHandle, LedgerError> {
        self.submit_as(self.default_sender, tx)
    }

    async fn get_receipt(&self, handle: &PendingHandle) -> Result<Option<Receipt>, LedgerError> {
        Ok(self.state.read().receipts.get(&handle.tx_hash).cloned())
    }
}

/// Drive a simulated peer: enter `room`, then walk to a random nearby point
/// every `interval` until `shutdown` turns true.
pub fn spawn_wanderer(
    ledger: InMemoryLedger,
    peer: Address,
    name: String,
    room: RoomId,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let enter = RoomCommand::EnterRoom {
            room_id: room,
            name: name.clone(),
        };
        if let Err(e) = ledger.act_as(peer, &enter) {
            warn!(peer = %peer, error = %e, "Simulated peer could not enter room");
            return;
        }
        info!(peer = %peer, name = %name, room = %room, "Simulated peer entered");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }

            let (x, y) = {
                let mut rng = rand::thread_rng();
                (rng.gen_range(-200.0..200.0), rng.gen_range(-200.0..200.0))
            };
            let Ok((x, y)) = encode_point(x, y) else {
                continue;
            };
            if let Err(e) = ledger.act_as(peer, &RoomCommand::Move { x, y }) {
                warn!(peer = %peer, error = %e, "Simulated move failed");
            }
        }
    })
}
