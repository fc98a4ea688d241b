//! # In-Memory Ledger
//!
//! A single chain holding ERC-721 token contracts, source bridges, and
//! destination bridges, with the checks the on-chain contracts enforce:
//!
//! - **Source bridge `commit`**: caller is the bridge's validator; nonce
//!   equals the owner's current nonce; the owner still owns the token and
//!   the bridge is approved; the owner signature recovers to the owner; the
//!   validator signature recovers to the validator. On success the token is
//!   escrowed by the bridge, the owner's nonce increments, the validator
//!   signature is recorded under `(owner, nonce)`, and `Commit` is emitted.
//! - **Destination bridge `acquire`**: the commitment has not been used;
//!   `keccak256(secret) == commitment`; the validator signature recovers to
//!   the validator. On success a new token is minted to the owner with the
//!   source URI and `Acquire` is emitted.
//!
//! Each state-changing call is one transaction mined in its own block.
//! [`InMemoryChain::mine`] advances the head without transactions, which is
//! how tests produce confirmations.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use nftb_core::{Address, ChainId, LedgerError, TokenUri, U256};
use nftb_crypto::{
    keccak256, Commitment, CompactSignature, OwnerMessage, ProtocolMessage, ValidatorMessage,
};

use crate::ledger::{ChainReader, CommitSubscription, DestinationLedger, SourceLedger};
use crate::types::{
    AcquireCall, AcquireEvent, BlockRange, CommitCall, CommitEvent, CommitFilter, Logged,
    TxReceipt,
};

const EVENT_CHANNEL_CAPACITY: usize = 256;

// ─── Contract state ──────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Erc721 {
    owners: HashMap<U256, Address>,
    uris: HashMap<U256, TokenUri>,
    approvals: HashMap<U256, Address>,
    operators: HashSet<(Address, Address)>,
    next_token_id: u64,
}

impl Erc721 {
    fn owner_of(&self, token_id: &U256) -> Option<Address> {
        self.owners.get(token_id).copied()
    }

    fn is_approved_or_operator(&self, owner: &Address, spender: &Address, token_id: &U256) -> bool {
        self.operators.contains(&(*owner, *spender))
            || self.approvals.get(token_id) == Some(spender)
    }

    fn mint(&mut self, to: Address, uri: TokenUri) -> U256 {
        loop {
            let id = U256::from(self.next_token_id);
            self.next_token_id += 1;
            if !self.owners.contains_key(&id) {
                self.owners.insert(id, to);
                self.uris.insert(id, uri);
                return id;
            }
        }
    }

    fn transfer(&mut self, token_id: U256, to: Address) {
        self.approvals.remove(&token_id);
        self.owners.insert(token_id, to);
    }
}

#[derive(Debug)]
struct SourceBridge {
    validator: Address,
    nonces: HashMap<Address, U256>,
    validator_signatures: HashMap<(Address, U256), CompactSignature>,
}

#[derive(Debug)]
struct DestinationBridge {
    validator: Address,
    token: Address,
    used_commitments: HashSet<Commitment>,
}

#[derive(Debug, Default)]
struct ChainState {
    head: u64,
    tx_count: u64,
    contract_count: u64,
    tokens: HashMap<Address, Erc721>,
    source_bridges: HashMap<Address, SourceBridge>,
    destination_bridges: HashMap<Address, DestinationBridge>,
    commit_log: Vec<Logged<CommitEvent>>,
    acquire_log: Vec<Logged<AcquireEvent>>,
    injected_failures: u32,
}

impl ChainState {
    fn next_contract_address(&mut self, chain_id: ChainId) -> Address {
        self.contract_count += 1;
        let mut seed = b"nftb-contract".to_vec();
        seed.extend_from_slice(&chain_id.as_u64().to_be_bytes());
        seed.extend_from_slice(&self.contract_count.to_be_bytes());
        Address::from_word(keccak256(seed))
    }

    /// Mine one block holding one transaction.
    fn mine_tx(&mut self, chain_id: ChainId) -> TxReceipt {
        self.tx_count += 1;
        self.head += 1;
        let mut seed = b"nftb-tx".to_vec();
        seed.extend_from_slice(&chain_id.as_u64().to_be_bytes());
        seed.extend_from_slice(&self.tx_count.to_be_bytes());
        TxReceipt {
            tx_hash: keccak256(seed),
            block_number: self.head,
        }
    }

    fn token(&self, chain_id: ChainId, token: &Address) -> Result<&Erc721, LedgerError> {
        self.tokens
            .get(token)
            .ok_or_else(|| no_contract(chain_id, token))
    }

    fn token_mut(&mut self, chain_id: ChainId, token: &Address) -> Result<&mut Erc721, LedgerError> {
        self.tokens
            .get_mut(token)
            .ok_or_else(|| no_contract(chain_id, token))
    }

    fn source_bridge(&self, chain_id: ChainId, bridge: &Address) -> Result<&SourceBridge, LedgerError> {
        self.source_bridges
            .get(bridge)
            .ok_or_else(|| no_contract(chain_id, bridge))
    }

    fn take_injected_failure(&mut self, chain_id: ChainId) -> Result<(), LedgerError> {
        if self.injected_failures > 0 {
            self.injected_failures -= 1;
            return Err(LedgerError::Rpc {
                chain_id,
                message: "injected transport failure".to_string(),
            });
        }
        Ok(())
    }
}

fn no_contract(chain_id: ChainId, address: &Address) -> LedgerError {
    revert(chain_id, format!("no contract deployed at {address}"))
}

fn revert(chain_id: ChainId, reason: impl Into<String>) -> LedgerError {
    LedgerError::Reverted {
        chain_id,
        reason: reason.into(),
    }
}

// ─── InMemoryChain ───────────────────────────────────────────────────

struct ChainInner {
    chain_id: ChainId,
    state: Mutex<ChainState>,
    commits: broadcast::Sender<Logged<CommitEvent>>,
}

/// One in-memory chain. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct InMemoryChain {
    inner: Arc<ChainInner>,
}

impl std::fmt::Debug for InMemoryChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryChain")
            .field("chain_id", &self.inner.chain_id)
            .field("head", &self.head())
            .finish()
    }
}

impl InMemoryChain {
    /// Start an empty chain at block 0.
    pub fn new(chain_id: ChainId) -> Self {
        let (commits, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(ChainInner {
                chain_id,
                state: Mutex::new(ChainState::default()),
                commits,
            }),
        }
    }

    /// The chain id.
    pub fn chain_id(&self) -> ChainId {
        self.inner.chain_id
    }

    /// Current head.
    pub fn head(&self) -> u64 {
        self.inner.state.lock().head
    }

    /// Advance the head by `blocks` empty blocks.
    pub fn mine(&self, blocks: u64) -> u64 {
        let mut state = self.inner.state.lock();
        state.head += blocks;
        state.head
    }

    /// Make the next `count` ledger calls fail with an RPC error.
    pub fn inject_rpc_failures(&self, count: u32) {
        self.inner.state.lock().injected_failures = count;
    }

    /// Deploy an empty ERC-721 contract.
    pub fn deploy_token(&self) -> Address {
        let mut state = self.inner.state.lock();
        let address = state.next_contract_address(self.inner.chain_id);
        state.tokens.insert(address, Erc721::default());
        address
    }

    /// Deploy a source bridge trusting `validator`.
    pub fn deploy_source_bridge(&self, validator: Address) -> Address {
        let mut state = self.inner.state.lock();
        let address = state.next_contract_address(self.inner.chain_id);
        state.source_bridges.insert(
            address,
            SourceBridge {
                validator,
                nonces: HashMap::new(),
                validator_signatures: HashMap::new(),
            },
        );
        address
    }

    /// Deploy a destination bridge minting into `token` and trusting
    /// `validator`.
    pub fn deploy_destination_bridge(
        &self,
        validator: Address,
        token: Address,
    ) -> Result<Address, LedgerError> {
        let mut state = self.inner.state.lock();
        state.token(self.inner.chain_id, &token)?;
        let address = state.next_contract_address(self.inner.chain_id);
        state.destination_bridges.insert(
            address,
            DestinationBridge {
                validator,
                token,
                used_commitments: HashSet::new(),
            },
        );
        Ok(address)
    }

    /// Mint `token_id` with `uri` to `to`, as the contract owner would.
    pub fn mint(
        &self,
        token: Address,
        to: Address,
        token_id: U256,
        uri: TokenUri,
    ) -> Result<TxReceipt, LedgerError> {
        let chain_id = self.inner.chain_id;
        let mut state = self.inner.state.lock();
        let erc721 = state.token_mut(chain_id, &token)?;
        if erc721.owners.contains_key(&token_id) {
            return Err(revert(chain_id, "ERC721: token already minted"));
        }
        erc721.owners.insert(token_id, to);
        erc721.uris.insert(token_id, uri);
        Ok(state.mine_tx(chain_id))
    }

    /// A handle acting as `account`.
    pub fn connect(&self, account: Address) -> ChainHandle {
        ChainHandle {
            chain: self.clone(),
            account,
        }
    }

    fn with_state<T>(
        &self,
        f: impl FnOnce(&mut ChainState, ChainId) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let chain_id = self.inner.chain_id;
        let mut state = self.inner.state.lock();
        state.take_injected_failure(chain_id)?;
        f(&mut *state, chain_id)
    }
}

// ─── ChainHandle ─────────────────────────────────────────────────────

/// An [`InMemoryChain`] seen from one account.
#[derive(Debug, Clone)]
pub struct ChainHandle {
    chain: InMemoryChain,
    account: Address,
}

impl ChainHandle {
    /// The underlying chain.
    pub fn chain(&self) -> &InMemoryChain {
        &self.chain
    }
}

#[async_trait]
impl ChainReader for ChainHandle {
    fn chain_id(&self) -> ChainId {
        self.chain.chain_id()
    }

    fn account(&self) -> Address {
        self.account
    }

    async fn block_number(&self) -> Result<u64, LedgerError> {
        self.chain.with_state(|s, _| Ok(s.head))
    }

    async fn owner_of(&self, token: Address, token_id: U256) -> Result<Address, LedgerError> {
        self.chain.with_state(|s, chain_id| {
            s.token(chain_id, &token)?
                .owner_of(&token_id)
                .ok_or_else(|| revert(chain_id, "ERC721: invalid token ID"))
        })
    }
}

#[async_trait]
impl SourceLedger for ChainHandle {
    async fn is_approved_for_all(
        &self,
        token: Address,
        owner: Address,
        operator: Address,
    ) -> Result<bool, LedgerError> {
        self.chain.with_state(|s, chain_id| {
            Ok(s.token(chain_id, &token)?.operators.contains(&(owner, operator)))
        })
    }

    async fn get_approved(&self, token: Address, token_id: U256) -> Result<Address, LedgerError> {
        self.chain.with_state(|s, chain_id| {
            let erc721 = s.token(chain_id, &token)?;
            if erc721.owner_of(&token_id).is_none() {
                return Err(revert(chain_id, "ERC721: invalid token ID"));
            }
            Ok(erc721
                .approvals
                .get(&token_id)
                .copied()
                .unwrap_or(Address::ZERO))
        })
    }

    async fn set_approval_for_all(
        &self,
        token: Address,
        operator: Address,
        approved: bool,
    ) -> Result<TxReceipt, LedgerError> {
        let sender = self.account;
        self.chain.with_state(|s, chain_id| {
            if operator == sender {
                return Err(revert(chain_id, "ERC721: approve to caller"));
            }
            let erc721 = s.token_mut(chain_id, &token)?;
            if approved {
                erc721.operators.insert((sender, operator));
            } else {
                erc721.operators.remove(&(sender, operator));
            }
            Ok(s.mine_tx(chain_id))
        })
    }

    async fn approve(
        &self,
        token: Address,
        spender: Address,
        token_id: U256,
    ) -> Result<TxReceipt, LedgerError> {
        let sender = self.account;
        self.chain.with_state(|s, chain_id| {
            let erc721 = s.token_mut(chain_id, &token)?;
            let owner = erc721
                .owner_of(&token_id)
                .ok_or_else(|| revert(chain_id, "ERC721: invalid token ID"))?;
            if owner != sender && !erc721.operators.contains(&(owner, sender)) {
                return Err(revert(
                    chain_id,
                    "ERC721: approve caller is not token owner or approved for all",
                ));
            }
            erc721.approvals.insert(token_id, spender);
            Ok(s.mine_tx(chain_id))
        })
    }

    async fn request_nonce(&self, bridge: Address, owner: Address) -> Result<U256, LedgerError> {
        self.chain.with_state(|s, chain_id| {
            Ok(s.source_bridge(chain_id, &bridge)?
                .nonces
                .get(&owner)
                .copied()
                .unwrap_or(U256::ZERO))
        })
    }

    async fn token_uri(
        &self,
        bridge: Address,
        token: Address,
        token_id: U256,
    ) -> Result<TokenUri, LedgerError> {
        self.chain.with_state(|s, chain_id| {
            s.source_bridge(chain_id, &bridge)?;
            s.token(chain_id, &token)?
                .uris
                .get(&token_id)
                .cloned()
                .ok_or_else(|| revert(chain_id, "ERC721: invalid token ID"))
        })
    }

    async fn validator_signature(
        &self,
        bridge: Address,
        owner: Address,
        request_nonce: U256,
    ) -> Result<Option<CompactSignature>, LedgerError> {
        self.chain.with_state(|s, chain_id| {
            Ok(s.source_bridge(chain_id, &bridge)?
                .validator_signatures
                .get(&(owner, request_nonce))
                .copied())
        })
    }

    async fn commit(&self, bridge: Address, call: CommitCall) -> Result<TxReceipt, LedgerError> {
        let sender = self.account;
        let logged = self.chain.with_state(|s, chain_id| {
            let source = s.source_bridge(chain_id, &bridge)?;
            if sender != source.validator {
                return Err(revert(chain_id, "caller is not the validator"));
            }
            let validator = source.validator;
            let current_nonce = source
                .nonces
                .get(&call.token_owner)
                .copied()
                .unwrap_or(U256::ZERO);
            if call.request_nonce != current_nonce {
                return Err(revert(chain_id, "invalid request nonce"));
            }

            let erc721 = s.token(chain_id, &call.from_token)?;
            let owner = erc721
                .owner_of(&call.token_id)
                .ok_or_else(|| revert(chain_id, "ERC721: invalid token ID"))?;
            if owner != call.token_owner {
                return Err(revert(chain_id, "token owner mismatch"));
            }
            if !erc721.is_approved_or_operator(&owner, &bridge, &call.token_id) {
                return Err(revert(chain_id, "bridge is not approved"));
            }
            let token_uri = erc721.uris.get(&call.token_id).cloned().unwrap_or_default();

            let owner_message = OwnerMessage {
                from_chain_id: chain_id,
                from_token: call.from_token,
                from_bridge: bridge,
                to_chain_id: call.destination.to_chain_id,
                to_token: call.destination.to_token,
                to_bridge: call.destination.to_bridge,
                request_nonce: call.request_nonce,
                token_id: call.token_id,
                authn_challenge: call.authn_challenge.clone(),
            };
            if !owner_message.verify(&call.token_owner, &call.owner_signature) {
                return Err(revert(chain_id, "invalid owner signature"));
            }

            let validator_message = ValidatorMessage {
                from_chain_id: chain_id,
                from_token: call.from_token,
                from_bridge: bridge,
                to_chain_id: call.destination.to_chain_id,
                to_token: call.destination.to_token,
                to_bridge: call.destination.to_bridge,
                token_owner: call.token_owner,
                token_id: call.token_id,
                token_uri,
                commitment: call.commitment,
                request_timestamp: call.request_timestamp,
            };
            if !validator_message.verify(&validator, &call.validator_signature) {
                return Err(revert(chain_id, "invalid validator signature"));
            }

            let next_nonce = call
                .request_nonce
                .checked_add(U256::from(1u64))
                .ok_or_else(|| revert(chain_id, "request nonce overflow"))?;

            s.token_mut(chain_id, &call.from_token)?
                .transfer(call.token_id, bridge);
            if let Some(source) = s.source_bridges.get_mut(&bridge) {
                source.nonces.insert(call.token_owner, next_nonce);
                source
                    .validator_signatures
                    .insert((call.token_owner, call.request_nonce), call.validator_signature);
            }

            let receipt = s.mine_tx(chain_id);
            let logged = Logged {
                event: CommitEvent {
                    from_token: call.from_token,
                    to_chain_id: call.destination.to_chain_id,
                    to_token: call.destination.to_token,
                    to_bridge: call.destination.to_bridge,
                    token_owner: call.token_owner,
                    request_nonce: call.request_nonce,
                    token_id: call.token_id,
                    commitment: call.commitment,
                    request_timestamp: call.request_timestamp,
                },
                address: bridge,
                block_number: receipt.block_number,
                tx_hash: receipt.tx_hash,
            };
            s.commit_log.push(logged.clone());
            Ok(logged)
        })?;

        tracing::debug!(
            chain_id = %self.chain_id(),
            owner = %logged.event.token_owner,
            nonce = %logged.event.request_nonce,
            block = logged.block_number,
            "commit mined"
        );
        // No receivers is not an error: nobody is listening.
        let _ = self.chain.inner.commits.send(logged.clone());
        Ok(TxReceipt {
            tx_hash: logged.tx_hash,
            block_number: logged.block_number,
        })
    }

    async fn commit_events(
        &self,
        bridge: Address,
        filter: &CommitFilter,
        range: BlockRange,
    ) -> Result<Vec<Logged<CommitEvent>>, LedgerError> {
        self.chain.with_state(|s, chain_id| {
            s.source_bridge(chain_id, &bridge)?;
            Ok(s.commit_log
                .iter()
                .filter(|l| {
                    l.address == bridge
                        && range.contains(l.block_number)
                        && filter.matches(&l.event)
                })
                .cloned()
                .collect())
        })
    }

    async fn subscribe_commits(
        &self,
        bridge: Address,
        filter: CommitFilter,
    ) -> Result<CommitSubscription, LedgerError> {
        self.chain.with_state(|s, chain_id| {
            s.source_bridge(chain_id, &bridge)?;
            Ok(())
        })?;
        Ok(CommitSubscription::new(
            self.chain_id(),
            bridge,
            filter,
            self.chain.inner.commits.subscribe(),
        ))
    }
}

#[async_trait]
impl DestinationLedger for ChainHandle {
    async fn acquire(
        &self,
        bridge: Address,
        call: AcquireCall,
    ) -> Result<Logged<AcquireEvent>, LedgerError> {
        self.chain.with_state(|s, chain_id| {
            let dest = s
                .destination_bridges
                .get(&bridge)
                .ok_or_else(|| no_contract(chain_id, &bridge))?;
            if dest.used_commitments.contains(&call.commitment) {
                return Err(revert(chain_id, "commitment already used"));
            }
            if !call.commitment.is_opened_by(&call.secret) {
                return Err(revert(chain_id, "secret does not open commitment"));
            }
            let validator_message = ValidatorMessage {
                from_chain_id: call.origin.from_chain_id,
                from_token: call.origin.from_token,
                from_bridge: call.origin.from_bridge,
                to_chain_id: chain_id,
                to_token: dest.token,
                to_bridge: bridge,
                token_owner: call.token_owner,
                token_id: call.old_token.token_id,
                token_uri: call.old_token.token_uri.clone(),
                commitment: call.commitment,
                request_timestamp: call.request_timestamp,
            };
            if !validator_message.verify(&dest.validator, &call.validator_signature) {
                return Err(revert(chain_id, "invalid validator signature"));
            }
            let token = dest.token;

            let new_token_id = s
                .token_mut(chain_id, &token)?
                .mint(call.token_owner, call.old_token.token_uri.clone());
            if let Some(dest) = s.destination_bridges.get_mut(&bridge) {
                dest.used_commitments.insert(call.commitment);
            }

            let receipt = s.mine_tx(chain_id);
            let logged = Logged {
                event: AcquireEvent {
                    origin: call.origin.clone(),
                    token_owner: call.token_owner,
                    old_token_id: call.old_token.token_id,
                    new_token_id,
                    commitment: call.commitment,
                    request_timestamp: call.request_timestamp,
                },
                address: bridge,
                block_number: receipt.block_number,
                tx_hash: receipt.tx_hash,
            };
            s.acquire_log.push(logged.clone());
            Ok(logged)
        })
    }

    async fn acquire_events(
        &self,
        bridge: Address,
        range: BlockRange,
    ) -> Result<Vec<Logged<AcquireEvent>>, LedgerError> {
        self.chain.with_state(|s, chain_id| {
            if !s.destination_bridges.contains_key(&bridge) {
                return Err(no_contract(chain_id, &bridge));
            }
            Ok(s.acquire_log
                .iter()
                .filter(|l| l.address == bridge && range.contains(l.block_number))
                .cloned()
                .collect())
        })
    }
}
