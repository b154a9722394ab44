//! In-memory contract gateway.
//!
//! Implements all three ledger contract surfaces in-process: calendar-day
//! streak transitions, pod membership, and idempotent milestone minting.
//! Used by the test suite and for local development without a node. The
//! semantics mirror the deployed contracts, including the rejection
//! messages the client layer is expected to reinterpret.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use super::{CallRequest, ContractGateway, InvokeRequest};
use crate::catalog;
use crate::codec;
use crate::config::LedgerConfig;
use crate::error::GatewayError;
use crate::progression;
use crate::signer::Signer;

#[derive(Debug, Default, Clone)]
struct BakerState {
    xp: u64,
    streak: u32,
    last_bake: Option<i64>,
    total_bakes: u64,
}

#[derive(Debug, Clone)]
struct PodState {
    id: u64,
    name: String,
    creator: String,
    member_limit: u32,
    target_streak: u32,
    current_streak: u32,
    created_at: i64,
    is_active: bool,
    members: Vec<String>,
    total_bakes: u64,
    /// Per-member UTC date of their last pod bake.
    member_bake_days: HashMap<String, NaiveDate>,
    daily_count_day: Option<NaiveDate>,
    daily_count: u32,
}

#[derive(Debug, Clone)]
struct MintedMilestone {
    definition_id: u32,
    token_id: u64,
    minted_at: i64,
}

#[derive(Debug, Default)]
struct LedgerState {
    bakers: HashMap<String, BakerState>,
    pods: HashMap<u64, PodState>,
    user_pods: HashMap<String, Vec<u64>>,
    pods_created: HashMap<String, u32>,
    minted: HashMap<String, Vec<MintedMilestone>>,
    next_pod_id: u64,
    next_token_id: u64,
    next_tx: u64,
    /// Entrypoint -> remaining transport failures to inject.
    flaky: HashMap<String, u32>,
    /// Logical clock (unix seconds) for mint timestamps and pod "today".
    now: i64,
}

pub struct InMemoryGateway {
    experience_address: String,
    pod_address: String,
    milestone_address: String,
    state: Mutex<LedgerState>,
}

fn day_of(ts: i64) -> Option<NaiveDate> {
    Utc.timestamp_opt(ts, 0).single().map(|dt| dt.date_naive())
}

impl InMemoryGateway {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            experience_address: config.experience_address.clone(),
            pod_address: config.pod_address.clone(),
            milestone_address: config.milestone_address.clone(),
            state: Mutex::new(LedgerState {
                now: Utc::now().timestamp(),
                ..Default::default()
            }),
        }
    }

    /// Pin the ledger clock, for deterministic tests.
    pub async fn set_now(&self, unix_seconds: i64) {
        self.state.lock().await.now = unix_seconds;
    }

    /// Inject `count` transport failures on the next hits of an entrypoint.
    pub async fn fail_next(&self, entrypoint: &str, count: u32) {
        self.state
            .lock()
            .await
            .flaky
            .insert(entrypoint.to_string(), count);
    }

    /// Seed a baker's counters directly, for test setup.
    pub async fn seed_baker(&self, identity: &str, xp: u64, streak: u32, last_bake: Option<i64>, total_bakes: u64) {
        let mut state = self.state.lock().await;
        state.bakers.insert(
            identity.to_string(),
            BakerState {
                xp,
                streak,
                last_bake,
                total_bakes,
            },
        );
    }

    fn take_injected_failure(state: &mut LedgerState, entrypoint: &str) -> Option<GatewayError> {
        if let Some(remaining) = state.flaky.get_mut(entrypoint) {
            if *remaining > 0 {
                *remaining -= 1;
                return Some(GatewayError::Transport(format!(
                    "injected failure on {entrypoint}"
                )));
            }
        }
        None
    }

    fn tx_hash(state: &mut LedgerState) -> String {
        state.next_tx += 1;
        format!("0x{:x}", 0xba4e_0000u64 + state.next_tx)
    }

    fn snapshot_for(state: &LedgerState, identity: &str) -> catalog::StatSnapshot {
        let baker = state.bakers.get(identity).cloned().unwrap_or_default();
        let joined = state.user_pods.get(identity).map(|p| p.len() as u32);
        catalog::StatSnapshot {
            xp: baker.xp,
            streak: baker.streak,
            total_bakes: baker.total_bakes,
            level: progression::level(baker.xp),
            pods_created: Some(state.pods_created.get(identity).copied().unwrap_or(0)),
            pods_joined: Some(joined.unwrap_or(0)),
        }
    }

    fn mint(state: &mut LedgerState, identity: &str, definition_id: u32) -> Result<u64, GatewayError> {
        let owned = state.minted.entry(identity.to_string()).or_default();
        if let Some(existing) = owned.iter().find(|m| m.definition_id == definition_id) {
            return Err(GatewayError::Rejected(format!(
                "milestone {definition_id} already exists for holder: token {:#x}",
                existing.token_id
            )));
        }
        state.next_token_id += 1;
        let token_id = state.next_token_id;
        let minted_at = state.now;
        state
            .minted
            .entry(identity.to_string())
            .or_default()
            .push(MintedMilestone {
                definition_id,
                token_id,
                minted_at,
            });
        Ok(token_id)
    }

    fn experience_call(state: &LedgerState, request: &CallRequest) -> Result<Vec<String>, GatewayError> {
        let user = request
            .calldata
            .first()
            .ok_or_else(|| GatewayError::Rejected("missing user argument".to_string()))?;
        let baker = state.bakers.get(user).cloned().unwrap_or_default();

        match request.entrypoint.as_str() {
            "get_xp" => Ok(vec![codec::encode_u64(baker.xp)]),
            "get_level" => Ok(vec![codec::encode_u64(progression::level(baker.xp) as u64)]),
            "get_streak" => Ok(vec![codec::encode_u64(baker.streak as u64)]),
            "get_total_bakes" => Ok(vec![codec::encode_u64(baker.total_bakes)]),
            "get_last_bake_timestamp" => {
                Ok(vec![codec::encode_i64(baker.last_bake.unwrap_or(0))])
            }
            other => Err(GatewayError::Rejected(format!("unknown entrypoint {other}"))),
        }
    }

    fn pod_call(state: &LedgerState, request: &CallRequest) -> Result<Vec<String>, GatewayError> {
        match request.entrypoint.as_str() {
            "get_pod" => {
                let pod = Self::pod_arg(state, &request.calldata, 0)?;
                Ok(vec![
                    codec::encode_u64(pod.id),
                    codec::encode_short_string(&pod.name),
                    pod.creator.clone(),
                    codec::encode_u64(pod.member_limit as u64),
                    codec::encode_u64(pod.target_streak as u64),
                    codec::encode_u64(pod.current_streak as u64),
                    codec::encode_i64(pod.created_at),
                    codec::encode_bool(pod.is_active),
                ])
            }
            "get_pod_members" => {
                let pod = Self::pod_arg(state, &request.calldata, 0)?;
                Ok(pod.members.clone())
            }
            "get_user_pods" => {
                let user = request
                    .calldata
                    .first()
                    .ok_or_else(|| GatewayError::Rejected("missing user argument".to_string()))?;
                let ids = state.user_pods.get(user).cloned().unwrap_or_default();
                Ok(ids.into_iter().map(codec::encode_u64).collect())
            }
            "get_pod_stats" => {
                let pod = Self::pod_arg(state, &request.calldata, 0)?;
                let today = day_of(state.now);
                let daily = if pod.daily_count_day == today { pod.daily_count } else { 0 };
                Ok(vec![
                    codec::encode_u64(pod.total_bakes),
                    codec::encode_u64(pod.members.len() as u64),
                    codec::encode_u64(daily as u64),
                    codec::encode_u64(pod.current_streak as u64),
                    codec::encode_u64(pod.target_streak as u64),
                    codec::encode_bool(pod.is_active),
                ])
            }
            "has_user_baked_today_in_pod" => {
                let pod = Self::pod_arg(state, &request.calldata, 0)?;
                let user = request
                    .calldata
                    .get(1)
                    .ok_or_else(|| GatewayError::Rejected("missing user argument".to_string()))?;
                let baked = match day_of(state.now) {
                    Some(today) => pod.member_bake_days.get(user).copied() == Some(today),
                    None => false,
                };
                Ok(vec![codec::encode_bool(baked)])
            }
            "check_pod_milestone" => {
                let pod = Self::pod_arg(state, &request.calldata, 0)?;
                let mut reached = Vec::new();
                for threshold in [10u64, 20, 50] {
                    if pod.total_bakes >= threshold {
                        reached.push(codec::encode_short_string(&format!("pod-{threshold}-bakes")));
                    }
                }
                Ok(reached)
            }
            other => Err(GatewayError::Rejected(format!("unknown entrypoint {other}"))),
        }
    }

    fn pod_arg<'a>(
        state: &'a LedgerState,
        calldata: &[String],
        index: usize,
    ) -> Result<&'a PodState, GatewayError> {
        let id = calldata
            .get(index)
            .ok_or_else(|| GatewayError::Rejected("missing pod id".to_string()))
            .and_then(|felt| codec::decode_u64(felt))?;
        state
            .pods
            .get(&id)
            .ok_or_else(|| GatewayError::Rejected(format!("pod {id} does not exist")))
    }

    fn milestone_call(state: &LedgerState, request: &CallRequest) -> Result<Vec<String>, GatewayError> {
        match request.entrypoint.as_str() {
            "get_user_milestones" => {
                let user = request
                    .calldata
                    .first()
                    .ok_or_else(|| GatewayError::Rejected("missing user argument".to_string()))?;
                let mut felts = Vec::new();
                for minted in state.minted.get(user).map(Vec::as_slice).unwrap_or(&[]) {
                    felts.push(codec::encode_u64(minted.definition_id as u64));
                    felts.push(codec::encode_u64(minted.token_id));
                    felts.push(codec::encode_i64(minted.minted_at));
                }
                Ok(felts)
            }
            "has_milestone" => {
                let user = request
                    .calldata
                    .first()
                    .ok_or_else(|| GatewayError::Rejected("missing user argument".to_string()))?;
                let definition_id = request
                    .calldata
                    .get(1)
                    .ok_or_else(|| GatewayError::Rejected("missing definition id".to_string()))
                    .and_then(|felt| codec::decode_u32(felt))?;
                let has = state
                    .minted
                    .get(user)
                    .map(|owned| owned.iter().any(|m| m.definition_id == definition_id))
                    .unwrap_or(false);
                Ok(vec![codec::encode_bool(has)])
            }
            "get_milestone_metadata" => {
                let definition_id = request
                    .calldata
                    .first()
                    .ok_or_else(|| GatewayError::Rejected("missing definition id".to_string()))
                    .and_then(|felt| codec::decode_u32(felt))?;
                let definition = catalog::definition(definition_id).ok_or_else(|| {
                    GatewayError::Rejected(format!("unknown milestone {definition_id}"))
                })?;
                Ok(vec![codec::encode_short_string(definition.name)])
            }
            other => Err(GatewayError::Rejected(format!("unknown entrypoint {other}"))),
        }
    }

    fn experience_invoke(state: &mut LedgerState, request: &InvokeRequest) -> Result<(), GatewayError> {
        match request.entrypoint.as_str() {
            "log_bake" => {
                let user = request
                    .calldata
                    .first()
                    .ok_or_else(|| GatewayError::Rejected("missing user argument".to_string()))?
                    .clone();
                let ts = request
                    .calldata
                    .get(1)
                    .ok_or_else(|| GatewayError::Rejected("missing timestamp".to_string()))
                    .and_then(|felt| codec::decode_i64(felt))?;

                let baker = state.bakers.entry(user).or_default();
                let today = day_of(ts)
                    .ok_or_else(|| GatewayError::Rejected(format!("invalid timestamp {ts}")))?;

                match baker.last_bake.and_then(day_of) {
                    // Same calendar day: refresh the timestamp, count nothing.
                    Some(last_day) if last_day == today => {}
                    Some(last_day) if (today - last_day).num_days() == 1 => {
                        baker.streak += 1;
                        baker.total_bakes += 1;
                    }
                    _ => {
                        baker.streak = 1;
                        baker.total_bakes += 1;
                    }
                }
                baker.last_bake = Some(ts);
                Ok(())
            }
            "add_xp" => {
                let user = request
                    .calldata
                    .first()
                    .ok_or_else(|| GatewayError::Rejected("missing user argument".to_string()))?
                    .clone();
                let amount = request
                    .calldata
                    .get(1)
                    .ok_or_else(|| GatewayError::Rejected("missing amount".to_string()))
                    .and_then(|felt| codec::decode_u64(felt))?;
                state.bakers.entry(user).or_default().xp += amount;
                Ok(())
            }
            other => Err(GatewayError::Rejected(format!("unknown entrypoint {other}"))),
        }
    }

    fn pod_invoke(state: &mut LedgerState, request: &InvokeRequest) -> Result<(), GatewayError> {
        let sender = request.sender.clone();
        match request.entrypoint.as_str() {
            "create_pod" => {
                let name = request
                    .calldata
                    .first()
                    .ok_or_else(|| GatewayError::Rejected("missing pod name".to_string()))
                    .and_then(|felt| codec::decode_short_string(felt))?;
                let target_streak = request
                    .calldata
                    .get(1)
                    .ok_or_else(|| GatewayError::Rejected("missing target streak".to_string()))
                    .and_then(|felt| codec::decode_u32(felt))?;
                let member_limit = request
                    .calldata
                    .get(2)
                    .ok_or_else(|| GatewayError::Rejected("missing member limit".to_string()))
                    .and_then(|felt| codec::decode_u32(felt))?;

                state.next_pod_id += 1;
                let id = state.next_pod_id;
                let created_at = state.now;
                state.pods.insert(
                    id,
                    PodState {
                        id,
                        name,
                        creator: sender.clone(),
                        member_limit,
                        target_streak,
                        current_streak: 0,
                        created_at,
                        is_active: true,
                        members: vec![sender.clone()],
                        total_bakes: 0,
                        member_bake_days: HashMap::new(),
                        daily_count_day: None,
                        daily_count: 0,
                    },
                );
                state.user_pods.entry(sender.clone()).or_default().push(id);
                *state.pods_created.entry(sender).or_default() += 1;
                Ok(())
            }
            "join_pod" => {
                let id = Self::pod_id_arg(&request.calldata)?;
                let pod = state
                    .pods
                    .get_mut(&id)
                    .ok_or_else(|| GatewayError::Rejected(format!("pod {id} does not exist")))?;
                if pod.members.contains(&sender) {
                    return Err(GatewayError::Rejected(format!(
                        "caller is already a member of pod {id}"
                    )));
                }
                if pod.members.len() as u32 >= pod.member_limit {
                    return Err(GatewayError::Rejected(format!("pod {id} is full")));
                }
                pod.members.push(sender.clone());
                state.user_pods.entry(sender).or_default().push(id);
                Ok(())
            }
            "leave_pod" => {
                let id = Self::pod_id_arg(&request.calldata)?;
                let pod = state
                    .pods
                    .get_mut(&id)
                    .ok_or_else(|| GatewayError::Rejected(format!("pod {id} does not exist")))?;
                pod.members.retain(|m| m != &sender);
                if let Some(joined) = state.user_pods.get_mut(&sender) {
                    joined.retain(|p| *p != id);
                }
                Ok(())
            }
            "log_pod_bake" => {
                let id = Self::pod_id_arg(&request.calldata)?;
                let now = state.now;
                let pod = state
                    .pods
                    .get_mut(&id)
                    .ok_or_else(|| GatewayError::Rejected(format!("pod {id} does not exist")))?;
                if !pod.members.contains(&sender) {
                    return Err(GatewayError::Rejected(format!(
                        "caller is not a member of pod {id}"
                    )));
                }
                let today = day_of(now)
                    .ok_or_else(|| GatewayError::Rejected(format!("invalid timestamp {now}")))?;

                pod.total_bakes += 1;
                if pod.daily_count_day != Some(today) {
                    pod.daily_count_day = Some(today);
                    pod.daily_count = 0;
                }
                pod.daily_count += 1;
                pod.member_bake_days.insert(sender, today);

                // The pod streak advances on the first day every member baked.
                let everyone = pod
                    .members
                    .iter()
                    .all(|m| pod.member_bake_days.get(m) == Some(&today));
                if everyone && pod.daily_count == pod.members.len() as u32 {
                    pod.current_streak += 1;
                }
                Ok(())
            }
            other => Err(GatewayError::Rejected(format!("unknown entrypoint {other}"))),
        }
    }

    fn pod_id_arg(calldata: &[String]) -> Result<u64, GatewayError> {
        calldata
            .first()
            .ok_or_else(|| GatewayError::Rejected("missing pod id".to_string()))
            .and_then(|felt| codec::decode_u64(felt))
    }

    fn milestone_invoke(state: &mut LedgerState, request: &InvokeRequest) -> Result<(), GatewayError> {
        match request.entrypoint.as_str() {
            "mint_milestone" => {
                let user = request
                    .calldata
                    .first()
                    .ok_or_else(|| GatewayError::Rejected("missing user argument".to_string()))?
                    .clone();
                let definition_id = request
                    .calldata
                    .get(1)
                    .ok_or_else(|| GatewayError::Rejected("missing definition id".to_string()))
                    .and_then(|felt| codec::decode_u32(felt))?;
                if catalog::definition(definition_id).is_none() {
                    return Err(GatewayError::Rejected(format!(
                        "unknown milestone {definition_id}"
                    )));
                }
                Self::mint(state, &user, definition_id)?;
                Ok(())
            }
            "check_and_mint_eligible" => {
                let user = request
                    .calldata
                    .first()
                    .ok_or_else(|| GatewayError::Rejected("missing user argument".to_string()))?
                    .clone();
                let stats = Self::snapshot_for(state, &user);
                for definition in catalog::all() {
                    if !catalog::qualifies(definition, &stats) {
                        continue;
                    }
                    let already = state
                        .minted
                        .get(&user)
                        .map(|owned| owned.iter().any(|m| m.definition_id == definition.id))
                        .unwrap_or(false);
                    if !already {
                        // Infallible here: the existence check just ran.
                        let _ = Self::mint(state, &user, definition.id);
                        debug!(user = %user, definition = definition.id, "minted eligible milestone");
                    }
                }
                Ok(())
            }
            other => Err(GatewayError::Rejected(format!("unknown entrypoint {other}"))),
        }
    }
}

#[async_trait]
impl ContractGateway for InMemoryGateway {
    async fn call(&self, request: CallRequest) -> Result<Vec<String>, GatewayError> {
        let mut state = self.state.lock().await;
        if let Some(failure) = Self::take_injected_failure(&mut state, &request.entrypoint) {
            return Err(failure);
        }

        if request.contract == self.experience_address {
            Self::experience_call(&state, &request)
        } else if request.contract == self.pod_address {
            Self::pod_call(&state, &request)
        } else if request.contract == self.milestone_address {
            Self::milestone_call(&state, &request)
        } else {
            Err(GatewayError::Rejected(format!(
                "no contract at {}",
                request.contract
            )))
        }
    }

    async fn invoke(&self, request: InvokeRequest, _signer: &Signer) -> Result<String, GatewayError> {
        let mut state = self.state.lock().await;
        if let Some(failure) = Self::take_injected_failure(&mut state, &request.entrypoint) {
            return Err(failure);
        }

        if request.contract == self.experience_address {
            Self::experience_invoke(&mut state, &request)?;
        } else if request.contract == self.pod_address {
            Self::pod_invoke(&mut state, &request)?;
        } else if request.contract == self.milestone_address {
            Self::milestone_invoke(&mut state, &request)?;
        } else {
            return Err(GatewayError::Rejected(format!(
                "no contract at {}",
                request.contract
            )));
        }
        Ok(Self::tx_hash(&mut state))
    }
}
