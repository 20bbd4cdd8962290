//! A player's session: identity, persistence, and the economy glued together.
//!
//! The session owns the current record. Each action runs the matching pure
//! economy function, writes the result back through a store transaction, and
//! publishes it on a watch channel for the ticker. The write folds in referral
//! credits that landed on the stored record after this session last saw it.

use tokio::sync::watch;

use crate::economy::{Economy, Snapshot, UpgradeOffer};
use crate::error::{CoreError, GameError, Result, StorageError};
use crate::events::{at, Event};
use crate::player::{PlayerRecord, WithdrawalRequest};
use crate::storage::{merge_fields, Fields, PlayerStore, WithdrawalSink};

/// Who is playing, as reported by the host environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub referrer_id: Option<String>,
}

impl Identity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: String::new(),
            avatar_url: None,
            referrer_id: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_avatar_url(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }

    pub fn with_referrer(mut self, referrer_id: impl Into<String>) -> Self {
        self.referrer_id = Some(referrer_id.into());
        self
    }
}

pub struct Session<S> {
    store: S,
    economy: Economy,
    record: PlayerRecord,
    updates: watch::Sender<PlayerRecord>,
}

impl<S: PlayerStore + WithdrawalSink> Session<S> {
    /// Load or create the player record for `identity`.
    ///
    /// Returns the session and the events produced while starting it
    /// (`PlayerCreated`, and `ReferralCredited` when a referrer was paid).
    ///
    /// # Errors
    /// A missing or blank identity and an unreachable store are both fatal.
    pub fn start(
        store: S,
        economy: Economy,
        identity: Option<Identity>,
        now_ms: u64,
    ) -> Result<(Self, Vec<Event>)> {
        let identity = identity
            .filter(|i| !i.user_id.trim().is_empty())
            .ok_or(CoreError::MissingIdentity)?;
        let user_id = identity.user_id.trim().to_string();

        let mut events = Vec::new();
        let record = match store.get(&user_id)? {
            Some(stored) => {
                let record = economy.normalize(&stored);
                if record != stored {
                    store.set(&user_id, &record)?;
                }
                refresh_profile(&store, record, &identity)?
            }
            None => {
                let referrer = economy
                    .valid_referrer(&user_id, identity.referrer_id.as_deref())
                    .filter(|r| referrer_exists(&store, r));
                let mut record =
                    economy.new_player(&user_id, &identity.display_name, referrer, now_ms);
                record.avatar_url = identity.avatar_url.clone();
                store.set(&user_id, &record)?;
                tracing::info!(user_id = %user_id, referred_by = ?record.referred_by, "player created");
                events.push(economy.player_created(&record));

                if let Some(referrer_id) = record.referred_by.as_deref() {
                    match credit_referrer(&store, &economy, referrer_id, &user_id, now_ms) {
                        Ok(Some(event)) => events.push(event),
                        Ok(None) => {
                            tracing::warn!(referrer_id, user_id = %user_id, "referrer vanished; bonus skipped")
                        }
                        Err(e) => {
                            tracing::warn!(referrer_id, user_id = %user_id, "referral bonus failed: {e}")
                        }
                    }
                }
                record
            }
        };

        let (updates, _) = watch::channel(record.clone());
        let session = Self {
            store,
            economy,
            record,
            updates,
        };
        Ok((session, events))
    }

    pub fn record(&self) -> &PlayerRecord {
        &self.record
    }

    pub fn economy(&self) -> &Economy {
        &self.economy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Receiver that always holds the latest committed record.
    pub fn subscribe(&self) -> watch::Receiver<PlayerRecord> {
        self.updates.subscribe()
    }

    pub fn snapshot(&self, now_ms: u64) -> Snapshot {
        self.economy.snapshot(&self.record, now_ms)
    }

    pub fn upgrade_offers(&self) -> Vec<UpgradeOffer> {
        self.economy.upgrade_offers(&self.record)
    }

    pub fn claim_vault(&mut self, now_ms: u64) -> Result<Event> {
        let outcome = self.economy.claim_vault(&self.record, now_ms);
        self.commit(outcome)
    }

    pub fn buy_upgrade(&mut self, upgrade_id: &str, now_ms: u64) -> Result<Event> {
        let outcome = self.economy.buy_upgrade(&self.record, upgrade_id, now_ms);
        self.commit(outcome)
    }

    pub fn tap(&mut self, count: u32, now_ms: u64) -> Result<Event> {
        let outcome = self.economy.tap(&self.record, count, now_ms);
        self.commit(outcome)
    }

    pub fn claim_daily(&mut self, now_ms: u64) -> Result<Event> {
        let outcome = self.economy.claim_daily(&self.record, now_ms);
        self.commit(outcome)
    }

    pub fn activate_boost(&mut self, boost_id: &str, now_ms: u64) -> Result<Event> {
        let outcome = self.economy.activate_boost(&self.record, boost_id, now_ms);
        self.commit(outcome)
    }

    /// Debit the balance and queue the request for external processing.
    ///
    /// The record write and the queue entry commit together or not at all.
    pub fn request_withdrawal(
        &mut self,
        amount: f64,
        destination: &str,
        network: &str,
        now_ms: u64,
    ) -> Result<(WithdrawalRequest, Event)> {
        let (next, request, event) =
            self.economy
                .request_withdrawal(&self.record, amount, destination, network, now_ms)?;
        let base = &self.record;
        let committed = self.store.queue_withdrawal(&next.user_id, &request, &mut |current| {
            Some(rebase(base, &next, current))
        })?;
        let event = self.publish(&next.user_id, committed, event)?;
        Ok((request, event))
    }

    fn commit(&mut self, outcome: std::result::Result<(PlayerRecord, Event), GameError>) -> Result<Event> {
        let (next, event) = outcome?;
        let base = &self.record;
        let committed = self
            .store
            .transaction(&next.user_id, &mut |current| Some(rebase(base, &next, current)))?;
        self.publish(&next.user_id, committed, event)
    }

    fn publish(
        &mut self,
        user_id: &str,
        committed: Option<PlayerRecord>,
        event: Event,
    ) -> Result<Event> {
        let record = committed.ok_or_else(|| StorageError::NotFound(user_id.to_string()))?;
        if record.referral_count != self.record.referral_count {
            let referral_count = record.referral_count;
            tracing::debug!(user_id, referral_count, "picked up referral credits");
        }
        let event = event.with_balance(record.balance);
        self.record = record;
        self.updates.send_replace(self.record.clone());
        Ok(event)
    }
}

/// Carry credits other writers added since `base` onto `next`.
///
/// Referral credits are the only writes another player makes to this record.
/// They raise `balance` and `referral_count` and nothing else.
fn rebase(base: &PlayerRecord, next: &PlayerRecord, current: Option<PlayerRecord>) -> PlayerRecord {
    let mut merged = next.clone();
    if let Some(current) = current {
        let credited = current.referral_count.saturating_sub(base.referral_count);
        merged.referral_count = merged.referral_count.saturating_add(credited);
        merged.balance += current.balance - base.balance;
    }
    merged
}

/// Push changed profile fields from the identity provider into the store.
fn refresh_profile<S: PlayerStore>(
    store: &S,
    record: PlayerRecord,
    identity: &Identity,
) -> Result<PlayerRecord> {
    let mut fields = Fields::new();
    if !identity.display_name.is_empty() && identity.display_name != record.display_name {
        fields.insert("display_name".into(), identity.display_name.clone().into());
    }
    if identity.avatar_url.is_some() && identity.avatar_url != record.avatar_url {
        fields.insert("avatar_url".into(), identity.avatar_url.clone().into());
    }
    if fields.is_empty() {
        return Ok(record);
    }

    store.update(&record.user_id, &fields)?;
    Ok(merge_fields(&record.user_id, &record, &fields)?)
}

/// Unknown referrers earn nobody a bonus. A failed lookup counts as unknown.
fn referrer_exists<S: PlayerStore>(store: &S, referrer_id: &str) -> bool {
    match store.get(referrer_id) {
        Ok(found) => {
            if found.is_none() {
                tracing::warn!(referrer_id, "referrer not found; ignoring referral");
            }
            found.is_some()
        }
        Err(e) => {
            tracing::warn!(referrer_id, "referrer lookup failed: {e}");
            false
        }
    }
}

/// Pay the referrer inside a store transaction.
///
/// Returns `Ok(None)` when the referrer has no record.
fn credit_referrer<S: PlayerStore>(
    store: &S,
    economy: &Economy,
    referrer_id: &str,
    invitee_id: &str,
    now_ms: u64,
) -> Result<Option<Event>> {
    let committed = store.transaction(referrer_id, &mut |current| {
        current.map(|r| economy.credit_referrer(&r))
    })?;
    Ok(committed.map(|r| {
        tracing::info!(referrer_id, invitee_id, referral_count = r.referral_count, "referral credited");
        Event::ReferralCredited {
            referrer_id: referrer_id.to_string(),
            invitee_id: invitee_id.to_string(),
            bonus: economy.config().referrer_bonus,
            referral_count: r.referral_count,
            at: at(now_ms),
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::EconomyConfig;
    use crate::storage::{LeaderboardEntry, MemoryStore};
    use std::sync::Arc;

    const HOUR_MS: u64 = 3_600_000;

    fn economy() -> Economy {
        Economy::new(EconomyConfig::default()).unwrap()
    }

    type StoreResult<T> = std::result::Result<T, StorageError>;

    /// One in-process store behind several sessions. With `queue_down` set,
    /// every withdrawal write fails.
    #[derive(Clone, Default)]
    struct Shared {
        inner: Arc<MemoryStore>,
        queue_down: bool,
    }

    impl PlayerStore for Shared {
        fn get(&self, user_id: &str) -> StoreResult<Option<PlayerRecord>> {
            self.inner.get(user_id)
        }

        fn set(&self, user_id: &str, record: &PlayerRecord) -> StoreResult<()> {
            self.inner.set(user_id, record)
        }

        fn update(&self, user_id: &str, fields: &Fields) -> StoreResult<()> {
            self.inner.update(user_id, fields)
        }

        fn transaction(
            &self,
            user_id: &str,
            f: &mut dyn FnMut(Option<PlayerRecord>) -> Option<PlayerRecord>,
        ) -> StoreResult<Option<PlayerRecord>> {
            self.inner.transaction(user_id, f)
        }

        fn leaderboard(&self, limit: usize) -> StoreResult<Vec<LeaderboardEntry>> {
            self.inner.leaderboard(limit)
        }
    }

    impl WithdrawalSink for Shared {
        fn queue_withdrawal(
            &self,
            user_id: &str,
            request: &WithdrawalRequest,
            f: &mut dyn FnMut(Option<PlayerRecord>) -> Option<PlayerRecord>,
        ) -> StoreResult<Option<PlayerRecord>> {
            if self.queue_down {
                return Err(StorageError::Locked);
            }
            self.inner.queue_withdrawal(user_id, request, f)
        }

        fn pending_withdrawals(&self) -> StoreResult<Vec<(String, WithdrawalRequest)>> {
            self.inner.pending_withdrawals()
        }
    }

    #[test]
    fn missing_identity_is_fatal() {
        let err = Session::start(MemoryStore::new(), economy(), None, 0).err().unwrap();
        assert!(matches!(err, CoreError::MissingIdentity));

        let blank = Identity::new("   ");
        let err = Session::start(MemoryStore::new(), economy(), Some(blank), 0).err().unwrap();
        assert!(matches!(err, CoreError::MissingIdentity));
    }

    #[test]
    fn first_sight_creates_and_persists() {
        let (session, events) = Session::start(
            MemoryStore::new(),
            economy(),
            Some(Identity::new("u1").with_display_name("Test User")),
            0,
        )
        .unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Event::PlayerCreated { .. }));
        let stored = session.store().get("u1").unwrap().unwrap();
        assert_eq!(stored.display_name, "Test User");
        assert_eq!(&stored, session.record());
    }

    #[test]
    fn rejected_action_leaves_store_untouched() {
        let (mut session, _) =
            Session::start(MemoryStore::new(), economy(), Some(Identity::new("u1")), 0).unwrap();
        let before = session.record().clone();
        let err = session.buy_upgrade("quantum-comp", HOUR_MS).unwrap_err();
        assert!(matches!(err, CoreError::Game(GameError::InsufficientBalance { .. })));
        assert_eq!(session.record(), &before);
        assert_eq!(session.store().get("u1").unwrap().unwrap(), before);
    }

    #[test]
    fn actions_publish_latest_record() {
        let (mut session, _) =
            Session::start(MemoryStore::new(), economy(), Some(Identity::new("u1")), 0).unwrap();
        let rx = session.subscribe();
        session.claim_vault(2 * HOUR_MS).unwrap();
        assert_eq!(rx.borrow().last_claim_ms, 2 * HOUR_MS);
        assert!((rx.borrow().balance - 1010.0).abs() < 1e-9);
    }

    #[test]
    fn withdrawal_lands_in_global_queue() {
        let store = MemoryStore::new();
        let (mut session, _) =
            Session::start(store, economy(), Some(Identity::new("u1")), 0).unwrap();
        let (request, _) = session.request_withdrawal(1000.0, "UQabc", "TON", 5).unwrap();
        assert_eq!(session.record().balance, 0.0);
        let pending = session.store().pending_withdrawals().unwrap();
        assert_eq!(pending, vec![("u1".to_string(), request)]);
    }

    #[test]
    fn failed_withdrawal_write_keeps_balance() {
        let store = Shared {
            queue_down: true,
            ..Shared::default()
        };
        let (mut session, _) =
            Session::start(store, economy(), Some(Identity::new("u1")), 0).unwrap();
        let err = session.request_withdrawal(1000.0, "UQabc", "TON", 5).unwrap_err();
        assert!(matches!(err, CoreError::Storage(StorageError::Locked)));

        assert_eq!(session.record().balance, 1000.0);
        assert!(session.record().transactions.is_empty());
        let stored = session.store().get("u1").unwrap().unwrap();
        assert_eq!(stored.balance, 1000.0);
        assert!(stored.transactions.is_empty());
        assert!(session.store().pending_withdrawals().unwrap().is_empty());
    }

    #[test]
    fn open_referrer_session_keeps_credit() {
        let store = Shared::default();
        let (mut referrer, _) =
            Session::start(store.clone(), economy(), Some(Identity::new("r")), 0).unwrap();
        let rx = referrer.subscribe();

        Session::start(store.clone(), economy(), Some(Identity::new("u1").with_referrer("r")), 10)
            .unwrap();
        let credited = store.get("r").unwrap().unwrap();
        assert_eq!(credited.balance, 2000.0);
        assert_eq!(credited.referral_count, 1);

        let event = referrer.claim_vault(2 * HOUR_MS).unwrap();
        let stored = store.get("r").unwrap().unwrap();
        assert_eq!(stored.referral_count, 1);
        assert!((stored.balance - 2010.0).abs() < 1e-9);
        assert_eq!(referrer.record(), &stored);
        assert_eq!(&*rx.borrow(), &stored);
        match event {
            Event::VaultClaimed { balance, .. } => assert!((balance - 2010.0).abs() < 1e-9),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn returning_player_profile_is_refreshed() {
        let store = MemoryStore::new();
        let eco = economy();
        store.set("u1", &eco.new_player("u1", "Old", None, 0)).unwrap();
        let (session, events) = Session::start(
            store,
            eco,
            Some(Identity::new("u1").with_display_name("New").with_avatar_url("https://a/b.png")),
            HOUR_MS,
        )
        .unwrap();
        assert!(events.is_empty());
        let stored = session.store().get("u1").unwrap().unwrap();
        assert_eq!(stored.display_name, "New");
        assert_eq!(stored.avatar_url.as_deref(), Some("https://a/b.png"));
        assert_eq!(stored.last_claim_ms, 0);
    }

    #[test]
    fn referral_pays_both_sides() {
        let store = MemoryStore::new();
        let eco = economy();
        store.set("r", &eco.new_player("r", "Ref", None, 0)).unwrap();
        let (session, events) = Session::start(
            store,
            eco,
            Some(Identity::new("u1").with_referrer("r")),
            10,
        )
        .unwrap();
        assert_eq!(session.record().balance, 1100.0);
        assert!(matches!(
            &events[1],
            Event::ReferralCredited { referrer_id, referral_count: 1, .. } if referrer_id == "r"
        ));
        let referrer = session.store().get("r").unwrap().unwrap();
        assert_eq!(referrer.balance, 2000.0);
        assert_eq!(referrer.referral_count, 1);
    }

    #[test]
    fn unknown_referrer_earns_no_bonus() {
        let (session, events) = Session::start(
            MemoryStore::new(),
            economy(),
            Some(Identity::new("u1").with_referrer("ghost")),
            0,
        )
        .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(session.record().balance, 1000.0);
        assert!(session.record().referred_by.is_none());
        assert!(session.store().get("ghost").unwrap().is_none());
    }
}
