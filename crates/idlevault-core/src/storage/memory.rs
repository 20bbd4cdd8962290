//! In-process store, for tests and embedding.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::database::LeaderboardEntry;
use super::{merge_fields, Fields, PlayerStore, WithdrawalSink};
use crate::error::StorageError;
use crate::player::{PlayerRecord, WithdrawalRequest, WithdrawalStatus};

/// Mutex-guarded map of player records. A transaction holds the lock for
/// its whole read-modify-write, so concurrent transactions serialise.
#[derive(Default)]
pub struct MemoryStore {
    players: Mutex<HashMap<String, PlayerRecord>>,
    withdrawals: Mutex<Vec<(String, WithdrawalRequest)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn players(&self) -> Result<MutexGuard<'_, HashMap<String, PlayerRecord>>, StorageError> {
        self.players.lock().map_err(|_| StorageError::Locked)
    }

    fn withdrawals(
        &self,
    ) -> Result<MutexGuard<'_, Vec<(String, WithdrawalRequest)>>, StorageError> {
        self.withdrawals.lock().map_err(|_| StorageError::Locked)
    }
}

impl PlayerStore for MemoryStore {
    fn get(&self, user_id: &str) -> Result<Option<PlayerRecord>, StorageError> {
        Ok(self.players()?.get(user_id).cloned())
    }

    fn set(&self, user_id: &str, record: &PlayerRecord) -> Result<(), StorageError> {
        self.players()?.insert(user_id.to_string(), record.clone());
        Ok(())
    }

    fn update(&self, user_id: &str, fields: &Fields) -> Result<(), StorageError> {
        let mut players = self.players()?;
        let current = players
            .get(user_id)
            .ok_or_else(|| StorageError::NotFound(user_id.to_string()))?;
        let next = merge_fields(user_id, current, fields)?;
        players.insert(user_id.to_string(), next);
        Ok(())
    }

    fn transaction(
        &self,
        user_id: &str,
        f: &mut dyn FnMut(Option<PlayerRecord>) -> Option<PlayerRecord>,
    ) -> Result<Option<PlayerRecord>, StorageError> {
        let mut players = self.players()?;
        let next = f(players.get(user_id).cloned());
        if let Some(ref record) = next {
            players.insert(user_id.to_string(), record.clone());
        }
        Ok(next)
    }

    fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StorageError> {
        let players = self.players()?;
        let mut all: Vec<&PlayerRecord> = players.values().collect();
        all.sort_by(|a, b| {
            b.balance
                .total_cmp(&a.balance)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        Ok(all
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(i, r)| LeaderboardEntry {
                rank: i + 1,
                user_id: r.user_id.clone(),
                display_name: r.display_name.clone(),
                balance: r.balance,
            })
            .collect())
    }
}

impl WithdrawalSink for MemoryStore {
    fn queue_withdrawal(
        &self,
        user_id: &str,
        request: &WithdrawalRequest,
        f: &mut dyn FnMut(Option<PlayerRecord>) -> Option<PlayerRecord>,
    ) -> Result<Option<PlayerRecord>, StorageError> {
        // Lock order: players, then withdrawals.
        let mut players = self.players()?;
        let mut withdrawals = self.withdrawals()?;
        let next = f(players.get(user_id).cloned());
        if let Some(ref record) = next {
            players.insert(user_id.to_string(), record.clone());
            withdrawals.push((user_id.to_string(), request.clone()));
        }
        Ok(next)
    }

    fn pending_withdrawals(&self) -> Result<Vec<(String, WithdrawalRequest)>, StorageError> {
        Ok(self
            .withdrawals()?
            .iter()
            .filter(|(_, r)| r.status == WithdrawalStatus::Pending)
            .cloned()
            .collect())
    }
}
