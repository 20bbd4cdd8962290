//! Withdrawal requests.
//!
//! A request debits the balance and is queued as `pending`; settling it is
//! somebody else's job.

use super::Economy;
use crate::error::GameError;
use crate::events::{at, Event};
use crate::player::{PlayerRecord, WithdrawalRequest, WithdrawalStatus};

impl Economy {
    pub fn request_withdrawal(
        &self,
        record: &PlayerRecord,
        amount: f64,
        destination: &str,
        network: &str,
        now_ms: u64,
    ) -> Result<(PlayerRecord, WithdrawalRequest, Event), GameError> {
        if !(amount.is_finite() && amount > 0.0) {
            return Err(GameError::InvalidAmount(format!(
                "withdrawal amount must be positive, got {amount}"
            )));
        }
        if amount < self.config.min_withdrawal {
            return Err(GameError::InvalidWithdrawal(format!(
                "minimum withdrawal is {}",
                self.config.min_withdrawal
            )));
        }
        let destination = destination.trim();
        if destination.is_empty() {
            return Err(GameError::InvalidWithdrawal("destination address is empty".into()));
        }
        let network = self
            .config
            .withdrawal_networks
            .iter()
            .find(|n| n.eq_ignore_ascii_case(network.trim()))
            .ok_or_else(|| {
                GameError::InvalidWithdrawal(format!(
                    "unsupported network '{network}' (expected one of {})",
                    self.config.withdrawal_networks.join(", ")
                ))
            })?;
        if !record.can_afford(amount) {
            return Err(GameError::InsufficientBalance {
                required: amount,
                available: record.balance,
            });
        }

        let request = WithdrawalRequest {
            id: uuid::Uuid::new_v4().to_string(),
            amount,
            destination: destination.to_string(),
            network: network.clone(),
            status: WithdrawalStatus::Pending,
            requested_at_ms: now_ms,
        };
        let mut next = record.clone();
        next.balance -= amount;
        next.transactions.push(request.clone());

        tracing::info!(user_id = %next.user_id, request_id = %request.id, amount, network = %request.network, "withdrawal requested");
        let event = Event::WithdrawalRequested {
            request_id: request.id.clone(),
            amount,
            network: request.network.clone(),
            balance: next.balance,
            at: at(now_ms),
        };
        Ok((next, request, event))
    }
}
