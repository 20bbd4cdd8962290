//! Referral bonuses.

use super::Economy;
use crate::player::PlayerRecord;

impl Economy {
    /// Referrer id worth honouring for `user_id`: present and not the user themselves.
    pub fn valid_referrer<'a>(&self, user_id: &str, referrer_id: Option<&'a str>) -> Option<&'a str> {
        referrer_id
            .map(str::trim)
            .filter(|r| !r.is_empty() && *r != user_id)
    }

    /// Referrer's record after one more completed signup.
    ///
    /// Meant to run inside a store transaction: concurrent signups must each
    /// see the previous credit.
    pub fn credit_referrer(&self, referrer: &PlayerRecord) -> PlayerRecord {
        let mut next = referrer.clone();
        next.balance += self.config.referrer_bonus;
        next.referral_count = next.referral_count.saturating_add(1);
        next
    }
}
