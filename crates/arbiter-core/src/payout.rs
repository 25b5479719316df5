//! Bond floors and settlement arithmetic.
//!
//! All percentage math truncates: `amount × bps / 10000` and
//! `amount × pct / 100`. Every settlement pays out exactly
//! `fee + agent_bond + challenger_bond`; overflow is an error, never a wrap.

use arbiter_state::{AccountId, Amount, Credit};

use crate::config::{ProtocolConfig, BPS_DENOMINATOR, PCT_DENOMINATOR};
use crate::domain::{ArbiterError, Result, Task};

/// `amount × bps / 10000`, floored.
pub fn apply_bps(amount: Amount, bps: u32) -> Result<Amount> {
    amount
        .checked_mul(u128::from(bps))
        .map(|v| v / BPS_DENOMINATOR)
        .ok_or(ArbiterError::Overflow("basis-point share"))
}

/// `amount × pct / 100`, floored.
pub fn apply_pct(amount: Amount, pct: u32) -> Result<Amount> {
    amount
        .checked_mul(u128::from(pct))
        .map(|v| v / PCT_DENOMINATOR)
        .ok_or(ArbiterError::Overflow("percentage share"))
}

/// Smallest agent bond accepted for a task with this fee.
pub fn min_agent_bond(fee: Amount, config: &ProtocolConfig) -> Result<Amount> {
    apply_bps(fee, config.min_bond_fee_bps)
}

/// Smallest challenger bond accepted against this agent bond.
pub fn min_challenger_bond(agent_bond: Amount, config: &ProtocolConfig) -> Result<Amount> {
    apply_pct(agent_bond, config.challenger_bond_multiplier_pct)
}

/// Escrowed amounts of one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pool {
    pub fee: Amount,
    pub agent_bond: Amount,
    pub challenger_bond: Amount,
}

impl Pool {
    pub fn of(task: &Task) -> Self {
        Self {
            fee: task.fee,
            agent_bond: task.agent_bond,
            challenger_bond: task.challenger_bond,
        }
    }

    pub fn total(&self) -> Result<Amount> {
        self.fee
            .checked_add(self.agent_bond)
            .and_then(|v| v.checked_add(self.challenger_bond))
            .ok_or(ArbiterError::Overflow("escrow pool"))
    }
}

/// Credits for one terminal transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payout {
    /// Zero-amount credits are omitted.
    pub credits: Vec<Credit>,
    pub winner_payout: Amount,
    pub protocol_fee: Amount,
    pub client_refund: Amount,
}

impl Payout {
    fn new(
        winner: &AccountId,
        winner_payout: Amount,
        treasury: Option<(&AccountId, Amount)>,
        client: Option<(&AccountId, Amount)>,
    ) -> Self {
        let mut credits = Vec::with_capacity(3);
        let mut push = |to: &AccountId, amount: Amount| {
            if amount > 0 {
                credits.push(Credit::new(to.clone(), amount));
            }
        };
        push(winner, winner_payout);
        let protocol_fee = treasury.map(|(_, fee)| fee).unwrap_or(0);
        if let Some((account, amount)) = treasury {
            push(account, amount);
        }
        let client_refund = client.map(|(_, refund)| refund).unwrap_or(0);
        if let Some((account, amount)) = client {
            push(account, amount);
        }
        Self {
            credits,
            winner_payout,
            protocol_fee,
            client_refund,
        }
    }

    pub fn total(&self) -> Amount {
        self.credits
            .iter()
            .fold(0u128, |acc, c| acc.saturating_add(c.amount))
    }
}

/// Agent proven right: `A + C − ρ·C + F` to the agent, `ρ·C` to the treasury.
pub fn agent_wins(
    pool: Pool,
    agent_owner: &AccountId,
    treasury: &AccountId,
    protocol_fee_bps: u32,
) -> Result<Payout> {
    let protocol_fee = apply_bps(pool.challenger_bond, protocol_fee_bps)?;
    let payout = pool
        .challenger_bond
        .checked_sub(protocol_fee)
        .and_then(|v| v.checked_add(pool.agent_bond))
        .and_then(|v| v.checked_add(pool.fee))
        .ok_or(ArbiterError::Overflow("agent payout"))?;
    Ok(Payout::new(
        agent_owner,
        payout,
        Some((treasury, protocol_fee)),
        None,
    ))
}

/// Challenger proven right: `C + A − ρ·A` to the challenger, `F` back to the
/// client, `ρ·A` to the treasury.
pub fn challenger_wins(
    pool: Pool,
    challenger: &AccountId,
    client: &AccountId,
    treasury: &AccountId,
    protocol_fee_bps: u32,
) -> Result<Payout> {
    let protocol_fee = apply_bps(pool.agent_bond, protocol_fee_bps)?;
    let payout = pool
        .agent_bond
        .checked_sub(protocol_fee)
        .and_then(|v| v.checked_add(pool.challenger_bond))
        .ok_or(ArbiterError::Overflow("challenger payout"))?;
    Ok(Payout::new(
        challenger,
        payout,
        Some((treasury, protocol_fee)),
        Some((client, pool.fee)),
    ))
}

/// Window closed without a dispute: `A + F` to the agent.
pub fn unchallenged(pool: Pool, agent_owner: &AccountId) -> Result<Payout> {
    let payout = pool
        .agent_bond
        .checked_add(pool.fee)
        .ok_or(ArbiterError::Overflow("claim payout"))?;
    Ok(Payout::new(agent_owner, payout, None, None))
}

/// Agent never published: `F + A` to the client.
pub fn expired(pool: Pool, client: &AccountId) -> Result<Payout> {
    let refund = pool
        .fee
        .checked_add(pool.agent_bond)
        .ok_or(ArbiterError::Overflow("expiry refund"))?;
    Ok(Payout::new(client, refund, None, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UNIT;

    fn acct(s: &str) -> AccountId {
        AccountId::from(s)
    }

    #[test]
    fn bond_floor_is_ten_percent_floored() {
        let config = ProtocolConfig::default();
        assert_eq!(min_agent_bond(UNIT, &config).unwrap(), UNIT / 10);
        assert_eq!(min_agent_bond(19, &config).unwrap(), 1);
        assert_eq!(min_agent_bond(9, &config).unwrap(), 0);
    }

    #[test]
    fn challenger_floor_is_one_and_a_half_times() {
        let config = ProtocolConfig::default();
        assert_eq!(
            min_challenger_bond(UNIT, &config).unwrap(),
            UNIT + UNIT / 2
        );
        assert_eq!(min_challenger_bond(3, &config).unwrap(), 4);
    }

    #[test]
    fn agent_wins_scenario_amounts() {
        let pool = Pool {
            fee: UNIT,
            agent_bond: UNIT,
            challenger_bond: UNIT + UNIT / 2,
        };
        let payout = agent_wins(pool, &acct("agent"), &acct("treasury"), 500).unwrap();
        assert_eq!(payout.winner_payout, 3_425_000_000_000_000_000);
        assert_eq!(payout.protocol_fee, 75_000_000_000_000_000);
        assert_eq!(payout.client_refund, 0);
        assert_eq!(payout.total(), pool.total().unwrap());
    }

    #[test]
    fn challenger_wins_scenario_amounts() {
        let pool = Pool {
            fee: UNIT,
            agent_bond: UNIT,
            challenger_bond: UNIT + UNIT / 2,
        };
        let payout = challenger_wins(
            pool,
            &acct("challenger"),
            &acct("client"),
            &acct("treasury"),
            500,
        )
        .unwrap();
        assert_eq!(payout.winner_payout, 2_450_000_000_000_000_000);
        assert_eq!(payout.protocol_fee, 50_000_000_000_000_000);
        assert_eq!(payout.client_refund, UNIT);
        assert_eq!(payout.total(), pool.total().unwrap());
    }

    #[test]
    fn odd_amounts_keep_the_remainder_with_the_winner() {
        let pool = Pool {
            fee: 7,
            agent_bond: 13,
            challenger_bond: 21,
        };
        let payout = agent_wins(pool, &acct("a"), &acct("t"), 500).unwrap();
        assert_eq!(payout.protocol_fee, 1);
        assert_eq!(payout.winner_payout, 40);
        assert_eq!(payout.total(), 41);
    }

    #[test]
    fn zero_protocol_fee_omits_treasury_credit() {
        let pool = Pool {
            fee: 10,
            agent_bond: 1,
            challenger_bond: 2,
        };
        let payout = agent_wins(pool, &acct("a"), &acct("t"), 500).unwrap();
        assert_eq!(payout.credits.len(), 1);
        assert_eq!(payout.total(), 13);
    }

    #[test]
    fn overflow_is_reported() {
        assert!(matches!(
            apply_bps(u128::MAX, 2),
            Err(ArbiterError::Overflow(_))
        ));
        let pool = Pool {
            fee: u128::MAX,
            agent_bond: 1,
            challenger_bond: 0,
        };
        assert!(expired(pool, &acct("c")).is_err());
    }
}
