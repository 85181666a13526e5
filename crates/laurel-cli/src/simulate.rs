//! End-to-end simulation driver.
//!
//! Seeds a referral network, replays a stream of investment events
//! through the distributor, then runs the full leaderboard pipeline:
//! ranking, winner calculation, prize distribution, and an audit dump.

use crate::config::CliConfig;
use anyhow::Context;
use chrono::Utc;
use laurel_core::{Amount, EngineError, UserId};
use laurel_engine::Laurel;
use laurel_storage::WriteOp;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub struct SimulationParams {
    pub participants: usize,
    pub investments: usize,
    pub seed: Option<u64>,
}

pub fn run(config: &CliConfig, params: &SimulationParams) -> anyhow::Result<()> {
    let engine = Laurel::in_memory(config.leaderboard.clone());
    engine
        .resolver
        .install_plan("simulator", config.plan.to_plan(Utc::now()))
        .context("installing commission plan")?;
    engine
        .resolver
        .check_configuration()
        .context("plan configuration check")?;

    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    // participants with display names
    let users: Vec<UserId> = (0..params.participants).map(|_| UserId::generate()).collect();
    let names: Vec<WriteOp> = users
        .iter()
        .enumerate()
        .map(|(i, user)| WriteOp::UpsertParticipant {
            user: *user,
            display_name: format!("participant-{:02}", i + 1),
        })
        .collect();
    engine
        .database()
        .commit(names)
        .context("registering participants")?;

    // everyone after the first few is referred by a random earlier user
    for (i, user) in users.iter().enumerate().skip(1) {
        if i > 2 && rng.gen_bool(0.2) {
            continue; // some users arrive organically
        }
        let referrer = users[rng.gen_range(0..i)];
        let _ = engine
            .graph
            .record_referral(referrer, *user, None, "simulator", Utc::now());
    }

    // investment event stream
    let mut total_invested = Amount::ZERO;
    let mut commissions = 0usize;
    for _ in 0..params.investments {
        let investor = users[rng.gen_range(0..users.len())];
        let amount = Amount::from_major(rng.gen_range(5..=50) * 100);
        let report = engine
            .distributor
            .distribute(
                laurel_core::InvestmentId::generate(),
                investor,
                amount,
                "Growth package",
                Utc::now(),
            )
            .context("distributing commissions")?;
        total_invested = total_invested.saturating_add(amount);
        commissions += report.transactions_created;
    }

    println!(
        "replayed {} investments ({} total), {} commission transactions",
        params.investments, total_invested, commissions
    );

    // leaderboard
    println!("\n rank  qualified  volume      referrals  prize      participant");
    for entry in engine.ranker.compute_leaderboard(10) {
        println!(
            " {:>4}  {:^9}  {:>10}  {:>9}  {:>9}  {}",
            entry.rank,
            if entry.qualified { "yes" } else { "no" },
            entry.direct_volume.to_string(),
            entry.direct_referrals,
            entry.prize.to_string(),
            entry.display_name,
        );
    }

    // prize pipeline
    let operator = UserId::generate();
    match engine.calculator.calculate_winners(operator, Utc::now()) {
        Ok(calculation) => {
            let ids: Vec<_> = calculation.winners.iter().map(|w| w.id).collect();
            let result = engine
                .prizes
                .distribute(operator, &ids, Utc::now())
                .context("distributing prizes")?;
            println!(
                "\n{} winners calculated, {} prizes distributed ({} total)",
                calculation.winners.len(),
                result.distributed,
                result.total_cash
            );
        }
        Err(EngineError::NoQualifiedParticipants) => {
            println!("\nno referrer met the qualification threshold, no prizes to pay");
        }
        Err(err) => return Err(err).context("calculating winners"),
    }

    // audit tail
    let entries = engine.audit().entries();
    println!("\naudit log: {} decisions, last 5:", entries.len());
    for entry in entries.iter().rev().take(5).rev() {
        println!(
            "  {} {:?} by {} - {}",
            entry.at.format("%H:%M:%S"),
            entry.action,
            entry.actor,
            entry.outcome
        );
    }

    Ok(())
}
