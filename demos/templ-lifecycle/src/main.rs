//! Templ lifecycle walkthrough
//!
//! Runs one templ end to end against the in-memory host:
//!
//! 1. **Bootstrap** with a linear entry fee curve
//! 2. **Paid joins** and the 30/30/30/10 fee split
//! 3. **Governance**: propose, vote to quorum, wait out the delay, execute
//! 4. **Disband** the treasury into the member pool and claim it back out
//! 5. **Event log** as the host received it
//!
//! Set `RUST_LOG=debug` to watch the engine's own tracing.

use anyhow::Context;
use chrono::{Duration, TimeZone, Utc};
use colored::Colorize;
use templ_runtime::{NewProposal, SimulatedHost, Templ, VoteOutcome};
use templ_types::{
    Address, AssetId, BootstrapConfig, CurveSegment, EntryFeeCurve, ProposalAction, StreamKey,
    TemplConfig, TemplMetadata,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn header(title: &str) {
    println!();
    println!("{}", "═".repeat(72).cyan());
    println!("  {}", title.cyan().bold());
    println!("{}", "═".repeat(72).cyan());
}

fn line(label: &str, value: impl std::fmt::Display) {
    println!("  {} {:<28} {}", "├".dimmed(), label, value.to_string().yellow());
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_target(false)
        .init();

    println!();
    println!("{}", "╔══════════════════════════════════════════════════════════════╗".cyan());
    println!("{}", "║    Templ: membership, treasury and governance lifecycle      ║".cyan().bold());
    println!("{}", "╚══════════════════════════════════════════════════════════════╝".cyan());

    let start = Utc
        .with_ymd_and_hms(2025, 1, 1, 12, 0, 0)
        .single()
        .context("demo start time")?;
    let sim = SimulatedHost::new(start);
    let access = AssetId::new("ACCESS");
    let usdc = AssetId::new("USDC");
    let priest = Address::new("priest");

    // ── Part 1: Bootstrap ───────────────────────────────────────────
    header("Part 1: Bootstrap");

    let config = TemplConfig {
        metadata: TemplMetadata::new("Night Owls", "A members-only reading club")
            .with_logo("https://example.org/night-owls.png"),
        access_asset: access.clone(),
        entry_fee: EntryFeeCurve::new(100, CurveSegment::linear(500)),
        ..TemplConfig::default()
    };
    let templ = Templ::bootstrap(BootstrapConfig::new(priest.clone(), config), sim.host())
        .context("bootstrap")?;

    line("templ", templ.id().short());
    line("priest", templ.admin());
    line("members", templ.member_count());
    line("next entry fee", templ.entry_fee_for_next_join());

    // ── Part 2: Paid joins ──────────────────────────────────────────
    header("Part 2: Paid joins");

    let mut members = vec![priest.clone()];
    for name in ["alice", "bob", "carol"] {
        let who = Address::new(name);
        sim.ledger.fund(&who, &access, 10_000);
        let receipt = templ.join(&who, &who, None)?;
        println!(
            "  {} {} joined as #{} paying {} (burn {} / treasury {} / pool {} / protocol {})",
            "├".dimmed(),
            name.green().bold(),
            receipt.sequence,
            receipt.fee.fee.to_string().yellow(),
            receipt.fee.burn,
            receipt.fee.treasury,
            receipt.fee.member_pool,
            receipt.fee.protocol,
        );
        members.push(who);
    }
    line("treasury holds", templ.treasury().holding(&access));
    line("reserved for pool", templ.reserved(&access));
    line("available", templ.available(&access));
    line("burned", templ.treasury().burned_total);

    // ── Part 3: Governance ──────────────────────────────────────────
    header("Part 3: Governance");

    let sponsor = Address::new("sponsor");
    sim.ledger.fund(&sponsor, &usdc, 500);
    templ.donate(&sponsor, &usdc, 500)?;
    line("USDC donated", templ.treasury().holding(&usdc));

    let grants = Address::new("grants");
    let id = templ.create_proposal(
        &members[1],
        NewProposal::new(
            ProposalAction::WithdrawTreasury {
                asset: usdc.clone(),
                recipient: grants.clone(),
                amount: 200,
                reason: "Reading room rent".into(),
            },
            "Pay the reading room",
        )
        .with_description("Two months of rent for the Thursday sessions"),
    )?;
    line("proposal", id);

    match templ.vote(id, &members[2], true)? {
        VoteOutcome::QuorumReached { yes_votes, no_votes } => {
            println!(
                "  {} quorum reached with {} yes / {} no",
                "├".dimmed(),
                yes_votes.to_string().green(),
                no_votes
            );
        }
        VoteOutcome::Recorded { yes_votes, .. } => {
            println!("  {} vote recorded, {} yes so far", "├".dimmed(), yes_votes);
        }
    }

    if let Err(e) = templ.execute_proposal(id) {
        println!("  {} executing early fails: {}", "├".dimmed(), e.to_string().red());
    }

    let delay = templ.config().governance.execution_delay;
    sim.clock.advance(delay);
    info!(hours = delay.num_hours(), "Execution delay elapsed");
    line("status after delay", templ.proposal_status(id)?);

    templ.execute_proposal(id)?;
    line("grants received", sim.ledger.balance(&grants, &usdc));
    line("USDC left", templ.treasury().holding(&usdc));

    // ── Part 4: Disband and claim ───────────────────────────────────
    header("Part 4: Disband and claim");

    let id = templ.create_proposal(
        &priest,
        NewProposal::new(
            ProposalAction::DisbandTreasury {
                asset: access.clone(),
            },
            "Share the treasury with everyone",
        ),
    )?;
    templ.vote(id, &members[3], true)?;
    sim.clock.advance(delay + Duration::minutes(1));
    templ.execute_proposal(id)?;
    line("available after disband", templ.available(&access));

    for member in &members {
        let claimed = templ.claim(member, &StreamKey::MemberPool)?;
        println!(
            "  {} {} claimed {}",
            "├".dimmed(),
            member.to_string().green(),
            claimed.to_string().yellow()
        );
    }
    let pool = templ.reward_stream(&StreamKey::MemberPool)?;
    line("pool remainder", pool.undistributed);
    line("pool balance", pool.pool_balance);

    // ── Part 5: Event log ───────────────────────────────────────────
    header("Part 5: Event log");

    for envelope in sim.sink.events() {
        println!(
            "  {} #{:<3} {}",
            "│".dimmed(),
            envelope.sequence,
            envelope.event.name().cyan()
        );
    }
    if let Some(last) = sim.sink.events().last() {
        println!();
        println!("{}", serde_json::to_string_pretty(last)?);
    }

    println!();
    println!("  {} {}", "└".dimmed(), "Lifecycle complete".green().bold());
    Ok(())
}
