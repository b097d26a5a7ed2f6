//! Derived index generation.
//!
//! Once a block passes the rules, the ledger-driven consequences are
//! appended to its index: dividend sources, sweeping of accounts below
//! the minimum balance, certification and membership expiries, the
//! exclusions they trigger, implicit revocations, and finally the
//! correction of raw validity durations into absolute times.

use crate::processes::local_index::LocalIndex;
use itertools::Itertools;
use trellis_consensus_core::api::LedgerView;
use trellis_consensus_core::block::Block;
use trellis_consensus_core::blockstamp::Blockstamp;
use trellis_consensus_core::config::Params;
use trellis_consensus_core::constants::ACCOUNT_MINIMUM_CURRENT_BASED_AMOUNT;
use trellis_consensus_core::errors::{ConsensusError, ConsensusResult, StoreError};
use trellis_consensus_core::head::ChainHead;
use trellis_consensus_core::index::{CertEntry, IdentityEntry, MembershipEntry, MembershipKind, Op, SourceEntry, SourceKind};
use trellis_consensus_core::keys::Pubkey;
use trellis_consensus_core::Timestamp;

pub fn generate_derived<L: LedgerView>(
    params: &Params,
    block: &Block,
    head: &ChainHead,
    index: &mut LocalIndex,
    ledger: &L,
) -> ConsensusResult<()> {
    create_dividends(block, head, index, ledger)?;
    sweep_low_accounts(block, head, index, ledger)?;
    expire_certs(block, head, index, ledger)?;
    expire_memberships(block, head, index, ledger)?;
    exclude_by_membership(block, index, ledger)?;
    exclude_by_certs(params, block, index, ledger)?;
    revoke_implicitly(block, head, index, ledger)?;
    correct_membership_times(block, head, index, ledger)?;
    correct_cert_times(block, head, index, ledger)?;
    Ok(())
}

/// One dividend source per member when the block creates a dividend.
fn create_dividends<L: LedgerView>(block: &Block, head: &ChainHead, index: &mut LocalIndex, ledger: &L) -> ConsensusResult<()> {
    let Some(dividend) = head.new_dividend else {
        return Ok(());
    };
    for member in ledger.members()? {
        index.sources.push(SourceEntry {
            op: Op::Create,
            kind: SourceKind::Dividend,
            identifier: member.pubkey.to_string(),
            pos: head.number,
            written_on: block.blockstamp(),
            written_time: head.median_time,
            amount: dividend,
            base: head.unit_base,
            conditions: format!("SIG({})", member.pubkey),
            ..SourceEntry::default()
        });
    }
    Ok(())
}

/// Accounts left below the minimum balance by this block have all their
/// remaining sources consumed.
fn sweep_low_accounts<L: LedgerView>(block: &Block, head: &ChainHead, index: &mut LocalIndex, ledger: &L) -> ConsensusResult<()> {
    let minimum = (ACCOUNT_MINIMUM_CURRENT_BASED_AMOUNT * 10u64.pow(head.unit_base as u32)) as i64;
    let conditions: Vec<String> = index
        .sources
        .iter()
        .filter(|e| !e.conditions.is_empty())
        .map(|e| e.conditions.clone())
        .unique()
        .collect();

    for condition in conditions {
        let variation: i64 = index
            .sources
            .iter()
            .filter(|s| s.conditions == condition)
            .map(|s| {
                let amount = (s.amount * 10u64.pow(s.base as u32)) as i64;
                match s.op {
                    Op::Create => amount,
                    Op::Update => -amount,
                }
            })
            .sum();
        let balance = ledger.wallet_balance(&condition)? + variation;
        if balance >= minimum {
            continue;
        }

        let consumed_in_block: Vec<(SourceKind, String, u64)> = index
            .sources
            .iter()
            .filter(|s| s.op == Op::Update)
            .map(|s| (s.kind, s.identifier.clone(), s.pos))
            .collect();
        let mut swept = 0i64;
        let mut sweep = |src: &SourceEntry, index: &mut LocalIndex| {
            swept += (src.amount * 10u64.pow(src.base as u32)) as i64;
            index.sources.push(SourceEntry {
                op: Op::Update,
                kind: src.kind,
                identifier: src.identifier.clone(),
                pos: src.pos,
                written_on: block.blockstamp(),
                written_time: head.median_time,
                amount: src.amount,
                base: src.base,
                locktime: src.locktime,
                conditions: src.conditions.clone(),
                consumed: true,
                ..SourceEntry::default()
            });
        };
        // Sources created by this block are consumed first, then the ones
        // already stored in the ledger.
        let fresh: Vec<SourceEntry> = index
            .sources
            .iter()
            .filter(|s| s.op == Op::Create && s.conditions == condition)
            .filter(|s| !consumed_in_block.contains(&(s.kind, s.identifier.clone(), s.pos)))
            .cloned()
            .collect();
        for src in fresh {
            sweep(&src, index);
        }
        for src in ledger.available_sources_of(&condition)? {
            if !consumed_in_block.contains(&(src.kind, src.identifier.clone(), src.pos)) {
                sweep(&src, index);
            }
        }

        if balance - swept < 0 {
            return Err(ConsensusError::InvariantViolation(format!(
                "sweeping account '{condition}' would leave a negative balance"
            )));
        }
    }
    Ok(())
}

fn expire_certs<L: LedgerView>(block: &Block, head: &ChainHead, index: &mut LocalIndex, ledger: &L) -> ConsensusResult<()> {
    for cert in ledger.certs_to_expire(head.median_time)? {
        index.certs.push(CertEntry {
            op: Op::Update,
            issuer: cert.issuer,
            receiver: cert.receiver,
            written_on: block.blockstamp(),
            created_on: cert.created_on,
            expired_on: head.median_time,
            ..CertEntry::default()
        });
    }
    Ok(())
}

fn expire_memberships<L: LedgerView>(block: &Block, head: &ChainHead, index: &mut LocalIndex, ledger: &L) -> ConsensusResult<()> {
    let renewed: Vec<Pubkey> =
        index.memberships.iter().filter(|ms| ms.expires_on.is_some()).map(|ms| ms.pubkey.clone()).collect();
    for ms in ledger.memberships_to_expire(head.median_time)? {
        if renewed.contains(&ms.pubkey) {
            continue;
        }
        index.memberships.push(MembershipEntry {
            op: Op::Update,
            pubkey: ms.pubkey,
            written_on: block.blockstamp(),
            created_on: ms.created_on,
            expired_on: Some(head.median_time),
            ..MembershipEntry::default()
        });
    }
    Ok(())
}

/// A key whose membership just expired is flagged for exclusion.
fn exclude_by_membership<L: LedgerView>(block: &Block, index: &mut LocalIndex, ledger: &L) -> ConsensusResult<()> {
    let expired: Vec<Pubkey> = index
        .memberships
        .iter()
        .filter(|ms| ms.expired_on.unwrap_or(0) > 0)
        .map(|ms| ms.pubkey.clone())
        .collect();
    for pubkey in expired {
        if ledger.identity(&pubkey)?.is_some_and(|i| i.member == Some(true)) {
            push_kick(block, index, pubkey);
        }
    }
    Ok(())
}

/// A member losing enough certifications in this block to fall under the
/// quorum is flagged for exclusion.
fn exclude_by_certs<L: LedgerView>(
    params: &Params,
    block: &Block,
    index: &mut LocalIndex,
    ledger: &L,
) -> ConsensusResult<()> {
    let receivers: Vec<Pubkey> = index
        .certs
        .iter()
        .filter(|c| c.op == Op::Update && c.expired_on > 0)
        .map(|c| c.receiver.clone())
        .unique()
        .collect();
    for receiver in receivers {
        let stored = ledger.certs_to(&receiver)?.len();
        let just_expired =
            index.certs.iter().filter(|c| c.op == Op::Update && c.expired_on > 0 && c.receiver == receiver).count();
        let just_received =
            index.certs.iter().filter(|c| c.op == Op::Create && c.receiver == receiver).count();
        let valid = stored + just_received - just_expired.min(stored);
        let is_member = ledger.identity(&receiver)?.is_some_and(|i| i.member == Some(true));
        let already_flagged =
            index.identities.iter().any(|i| i.pubkey == receiver && i.kick == Some(true));
        if valid < params.sig_qty as usize && is_member && !already_flagged {
            push_kick(block, index, receiver);
        }
    }
    Ok(())
}

fn push_kick(block: &Block, index: &mut LocalIndex, pubkey: Pubkey) {
    if index.identities.iter().any(|i| i.pubkey == pubkey && i.kick == Some(true)) {
        return;
    }
    index.identities.push(IdentityEntry {
        op: Op::Update,
        pubkey,
        written_on: block.blockstamp(),
        kick: Some(true),
        ..IdentityEntry::default()
    });
}

fn revoke_implicitly<L: LedgerView>(block: &Block, head: &ChainHead, index: &mut LocalIndex, ledger: &L) -> ConsensusResult<()> {
    for ms in ledger.memberships_to_revoke(head.median_time)? {
        index.memberships.push(MembershipEntry {
            op: Op::Update,
            pubkey: ms.pubkey,
            written_on: block.blockstamp(),
            created_on: ms.created_on,
            revoked_on: Some(head.median_time),
            ..MembershipEntry::default()
        });
    }
    Ok(())
}

/// Anchor median time of a document, used to turn raw validity durations
/// into absolute expiry times.
fn anchor_time<L: LedgerView>(block: &Block, created_on: Blockstamp, head: &ChainHead, ledger: &L) -> ConsensusResult<Timestamp> {
    if block.is_genesis() && created_on == Blockstamp::zero() {
        return Ok(head.median_time);
    }
    match ledger.block_by_blockstamp(&created_on)? {
        Some(anchor) => Ok(anchor.median_time),
        None => Err(StoreError::ForkBlockNotFound(created_on).into()),
    }
}

fn correct_membership_times<L: LedgerView>(block: &Block, head: &ChainHead, index: &mut LocalIndex, ledger: &L) -> ConsensusResult<()> {
    for i in 0..index.memberships.len() {
        let entry = &index.memberships[i];
        if !matches!(entry.kind, Some(MembershipKind::Join) | Some(MembershipKind::Renew)) {
            continue;
        }
        let base = anchor_time(block, entry.created_on, head, ledger)?;
        let entry = &mut index.memberships[i];
        entry.expires_on = entry.expires_on.map(|raw| raw + base);
        entry.revokes_on = entry.revokes_on.map(|raw| raw + base);
    }
    Ok(())
}

fn correct_cert_times<L: LedgerView>(block: &Block, head: &ChainHead, index: &mut LocalIndex, ledger: &L) -> ConsensusResult<()> {
    for i in 0..index.certs.len() {
        let entry = &index.certs[i];
        if entry.expires_on.is_none() {
            continue;
        }
        let base = if block.is_genesis() && entry.created_on == 0 {
            head.median_time
        } else {
            match ledger.block_at(entry.created_on)? {
                Some(anchor) => anchor.median_time,
                None => return Err(StoreError::BlockNotFound(entry.created_on).into()),
            }
        };
        let entry = &mut index.certs[i];
        entry.expires_on = entry.expires_on.map(|raw| raw + base);
    }
    Ok(())
}
