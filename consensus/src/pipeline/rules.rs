//! Protocol rule evaluation.
//!
//! The structural pass inspects the submitted block alone; the global pass
//! confronts the block's header with the computed head and reads the
//! verdicts the annotation pass left on the index entries. Rules run in
//! catalogue order and the first violated one rejects the block.

use crate::processes::local_index::LocalIndex;
use trellis_consensus_core::api::SignatureVerifier;
use trellis_consensus_core::block::Block;
use trellis_consensus_core::config::Params;
use trellis_consensus_core::constants::{MIN_ACCEPTABLE_BLOCK_SIZE, POW_UPPER_BOUND, TX_WINDOW};
use trellis_consensus_core::errors::{RuleError, RuleResult};
use trellis_consensus_core::head::ChainHead;
use trellis_consensus_core::index::{MembershipKind, Op};
use trellis_consensus_core::keys::Pubkey;

/// Structural checks on the block alone. `check_signature` is cleared by
/// test profiles that seal blocks without real keys.
pub fn check_local<V: SignatureVerifier>(block: &Block, verifier: &V, check_signature: bool) -> RuleResult<()> {
    if check_signature {
        check_document_signatures(block, verifier)?;
    }
    if block.is_genesis() && !block.joiners.iter().any(|j| j.pubkey == block.issuer) {
        return Err(RuleError::GenesisIssuerNotFounder);
    }

    for (i, idty) in block.identities.iter().enumerate() {
        if block.identities[..i].iter().any(|other| other.uid == idty.uid) {
            return Err(RuleError::LocalUidConflict);
        }
        if block.identities[..i].iter().any(|other| other.pubkey == idty.pubkey) {
            return Err(RuleError::LocalPubkeyConflict);
        }
        if !block.joiners.iter().any(|j| j.pubkey == idty.pubkey) {
            return Err(RuleError::LocalIdentityWithoutMembership);
        }
    }

    let memberships: Vec<&Pubkey> = block
        .joiners
        .iter()
        .chain(&block.actives)
        .chain(&block.leavers)
        .map(|ms| &ms.pubkey)
        .collect();
    for (i, pubkey) in memberships.iter().enumerate() {
        if memberships[..i].contains(pubkey) {
            return Err(RuleError::LocalMembershipUnicity);
        }
    }
    for (i, revocation) in block.revoked.iter().enumerate() {
        if block.revoked[..i].iter().any(|other| other.pubkey == revocation.pubkey) {
            return Err(RuleError::LocalRevocationUnicity);
        }
    }
    for (i, cert) in block.certifications.iter().enumerate() {
        if block.certifications[..i].iter().any(|other| other.issuer == cert.issuer && other.receiver == cert.receiver) {
            return Err(RuleError::LocalCertificationUnicity);
        }
    }

    let inputs: Vec<_> = block
        .transactions
        .iter()
        .flat_map(|tx| tx.inputs.iter())
        .map(|input| (input.kind, &input.identifier, input.pos))
        .collect();
    for (i, input) in inputs.iter().enumerate() {
        if inputs[..i].contains(input) {
            return Err(RuleError::LocalSourceUnicity);
        }
    }
    for tx in &block.transactions {
        match (tx.input_sum(), tx.output_sum()) {
            (Some(inputs), Some(outputs)) if inputs == outputs => {}
            _ => return Err(RuleError::LocalTransactionSums),
        }
    }
    Ok(())
}

/// Every document carried by the block must be signed by its own key: the
/// block itself, identities, memberships and every transaction issuer.
fn check_document_signatures<V: SignatureVerifier>(block: &Block, verifier: &V) -> RuleResult<()> {
    if !verifier.block_sig_ok(block) {
        return Err(RuleError::BlockSignature);
    }
    for idty in &block.identities {
        if !verifier.identity_sig_ok(idty) {
            return Err(RuleError::IdentitySignature);
        }
    }
    for ms in block.joiners.iter().chain(&block.actives) {
        if !verifier.membership_sig_ok(ms, &block.currency, "IN") {
            return Err(RuleError::MembershipSignature);
        }
    }
    for ms in &block.leavers {
        if !verifier.membership_sig_ok(ms, &block.currency, "OUT") {
            return Err(RuleError::MembershipSignature);
        }
    }
    for tx in &block.transactions {
        if tx.signatures.len() != tx.issuers.len()
            || (0..tx.issuers.len()).any(|i| !verifier.transaction_sig_ok(tx, i))
        {
            return Err(RuleError::TransactionSignature);
        }
    }
    Ok(())
}

/// Global checks: the block's header against the computed `head`, then the
/// annotated index verdicts, in catalogue order.
///
/// `to_kick` is the set of stored identities flagged for exclusion, which
/// the block is required to exclude.
pub fn check_global(
    params: &Params,
    block: &Block,
    head: &ChainHead,
    prev: Option<&ChainHead>,
    index: &LocalIndex,
    to_kick: &[Pubkey],
    with_pow: bool,
) -> RuleResult<()> {
    if let Some(prev) = prev {
        if block.version != prev.version && block.version != prev.version + 1 {
            return Err(RuleError::Version);
        }
        let max_size = MIN_ACCEPTABLE_BLOCK_SIZE.max((1.1 * head.avg_block_size as f64).ceil() as u64);
        if block.size >= max_size {
            return Err(RuleError::BlockSize);
        }
    }
    if block.currency != params.currency {
        return Err(RuleError::Currency);
    }
    if block.number != head.number {
        return Err(RuleError::Number);
    }
    if block.previous_hash != head.previous_hash {
        return Err(RuleError::PreviousHash);
    }
    if block.previous_issuer != head.previous_issuer {
        return Err(RuleError::PreviousIssuer);
    }
    if !block.is_genesis() && !head.issuer_is_member {
        return Err(RuleError::IssuerIsMember);
    }
    if block.issuers_count != head.issuers_count {
        return Err(RuleError::IssuersCount);
    }
    if block.issuers_frame != head.issuers_frame {
        return Err(RuleError::IssuersFrame);
    }
    if block.issuers_frame_var != head.issuers_frame_var {
        return Err(RuleError::IssuersFrameVar);
    }
    if block.median_time != head.median_time {
        return Err(RuleError::MedianTime);
    }
    if block.dividend != head.new_dividend {
        return Err(RuleError::Dividend);
    }
    if block.unit_base != head.unit_base {
        return Err(RuleError::UnitBase);
    }
    if block.members_count != head.members_count {
        return Err(RuleError::MembersCount);
    }
    if !block.is_genesis() && block.pow_min != head.pow_min {
        return Err(RuleError::PowMin);
    }
    if with_pow {
        check_proof_of_work(block, head)?;
    }

    for entry in &index.identities {
        if entry.op == Op::Create && entry.age > params.idty_window {
            return Err(RuleError::IdentityWritability);
        }
    }
    for entry in &index.memberships {
        if entry.kind.is_some() && entry.age > params.ms_window {
            return Err(RuleError::MembershipWritability);
        }
        if entry.unchainable {
            return Err(RuleError::MembershipPeriod);
        }
    }
    for entry in &index.certs {
        if entry.age > params.sig_window {
            return Err(RuleError::CertificationWritability);
        }
        if entry.stock > params.sig_stock as u64 {
            return Err(RuleError::CertificationStock);
        }
        if entry.unchainable {
            return Err(RuleError::CertificationPeriod);
        }
        if !block.is_genesis() && !entry.from_member {
            return Err(RuleError::CertificationFromMember);
        }
        if !entry.to_member && !entry.to_newcomer {
            return Err(RuleError::CertificationToMemberOrNewcomer);
        }
        if entry.to_leaver {
            return Err(RuleError::CertificationToLeaver);
        }
        if entry.is_replay {
            return Err(RuleError::CertificationReplay);
        }
        if !entry.sig_ok {
            return Err(RuleError::CertificationSignature);
        }
    }
    for entry in &index.identities {
        if !entry.uid_unique {
            return Err(RuleError::IdentityUidUnicity);
        }
        if !entry.pub_unique {
            return Err(RuleError::IdentityPubkeyUnicity);
        }
    }
    for entry in &index.memberships {
        if !entry.number_follows {
            return Err(RuleError::MembershipSuccession);
        }
        if !entry.distance_ok {
            return Err(RuleError::MembershipDistance);
        }
        if entry.on_revoked {
            return Err(RuleError::MembershipOnRevoked);
        }
        if entry.joins_twice {
            return Err(RuleError::MembershipJoinsTwice);
        }
        if !entry.enough_certs {
            return Err(RuleError::MembershipEnoughCerts);
        }
        if entry.kind == Some(MembershipKind::Leave) && !entry.leaver_is_member {
            return Err(RuleError::MembershipLeaverIsMember);
        }
        if entry.kind == Some(MembershipKind::Renew) && !entry.active_is_member {
            return Err(RuleError::MembershipActiveIsMember);
        }
        if entry.revoked_on.is_some() {
            if !entry.revoked_is_member {
                return Err(RuleError::MembershipRevokedIsMember);
            }
            if entry.already_revoked {
                return Err(RuleError::MembershipRevokedSingleton);
            }
            if !entry.revocation_sig_ok {
                return Err(RuleError::MembershipRevocationSignature);
            }
        }
    }

    let excluded: Vec<&Pubkey> =
        index.identities.iter().filter(|i| i.member == Some(false)).map(|i| &i.pubkey).collect();
    for entry in &index.identities {
        if entry.member == Some(false) && !entry.excluded_is_member {
            return Err(RuleError::ExcludedIsMember);
        }
        if entry.member == Some(false) && !entry.has_to_be_excluded {
            return Err(RuleError::ToBeKickedArePresent);
        }
    }
    for pubkey in to_kick {
        if excluded.iter().filter(|p| ***p == *pubkey).count() != 1 {
            return Err(RuleError::ToBeKickedArePresent);
        }
    }

    for entry in &index.sources {
        match entry.op {
            Op::Update => {
                if entry.age > TX_WINDOW {
                    return Err(RuleError::TransactionWritability);
                }
                if !entry.available {
                    return Err(RuleError::InputIsAvailable);
                }
                if entry.is_locked {
                    return Err(RuleError::InputIsUnlocked);
                }
                if entry.is_time_locked {
                    return Err(RuleError::InputIsTimeUnlocked);
                }
            }
            Op::Create => {
                if entry.base > head.unit_base {
                    return Err(RuleError::OutputBase);
                }
            }
        }
    }
    Ok(())
}

/// The hash must carry the required zero digits, and the digit after them
/// must not exceed the bound the difficulty remainder allows.
fn check_proof_of_work(block: &Block, head: &ChainHead) -> RuleResult<()> {
    let given_zeros = block.hash.leading_zero_nibbles();
    let next = if head.pow_zeros < 64 { block.hash.nibble(head.pow_zeros) } else { 0 };
    let bound = POW_UPPER_BOUND[head.pow_remainder as usize];
    if given_zeros < head.pow_zeros || next > bound {
        return Err(RuleError::ProofOfWork {
            given_zeros,
            next_char: char::from_digit(next as u32, 16).unwrap_or('?').to_ascii_uppercase(),
            required_zeros: head.pow_zeros,
        });
    }
    Ok(())
}
