//! Local index extraction.
//!
//! Translates the document lists of a candidate block into the four index
//! entry streams, using only the block itself and the currency parameters.
//! Expiry fields are written as raw durations here; they are turned into
//! absolute times by the expiry corrections once the referenced blocks are
//! known.

use trellis_consensus_core::api::IndexBatch;
use trellis_consensus_core::block::Block;
use trellis_consensus_core::blockstamp::Blockstamp;
use trellis_consensus_core::config::Params;
use trellis_consensus_core::constants::REVOCATION_FACTOR;
use trellis_consensus_core::index::{CertEntry, IdentityEntry, MembershipEntry, MembershipKind, Op, SourceEntry, SourceKind};
use trellis_consensus_core::keys::Pubkey;

/// Index entries extracted from one block, in block order.
#[derive(Debug, Clone, Default)]
pub struct LocalIndex {
    pub identities: Vec<IdentityEntry>,
    pub memberships: Vec<MembershipEntry>,
    pub certs: Vec<CertEntry>,
    pub sources: Vec<SourceEntry>,
}

impl LocalIndex {
    pub fn into_batch(self) -> IndexBatch {
        IndexBatch {
            identities: self.identities,
            memberships: self.memberships,
            certs: self.certs,
            sources: self.sources,
        }
    }
}

/// Extracts the local index of `block`.
pub fn extract(block: &Block, params: &Params) -> LocalIndex {
    let written_on = block.blockstamp();
    let median_time = block.median_time;
    let mut index = LocalIndex::default();

    for idty in &block.identities {
        index.identities.push(IdentityEntry {
            op: Op::Create,
            pubkey: idty.pubkey.clone(),
            written_on,
            uid: Some(idty.uid.clone()),
            created_on: Some(idty.created_on),
            sig: Some(idty.sig.clone()),
            member: Some(true),
            was_member: Some(true),
            kick: Some(false),
            wot_id: None,
            ..blank_identity(&idty.pubkey, written_on)
        });
    }

    for joiner in &block.joiners {
        let declared_here = block.identities.iter().any(|i| i.pubkey == joiner.pubkey);
        index.memberships.push(MembershipEntry {
            op: if declared_here { Op::Create } else { Op::Update },
            kind: Some(MembershipKind::Join),
            leaving: Some(false),
            ..membership(joiner.pubkey.clone(), joiner.created_on, written_on, median_time, params)
        });
        if !declared_here {
            // The identity already exists: flip it back to member.
            index.identities.push(IdentityEntry {
                op: Op::Update,
                pubkey: joiner.pubkey.clone(),
                written_on,
                member: Some(true),
                was_member: Some(true),
                kick: Some(false),
                ..blank_identity(&joiner.pubkey, written_on)
            });
        }
    }

    for active in &block.actives {
        index.memberships.push(MembershipEntry {
            op: Op::Update,
            kind: Some(MembershipKind::Renew),
            ..membership(active.pubkey.clone(), active.created_on, written_on, median_time, params)
        });
    }

    for leaver in &block.leavers {
        index.memberships.push(MembershipEntry {
            op: Op::Update,
            kind: Some(MembershipKind::Leave),
            leaving: Some(true),
            expires_on: None,
            expired_on: None,
            revokes_on: None,
            ..membership(leaver.pubkey.clone(), leaver.created_on, written_on, median_time, params)
        });
    }

    for revocation in &block.revoked {
        index.memberships.push(MembershipEntry {
            op: Op::Update,
            pubkey: revocation.pubkey.clone(),
            written_on,
            created_on: Blockstamp::zero(),
            kind: None,
            expires_on: None,
            expired_on: None,
            revokes_on: None,
            revoked_on: Some(median_time),
            leaving: Some(false),
            revocation_sig: Some(revocation.sig.clone()),
            chainable_on: None,
            ..MembershipEntry::default()
        });
    }

    for pubkey in &block.excluded {
        index.identities.push(IdentityEntry {
            op: Op::Update,
            pubkey: pubkey.clone(),
            written_on,
            member: Some(false),
            kick: Some(false),
            ..blank_identity(pubkey, written_on)
        });
    }

    for cert in &block.certifications {
        index.certs.push(CertEntry {
            op: Op::Create,
            issuer: cert.issuer.clone(),
            receiver: cert.receiver.clone(),
            written_on,
            created_on: cert.block_number,
            sig: Some(cert.sig.clone()),
            // Raw validity duration; corrected into an absolute time later.
            expires_on: Some(params.sig_validity),
            expired_on: 0,
            chainable_on: Some(median_time + params.sig_period),
            ..CertEntry::default()
        });
    }

    for (tx_index, tx) in block.transactions.iter().enumerate() {
        for (input_index, input) in tx.inputs.iter().enumerate() {
            index.sources.push(SourceEntry {
                op: Op::Update,
                kind: input.kind,
                identifier: input.identifier.clone(),
                pos: input.pos,
                written_on,
                written_time: median_time,
                amount: input.amount,
                base: input.base,
                locktime: tx.locktime,
                // Filled from the stored source while checking availability.
                conditions: String::new(),
                consumed: true,
                tx_index: Some(tx_index),
                input_index: Some(input_index),
                ..SourceEntry::default()
            });
        }
        for (pos, output) in tx.outputs.iter().enumerate() {
            index.sources.push(SourceEntry {
                op: Op::Create,
                kind: SourceKind::Transaction,
                identifier: tx.hash.to_string(),
                pos: pos as u64,
                written_on,
                written_time: median_time,
                amount: output.amount,
                base: output.base,
                locktime: tx.locktime,
                conditions: output.conditions.clone(),
                consumed: false,
                ..SourceEntry::default()
            });
        }
    }

    index
}

fn membership(pubkey: Pubkey, created_on: Blockstamp, written_on: Blockstamp, median_time: u64, params: &Params) -> MembershipEntry {
    MembershipEntry {
        op: Op::Update,
        pubkey,
        written_on,
        created_on,
        kind: None,
        // Raw validity durations; corrected into absolute times later.
        expires_on: Some(params.ms_validity),
        // Zero resets an earlier expiry under reduction.
        expired_on: Some(0),
        revokes_on: Some(params.ms_validity * REVOCATION_FACTOR),
        revoked_on: None,
        leaving: None,
        revocation_sig: None,
        chainable_on: Some(median_time + params.ms_period),
        ..MembershipEntry::default()
    }
}

fn blank_identity(pubkey: &Pubkey, written_on: Blockstamp) -> IdentityEntry {
    IdentityEntry {
        op: Op::Update,
        pubkey: pubkey.clone(),
        written_on,
        uid: None,
        created_on: None,
        sig: None,
        member: None,
        was_member: None,
        kick: None,
        wot_id: None,
        ..IdentityEntry::default()
    }
}
