//! Block application pipeline.
//!
//! [`Chain`] ties the stores together: it validates candidate blocks
//! against the current ledger state, commits the accepted ones along with
//! their index entries and web-of-trust changes, reverts the top block
//! when a fork switch demands it, and keeps a pool of fork blocks for the
//! switcher to examine.

use crate::pipeline::rules;
use crate::processes::derived;
use crate::processes::head as head_process;
use crate::processes::local_index::{self, LocalIndex};
use std::collections::HashMap;
use trellis_consensus_core::api::{CommitSink, IndexBatch, LedgerView, SignatureVerifier, WotGraph, WotId};
use trellis_consensus_core::block::Block;
use trellis_consensus_core::blockstamp::Blockstamp;
use trellis_consensus_core::config::Params;
use trellis_consensus_core::errors::{ConsensusResult, StoreError};
use trellis_consensus_core::head::ChainHead;
use trellis_consensus_core::index::Op;
use trellis_consensus_core::keys::Pubkey;

/// How much of the rule catalogue a [`Chain`] enforces.
///
/// Proof of work and signatures are skipped by block generation previews
/// and by tests that forge blocks without keys; everything else always
/// runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckProfile {
    Full,
    SkipPowAndSignature,
}

pub struct Chain<L, W, V> {
    params: Params,
    pub ledger: L,
    pub wot: W,
    verifier: V,
    profile: CheckProfile,
    pub(crate) forks: Vec<Block>,
    pub(crate) invalid_forks: Vec<Blockstamp>,
}

impl<L, W, V> Chain<L, W, V>
where
    L: LedgerView + CommitSink,
    W: WotGraph + Clone,
    V: SignatureVerifier,
{
    pub fn new(params: Params, ledger: L, wot: W, verifier: V, profile: CheckProfile) -> Self {
        Self { params, ledger, wot, verifier, profile, forks: Vec::new(), invalid_forks: Vec::new() }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn current(&self) -> ConsensusResult<Option<ChainHead>> {
        Ok(self.ledger.head()?)
    }

    /// Validates `block` against the current chain state without touching
    /// it. Returns the head the block would produce and its local index,
    /// annotated and rule-checked.
    pub fn check_block(&self, block: &Block) -> ConsensusResult<(ChainHead, LocalIndex)> {
        let prev = self.ledger.head()?;
        let mut index = local_index::extract(block, &self.params);

        let joins = index.identities.iter().filter(|i| i.member == Some(true)).count() as u64;
        let leaves = index.identities.iter().filter(|i| i.member == Some(false)).count() as u64;
        let issuer_is_member = if block.is_genesis() {
            block.joiners.iter().any(|j| j.pubkey == block.issuer)
        } else {
            self.ledger.identity(&block.issuer)?.is_some_and(|i| i.member == Some(true))
        };

        let recent = match &prev {
            Some(prev) => {
                let needed = prev
                    .issuers_frame
                    .max(self.params.median_time_blocks)
                    .max(self.params.dt_diff_eval) as usize;
                self.ledger.recent_heads(needed)?
            }
            None => Vec::new(),
        };
        let head = head_process::compute_head(&self.params, block, &recent, joins, leaves, issuer_is_member);

        crate::processes::global_scope::annotate(
            &self.params,
            block,
            &mut index,
            &head,
            prev.as_ref(),
            &self.ledger,
            &self.wot,
            &self.verifier,
        )?;

        let full = self.profile == CheckProfile::Full;
        rules::check_local(block, &self.verifier, full)?;
        let to_kick: Vec<Pubkey> =
            self.ledger.identities_to_kick()?.into_iter().map(|i| i.pubkey).collect();
        rules::check_global(&self.params, block, &head, prev.as_ref(), &index, &to_kick, full)?;
        Ok((head, index))
    }

    /// Checks `block` and, on success, commits it: index entries, wallet
    /// movements, web-of-trust nodes and links, then a trim of index
    /// entries that fell out of the validation window.
    pub fn apply_block(&mut self, block: &Block) -> ConsensusResult<ChainHead> {
        let (head, mut index) = self.check_block(block)?;
        derived::generate_derived(&self.params, block, &head, &mut index, &self.ledger)?;

        for entry in index.identities.iter_mut().filter(|i| i.op == Op::Create) {
            entry.wot_id = Some(self.wot.add_node());
        }

        let batch = index.into_batch();
        self.ledger.commit(block, &head, &batch)?;
        self.update_wot(&batch)?;
        self.trim_window(&head)?;

        log::info!("applied block #{} {} (members: {})", head.number, head.hash, head.members_count);
        Ok(head)
    }

    /// Removes the top block and undoes everything it did: wallet moves
    /// and index entries through the ledger, links, enabled flags and
    /// newcomer nodes in the web of trust. Returns the removed block.
    pub fn revert_top(&mut self) -> ConsensusResult<Block> {
        let head = self.ledger.head()?.ok_or(StoreError::EmptyLedger)?;
        let (block, batch) = self.ledger.remove_block(head.number)?;

        // Newcomers of the reverted block are gone from the ledger, but
        // their entries still carry the node ids assigned at apply time.
        let mut ids: HashMap<&str, WotId> = HashMap::new();
        for entry in batch.identities.iter().filter(|i| i.op == Op::Create) {
            if let Some(id) = entry.wot_id {
                ids.insert(entry.pubkey.as_str(), id);
            }
        }
        let newcomers = ids.len();
        for cert in batch.certs.iter().rev() {
            let (Some(from), Some(to)) = (self.wot_id_of(&ids, &cert.issuer)?, self.wot_id_of(&ids, &cert.receiver)?)
            else {
                return Err(StoreError::WotNodeNotFound(cert.issuer.to_string()).into());
            };
            match cert.op {
                Op::Create => self.wot.rem_link(from, to),
                Op::Update => self.wot.add_link(from, to),
            }
        }
        for entry in batch.identities.iter().filter(|i| i.op == Op::Update) {
            let Some(id) = self.wot_id_of(&ids, &entry.pubkey)? else {
                return Err(StoreError::WotNodeNotFound(entry.pubkey.to_string()).into());
            };
            match entry.member {
                // A come-back join is undone by disabling the node again.
                Some(true) => self.wot.set_enabled(id, false),
                Some(false) => self.wot.set_enabled(id, true),
                None => None,
            };
        }
        for _ in 0..newcomers {
            self.wot.rem_node();
        }

        log::info!("reverted block #{} {}", block.number, block.hash);
        Ok(block)
    }

    /// Feeds one incoming block: applied right away when it extends the
    /// current head, stashed in the fork pool when it does not. Genesis is
    /// only accepted on an empty ledger.
    pub fn receive_block(&mut self, block: Block) -> ConsensusResult<Option<ChainHead>> {
        let current = self.ledger.head()?;
        let extends = match &current {
            Some(head) => block.number == head.number + 1 && block.previous_hash == Some(head.hash),
            None => block.is_genesis(),
        };
        if extends {
            return self.apply_block(&block).map(Some);
        }

        let within_window = current
            .as_ref()
            .is_some_and(|head| block.number + self.params.fork_window_size >= head.number);
        let known = self.forks.iter().any(|b| b.number == block.number && b.hash == block.hash)
            || self.invalid_forks.contains(&block.blockstamp());
        if within_window && !known {
            log::debug!("pooled fork block #{} {}", block.number, block.hash);
            self.forks.push(block);
        }
        Ok(None)
    }

    fn wot_id_of(&self, overlay: &HashMap<&str, WotId>, pubkey: &Pubkey) -> ConsensusResult<Option<WotId>> {
        if let Some(id) = overlay.get(pubkey.as_str()) {
            return Ok(Some(*id));
        }
        Ok(self.ledger.identity(pubkey)?.and_then(|i| i.wot_id))
    }

    fn update_wot(&mut self, batch: &IndexBatch) -> ConsensusResult<()> {
        for entry in batch.identities.iter().filter(|i| i.op == Op::Update) {
            let Some(id) = self.ledger.identity(&entry.pubkey)?.and_then(|i| i.wot_id) else {
                return Err(StoreError::WotNodeNotFound(entry.pubkey.to_string()).into());
            };
            match entry.member {
                Some(true) => self.wot.set_enabled(id, true),
                Some(false) => self.wot.set_enabled(id, false),
                None => None,
            };
        }
        for cert in &batch.certs {
            let from = self.ledger.identity(&cert.issuer)?.and_then(|i| i.wot_id);
            let to = self.ledger.identity(&cert.receiver)?.and_then(|i| i.wot_id);
            let (Some(from), Some(to)) = (from, to) else {
                return Err(StoreError::WotNodeNotFound(cert.issuer.to_string()).into());
            };
            match cert.op {
                Op::Create => self.wot.add_link(from, to),
                Op::Update => self.wot.rem_link(from, to),
            }
        }
        Ok(())
    }

    /// Index entries older than the window influencing validation are
    /// compacted away.
    fn trim_window(&mut self, head: &ChainHead) -> ConsensusResult<()> {
        let size = head
            .issuers_count
            .max(head.issuers_frame)
            .max(self.params.median_time_blocks)
            .max(self.params.dt_diff_eval)
            + self.params.fork_window_size;
        if head.number + 1 > size {
            self.ledger.trim(head.number - size)?;
        }
        Ok(())
    }
}

