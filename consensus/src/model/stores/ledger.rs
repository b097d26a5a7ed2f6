use indexmap::IndexMap;
use trellis_consensus_core::api::{
    BlockHistoryReader, BlockSummary, CertIndexReader, CommitSink, HeadReader, IdentityIndexReader, IndexBatch,
    MembershipIndexReader, SourceIndexReader, WalletReader,
};
use trellis_consensus_core::block::Block;
use trellis_consensus_core::blockstamp::Blockstamp;
use trellis_consensus_core::errors::{StoreError, StoreResult};
use trellis_consensus_core::hash::Hash;
use trellis_consensus_core::head::ChainHead;
use trellis_consensus_core::index::{
    reduce, reduce_by, CertEntry, IdentityEntry, MembershipEntry, Op, Reducible, SourceEntry, SourceKind,
};
use trellis_consensus_core::keys::Pubkey;
use trellis_consensus_core::{BlockNumber, Timestamp};

/// In-memory ledger backend.
///
/// Index entries are stored as append-only logs in write order; reads
/// reduce the matching entries on the fly. Committing is appending,
/// reverting is dropping every entry written on the removed block, which
/// makes revert exact by construction.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    blocks: Vec<Block>,
    /// Heads of the most recent blocks, ascending. Older heads are dropped
    /// by [`CommitSink::trim`].
    heads: Vec<ChainHead>,
    identities: Vec<IdentityEntry>,
    memberships: Vec<MembershipEntry>,
    certs: Vec<CertEntry>,
    sources: Vec<SourceEntry>,
    /// Balance per condition script, in base units.
    wallets: IndexMap<String, i64>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// The oldest head still stored, used to size the kept window.
    pub fn tail(&self) -> Option<&ChainHead> {
        self.heads.first()
    }

    fn apply_wallet_moves(&mut self, sources: &[SourceEntry], reverse: bool) {
        for entry in sources {
            let amount = (entry.amount * 10u64.pow(entry.base as u32)) as i64;
            let variation = match entry.op {
                Op::Create => amount,
                Op::Update => -amount,
            };
            let variation = if reverse { -variation } else { variation };
            *self.wallets.entry(entry.conditions.clone()).or_insert(0) += variation;
        }
    }

    fn reduced_sources(&self) -> Vec<SourceEntry> {
        reduce_by(&self.sources)
    }
}

impl HeadReader for MemoryLedger {
    fn head(&self) -> StoreResult<Option<ChainHead>> {
        Ok(self.heads.last().cloned())
    }

    fn head_at(&self, number: BlockNumber) -> StoreResult<Option<ChainHead>> {
        Ok(self.heads.iter().find(|h| h.number == number).cloned())
    }

    fn recent_heads(&self, count: usize) -> StoreResult<Vec<ChainHead>> {
        Ok(self.heads.iter().rev().take(count).cloned().collect())
    }
}

impl BlockHistoryReader for MemoryLedger {
    fn block_at(&self, number: BlockNumber) -> StoreResult<Option<BlockSummary>> {
        Ok(self.blocks.get(number as usize).map(summary))
    }

    fn block_by_blockstamp(&self, bs: &Blockstamp) -> StoreResult<Option<BlockSummary>> {
        Ok(self.blocks.get(bs.number as usize).filter(|b| b.hash == bs.hash).map(summary))
    }

    fn full_block(&self, number: BlockNumber, hash: &Hash) -> StoreResult<Option<Block>> {
        Ok(self.blocks.get(number as usize).filter(|b| b.hash == *hash).cloned())
    }
}

fn summary(block: &Block) -> BlockSummary {
    BlockSummary {
        number: block.number,
        hash: block.hash,
        previous_hash: block.previous_hash,
        issuer: block.issuer.clone(),
        median_time: block.median_time,
    }
}

impl IdentityIndexReader for MemoryLedger {
    fn identity(&self, pubkey: &Pubkey) -> StoreResult<Option<IdentityEntry>> {
        let entries: Vec<_> = self.identities.iter().filter(|e| &e.pubkey == pubkey).cloned().collect();
        Ok(reduce(&entries))
    }

    fn identity_by_uid(&self, uid: &str) -> StoreResult<Option<IdentityEntry>> {
        match self.identities.iter().find(|e| e.uid.as_deref() == Some(uid)) {
            Some(entry) => self.identity(&entry.pubkey.clone()),
            None => Ok(None),
        }
    }

    fn members(&self) -> StoreResult<Vec<IdentityEntry>> {
        Ok(reduce_by(&self.identities).into_iter().filter(|i| i.member == Some(true)).collect())
    }

    fn identities_to_kick(&self) -> StoreResult<Vec<IdentityEntry>> {
        Ok(reduce_by(&self.identities).into_iter().filter(|i| i.kick == Some(true)).collect())
    }
}

impl MembershipIndexReader for MemoryLedger {
    fn membership(&self, pubkey: &Pubkey) -> StoreResult<Option<MembershipEntry>> {
        let entries: Vec<_> = self.memberships.iter().filter(|e| &e.pubkey == pubkey).cloned().collect();
        Ok(reduce(&entries))
    }

    fn memberships_to_expire(&self, median_time: Timestamp) -> StoreResult<Vec<MembershipEntry>> {
        Ok(reduce_by(&self.memberships)
            .into_iter()
            .filter(|ms| !ms.is_expired() && ms.expires_on.is_some_and(|t| t <= median_time))
            .collect())
    }

    fn memberships_to_revoke(&self, median_time: Timestamp) -> StoreResult<Vec<MembershipEntry>> {
        Ok(reduce_by(&self.memberships)
            .into_iter()
            .filter(|ms| !ms.is_revoked() && ms.revokes_on.is_some_and(|t| t <= median_time))
            .collect())
    }
}

impl CertIndexReader for MemoryLedger {
    fn certs_from(&self, issuer: &Pubkey) -> StoreResult<Vec<CertEntry>> {
        let entries: Vec<_> = self.certs.iter().filter(|c| &c.issuer == issuer).cloned().collect();
        Ok(reduce_by(&entries).into_iter().filter(|c| c.expired_on == 0).collect())
    }

    fn certs_to(&self, receiver: &Pubkey) -> StoreResult<Vec<CertEntry>> {
        let entries: Vec<_> = self.certs.iter().filter(|c| &c.receiver == receiver).cloned().collect();
        Ok(reduce_by(&entries).into_iter().filter(|c| c.expired_on == 0).collect())
    }

    fn certs_to_expire(&self, median_time: Timestamp) -> StoreResult<Vec<CertEntry>> {
        Ok(reduce_by(&self.certs)
            .into_iter()
            .filter(|c| c.expired_on == 0 && c.expires_on.is_some_and(|t| t <= median_time))
            .collect())
    }
}

impl SourceIndexReader for MemoryLedger {
    fn source(&self, kind: SourceKind, identifier: &str, pos: u64) -> StoreResult<Option<SourceEntry>> {
        let entries: Vec<_> = self
            .sources
            .iter()
            .filter(|s| s.kind == kind && s.identifier == identifier && s.pos == pos)
            .cloned()
            .collect();
        Ok(reduce(&entries))
    }

    fn available_sources_of(&self, conditions: &str) -> StoreResult<Vec<SourceEntry>> {
        Ok(self.reduced_sources().into_iter().filter(|s| !s.consumed && s.conditions == conditions).collect())
    }
}

impl WalletReader for MemoryLedger {
    fn wallet_balance(&self, conditions: &str) -> StoreResult<i64> {
        Ok(self.wallets.get(conditions).copied().unwrap_or(0))
    }
}

impl CommitSink for MemoryLedger {
    fn commit(&mut self, block: &Block, head: &ChainHead, batch: &IndexBatch) -> StoreResult<()> {
        if let Some(top) = self.heads.last() {
            if head.number != top.number + 1 {
                return Err(StoreError::DataInconsistency(format!(
                    "commit of block #{} on top of #{}",
                    head.number, top.number
                )));
            }
        } else if head.number != 0 {
            return Err(StoreError::DataInconsistency(format!("commit of block #{} on an empty ledger", head.number)));
        }
        self.blocks.push(block.clone());
        self.heads.push(head.clone());
        self.identities.extend(batch.identities.iter().cloned());
        self.memberships.extend(batch.memberships.iter().cloned());
        self.certs.extend(batch.certs.iter().cloned());
        self.sources.extend(batch.sources.iter().cloned());
        self.apply_wallet_moves(&batch.sources, false);
        Ok(())
    }

    fn remove_block(&mut self, number: BlockNumber) -> StoreResult<(Block, IndexBatch)> {
        match self.heads.last() {
            Some(top) if top.number == number => {}
            _ => return Err(StoreError::BlockNotFound(number)),
        }
        self.heads.pop();
        let block = self.blocks.pop().ok_or(StoreError::BlockNotFound(number))?;
        let batch = IndexBatch {
            identities: self.identities.iter().filter(|e| e.written_on.number == number).cloned().collect(),
            memberships: self.memberships.iter().filter(|e| e.written_on.number == number).cloned().collect(),
            certs: self.certs.iter().filter(|e| e.written_on.number == number).cloned().collect(),
            sources: self.sources.iter().filter(|e| e.written_on.number == number).cloned().collect(),
        };
        self.identities.retain(|e| e.written_on.number != number);
        self.memberships.retain(|e| e.written_on.number != number);
        self.certs.retain(|e| e.written_on.number != number);
        self.sources.retain(|e| e.written_on.number != number);
        self.apply_wallet_moves(&batch.sources, true);
        Ok((block, batch))
    }

    fn trim(&mut self, below: BlockNumber) -> StoreResult<()> {
        self.heads.retain(|h| h.number > below);
        self.identities = compact(&self.identities, below);
        self.memberships = compact(&self.memberships, below);
        // Fully expired certifications and fully consumed sources older
        // than the window can be forgotten entirely.
        self.certs = compact(&self.certs, below)
            .into_iter()
            .filter(|c| !(c.expired_on > 0 && c.written_on.number <= below))
            .collect();
        self.sources = compact(&self.sources, below)
            .into_iter()
            .filter(|s| !(s.consumed && s.written_on.number <= below))
            .collect();
        Ok(())
    }
}

/// Replaces, per record, every entry written at or below `below` by its
/// reduction, keeping later entries untouched. Reads reduce in write order
/// so the compacted entry takes the slot of the record's first entry.
fn compact<T: Reducible + Clone>(entries: &[T], below: BlockNumber) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.written_number() <= below {
            match out.iter_mut().find(|e| e.key() == entry.key() && e.written_number() <= below) {
                Some(existing) => existing.merge(entry),
                None => out.push(entry.clone()),
            }
        } else {
            out.push(entry.clone());
        }
    }
    out
}
