//! Fork resolution.
//!
//! A node follows one chain but keeps candidate fork blocks in a pool.
//! [`Switcher`] decides when to leave the current branch: an alternative
//! branch must be ahead by a configured number of blocks AND a matching
//! amount of median time before it is even considered, the branch
//! reaching the highest block wins, and the switch only happens if that
//! winner is itself still far enough ahead. Branch trials happen on the
//! live ledger, by reverting to the fork point, replaying the candidate
//! blocks, and rolling everything back.

use crate::pipeline::applier::Chain;
use trellis_consensus_core::api::{CommitSink, LedgerView, SignatureVerifier, WotGraph};
use trellis_consensus_core::block::Block;
use trellis_consensus_core::blockstamp::Blockstamp;
use trellis_consensus_core::config::Params;
use trellis_consensus_core::errors::ConsensusResult;
use trellis_consensus_core::hash::Hash;
use trellis_consensus_core::{BlockNumber, Timestamp};

/// Chain access needed by the switcher, kept narrow so trials can be
/// scripted in tests.
pub trait ForkResolutionDao {
    /// Number and median time of the current head.
    fn current(&self) -> ConsensusResult<Option<(BlockNumber, Timestamp)>>;

    /// Snapshot of the fork block pool.
    fn fork_pool(&self) -> Vec<Block>;

    /// Whether the block `number`-`hash` sits on the followed chain.
    fn on_chain(&self, number: BlockNumber, hash: &Hash) -> ConsensusResult<bool>;

    /// Reverts the chain down to `number` included, returning the removed
    /// blocks top first.
    fn revert_to(&mut self, number: BlockNumber) -> ConsensusResult<Vec<Block>>;

    /// Checks and commits one block on top of the current head.
    fn apply(&mut self, block: &Block) -> ConsensusResult<()>;

    fn mark_invalid(&mut self, bs: Blockstamp);
    fn is_invalid(&self, bs: &Blockstamp) -> bool;
    fn drop_from_pool(&mut self, bs: &Blockstamp);
}

/// A candidate branch: the chain blocks above `fork_point` are to be
/// replaced by `blocks`, ascending.
struct Suite {
    fork_point: BlockNumber,
    blocks: Vec<Block>,
}

pub struct Switcher {
    params: Params,
}

impl Switcher {
    pub fn new(params: Params) -> Self {
        Self { params }
    }

    /// Examines the fork pool and switches to a better branch when one
    /// exists. Returns the blockstamp of the new head when a switch
    /// happened.
    pub fn try_to_fork<D: ForkResolutionDao>(&self, dao: &mut D) -> ConsensusResult<Option<Blockstamp>> {
        let Some((current_number, current_time)) = dao.current()? else {
            return Ok(None);
        };
        let number_start = current_number + self.params.switch_on_head_advance;
        let time_start = current_time + self.params.switch_on_head_advance * self.params.avg_gen_time;

        let suites = self.find_potential_suites(dao, number_start, time_start)?;
        let best = self.find_longest_branch(dao, suites)?;

        let Some(suite) = best else {
            return Ok(None);
        };
        // The advance thresholds apply to the selected branch alone: when
        // the longest one falls short, no switch happens at all, even if a
        // shorter branch would have qualified.
        let far_enough = suite
            .blocks
            .last()
            .is_some_and(|last| last.number >= number_start && last.median_time >= time_start);
        if !far_enough {
            return Ok(None);
        }
        let head = suite.blocks.last().map(Block::blockstamp);
        log::info!(
            "switching to fork branch of {} blocks above #{}",
            suite.blocks.len(),
            suite.fork_point
        );
        dao.revert_to(suite.fork_point)?;
        for block in &suite.blocks {
            dao.apply(block)?;
            dao.drop_from_pool(&block.blockstamp());
        }
        Ok(head)
    }

    /// Builds every branch of the pool whose head is far enough ahead,
    /// walking `previous_hash` links back to a block of the followed
    /// chain. Branches with a missing link or a fork point out of the
    /// window are discarded.
    fn find_potential_suites<D: ForkResolutionDao>(
        &self,
        dao: &D,
        number_start: BlockNumber,
        time_start: Timestamp,
    ) -> ConsensusResult<Vec<Suite>> {
        let pool = dao.fork_pool();
        let mut suites = Vec::new();
        for candidate in &pool {
            if candidate.number < number_start
                || candidate.median_time < time_start
                || dao.is_invalid(&candidate.blockstamp())
            {
                continue;
            }
            if let Some(suite) = self.build_suite(dao, &pool, candidate)? {
                suites.push(suite);
            }
        }
        Ok(suites)
    }

    fn build_suite<D: ForkResolutionDao>(&self, dao: &D, pool: &[Block], head: &Block) -> ConsensusResult<Option<Suite>> {
        let mut blocks = vec![head.clone()];
        loop {
            let last = &blocks[blocks.len() - 1];
            let Some(previous_hash) = last.previous_hash else {
                // A competing genesis cannot be forked to.
                return Ok(None);
            };
            let previous_number = last.number - 1;
            if head.number - previous_number > self.params.fork_window_size {
                log::debug!("fork branch of {} exceeds the window", head.blockstamp());
                return Ok(None);
            }
            if dao.on_chain(previous_number, &previous_hash)? {
                blocks.reverse();
                return Ok(Some(Suite { fork_point: previous_number, blocks }));
            }
            match pool.iter().find(|b| b.number == previous_number && b.hash == previous_hash) {
                Some(previous) => blocks.push(previous.clone()),
                None => return Ok(None),
            }
        }
    }

    /// Tries every suite on the live ledger and keeps the one reaching the
    /// highest block, counting only the blocks that pass their checks.
    /// Each trial is rolled back before the next; a block failing its
    /// checks is remembered as invalid so it is never tried again.
    fn find_longest_branch<D: ForkResolutionDao>(
        &self,
        dao: &mut D,
        suites: Vec<Suite>,
    ) -> ConsensusResult<Option<Suite>> {
        let mut best: Option<Suite> = None;
        for suite in suites {
            let reverted = dao.revert_to(suite.fork_point)?;
            let mut added = Vec::new();
            for block in &suite.blocks {
                match dao.apply(block) {
                    Ok(()) => added.push(block.clone()),
                    Err(e) if e.is_block_rejection() => {
                        log::warn!("fork block {} rejected: {}", block.blockstamp(), e);
                        dao.mark_invalid(block.blockstamp());
                        dao.drop_from_pool(&block.blockstamp());
                        break;
                    }
                    Err(e) => return Err(e),
                }
            }
            // Roll the trial back and restore the branch we follow.
            dao.revert_to(suite.fork_point)?;
            for block in reverted.iter().rev() {
                dao.apply(block)?;
            }

            if added.is_empty() {
                continue;
            }
            let reached = suite.fork_point + added.len() as u64;
            if best.as_ref().map_or(true, |b| b.fork_point + (b.blocks.len() as u64) < reached) {
                best = Some(Suite { fork_point: suite.fork_point, blocks: added });
            }
        }
        Ok(best)
    }
}

impl<L, W, V> ForkResolutionDao for Chain<L, W, V>
where
    L: LedgerView + CommitSink,
    W: WotGraph + Clone,
    V: SignatureVerifier,
{
    fn current(&self) -> ConsensusResult<Option<(BlockNumber, Timestamp)>> {
        Ok(self.ledger.head()?.map(|h| (h.number, h.median_time)))
    }

    fn fork_pool(&self) -> Vec<Block> {
        self.forks.clone()
    }

    fn on_chain(&self, number: BlockNumber, hash: &Hash) -> ConsensusResult<bool> {
        Ok(self.ledger.full_block(number, hash)?.is_some())
    }

    fn revert_to(&mut self, number: BlockNumber) -> ConsensusResult<Vec<Block>> {
        let mut removed = Vec::new();
        while self.ledger.head()?.is_some_and(|h| h.number > number) {
            removed.push(self.revert_top()?);
        }
        Ok(removed)
    }

    fn apply(&mut self, block: &Block) -> ConsensusResult<()> {
        self.apply_block(block).map(|_| ())
    }

    fn mark_invalid(&mut self, bs: Blockstamp) {
        if !self.invalid_forks.contains(&bs) {
            self.invalid_forks.push(bs);
        }
    }

    fn is_invalid(&self, bs: &Blockstamp) -> bool {
        self.invalid_forks.contains(bs)
    }

    fn drop_from_pool(&mut self, bs: &Blockstamp) {
        self.forks.retain(|b| b.blockstamp() != *bs);
    }
}
