//! Chain-head computation.
//!
//! Derives every head field of a candidate block from the block itself and
//! the window of recent heads. The values computed here are the reference
//! the block's own header fields are checked against; the function is pure
//! so it can be used both for validation and for sealing blocks in tests.

use itertools::Itertools;
use trellis_consensus_core::block::Block;
use trellis_consensus_core::config::Params;
use trellis_consensus_core::constants::{NB_DIGITS_UD, POW_DIFFICULTY_RANGE_RATIO};
use trellis_consensus_core::head::ChainHead;

/// Computes the head of `block` on top of `recent`, the stored heads
/// newest first (empty for a genesis block).
///
/// `joins` and `leaves` are the counts of identity entries the block sets
/// to member and to non-member; `issuer_is_member` is the verdict of the
/// issuer lookup, carried into the head for the membership rule.
pub fn compute_head(params: &Params, block: &Block, recent: &[ChainHead], joins: u64, leaves: u64, issuer_is_member: bool) -> ChainHead {
    match recent.first() {
        Some(prev) => next_head(params, block, prev, recent, joins, leaves, issuer_is_member),
        None => genesis_head(params, block, joins, issuer_is_member),
    }
}

fn genesis_head(params: &Params, block: &Block, joins: u64, issuer_is_member: bool) -> ChainHead {
    let issuer_diff = block.pow_min;
    ChainHead {
        version: block.version,
        number: 0,
        hash: block.hash,
        previous_hash: None,
        issuer: block.issuer.clone(),
        previous_issuer: None,
        time: block.time,
        median_time: block.time,
        bsize: block.size,
        avg_block_size: 0,
        members_count: joins,
        issuers_count: 0,
        issuers_frame: 1,
        issuers_frame_var: 0,
        issuer_diff,
        issuer_is_member,
        pow_min: block.pow_min,
        pow_zeros: (issuer_diff / 16) as usize,
        pow_remainder: issuer_diff % 16,
        diff_number: params.dt_diff_eval,
        speed: 0.0,
        unit_base: 0,
        dividend: params.ud0,
        new_dividend: None,
        ud_time: params.ud_time0,
        ud_reeval_time: params.ud_reeval_time0,
        mass: 0,
        mass_reeval: 0,
    }
}

fn next_head(
    params: &Params,
    block: &Block,
    prev: &ChainHead,
    recent: &[ChainHead],
    joins: u64,
    leaves: u64,
    issuer_is_member: bool,
) -> ChainHead {
    let number = prev.number + 1;

    // Issuer rotation frame.
    let issuers_count = distinct_issuers(&recent[..(prev.issuers_frame as usize).min(recent.len())]);
    let issuers_frame = match prev.issuers_frame_var {
        v if v > 0 => prev.issuers_frame + 1,
        v if v < 0 => prev.issuers_frame - 1,
        _ => prev.issuers_frame,
    };
    let toward_zero = match prev.issuers_frame_var {
        v if v > 0 => -1,
        v if v < 0 => 1,
        _ => 0,
    };
    let issuers_frame_var = prev.issuers_frame_var + 5 * (issuers_count as i64 - prev.issuers_count as i64) + toward_zero;

    let avg_block_size = average(recent.iter().take(issuers_count as usize).map(|h| h.bsize));

    let time_window = (params.median_time_blocks as usize).min(number as usize);
    let median_time = prev.median_time.max(average(recent.iter().take(time_window).map(|h| h.time)));

    let diff_number =
        if prev.diff_number <= number { prev.diff_number + params.dt_diff_eval } else { prev.diff_number };

    let members_count = prev.members_count + joins - leaves;

    // Dividend clock.
    let ud_time = if prev.ud_time <= median_time { prev.ud_time + params.dt } else { prev.ud_time };
    let ud_reeval_time =
        if prev.ud_reeval_time <= median_time { prev.ud_reeval_time + params.dt_reeval } else { prev.ud_reeval_time };
    let reeval = ud_reeval_time != prev.ud_reeval_time;
    let mass_reeval = if reeval { prev.mass } else { prev.mass_reeval };

    let mut unit_base = prev.unit_base;
    let mut dividend = if reeval {
        let reduced_mass = (mass_reeval as f64 / 10f64.powi(prev.unit_base as i32)).ceil();
        (prev.dividend as f64 + params.c.powi(2) * reduced_mass / members_count as f64 / (params.dt_reeval as f64 / params.dt as f64))
            .ceil() as u64
    } else {
        prev.dividend
    };
    let mut new_dividend = (ud_time != prev.ud_time).then_some(dividend);
    if dividend >= 10u64.pow(NB_DIGITS_UD) {
        dividend = (dividend as f64 / 10.0).ceil() as u64;
        new_dividend = new_dividend.map(|_| dividend);
        unit_base += 1;
    }

    let mass = prev.mass + if new_dividend.is_some() { dividend * 10u64.pow(unit_base as u32) * members_count } else { 0 };

    // Block production speed over the difficulty window.
    let quantity = (params.dt_diff_eval as usize).min(number as usize);
    let elapsed = median_time.saturating_sub(recent[quantity - 1].median_time);
    let speed = if elapsed == 0 { 100.0 } else { quantity as f64 / elapsed as f64 };

    let pow_min = if diff_number != prev.diff_number { adjusted_pow_min(params, prev.pow_min, speed) } else { prev.pow_min };
    let issuer_diff = personal_difficulty(params, block, prev, recent, pow_min);

    ChainHead {
        version: block.version,
        number,
        hash: block.hash,
        previous_hash: Some(prev.hash),
        issuer: block.issuer.clone(),
        previous_issuer: Some(prev.issuer.clone()),
        time: block.time,
        median_time,
        bsize: block.size,
        avg_block_size,
        members_count,
        issuers_count,
        issuers_frame,
        issuers_frame_var,
        issuer_diff,
        issuer_is_member,
        pow_min,
        pow_zeros: (issuer_diff / 16) as usize,
        pow_remainder: issuer_diff % 16,
        diff_number,
        speed,
        unit_base,
        dividend,
        new_dividend,
        ud_time,
        ud_reeval_time,
        mass,
        mass_reeval,
    }
}

/// Difficulty ratchet, applied once per difficulty window.
fn adjusted_pow_min(params: &Params, prev_pow_min: u64, speed: f64) -> u64 {
    let min_gen_time = (params.avg_gen_time as f64 / POW_DIFFICULTY_RANGE_RATIO).floor();
    let max_gen_time = (params.avg_gen_time as f64 * POW_DIFFICULTY_RANGE_RATIO).ceil();
    let max_speed = 1.0 / min_gen_time;
    let min_speed = 1.0 / max_gen_time;
    if speed >= max_speed {
        // Crossing into the next difficulty unit costs two steps.
        if (prev_pow_min + 2) % 16 == 0 {
            prev_pow_min + 2
        } else {
            prev_pow_min + 1
        }
    } else if speed <= min_speed {
        if prev_pow_min % 16 == 0 {
            prev_pow_min.saturating_sub(2)
        } else {
            prev_pow_min.saturating_sub(1)
        }
    } else {
        prev_pow_min
    }
}

/// Per-issuer difficulty: the common floor raised by a rotation factor for
/// issuers who signed recently, plus a handicap for issuers holding an
/// excessive share of the frame.
fn personal_difficulty(params: &Params, block: &Block, prev: &ChainHead, recent: &[ChainHead], pow_min: u64) -> u64 {
    let frame = &recent[..(prev.issuers_frame as usize).min(recent.len())];
    let personal_in_frame = frame.iter().filter(|h| h.issuer == block.issuer).count() as u64;

    let mut per_issuer: Vec<u64> = frame
        .iter()
        .map(|h| &h.issuer)
        .unique()
        .map(|issuer| frame.iter().filter(|h| &h.issuer == issuer).count() as u64)
        .collect();
    let median_share = median(&mut per_issuer).max(1.0);
    let personal_excess = ((personal_in_frame + 1) as f64 / median_share - 1.0).max(0.0);
    let handicap = ((1.0 + personal_excess).ln() / POW_DIFFICULTY_RANGE_RATIO.ln()).floor() as u64;

    let last_personal = frame.iter().find(|h| h.issuer == block.issuer);
    let nb_previous_issuers = last_personal.map_or(0, |h| h.issuers_count);
    let nb_blocks_since = last_personal.map_or(0, |h| prev.number - h.number);

    let rotation = (params.percent_rot * nb_previous_issuers as f64 / (1 + nb_blocks_since) as f64).floor() as u64;
    let mut diff = pow_min.max(pow_min * rotation) + handicap;
    if (diff + 1) % 16 == 0 {
        diff += 1;
    }
    diff
}

fn distinct_issuers(heads: &[ChainHead]) -> u64 {
    heads.iter().map(|h| &h.issuer).unique().count() as u64
}

/// Floored average, zero on an empty range.
fn average(values: impl Iterator<Item = u64>) -> u64 {
    let (sum, count) = values.fold((0u64, 0u64), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0
    } else {
        sum / count
    }
}

/// Median of a sample; the mean of the two central values on even sizes.
fn median(values: &mut [u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid] as f64
    } else {
        (values[mid - 1] + values[mid]) as f64 / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_consensus_core::hash::Hash;
    use trellis_consensus_core::keys::Pubkey;
    use trellis_consensus_core::Timestamp as Ts;

    fn block(number: u64, issuer: &str, time: Ts) -> Block {
        Block {
            version: 10,
            number,
            currency: "trellis_test".into(),
            hash: Hash::EMPTY_DOC,
            previous_hash: (number > 0).then_some(Hash::EMPTY_DOC),
            issuer: Pubkey::from(issuer),
            previous_issuer: None,
            signature: String::new(),
            time,
            median_time: 0,
            members_count: 0,
            issuers_count: 0,
            issuers_frame: 1,
            issuers_frame_var: 0,
            pow_min: 0,
            dividend: None,
            unit_base: 0,
            size: 0,
            identities: vec![],
            joiners: vec![],
            actives: vec![],
            leavers: vec![],
            revoked: vec![],
            excluded: vec![],
            certifications: vec![],
            transactions: vec![],
        }
    }

    /// Plays `blocks` in order through [`compute_head`], returning the
    /// heads newest first.
    fn play(params: &Params, blocks: &[Block], joins: &[u64]) -> Vec<ChainHead> {
        let mut recent: Vec<ChainHead> = Vec::new();
        for (i, b) in blocks.iter().enumerate() {
            let head = compute_head(params, b, &recent, joins.get(i).copied().unwrap_or(0), 0, true);
            recent.insert(0, head);
        }
        recent
    }

    #[test]
    fn genesis_head_values() {
        let params = Params::for_tests();
        let head = compute_head(&params, &block(0, "AAA", 1_500_000_000), &[], 3, 0, true);
        assert_eq!(head.number, 0);
        assert_eq!(head.members_count, 3);
        assert_eq!(head.issuers_count, 0);
        assert_eq!(head.issuers_frame, 1);
        assert_eq!(head.median_time, 1_500_000_000);
        assert_eq!(head.dividend, params.ud0);
        assert_eq!(head.new_dividend, None);
        assert_eq!(head.mass, 0);
    }

    #[test]
    fn frame_grows_when_a_second_issuer_appears() {
        let params = Params::for_tests();
        let t0 = 1_500_000_000;
        let blocks =
            vec![block(0, "AAA", t0), block(1, "AAA", t0 + 100), block(2, "BBB", t0 + 200), block(3, "BBB", t0 + 300)];
        let heads = play(&params, &blocks, &[2]);
        // Block 1 discovers its first issuer: the frame variation jumps by
        // five, widening the frame one block per block afterwards.
        assert_eq!(heads[2].issuers_count, 1);
        assert_eq!(heads[2].issuers_frame_var, 5);
        assert_eq!(heads[1].issuers_frame, 2);
        // Block 3's two-block frame covers blocks 1 and 2, one per issuer.
        assert_eq!(heads[0].issuers_count, 2);
        assert_eq!(heads[0].issuers_frame, 3);
    }

    #[test]
    fn median_time_is_monotonic() {
        let params = Params::for_tests();
        let t0 = 1_500_000_000;
        let blocks = vec![block(0, "AAA", t0), block(1, "AAA", t0 + 500), block(2, "AAA", t0 + 100)];
        let heads = play(&params, &blocks, &[2]);
        assert!(heads[0].median_time >= heads[1].median_time);
    }

    #[test]
    fn dividend_is_produced_when_ud_time_is_reached() {
        let params = Params::for_tests();
        let t0 = params.ud_time0;
        // Genesis at ud_time0: block 1's median time reaches the UD clock.
        let blocks = vec![block(0, "AAA", t0), block(1, "AAA", t0 + 100)];
        let heads = play(&params, &blocks, &[2]);
        let head = &heads[0];
        assert_eq!(head.ud_time, params.ud_time0 + params.dt);
        assert!(head.new_dividend.is_some());
        assert_eq!(head.mass, head.dividend * 2);
    }

    #[test]
    fn members_count_tracks_joins_and_leaves() {
        let params = Params::for_tests();
        let t0 = 1_500_000_000;
        let heads = play(&params, &[block(0, "AAA", t0), block(1, "AAA", t0 + 100)], &[3, 1]);
        assert_eq!(heads[0].members_count, 4);
        let b2 = compute_head(&params, &block(2, "AAA", t0 + 200), &heads, 0, 2, true);
        assert_eq!(b2.members_count, 2);
    }

    #[test]
    fn average_and_median_helpers() {
        assert_eq!(average([].into_iter()), 0);
        assert_eq!(average([3, 4].into_iter()), 3);
        assert_eq!(median(&mut []), 0.0);
        assert_eq!(median(&mut [5, 1, 3]), 3.0);
        assert_eq!(median(&mut [1, 2, 3, 4]), 2.5);
    }
}
