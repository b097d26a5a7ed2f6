//! Distance rule evaluation.
//!
//! A member must stay within `step_max` certification hops of `x_percent`
//! of the sentries. The check runs over a sandbox copy of the web of trust
//! so that newcomers and the certifications of the block under scrutiny
//! can be grafted in without touching the committed graph.

use std::collections::HashSet;
use trellis_consensus_core::api::{WotGraph, WotId};
use trellis_consensus_core::config::Params;
use trellis_consensus_core::keys::Pubkey;

/// Whether any of `checked` ends up outdistanced once the newcomers and
/// certifications of the block are grafted onto the graph.
///
/// `resolve` maps a pubkey to its committed graph node; pubkeys without
/// one get a temporary, disabled node. `block_certs` are the (issuer,
/// receiver) pairs certified inside the block.
pub fn people_are_outdistanced<W: WotGraph + Clone>(
    params: &Params,
    wot: &W,
    members_count: u64,
    checked: &[Pubkey],
    resolve: impl Fn(&Pubkey) -> Option<WotId>,
    block_certs: &[(Pubkey, Pubkey)],
) -> bool {
    let mut sandbox = wot.clone();
    let mut temp_ids: Vec<(Pubkey, WotId)> = Vec::new();
    let mut id_of = |sandbox: &mut W, temp_ids: &mut Vec<(Pubkey, WotId)>, pubkey: &Pubkey| -> WotId {
        if let Some(id) = resolve(pubkey) {
            return id;
        }
        if let Some((_, id)) = temp_ids.iter().find(|(p, _)| p == pubkey) {
            return *id;
        }
        let id = sandbox.add_node();
        sandbox.set_enabled(id, false);
        temp_ids.push((pubkey.clone(), id));
        id
    };

    for (issuer, receiver) in block_certs {
        let from = id_of(&mut sandbox, &mut temp_ids, issuer);
        let to = id_of(&mut sandbox, &mut temp_ids, receiver);
        sandbox.add_link(from, to);
    }

    let d_sen = (members_count as f64).powf(1.0 / params.step_max as f64).ceil() as usize;
    checked.iter().any(|pubkey| {
        let node = id_of(&mut sandbox, &mut temp_ids, pubkey);
        outdistanced(&sandbox, node, d_sen, params.step_max, params.x_percent)
    })
}

fn outdistanced<W: WotGraph>(wot: &W, node: WotId, d_sen: usize, step_max: u32, x_percent: f64) -> bool {
    let mut area: HashSet<WotId> = HashSet::new();
    area.insert(node);
    let mut border: HashSet<WotId> = HashSet::new();
    border.insert(node);
    for _ in 0..step_max {
        let mut next = HashSet::new();
        for &id in &border {
            for source in wot.sources_of(id) {
                if !area.contains(&source) {
                    next.insert(source);
                }
            }
        }
        area.extend(next.iter().copied());
        border = next;
    }

    let sentries = wot.sentries(d_sen);
    let mut success = area.iter().filter(|n| sentries.contains(n)).count() as u32;
    let mut sentries_count = sentries.len() as u32;
    if wot.is_sentry(node, d_sen) == Some(true) {
        sentries_count -= 1;
        success -= 1;
    }
    f64::from(success) < (x_percent * f64::from(sentries_count)).trunc() - 1.0
}
