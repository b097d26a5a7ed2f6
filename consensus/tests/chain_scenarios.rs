//! End-to-end chain scenarios: a currency bootstrapped by three founders,
//! dividends, membership growth, reverts and fork switches, all against
//! the in-memory stores.

use trellis_consensus::model::stores::MemoryLedger;
use trellis_consensus::model::wot::MemoryWot;
use trellis_consensus::processes::{head as head_process, local_index};
use trellis_consensus::{Chain, CheckProfile, Switcher};
use trellis_consensus_core::api::{
    HeadReader, IdentityIndexReader, MembershipIndexReader, SignatureVerifier, SourceIndexReader, WalletReader, WotGraph,
};
use trellis_consensus_core::block::{
    Block, CertificationDoc, IdentityDoc, MembershipDoc, RevocationDoc, Transaction, TxInput, TxOutput, TxUnlock,
    UnlockParam,
};
use trellis_consensus_core::blockstamp::Blockstamp;
use trellis_consensus_core::config::Params;
use trellis_consensus_core::errors::{ConsensusError, RuleError};
use trellis_consensus_core::hash::Hash;
use trellis_consensus_core::index::SourceKind;
use trellis_consensus_core::keys::Pubkey;
use trellis_consensus_core::Timestamp;

const T0: Timestamp = 1_500_000_000;
const FOUNDERS: [(&str, &str); 3] = [("F1", "alice"), ("F2", "bob"), ("F3", "carol")];

/// Accepts every signature; the chains under test run with
/// [`CheckProfile::SkipPowAndSignature`] and forged documents.
struct Approving;

impl SignatureVerifier for Approving {
    fn block_sig_ok(&self, _: &Block) -> bool {
        true
    }
    fn identity_sig_ok(&self, _: &IdentityDoc) -> bool {
        true
    }
    fn membership_sig_ok(&self, _: &MembershipDoc, _: &str, _: &str) -> bool {
        true
    }
    fn certification_sig_ok(&self, _: &CertificationDoc, _: &str, _: Blockstamp) -> bool {
        true
    }
    fn revocation_sig_ok(&self, _: &Pubkey, _: &str, _: Blockstamp, _: &str) -> bool {
        true
    }
    fn transaction_sig_ok(&self, _: &Transaction, _: usize) -> bool {
        true
    }
}

type TestChain = Chain<MemoryLedger, MemoryWot, Approving>;

fn tag(number: u64, branch: u8) -> Hash {
    let mut bytes = [0u8; 32];
    bytes[0] = branch;
    bytes[1..9].copy_from_slice(&number.to_be_bytes());
    Hash::from_bytes(bytes)
}

fn draft(number: u64, branch: u8, time: Timestamp) -> Block {
    Block {
        version: 10,
        number,
        currency: "trellis_test".into(),
        hash: tag(number, branch),
        previous_hash: None,
        issuer: Pubkey::from("F1"),
        previous_issuer: None,
        signature: String::new(),
        time,
        median_time: time,
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

/// Fills in the header fields a valid block must share with its computed
/// head: median time, counters, frame, difficulty and dividend.
fn seal(chain: &TestChain, block: &mut Block) {
    let prev = chain.ledger.head().unwrap();
    block.previous_hash = prev.as_ref().map(|p| p.hash);
    block.previous_issuer = prev.as_ref().map(|p| p.issuer.clone());

    let index = local_index::extract(block, chain.params());
    let joins = index.identities.iter().filter(|i| i.member == Some(true)).count() as u64;
    let leaves = index.identities.iter().filter(|i| i.member == Some(false)).count() as u64;
    let recent = match &prev {
        Some(p) => {
            let needed = p
                .issuers_frame
                .max(chain.params().median_time_blocks)
                .max(chain.params().dt_diff_eval) as usize;
            chain.ledger.recent_heads(needed).unwrap()
        }
        None => Vec::new(),
    };
    let head = head_process::compute_head(chain.params(), block, &recent, joins, leaves, true);

    block.median_time = head.median_time;
    block.members_count = head.members_count;
    block.issuers_count = head.issuers_count;
    block.issuers_frame = head.issuers_frame;
    block.issuers_frame_var = head.issuers_frame_var;
    block.pow_min = head.pow_min;
    block.dividend = head.new_dividend;
    block.unit_base = head.unit_base;
}

fn identity(pubkey: &str, uid: &str, created_on: Blockstamp) -> IdentityDoc {
    IdentityDoc { pubkey: Pubkey::from(pubkey), uid: uid.into(), created_on, sig: "SIG".into() }
}

fn membership(pubkey: &str, created_on: Blockstamp) -> MembershipDoc {
    MembershipDoc { pubkey: Pubkey::from(pubkey), created_on, sig: "SIG".into() }
}

fn cert(issuer: &str, receiver: &str, block_number: u64) -> CertificationDoc {
    CertificationDoc { issuer: Pubkey::from(issuer), receiver: Pubkey::from(receiver), block_number, sig: "SIG".into() }
}

fn genesis_block(branch: u8) -> Block {
    let mut b = draft(0, branch, T0);
    for (pubkey, uid) in FOUNDERS {
        b.identities.push(identity(pubkey, uid, Blockstamp::zero()));
        b.joiners.push(membership(pubkey, Blockstamp::zero()));
    }
    for (issuer, _) in FOUNDERS {
        for (receiver, _) in FOUNDERS {
            if issuer != receiver {
                b.certifications.push(cert(issuer, receiver, 0));
            }
        }
    }
    b
}

/// A chain bootstrapped with three mutually certified founders.
fn founded_chain() -> TestChain {
    let mut chain = Chain::new(
        Params::for_tests(),
        MemoryLedger::new(),
        MemoryWot::default(),
        Approving,
        CheckProfile::SkipPowAndSignature,
    );
    let mut genesis = genesis_block(0);
    seal(&chain, &mut genesis);
    chain.apply_block(&genesis).unwrap();
    chain
}

/// Seals and applies an empty block on top of the chain.
fn grow(chain: &mut TestChain, number: u64, branch: u8, time: Timestamp) -> Block {
    let mut b = draft(number, branch, time);
    seal(chain, &mut b);
    chain.apply_block(&b).unwrap();
    b
}

#[test]
fn genesis_admits_the_founders() {
    let chain = founded_chain();
    let head = chain.ledger.head().unwrap().unwrap();
    assert_eq!(head.number, 0);
    assert_eq!(head.members_count, 3);
    assert_eq!(chain.ledger.members().unwrap().len(), 3);
    assert_eq!(chain.wot.node_count(), 3);
    for (pubkey, _) in FOUNDERS {
        let idty = chain.ledger.identity(&Pubkey::from(pubkey)).unwrap().unwrap();
        assert_eq!(idty.member, Some(true));
        assert!(idty.wot_id.is_some());
    }
}

#[test]
fn universal_dividend_reaches_every_member() {
    let mut chain = founded_chain();
    // Genesis sits exactly on the first dividend time: the next block
    // creates one.
    let b1 = grow(&mut chain, 1, 0, T0 + 100);
    assert_eq!(b1.dividend, Some(100));
    for (pubkey, _) in FOUNDERS {
        assert_eq!(chain.ledger.wallet_balance(&format!("SIG({pubkey})")).unwrap(), 100);
        let source = chain.ledger.source(SourceKind::Dividend, pubkey, 1).unwrap().unwrap();
        assert_eq!(source.amount, 100);
        assert!(!source.consumed);
    }
}

#[test]
fn a_dividend_can_be_spent() {
    let mut chain = founded_chain();
    let b1 = grow(&mut chain, 1, 0, T0 + 100);

    let mut b2 = draft(2, 0, T0 + 200);
    b2.transactions.push(Transaction {
        hash: tag(900, 9),
        blockstamp: b1.blockstamp(),
        locktime: 0,
        issuers: vec![Pubkey::from("F1")],
        inputs: vec![TxInput { amount: 100, base: 0, kind: SourceKind::Dividend, identifier: "F1".into(), pos: 1 }],
        unlocks: vec![TxUnlock { input_index: 0, params: vec![UnlockParam::Sig(0)] }],
        outputs: vec![TxOutput { amount: 100, base: 0, conditions: "SIG(F2)".into() }],
        signatures: vec!["SIG".into()],
        comment: String::new(),
    });
    seal(&chain, &mut b2);
    chain.apply_block(&b2).unwrap();

    assert_eq!(chain.ledger.wallet_balance("SIG(F1)").unwrap(), 0);
    assert_eq!(chain.ledger.wallet_balance("SIG(F2)").unwrap(), 200);
    let spent = chain.ledger.source(SourceKind::Dividend, "F1", 1).unwrap().unwrap();
    assert!(spent.consumed);
}

#[test]
fn monetary_mass_matches_the_sum_of_balances() {
    let mut chain = founded_chain();
    let mut anchor = None;
    for n in 1..=120 {
        anchor = Some(grow(&mut chain, n, 0, T0 + 100 * n));
    }
    let anchor = anchor.unwrap();

    // A transaction moves money around without creating or destroying any.
    let source = chain.ledger.source(SourceKind::Dividend, "F1", 1).unwrap().unwrap();
    let mut b = draft(121, 0, T0 + 100 * 121);
    b.transactions.push(Transaction {
        hash: tag(901, 9),
        blockstamp: anchor.blockstamp(),
        locktime: 0,
        issuers: vec![Pubkey::from("F1")],
        inputs: vec![TxInput {
            amount: source.amount,
            base: source.base,
            kind: SourceKind::Dividend,
            identifier: "F1".into(),
            pos: 1,
        }],
        unlocks: vec![TxUnlock { input_index: 0, params: vec![UnlockParam::Sig(0)] }],
        outputs: vec![TxOutput { amount: source.amount, base: source.base, conditions: "SIG(F2)".into() }],
        signatures: vec!["SIG".into()],
        comment: String::new(),
    });
    seal(&chain, &mut b);
    chain.apply_block(&b).unwrap();

    let head = chain.ledger.head().unwrap().unwrap();
    assert!(head.mass > 0);
    // The dividend was reevaluated upwards along the way.
    assert!(head.dividend > chain.params().ud0);
    let total: i64 = FOUNDERS
        .iter()
        .map(|(pubkey, _)| chain.ledger.wallet_balance(&format!("SIG({pubkey})")).unwrap())
        .sum();
    assert_eq!(total as u64, head.mass);
}

fn join_block(chain: &TestChain, number: u64, time: Timestamp, certifiers: &[&str]) -> Block {
    let genesis_stamp = Blockstamp { number: 0, hash: tag(0, 0) };
    let mut b = draft(number, 0, time);
    b.identities.push(identity("DDD", "dave", genesis_stamp));
    b.joiners.push(membership("DDD", genesis_stamp));
    for certifier in certifiers {
        b.certifications.push(cert(certifier, "DDD", 0));
    }
    seal(chain, &mut b);
    b
}

#[test]
fn an_under_certified_candidate_is_rejected() {
    let mut chain = founded_chain();
    let b1 = join_block(&chain, 1, T0 + 100, &["F1"]);
    let err = chain.apply_block(&b1).unwrap_err();
    assert!(matches!(err, ConsensusError::Rule(RuleError::MembershipEnoughCerts)));
    // Nothing was committed.
    assert_eq!(chain.ledger.head().unwrap().unwrap().number, 0);
    assert_eq!(chain.ledger.members().unwrap().len(), 3);
    assert_eq!(chain.wot.node_count(), 3);
}

#[test]
fn a_certified_candidate_joins_and_a_revert_undoes_it() {
    let mut chain = founded_chain();
    let b1 = join_block(&chain, 1, T0 + 100, &["F1", "F2"]);
    chain.apply_block(&b1).unwrap();

    assert_eq!(chain.ledger.members().unwrap().len(), 4);
    assert_eq!(chain.wot.node_count(), 4);
    let dave = chain.ledger.identity(&Pubkey::from("DDD")).unwrap().unwrap();
    let dave_node = dave.wot_id.unwrap();
    assert_eq!(chain.wot.is_enabled(dave_node), Some(true));
    assert!(chain.wot.has_link(0, dave_node));

    let reverted = chain.revert_top().unwrap();
    assert_eq!(reverted.hash, b1.hash);
    assert_eq!(chain.ledger.head().unwrap().unwrap().number, 0);
    assert_eq!(chain.ledger.members().unwrap().len(), 3);
    assert_eq!(chain.wot.node_count(), 3);
    assert!(chain.ledger.identity(&Pubkey::from("DDD")).unwrap().is_none());
}

#[test]
fn a_revoked_founder_is_excluded_from_the_ledger() {
    let mut chain = founded_chain();
    let mut b1 = draft(1, 0, T0 + 100);
    b1.revoked.push(RevocationDoc { pubkey: Pubkey::from("F3"), sig: "SIG".into() });
    b1.excluded.push(Pubkey::from("F3"));
    seal(&chain, &mut b1);
    chain.apply_block(&b1).unwrap();

    assert_eq!(chain.ledger.members().unwrap().len(), 2);
    let f3 = chain.ledger.identity(&Pubkey::from("F3")).unwrap().unwrap();
    assert_eq!(f3.member, Some(false));
    assert!(chain.ledger.membership(&Pubkey::from("F3")).unwrap().unwrap().is_revoked());
    assert_eq!(chain.wot.is_enabled(f3.wot_id.unwrap()), Some(false));
}

#[test]
fn a_longer_fork_branch_takes_over() {
    let mut main = founded_chain();
    let mut fork = founded_chain();

    grow(&mut main, 1, 0, T0 + 100);

    // The fork branch is built on an identical twin of the ledger, five
    // blocks deep and far enough in median time.
    let fork_blocks: Vec<Block> = (1..=5).map(|n| grow(&mut fork, n, 1, T0 + 400 * n)).collect();
    for block in &fork_blocks {
        assert!(main.receive_block(block.clone()).unwrap().is_none());
    }
    assert_eq!(main.ledger.head().unwrap().unwrap().number, 1);

    let switched = Switcher::new(Params::for_tests()).try_to_fork(&mut main).unwrap();
    assert_eq!(switched, Some(fork_blocks[4].blockstamp()));
    let head = main.ledger.head().unwrap().unwrap();
    assert_eq!(head.number, 5);
    assert_eq!(head.hash, tag(5, 1));
}
