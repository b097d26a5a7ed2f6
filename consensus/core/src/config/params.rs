use serde::{Deserialize, Serialize};

/// Currency parameters. The genesis block of a currency embeds them; every
/// later block must be validated against the set captured at genesis.
///
/// All durations are in seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Params {
    /// Currency name, propagated to every non-genesis head.
    pub currency: String,

    /// Relative growth rate of the universal dividend per reevaluation
    /// period.
    pub c: f64,
    /// Time between two universal dividend creations.
    pub dt: u64,
    /// Amount of the first universal dividend.
    pub ud0: u64,
    /// First universal dividend creation time.
    pub ud_time0: u64,
    /// First universal dividend reevaluation time.
    pub ud_reeval_time0: u64,
    /// Time between two universal dividend reevaluations.
    pub dt_reeval: u64,

    /// Minimum delay between two certifications issued by the same key.
    pub sig_period: u64,
    /// Maximum number of active certifications issued by one key.
    pub sig_stock: u32,
    /// Window during which a certification document can be written.
    pub sig_window: u64,
    /// Validity duration of a certification.
    pub sig_validity: u64,
    /// Number of received certifications required to become a member.
    pub sig_qty: u32,

    /// Window during which an identity document can be written.
    pub idty_window: u64,
    /// Window during which a membership document can be written.
    pub ms_window: u64,
    /// Validity duration of a membership.
    pub ms_validity: u64,
    /// Minimum delay between two membership documents from the same key.
    pub ms_period: u64,

    /// Maximum distance, in certification hops, between a member and
    /// `x_percent` of the distance sentries.
    pub step_max: u32,
    /// Fraction of the sentries that must be reachable within `step_max`
    /// hops.
    pub x_percent: f64,

    /// Number of blocks over which the median time is computed.
    pub median_time_blocks: u64,
    /// Targeted average time between two blocks.
    pub avg_gen_time: u64,
    /// Number of blocks between two difficulty reevaluations.
    pub dt_diff_eval: u64,
    /// Share of recent issuers used to scale the per-issuer difficulty
    /// rotation handicap.
    pub percent_rot: f64,

    /// Depth of the fork window: blocks deeper than this below HEAD can no
    /// longer be reverted, and fork branches rooted below it are ignored.
    pub fork_window_size: u64,
    /// A fork chain is only switched to when it is at least this many
    /// blocks, and this many average block times, ahead ("3-3 rule").
    pub switch_on_head_advance: u64,
}

impl Params {
    /// Parameters of the main currency network.
    pub fn main() -> Self {
        Params {
            currency: "trellis".into(),
            c: 0.0488,
            dt: 86_400,
            ud0: 1_000,
            ud_time0: 1_488_970_800,
            ud_reeval_time0: 1_490_094_000,
            dt_reeval: 15_778_800,
            sig_period: 432_000,
            sig_stock: 100,
            sig_window: 5_259_600,
            sig_validity: 63_115_200,
            sig_qty: 5,
            idty_window: 5_259_600,
            ms_window: 5_259_600,
            ms_validity: 31_557_600,
            ms_period: 5_259_600,
            step_max: 5,
            x_percent: 0.8,
            median_time_blocks: 24,
            avg_gen_time: 300,
            dt_diff_eval: 12,
            percent_rot: 0.67,
            fork_window_size: 100,
            switch_on_head_advance: 3,
        }
    }

    /// Small, fast parameters for unit tests: one-block windows, short
    /// periods, two certifications to join.
    pub fn for_tests() -> Self {
        Params {
            currency: "trellis_test".into(),
            c: 0.1,
            dt: 100,
            ud0: 100,
            ud_time0: 1_500_000_000,
            ud_reeval_time0: 1_500_000_000,
            dt_reeval: 1_000,
            sig_period: 0,
            sig_stock: 100,
            sig_window: 10_000,
            sig_validity: 10_000,
            sig_qty: 2,
            idty_window: 10_000,
            ms_window: 10_000,
            ms_validity: 10_000,
            ms_period: 0,
            step_max: 5,
            x_percent: 0.8,
            median_time_blocks: 3,
            avg_gen_time: 100,
            dt_diff_eval: 10,
            percent_rot: 0.67,
            fork_window_size: 10,
            switch_on_head_advance: 3,
        }
    }
}
