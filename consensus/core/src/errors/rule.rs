use thiserror::Error;

/// A named protocol rule rejected the block.
///
/// The numbered identifiers (`BR_G49`..`BR_G110`) come from the protocol
/// rule catalogue and are part of the observable contract: independent
/// implementations and interoperability tests match on them. They are
/// reachable through [`RuleError::identifier`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    // Structural checks on the submitted block, outside the numbered
    // catalogue.
    #[error("block signature does not match its issuer")]
    BlockSignature,
    #[error("an identity signature does not match its key")]
    IdentitySignature,
    #[error("a membership signature does not match its key")]
    MembershipSignature,
    #[error("a transaction signature does not match its issuer")]
    TransactionSignature,
    #[error("genesis block must be signed by one of its own joiners")]
    GenesisIssuerNotFounder,
    #[error("identity user id appears twice in the block")]
    LocalUidConflict,
    #[error("identity pubkey appears twice in the block")]
    LocalPubkeyConflict,
    #[error("identity does not match an equivalent membership in the block")]
    LocalIdentityWithoutMembership,
    #[error("more than one membership for the same key in the block")]
    LocalMembershipUnicity,
    #[error("more than one revocation for the same key in the block")]
    LocalRevocationUnicity,
    #[error("more than one certification between the same keys in the block")]
    LocalCertificationUnicity,
    #[error("a source is referenced twice in the block")]
    LocalSourceUnicity,
    #[error("transaction input and output sums differ")]
    LocalTransactionSums,

    // Numbered catalogue, in evaluation order.
    #[error("block version does not follow the previous one")]
    Version,
    #[error("block exceeds the maximum acceptable size")]
    BlockSize,
    #[error("currency differs from the chain currency")]
    Currency,
    #[error("block number does not follow the chain head")]
    Number,
    #[error("previous hash does not match the chain head")]
    PreviousHash,
    #[error("previous issuer does not match the chain head")]
    PreviousIssuer,
    #[error("block issuer is not a member")]
    IssuerIsMember,
    #[error("issuers count does not match the computed head")]
    IssuersCount,
    #[error("issuers frame does not match the computed head")]
    IssuersFrame,
    #[error("issuers frame variation does not match the computed head")]
    IssuersFrameVar,
    #[error("median time does not match the computed head")]
    MedianTime,
    #[error("universal dividend does not match the computed head")]
    Dividend,
    #[error("unit base does not match the computed head")]
    UnitBase,
    #[error("members count does not match the computed head")]
    MembersCount,
    #[error("proof-of-work minimum does not match the computed head")]
    PowMin,
    #[error("wrong proof-of-work level: {given_zeros} zeros and '{next_char}' given, {required_zeros} zeros required")]
    ProofOfWork { given_zeros: usize, next_char: char, required_zeros: usize },
    #[error("an identity is too old to be written")]
    IdentityWritability,
    #[error("a membership is too old to be written")]
    MembershipWritability,
    #[error("a membership does not respect the membership period")]
    MembershipPeriod,
    #[error("a certification is too old to be written")]
    CertificationWritability,
    #[error("a certification issuer exceeds its certification stock")]
    CertificationStock,
    #[error("a certification does not respect the certification period")]
    CertificationPeriod,
    #[error("a certification issuer is not a member")]
    CertificationFromMember,
    #[error("a certification receiver is neither a member nor a newcomer")]
    CertificationToMemberOrNewcomer,
    #[error("a certification is issued to a leaver")]
    CertificationToLeaver,
    #[error("a certification replays an active certification")]
    CertificationReplay,
    #[error("a certification signature is wrong")]
    CertificationSignature,
    #[error("an identity user id is already taken")]
    IdentityUidUnicity,
    #[error("an identity pubkey is already taken")]
    IdentityPubkeyUnicity,
    #[error("a membership does not follow the previous one of the same key")]
    MembershipSuccession,
    #[error("a joining or renewing key is outdistanced from the web of trust")]
    MembershipDistance,
    #[error("a membership concerns a revoked identity")]
    MembershipOnRevoked,
    #[error("a key already member tries to join twice")]
    MembershipJoinsTwice,
    #[error("a joining or renewing key lacks certifications")]
    MembershipEnoughCerts,
    #[error("a leaver is not a member")]
    MembershipLeaverIsMember,
    #[error("a renewing key is not a member")]
    MembershipActiveIsMember,
    #[error("a revoked key is not a member")]
    MembershipRevokedIsMember,
    #[error("a key is revoked twice")]
    MembershipRevokedSingleton,
    #[error("a revocation signature is wrong")]
    MembershipRevocationSignature,
    #[error("an excluded key is not a member")]
    ExcludedIsMember,
    #[error("keys to be kicked are not all excluded exactly once")]
    ToBeKickedArePresent,
    #[error("a transaction is too old to be written")]
    TransactionWritability,
    #[error("a transaction input is not available")]
    InputIsAvailable,
    #[error("a transaction input does not satisfy its source conditions")]
    InputIsUnlocked,
    #[error("a transaction input is still time-locked")]
    InputIsTimeUnlocked,
    #[error("a transaction output uses a unit base above the current one")]
    OutputBase,
}

impl RuleError {
    /// Catalogue identifier of the rule, for rules that belong to the
    /// numbered protocol catalogue; structural checks return a stable
    /// `LOCAL_*` name instead.
    pub fn identifier(&self) -> &'static str {
        match self {
            RuleError::BlockSignature => "LOCAL_BLOCK_SIGNATURE",
            RuleError::IdentitySignature => "LOCAL_IDENTITY_SIGNATURE",
            RuleError::MembershipSignature => "LOCAL_MEMBERSHIP_SIGNATURE",
            RuleError::TransactionSignature => "LOCAL_TRANSACTION_SIGNATURE",
            RuleError::GenesisIssuerNotFounder => "LOCAL_GENESIS_ISSUER",
            RuleError::LocalUidConflict => "LOCAL_UID_CONFLICT",
            RuleError::LocalPubkeyConflict => "LOCAL_PUBKEY_CONFLICT",
            RuleError::LocalIdentityWithoutMembership => "LOCAL_IDENTITY_WITHOUT_MEMBERSHIP",
            RuleError::LocalMembershipUnicity => "LOCAL_MEMBERSHIP_UNICITY",
            RuleError::LocalRevocationUnicity => "LOCAL_REVOCATION_UNICITY",
            RuleError::LocalCertificationUnicity => "LOCAL_CERTIFICATION_UNICITY",
            RuleError::LocalSourceUnicity => "LOCAL_SOURCE_UNICITY",
            RuleError::LocalTransactionSums => "LOCAL_TRANSACTION_SUMS",
            RuleError::Version => "BR_G49",
            RuleError::BlockSize => "BR_G50",
            RuleError::Currency => "BR_G98",
            RuleError::Number => "BR_G51",
            RuleError::PreviousHash => "BR_G52",
            RuleError::PreviousIssuer => "BR_G53",
            RuleError::IssuerIsMember => "BR_G101",
            RuleError::IssuersCount => "BR_G54",
            RuleError::IssuersFrame => "BR_G55",
            RuleError::IssuersFrameVar => "BR_G56",
            RuleError::MedianTime => "BR_G57",
            RuleError::Dividend => "BR_G58",
            RuleError::UnitBase => "BR_G59",
            RuleError::MembersCount => "BR_G60",
            RuleError::PowMin => "BR_G61",
            RuleError::ProofOfWork { .. } => "BR_G62",
            RuleError::IdentityWritability => "BR_G63",
            RuleError::MembershipWritability => "BR_G64",
            RuleError::MembershipPeriod => "BR_G108",
            RuleError::CertificationWritability => "BR_G65",
            RuleError::CertificationStock => "BR_G66",
            RuleError::CertificationPeriod => "BR_G67",
            RuleError::CertificationFromMember => "BR_G68",
            RuleError::CertificationToMemberOrNewcomer => "BR_G69",
            RuleError::CertificationToLeaver => "BR_G70",
            RuleError::CertificationReplay => "BR_G71",
            RuleError::CertificationSignature => "BR_G72",
            RuleError::IdentityUidUnicity => "BR_G73",
            RuleError::IdentityPubkeyUnicity => "BR_G74",
            RuleError::MembershipSuccession => "BR_G75",
            RuleError::MembershipDistance => "BR_G76",
            RuleError::MembershipOnRevoked => "BR_G77",
            RuleError::MembershipJoinsTwice => "BR_G78",
            RuleError::MembershipEnoughCerts => "BR_G79",
            RuleError::MembershipLeaverIsMember => "BR_G80",
            RuleError::MembershipActiveIsMember => "BR_G81",
            RuleError::MembershipRevokedIsMember => "BR_G82",
            RuleError::MembershipRevokedSingleton => "BR_G83",
            RuleError::MembershipRevocationSignature => "BR_G84",
            RuleError::ExcludedIsMember => "BR_G85",
            RuleError::ToBeKickedArePresent => "BR_G86",
            RuleError::TransactionWritability => "BR_G103",
            RuleError::InputIsAvailable => "BR_G87",
            RuleError::InputIsUnlocked => "BR_G88",
            RuleError::InputIsTimeUnlocked => "BR_G89",
            RuleError::OutputBase => "BR_G90",
        }
    }
}

pub type RuleResult<T> = std::result::Result<T, RuleError>;
