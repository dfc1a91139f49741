use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::as_graphs::as_graph::ASN;
use crate::simulation_engine::announcement::Prefix;

/// Relationship through which an announcement was received (or is sent).
///
/// The numeric values are the Gao-Rexford preference: a higher value wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Relationships {
    Providers = 1,
    Peers = 2,
    Customers = 3,
    Origin = 4,
}

impl Relationships {
    /// The relationship as seen from the other end of the link.
    pub fn invert(&self) -> Self {
        match self {
            Relationships::Providers => Relationships::Customers,
            Relationships::Customers => Relationships::Providers,
            Relationships::Peers => Relationships::Peers,
            Relationships::Origin => Relationships::Origin,
        }
    }
}

impl Default for Relationships {
    fn default() -> Self {
        Relationships::Origin
    }
}

impl fmt::Display for Relationships {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Relationships::Providers => "PROVIDERS",
            Relationships::Peers => "PEERS",
            Relationships::Customers => "CUSTOMERS",
            Relationships::Origin => "ORIGIN",
        };
        write!(f, "{}", s)
    }
}

/// Named AS groups cached on the graph. Every group except `Ixp` excludes IXPs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ASNGroups {
    Ixp,
    Stubs,
    Multihomed,
    StubsOrMh,
    Input,
    Etc,
    Transit,
    AllWoutIxps,
}

impl ASNGroups {
    pub const ALL: [ASNGroups; 8] = [
        ASNGroups::Ixp,
        ASNGroups::Stubs,
        ASNGroups::Multihomed,
        ASNGroups::StubsOrMh,
        ASNGroups::Input,
        ASNGroups::Etc,
        ASNGroups::Transit,
        ASNGroups::AllWoutIxps,
    ];
}

impl fmt::Display for ASNGroups {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ASNGroups::Ixp => "IXP",
            ASNGroups::Stubs => "STUBS",
            ASNGroups::Multihomed => "MULTIHOMED",
            ASNGroups::StubsOrMh => "STUBS_OR_MH",
            ASNGroups::Input => "INPUT_CLIQUE",
            ASNGroups::Etc => "ETC",
            ASNGroups::Transit => "TRANSIT",
            ASNGroups::AllWoutIxps => "ALL_WOUT_IXPS",
        };
        write!(f, "{}", s)
    }
}

/// Policy variant selected per AS at engine setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Settings {
    #[default]
    BaseDefense,
    Rov,
    PeerRov,
    OnlyToCustomers,
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Settings::BaseDefense => "BGP",
            Settings::Rov => "ROV",
            Settings::PeerRov => "PeerROV",
            Settings::OnlyToCustomers => "OnlyToCustomers",
        };
        write!(f, "{}", s)
    }
}

/// Route origin validity of an announcement, set by whoever seeds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum ROAValidity {
    Valid = 0,
    #[default]
    Unknown = 1,
    InvalidLength = 2,
    InvalidOrigin = 3,
    InvalidLengthAndOrigin = 4,
}

impl ROAValidity {
    pub fn is_invalid(&self) -> bool {
        matches!(
            self,
            ROAValidity::InvalidLength
                | ROAValidity::InvalidOrigin
                | ROAValidity::InvalidLengthAndOrigin
        )
    }
}

impl fmt::Display for ROAValidity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ROAValidity::Valid => "VALID",
            ROAValidity::Unknown => "UNKNOWN",
            ROAValidity::InvalidLength => "INVALID_LENGTH",
            ROAValidity::InvalidOrigin => "INVALID_ORIGIN",
            ROAValidity::InvalidLengthAndOrigin => "INVALID_LENGTH_AND_ORIGIN",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommonASNs;

impl CommonASNs {
    pub const ATTACKER: ASN = 666;
    pub const VICTIM: ASN = 777;
}

/// Malformed or ambiguous topology input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    /// A link has the same AS on both ends
    #[error("AS {asn} cannot be linked to itself")]
    SelfLink { asn: ASN },
    /// The same pair of ASes appears with two different relationships
    #[error("AS {asn1} and AS {asn2} have more than one relationship")]
    AmbiguousLink { asn1: ASN, asn2: ASN },
    /// Following providers from this AS leads back to it
    #[error("customer-provider cycle through AS {asn}")]
    CustomerProviderCycle { asn: ASN },
}

/// Errors raised while seeding or running the propagation engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("seed announcement for {prefix} has no seed ASN")]
    MissingSeedAsn { prefix: Prefix },
    #[error("seed ASN {asn} is not in the AS graph")]
    UnknownSeedAsn { asn: ASN },
    #[error("AS {asn} already holds an announcement for {prefix}")]
    SeedConflict { asn: ASN, prefix: Prefix },
    #[error("seed path {as_path:?} for {prefix} does not start with seed ASN {asn}")]
    MalformedSeedPath {
        asn: ASN,
        prefix: Prefix,
        as_path: Vec<ASN>,
    },
    #[error("the engine must be set up before running")]
    NotSetup,
    #[error("expected propagation round {expected}, got {requested}")]
    OutOfSequence { expected: u32, requested: u32 },
    #[error("all {rounds} propagation rounds have already run")]
    AlreadyDone { rounds: u32 },
    /// Two candidates are indistinguishable by the whole comparison chain.
    /// This is a bug in the graph or in a policy, never a routing outcome.
    #[error("AS {asn} cannot break the tie for {prefix} between {current_path:?} and {new_path:?}")]
    TieBreakViolation {
        asn: ASN,
        prefix: Prefix,
        current_path: Vec<ASN>,
        new_path: Vec<ASN>,
    },
}

/// Errors while reading a CAIDA serial-2 relationship file.
#[derive(Error, Debug)]
pub enum CaidaParseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

/// A trial of a multi-trial simulation failed.
#[derive(Error, Debug)]
pub enum TrialError {
    #[error("trial {trial} failed: {source}")]
    Engine {
        trial: usize,
        #[source]
        source: EngineError,
    },
    #[error("invalid progress bar template: {0}")]
    Progress(#[from] indicatif::style::TemplateError),
}
