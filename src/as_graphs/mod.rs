pub mod as_graph;
pub mod as_graph_generators;
pub mod links;

pub use as_graph::{ASFactory, ASGraph, GraphBuilder, AS, ASN};
pub use links::{ASGraphInfo, CustomerProviderLink, PeerLink};
