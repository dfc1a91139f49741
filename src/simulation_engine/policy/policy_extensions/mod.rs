pub mod bgp;
pub mod only_to_customers;
pub mod peer_rov;
pub mod rov;
