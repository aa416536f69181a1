pub mod cluster;
pub mod opt;
