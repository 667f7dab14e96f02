pub mod checksum;
pub mod frame;
pub mod link;
