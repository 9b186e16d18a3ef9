pub mod archive;
pub mod packages;
pub mod phrases;
