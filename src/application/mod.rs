pub mod provision;
pub mod serve;
pub mod startup;
