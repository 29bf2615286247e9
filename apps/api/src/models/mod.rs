pub mod posting;
pub mod prediction;
