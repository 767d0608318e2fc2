pub mod consensus;
pub mod merge;
pub mod normalize;
pub mod report;
pub mod roster;
pub mod search;
pub mod similarity;
pub mod stats;
