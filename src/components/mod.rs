pub mod roster;
pub mod score_bug;
