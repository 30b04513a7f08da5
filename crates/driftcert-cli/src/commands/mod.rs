pub mod diff;
pub mod policy_check;
pub mod score;
