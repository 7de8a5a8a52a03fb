pub mod money;
pub mod pii;

pub use money::{percent_of, round_money};
pub use pii::Masked;
