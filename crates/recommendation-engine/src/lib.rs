pub mod engine;
pub mod explain;
pub mod types;

pub use engine::{
    entry_zone, expected_value, liquidity_risk, resolve_action, target_zone, win_probability,
    Synthesizer,
};
pub use types::*;
