//! Round resolution systems.

pub mod combat;
pub mod damage;
pub mod dice;
pub mod reinforcement;
pub mod stack_wipe;
pub mod targeting;

pub use combat::{advance_round, retreat_side, run_battle, run_until, start_battle};
pub use reinforcement::reinforce;
pub use stack_wipe::{check_instant_stack_wipe, check_stack_wipe, stack_wipe, StackWipeResult};
pub use targeting::assign_targets;
