//! Strategy runtime (§4.6): signal-emitting strategies, per-symbol scratch
//! state, and OCO order linkage.

mod oco;
mod signal;
mod state_map;

pub use oco::{OcoTracker, OrderCanceler};
pub use signal::{BarStrategy, KillSwitch, RiskCheck, Signal, SignalExecutor, SignalHandler, SignalStrategy};
pub use state_map::SymbolStateMap;
