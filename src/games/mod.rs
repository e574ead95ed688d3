pub mod blackjack;
pub mod crash;
pub mod mines;
pub mod rng;
pub mod roulette;
pub mod slots;
pub mod types;

pub use blackjack::BlackjackEngine;
pub use crash::CrashEngine;
pub use mines::MinesEngine;
pub use rng::{RandomSource, ScriptedRandom};
pub use roulette::RouletteEngine;
pub use slots::{SlotTheme, SlotsEngine};
pub use types::*;
