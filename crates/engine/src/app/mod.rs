mod clock;
mod input;
mod session;

pub use clock::TickClock;
pub use input::{InputContext, Panel, PointerInput};
pub use session::{Session, SessionEvent};
