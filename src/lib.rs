pub mod action;
pub mod board;
pub mod bot;
pub mod fog;
pub mod piece;
pub mod session;

pub use action::*;
pub use board::*;
pub use bot::*;
pub use fog::*;
pub use piece::*;
pub use session::*;
