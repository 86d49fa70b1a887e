pub mod card;
pub mod chat;
pub mod client_session;
pub mod disconnect;
pub mod eval;
pub mod hand;
pub mod seat;
pub mod table_session;

pub use card::*;
pub use chat::*;
pub use client_session::*;
pub use disconnect::*;
pub use eval::*;
pub use hand::*;
pub use seat::*;
pub use table_session::*;
