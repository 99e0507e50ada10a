mod relay_hub;
mod room_members;

pub use relay_hub::*;
pub use room_members::Outbound;
