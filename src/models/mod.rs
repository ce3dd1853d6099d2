mod appointment;
mod availability;
mod notification;

pub use appointment::*;
pub use availability::*;
pub use notification::*;
