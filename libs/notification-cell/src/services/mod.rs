pub mod channel;
pub mod dispatcher;
pub mod qr;
pub mod sendgrid;

pub use channel::*;
pub use dispatcher::*;
pub use qr::*;
pub use sendgrid::*;
