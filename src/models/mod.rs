pub mod insight;
pub mod pending_registration;
pub mod task;
pub mod user;

pub use insight::*;
pub use pending_registration::*;
pub use task::*;
pub use user::*;
