// ── Domain model ──

mod computer;
mod user;

pub use computer::{Computer, LapsPassword};
pub use user::DirectoryUser;
