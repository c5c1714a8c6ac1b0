//! Persisted entities.

pub mod follower;
pub mod object;
pub mod types;
pub mod user;

pub use follower::Entity as Follower;
pub use object::Entity as Object;
pub use types::{CopyList, CopyTarget, KeyList};
pub use user::Entity as User;
