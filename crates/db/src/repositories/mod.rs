//! SeaORM-backed implementations of the store traits.

mod follower;
mod object;
mod user;

pub use follower::FollowerRepository;
pub use object::ObjectRepository;
pub use user::UserRepository;
