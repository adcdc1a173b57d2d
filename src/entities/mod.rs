pub mod prelude;

pub mod comments;
pub mod followers;
pub mod posts;
pub mod user_invitations;
pub mod users;
