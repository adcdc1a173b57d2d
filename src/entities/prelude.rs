pub use super::comments::Entity as Comments;
pub use super::followers::Entity as Followers;
pub use super::posts::Entity as Posts;
pub use super::user_invitations::Entity as UserInvitations;
pub use super::users::Entity as Users;
