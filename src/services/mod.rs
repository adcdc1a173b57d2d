pub mod hashing;
pub mod mailer;
pub mod token;
pub mod validation;

pub use mailer::{LogMailer, MailError, Mailer, MailtrapMailer};
pub use token::{Claims, TokenAuthenticator};

pub mod user_service;
pub mod user_service_impl;
pub use user_service::{Registration, UserError, UserService};
pub use user_service_impl::{RegistrationSettings, SeaOrmUserService};

pub mod post_service;
pub mod post_service_impl;
pub use post_service::{PostError, PostPatch, PostService};
pub use post_service_impl::SeaOrmPostService;

pub mod follow_service;
pub mod follow_service_impl;
pub use follow_service::{FollowError, FollowService};
pub use follow_service_impl::SeaOrmFollowService;

pub mod comment_service;
pub mod comment_service_impl;
pub use comment_service::{CommentError, CommentService};
pub use comment_service_impl::SeaOrmCommentService;
