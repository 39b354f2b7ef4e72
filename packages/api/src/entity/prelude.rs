pub use super::activity_log::Entity as ActivityLog;
pub use super::api_token::Entity as ApiToken;
pub use super::app::Entity as App;
pub use super::deployment::Entity as Deployment;
pub use super::domain::Entity as Domain;
pub use super::oauth_state::Entity as OAuthState;
pub use super::user::Entity as User;
