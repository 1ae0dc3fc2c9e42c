pub use super::authorities::Entity as Authorities;
pub use super::event_members::Entity as EventMembers;
pub use super::sport_events::Entity as SportEvents;
pub use super::users::Entity as Users;
pub use super::users_authorities::Entity as UsersAuthorities;
