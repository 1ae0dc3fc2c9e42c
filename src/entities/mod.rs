pub mod prelude;

pub mod authorities;
pub mod event_members;
pub mod sport_events;
pub mod users;
pub mod users_authorities;
