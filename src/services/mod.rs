pub mod role_registry;
pub use role_registry::{Role, RoleError, RoleRegistry};

pub mod account_service;
pub mod account_service_impl;
pub use account_service::{
    AccountError, AccountProfile, AccountService, PasswordChangeRequest, ProfileUpdate,
    RegisterRequest,
};
pub use account_service_impl::SeaOrmAccountService;

pub mod event_service;
pub mod event_service_impl;
pub use event_service::{
    CreateEventRequest, EventError, EventService, EventView, MemberView, UpdateEventRequest,
};
pub use event_service_impl::SeaOrmEventService;
