mod admin;
mod init;

pub use admin::cmd_create_admin;
pub use init::cmd_init_config;
