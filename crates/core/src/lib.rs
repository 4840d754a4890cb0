pub mod auth;
pub mod catalog;
pub mod config;
pub mod notify;
pub mod queue;
pub mod testing;

pub use auth::{
    create_authenticator, ApiKeyAuthenticator, AuthError, AuthRequest, Authenticator, Identity,
    NoneAuthenticator,
};
pub use catalog::{ServiceCatalog, ServiceDetails};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthMethod, Config, ConfigError,
    SanitizedConfig,
};
pub use notify::{
    create_sms_sender, EventSink, LogSmsSender, NullEventSink, QueueEvent, SmsSender,
    TwilioSmsSender,
};
pub use queue::{
    JoinReceipt, JoinRequest, QueueEngine, QueueError, QueueStore, ShopStatusStore,
    SqliteQueueStore, Ticket, TicketStatus,
};
