pub mod data_provider;
pub mod deck;
pub mod mastery;
pub mod quiz;
pub mod session_store;
pub mod srs;
pub mod statistics;
pub mod study_session;

pub use data_provider::DataProvider;
pub use session_store::SessionStore;
