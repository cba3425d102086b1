//! Repository layer
//!
//! Data access for the Cosplayhub backend. Each repository is defined as a
//! trait with a sqlx-based implementation supporting SQLite and MySQL.

pub mod blacklist;
pub mod category;
pub mod event;
pub mod partner;
pub mod user;

pub use blacklist::{BlacklistRepository, SqlxBlacklistRepository};
pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use event::{EventRepository, SqlxEventRepository};
pub use partner::{PartnerRepository, SqlxPartnerRepository};
pub use user::{SqlxUserRepository, UserRepository};
