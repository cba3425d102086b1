//! Service layer
//!
//! Business logic for the Cosplayhub backend:
//! - `auth` - registration, login, logout and current-user flows
//! - `token` - JWT issue/verify/refresh/revoke with rotation and blacklist
//! - `event` - event CRUD and the query/filter/pagination pipeline
//! - `category` - category CRUD with protect-on-delete
//! - `media` - image hosting client (upload/destroy)
//! - `password` - argon2 password hashing

pub mod auth;
pub mod category;
pub mod event;
pub mod media;
pub mod password;
pub mod token;

pub use auth::{AuthService, AuthServiceError, LoginInput, RegisterInput};
pub use category::{CategoryService, CategoryServiceError};
pub use event::{EventQuery, EventService, EventServiceError, Ordering};
pub use media::{CloudinaryClient, ImageHost, ImageUpload, MediaError, UploadedImage};
pub use token::{Claims, TokenError, TokenKind, TokenPair, TokenService};
