//! Data models
//!
//! serde + sqlx row types and the Create/Update payload structs used by
//! the API handlers. Column names are snake_case; the JSON wire format is
//! camelCase to stay compatible with the existing front end.

pub mod category;
pub mod member;
pub mod order;
pub mod product;

pub use category::{Category, CategoryCreate, CategoryUpdate};
pub use member::{Member, MemberRegister, MemberRole, MemberUpdate, PasswordChange};
pub use order::{Order, OrderCreate, OrderCreateItem, OrderItem, OrderStatus, PickupInfo};
pub use product::{Product, ProductCreate, ProductUpdate};
