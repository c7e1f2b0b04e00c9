pub mod admin;
pub mod category;
pub mod proxy;

pub use admin::admin_router;
pub use category::{CategoryInput, RouteCategory, RouteTarget, RouterConfig};
pub use proxy::proxy_router;
