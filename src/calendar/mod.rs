pub mod plan;
pub mod calendar_type;
pub mod color;
pub mod session;

pub use plan::{Plan, PRIVATE_PLAN_NAME};
pub use calendar_type::Calendar;
pub use color::{SUPPORTED_COLORS, is_supported_color};
pub use session::Session;
