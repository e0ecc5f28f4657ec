pub mod calendar;
pub mod sync;
pub mod storage;
pub mod store;
pub mod app;

pub use calendar::{Calendar, Plan, Session};
pub use app::AppContext;
pub use store::{CalendarStore, SessionStore, StoreError};
