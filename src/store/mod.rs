pub mod calendar_store;
pub mod calendars;
pub mod session;

pub use calendar_store::{CalendarStore, StoreError};
pub use calendars::CalendarState;
pub use session::{SessionError, SessionStore};
