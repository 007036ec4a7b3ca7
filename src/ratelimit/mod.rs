//! Rate limiting logic and state management.

mod limiter;
mod window;

pub use limiter::RateLimiter;
pub use window::TimeWindow;
