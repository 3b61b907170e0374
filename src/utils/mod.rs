pub mod auth;
pub mod clock;

pub use auth::{create_token, verify_token, Claims};
pub use clock::{lab_date, Clock, FixedClock, SystemClock};

use uuid::Uuid;

/// Short random key for array entries (notes, images, activity events).
pub fn short_key() -> String {
    let mut key = Uuid::new_v4().simple().to_string();
    key.truncate(12);
    key
}
