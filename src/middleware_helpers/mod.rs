pub mod request_id;

pub use request_id::{bind_request_id, with_request_ids};
