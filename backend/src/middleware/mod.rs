pub mod prediction_history;
pub mod request_id;

pub use prediction_history::record_prediction_history;
pub use request_id::{request_id, RequestId};
