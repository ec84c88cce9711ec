pub mod timing;

pub use timing::observe_requests;
