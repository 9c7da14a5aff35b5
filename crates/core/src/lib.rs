#![forbid(unsafe_code)]

pub mod csv;
pub mod dataset;
pub mod model;
pub mod reconcile;
pub mod selector;
pub mod time;

pub use reconcile::reconcile;
pub use selector::select_next;
pub use time::Clock;
