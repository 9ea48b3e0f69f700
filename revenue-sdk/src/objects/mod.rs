pub mod balance;
pub mod event;
pub mod response;

pub use balance::BalanceResponse;
pub use event::EventPayload;
pub use response::{Acceptance, Rejection, RejectionReason, SubmitEventResponse};
