// Models module - contains Form, Employee, reference lists and the notification outbox

pub mod employee;
pub mod form;
pub mod outbox;
pub mod reference;

pub use employee::{Employee, NewEmployee};
pub use form::{Form, FormStatus, NewForm};
pub use outbox::{DeliveryState, NewOutboxEntry, OutboxEntry};
pub use reference::{Department, Unit};
