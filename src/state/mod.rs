pub mod application;
pub mod authority;
pub mod hook;
pub mod machine;
pub mod standing;

pub use application::{
    Application, ApprovalSlot, Approvals, HistoryAction, HistoryEntry, HistoryLevel, Level,
    Location, MemberType, PaymentStatus, SlotStatus, Status,
};
pub use authority::{can_act, visibility, Visibility};
pub use hook::{ApprovalHook, LoggingHook, NoOpHook};
pub use machine::{transition, Decision};
pub use standing::{classify, Standing, Viewpoint};
