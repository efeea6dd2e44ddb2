//! Single-plan scheduling: free slots, daily capacity, allocation and the
//! relaxation pass.

mod allocator;
mod capacity;
mod core;
mod free_slots;
mod state;

pub use allocator::{
    clamp_segment, max_split_segments, widen_to_slot, Allocator, AllocatorOptions, TaskDemand,
};
pub use capacity::{DailyLimits, DailyLoad};
pub use self::core::{schedule_end_date, Planner, PlanningInput};
pub use free_slots::FreeSlotBuilder;
pub use state::AllocationState;
