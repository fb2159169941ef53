pub mod assignments;
pub mod conflicts;
pub mod health;
pub mod pipeline;
pub mod tasks;
pub mod volunteers;
