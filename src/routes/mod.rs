pub mod dashboard;
pub mod file;
pub mod group;
pub mod meeting;
pub mod message;
pub mod progress;
pub mod proposal;
pub mod request;
pub mod student;
pub mod sync;
pub mod task;
pub mod teacher;
