/// Data models shared between the API server and its tests

pub mod board;
pub mod board_access;
pub mod stage;
pub mod tag;
pub mod task;
pub mod user;

pub use board::{Board, BoardWithLevel, CreateBoard, UpdateBoard, DEFAULT_STAGE_NAMES};
pub use board_access::{AccessLevel, BoardAccess, CreateBoardAccess};
pub use stage::{CreateStage, Stage, UpdateStage};
pub use tag::{CreateTag, Tag, UpdateTag};
pub use task::{CreateTask, Task, TaskFilters, TaskSummary, TaskTagRow, UpdateTask};
pub use user::{CreateUser, UpdateUser, User};
