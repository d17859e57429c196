//! Terminal front end over [`SchoolStore`](crate::store::SchoolStore): a
//! records table with search, add/edit/delete dialogs, registration and
//! assignment forms, and file operations behind Ctrl shortcuts.

mod app;
mod forms;
mod helpers;
mod terminal;

pub use app::App;
pub use terminal::run_app;
