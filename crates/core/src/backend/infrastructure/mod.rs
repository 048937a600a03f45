mod child_io;
pub mod process_backend_session;
