pub mod concepts;
pub mod config;
pub mod feedback;
pub mod framework;
pub mod router;
pub mod sim;
pub mod util;
