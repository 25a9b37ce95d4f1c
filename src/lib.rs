pub mod cli;
pub mod database_ops;

pub mod util {
    pub mod db;
    pub mod env;
    pub mod logging;
    pub mod progress;
}
