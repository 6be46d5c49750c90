pub mod defaults;
pub mod settings;
pub mod user;

pub use settings::{
    ClientConfig, EngineConfig, PoolConfig, WorkerSettings, resolve_worker_count,
};
pub use user::{load_config, load_user_config, user_config_path};
