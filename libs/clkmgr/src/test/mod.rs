mod mock;
#[cfg(feature = "state-check")]
mod state_check;
mod stress;

pub fn init_logger() { let _ = env_logger::builder().is_test(true).try_init(); }
