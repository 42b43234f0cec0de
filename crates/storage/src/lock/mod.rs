pub mod lock_manager;
