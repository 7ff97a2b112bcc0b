//! Config loading tests.
//!
//! Env var access is process-global, so every test takes the same lock.

use std::sync::{Mutex, MutexGuard};

use drainq::config::{Config, DEFAULT_WIQ, ShutdownPolicy};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clean_env() -> MutexGuard<'static, ()> {
    let guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    unsafe {
        for var in ["wiq", "SF_AMQPQUEUE", "queue", "SF_VMID", "OPENIAP_APIKEY"] {
            std::env::remove_var(var);
        }
    }
    guard
}

#[test]
fn queue_name_falls_back_to_default() {
    let _guard = clean_env();
    let config = Config::from_env().unwrap();
    assert_eq!(config.wiq, DEFAULT_WIQ);
    assert_eq!(config.queue, DEFAULT_WIQ);
}

#[test]
fn queue_name_fallback_order() {
    let _guard = clean_env();

    unsafe {
        std::env::set_var("SF_AMQPQUEUE", "amqp_queue");
    }
    let config = Config::from_env().unwrap();
    assert_eq!(config.wiq, "amqp_queue");

    // "wiq" wins over SF_AMQPQUEUE
    unsafe {
        std::env::set_var("wiq", "my_queue");
    }
    let config = Config::from_env().unwrap();
    assert_eq!(config.wiq, "my_queue");
    assert_eq!(config.queue, "my_queue");

    // "queue" overrides only the registration name
    unsafe {
        std::env::set_var("queue", "notify_queue");
    }
    let config = Config::from_env().unwrap();
    assert_eq!(config.wiq, "my_queue");
    assert_eq!(config.queue, "notify_queue");

    unsafe {
        std::env::remove_var("wiq");
        std::env::remove_var("SF_AMQPQUEUE");
        std::env::remove_var("queue");
    }
}

#[test]
fn vm_id_selects_scale_to_zero() {
    let _guard = clean_env();

    let config = Config::from_env().unwrap();
    assert_eq!(config.shutdown, ShutdownPolicy::Persistent);

    unsafe {
        std::env::set_var("SF_VMID", "vm-123");
    }
    let config = Config::from_env().unwrap();
    assert_eq!(
        config.shutdown,
        ShutdownPolicy::ScaleToZero {
            vm_id: "vm-123".to_string()
        }
    );

    unsafe {
        std::env::remove_var("SF_VMID");
    }
}

#[test]
fn empty_vars_are_treated_as_unset() {
    let _guard = clean_env();

    unsafe {
        std::env::set_var("wiq", "");
        std::env::set_var("SF_VMID", "");
    }
    let config = Config::from_env().unwrap();
    assert_eq!(config.wiq, DEFAULT_WIQ);
    assert_eq!(config.shutdown, ShutdownPolicy::Persistent);

    unsafe {
        std::env::remove_var("wiq");
        std::env::remove_var("SF_VMID");
    }
}
