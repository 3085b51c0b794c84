//! Environment hygiene
//! The payload starts from an empty environment and receives only the
//! configured variables, minus the ones that let a caller change how the
//! loader or the interpreter behaves before the submission runs.

use std::collections::BTreeMap;

/// Dynamic loader hooks
const DANGEROUS_LD_VARS: &[&str] = &[
    "LD_PRELOAD",
    "LD_LIBRARY_PATH",
    "LD_AUDIT",
    "LD_BIND_NOW",
    "LD_DEBUG",
    "LD_PROFILE",
    "LD_USE_LOAD_BIAS",
    "LD_DYNAMIC_WEAK",
];

/// Interpreter hooks that run code or redirect imports ahead of the bootstrap
const DANGEROUS_INTERPRETER_VARS: &[&str] = &[
    "PYTHONSTARTUP",
    "PYTHONPATH",
    "PYTHONHOME",
    "PYTHONINSPECT",
    "PYTHONUSERBASE",
    "PYTHONBREAKPOINT",
];

fn is_dangerous(key: &str) -> bool {
    DANGEROUS_LD_VARS.contains(&key) || DANGEROUS_INTERPRETER_VARS.contains(&key)
}

/// Build the exec environment from the configured pairs.
///
/// Dangerous variables are dropped, later duplicates win, and the result is
/// sorted by key so every run sees the same ordering.
pub fn payload_environment(configured: &[(String, String)]) -> Vec<(String, String)> {
    let mut env_map = BTreeMap::new();
    for (key, value) in configured {
        if is_dangerous(key) {
            log::info!("Removed dangerous environment variable: {}", key);
            continue;
        }
        env_map.insert(key.clone(), value.clone());
    }
    env_map.into_iter().collect()
}

/// Validate environment safety
pub fn validate_environment_safety(configured: &[(String, String)]) -> Vec<String> {
    let mut warnings = Vec::new();

    for (key, _) in configured {
        if is_dangerous(key) {
            warnings.push(format!(
                "Dangerous environment variable will be dropped: {}",
                key
            ));
        }
    }

    if let Some((_, path)) = configured.iter().rev().find(|(key, _)| key == "PATH") {
        if path.split(':').any(|entry| !entry.starts_with('/')) {
            warnings.push("PATH contains relative or home directory references".to_string());
        }
    }

    warnings
}
