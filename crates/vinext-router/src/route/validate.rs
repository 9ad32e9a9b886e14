use std::collections::HashMap;

use super::Routable;
use crate::error::RouterError;

/// Checks a built table for routes that can never coexist
///
/// - two routes with the same pattern
/// - two different parameter names at the same position under the same
///   prefix (`/users/:id` next to `/users/:slug/edit`)
pub fn validate_routes<R: Routable>(routes: &[R]) -> Result<(), RouterError> {
    let mut patterns: HashMap<&str, &R> = HashMap::new();
    for route in routes {
        if let Some(first) = patterns.insert(route.pattern(), route) {
            return Err(RouterError::Conflict {
                pattern: route.pattern().to_string(),
                first: first.source_path().to_path_buf(),
                second: route.source_path().to_path_buf(),
            });
        }
    }

    // Keyed by the prefix with every parameter name erased.
    let mut names: HashMap<String, String> = HashMap::new();
    for route in routes {
        let mut prefix = String::new();
        for part in route.pattern().split('/').filter(|s| !s.is_empty()) {
            match part.strip_prefix(':') {
                Some(param) => {
                    let name = param.trim_end_matches(['+', '*']);
                    let marker = &param[name.len()..];
                    prefix.push_str("/:");
                    prefix.push_str(marker);

                    match names.get(&prefix) {
                        Some(existing) if existing != name => {
                            return Err(RouterError::DynamicNameMismatch {
                                position: prefix,
                                first: existing.clone(),
                                second: name.to_string(),
                            });
                        }
                        Some(_) => {}
                        None => {
                            names.insert(prefix.clone(), name.to_string());
                        }
                    }
                }
                None => {
                    prefix.push('/');
                    prefix.push_str(part);
                }
            }
        }
    }

    Ok(())
}
