//! Forward-path enumeration over an import adjacency map.
//!
//! Shared by the memory and SQLite backends; the remote backend does not
//! support traversal.

use std::collections::HashMap;

/// Enumerate forward paths from `start` through `adjacency`, up to `hops`
/// edges deep, returning at most `limit` paths. Each path includes the
/// start node. Cycles are cut by never revisiting a node within one path.
pub fn enumerate_paths(
    adjacency: &HashMap<String, Vec<String>>,
    start: &str,
    hops: u32,
    limit: usize,
) -> Vec<Vec<String>> {
    let mut paths = Vec::new();
    let mut current = vec![start.to_string()];
    walk(adjacency, hops, limit, &mut current, &mut paths);
    paths
}

fn walk(
    adjacency: &HashMap<String, Vec<String>>,
    hops_left: u32,
    limit: usize,
    current: &mut Vec<String>,
    paths: &mut Vec<Vec<String>>,
) {
    if paths.len() >= limit || hops_left == 0 {
        return;
    }
    let here = current.last().cloned().unwrap_or_default();
    let Some(next) = adjacency.get(&here) else {
        return;
    };
    for dst in next {
        if paths.len() >= limit {
            return;
        }
        if current.contains(dst) {
            continue;
        }
        current.push(dst.clone());
        paths.push(current.clone());
        walk(adjacency, hops_left - 1, limit, current, paths);
        current.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adj(pairs: &[(&str, &str)]) -> HashMap<String, Vec<String>> {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for (from, to) in pairs {
            map.entry(from.to_string())
                .or_default()
                .push(to.to_string());
        }
        map
    }

    #[test]
    fn test_single_hop() {
        let adjacency = adj(&[("a", "b"), ("a", "c")]);
        let paths = enumerate_paths(&adjacency, "a", 1, 50);
        assert_eq!(paths.len(), 2);
        assert!(paths.contains(&vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_two_hops_include_prefixes() {
        let adjacency = adj(&[("a", "b"), ("b", "c")]);
        let paths = enumerate_paths(&adjacency, "a", 2, 50);
        // Both the one-hop prefix and the full two-hop path are reported.
        assert_eq!(paths.len(), 2);
        assert!(paths.contains(&vec!["a".to_string(), "b".to_string(), "c".to_string()]));
    }

    #[test]
    fn test_cycle_terminates() {
        let adjacency = adj(&[("a", "b"), ("b", "a")]);
        let paths = enumerate_paths(&adjacency, "a", 10, 50);
        assert_eq!(paths.len(), 1);
    }

    #[test]
    fn test_limit_respected() {
        let pairs: Vec<(String, String)> = (0..100).map(|i| ("a".to_string(), format!("f{i}"))).collect();
        let borrowed: Vec<(&str, &str)> = pairs.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
        let adjacency = adj(&borrowed);
        let paths = enumerate_paths(&adjacency, "a", 1, 50);
        assert_eq!(paths.len(), 50);
    }

    #[test]
    fn test_absent_start_is_empty() {
        let adjacency = adj(&[("a", "b")]);
        assert!(enumerate_paths(&adjacency, "zzz", 2, 50).is_empty());
    }
}
