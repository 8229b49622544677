//! Hierarchical parameter store.
//!
//! Parameters live in a tree of named sections, each holding string values.
//! Two front-ends build the tree: YAML (nested mappings become sections) and
//! the line-oriented parameter format:
//!
//! ```text
//! enter problemParams
//!   set cfl=0.5
//! leave
//! # comment
//! ```
//!
//! Lookups are pure: nothing here mutates a tree after it has been loaded.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use log::{debug, trace, warn};

use crate::error::ConfigError;

/// One section of the parameter tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamTree {
    name: String,
    params: BTreeMap<String, String>,
    children: BTreeMap<String, ParamTree>,
}

impl ParamTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Section name ("" for the root).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn insert_param(&mut self, key: &str, value: &str) {
        trace!("wrote {} as {}", key, value);
        self.params.insert(key.to_string(), value.to_string());
    }

    /// Return the child section `key`, creating it if needed.
    pub fn insert_section(&mut self, key: &str) -> &mut ParamTree {
        self.children.entry(key.to_string()).or_insert_with(|| ParamTree {
            name: key.to_string(),
            ..ParamTree::default()
        })
    }

    pub fn has_section(&self, key: &str) -> bool {
        self.children.contains_key(key)
    }

    /// Enter a child section; fails if it does not exist.
    pub fn section(&self, key: &str) -> Result<&ParamTree, ConfigError> {
        self.children
            .get(key)
            .ok_or_else(|| ConfigError::MissingSection(key.to_string()))
    }

    pub fn try_section(&self, key: &str) -> Option<&ParamTree> {
        self.children.get(key)
    }

    /// Raw string value, if present.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Typed value; fails if absent or unparsable.
    pub fn get<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.lookup(key) {
            Some(raw) => parse_value(key, raw),
            None => Err(ConfigError::MissingKey {
                section: self.display_name().to_string(),
                key: key.to_string(),
            }),
        }
    }

    /// Typed value with a default substituted when the key is absent.
    /// A present but unparsable value is still an error.
    pub fn query<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.lookup(key) {
            Some(raw) => parse_value(key, raw),
            None => {
                debug!("{}.{} not set; continuing with default", self.display_name(), key);
                Ok(default)
            }
        }
    }

    fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "<root>"
        } else {
            &self.name
        }
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Parse the line-oriented `enter` / `set` / `leave` format.
pub fn parse_params(text: &str) -> Result<ParamTree, ConfigError> {
    let mut root = ParamTree::new();
    let mut path: Vec<String> = Vec::new();

    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (head, value) = match line.split_once('=') {
            Some((head, value)) => (head, Some(value.trim())),
            None => (line, None),
        };
        let mut words = head.split_whitespace();
        let command = words.next().unwrap_or("");
        let argument = words.next();

        let node = node_at(&mut root, &path);
        match (command, argument, value) {
            ("set", Some(key), Some(value)) => node.insert_param(key, value),
            ("enter", Some(key), None) => {
                if node.has_section(key) {
                    return Err(ConfigError::Parse {
                        line: lineno + 1,
                        message: format!("section '{}' already exists", key),
                    });
                }
                node.insert_section(key);
                path.push(key.to_string());
            }
            ("leave", None, None) => {
                if path.pop().is_none() {
                    return Err(ConfigError::Parse {
                        line: lineno + 1,
                        message: "'leave' at the root section".to_string(),
                    });
                }
            }
            _ => warn!("unrecognized parameter line {}: '{}'", lineno + 1, line),
        }
    }

    if !path.is_empty() {
        warn!("parameter file ended inside section '{}'", path.join("."));
    }
    Ok(root)
}

fn node_at<'t>(root: &'t mut ParamTree, path: &[String]) -> &'t mut ParamTree {
    path.iter().fold(root, |node, key| node.insert_section(key))
}

/// Build a tree from YAML. Mappings become sections, scalars become values,
/// sequences of scalars become space-separated values.
pub fn from_yaml_str(text: &str) -> Result<ParamTree, ConfigError> {
    let value: serde_yaml::Value = serde_yaml::from_str(text)?;
    let mut root = ParamTree::new();
    match value {
        serde_yaml::Value::Null => {}
        serde_yaml::Value::Mapping(map) => fill_from_yaml(&mut root, map)?,
        _ => {
            return Err(ConfigError::InvalidValue {
                key: "<root>".to_string(),
                value: format!("{:?}", value),
                reason: "top level must be a mapping".to_string(),
            })
        }
    }
    Ok(root)
}

fn fill_from_yaml(node: &mut ParamTree, map: serde_yaml::Mapping) -> Result<(), ConfigError> {
    for (key, value) in map {
        let key = yaml_scalar(&key).ok_or_else(|| ConfigError::InvalidValue {
            key: format!("{:?}", key),
            value: String::new(),
            reason: "section keys must be scalars".to_string(),
        })?;
        match value {
            serde_yaml::Value::Null => {}
            serde_yaml::Value::Mapping(child) => fill_from_yaml(node.insert_section(&key), child)?,
            serde_yaml::Value::Sequence(items) => {
                let joined = items
                    .iter()
                    .map(|item| {
                        yaml_scalar(item).ok_or_else(|| ConfigError::InvalidValue {
                            key: key.clone(),
                            value: format!("{:?}", item),
                            reason: "sequence items must be scalars".to_string(),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?
                    .join(" ");
                node.insert_param(&key, &joined);
            }
            other => {
                let scalar = yaml_scalar(&other).ok_or_else(|| ConfigError::InvalidValue {
                    key: key.clone(),
                    value: format!("{:?}", other),
                    reason: "unsupported YAML value".to_string(),
                })?;
                node.insert_param(&key, &scalar);
            }
        }
    }
    Ok(())
}

fn yaml_scalar(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Load a parameter file. `.yaml` / `.yml` files are read as YAML, anything
/// else with the line-oriented format.
pub fn load(path: impl AsRef<Path>) -> Result<ParamTree, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let tree = if is_yaml {
        from_yaml_str(&contents)?
    } else {
        parse_params(&contents)?
    };
    debug!("parameter tree built from {}", path.display());
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_section_is_error() {
        let tree = ParamTree::new();
        assert!(matches!(tree.section("bogusSection"), Err(ConfigError::MissingSection(_))));
    }

    #[test]
    fn test_optional_section_lookup_does_not_mutate() {
        let tree = parse_params("enter problemParams
  set cfl=0.5
leave
").unwrap();
        let before = tree.clone();
        let problem = tree.section("problemParams").unwrap();
        let limiter = match problem.try_section("advectionParams") {
            Some(section) => section.query("fluxLimiter", "vanLeer".to_string()).unwrap(),
            None => "vanLeer".to_string(),
        };
        assert_eq!(limiter, "vanLeer");
        assert!(problem.section("advectionParams").is_err());
        assert_eq!(tree, before, "lookups must not touch the tree");
    }

    #[test]
    fn test_cant_get_missing_value() {
        let tree = ParamTree::new();
        let err = tree.get::<String>("bogusParam").unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey { .. }), "got {:?}", err);
    }

    #[test]
    fn test_can_query_missing_value() {
        let tree = ParamTree::new();
        let value: String = tree.query("bogusParam", "testValue".to_string()).unwrap();
        assert_eq!(value, "testValue");
    }

    #[test]
    fn test_typed_params() {
        let mut tree = ParamTree::new();
        tree.insert_param("s", "testValue");
        tree.insert_param("i", "42");
        tree.insert_param("f", "3.14159");
        assert_eq!(tree.get::<String>("s").unwrap(), "testValue");
        assert_eq!(tree.get::<i32>("i").unwrap(), 42);
        assert!((tree.get::<f64>("f").unwrap() - 3.14159).abs() < 1e-12);
    }

    #[test]
    fn test_unparsable_value_is_error_even_with_default() {
        let mut tree = ParamTree::new();
        tree.insert_param("cfl", "fast");
        let err = tree.query::<f64>("cfl", 0.5).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }), "got {:?}", err);
    }

    #[test]
    fn test_parse_ignores_comments() {
        let text = "enter realSection\n  set x=42\nleave\n# enter fakeSection\nset y=13\n# leave\n";
        let tree = parse_params(text).unwrap();
        assert_eq!(tree.section("realSection").unwrap().get::<i32>("x").unwrap(), 42);
        assert!(tree.try_section("fakeSection").is_none());
        assert_eq!(tree.get::<i32>("y").unwrap(), 13);
    }

    #[test]
    fn test_parse_nested_sections() {
        let text = "enter problemParams\nset cfl = 0.25\nenter advectionParams\nset fluxLimiter=minmod\nleave\nleave\n";
        let tree = parse_params(text).unwrap();
        let problem = tree.section("problemParams").unwrap();
        assert_eq!(problem.get::<f64>("cfl").unwrap(), 0.25);
        let advection = problem.section("advectionParams").unwrap();
        assert_eq!(advection.get::<String>("fluxLimiter").unwrap(), "minmod");
    }

    #[test]
    fn test_parse_leave_at_root_fails() {
        let err = parse_params("leave\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { line: 1, .. }), "got {:?}", err);
    }

    #[test]
    fn test_parse_duplicate_section_fails() {
        let err = parse_params("enter a\nleave\nenter a\nleave\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { line: 3, .. }), "got {:?}", err);
    }

    #[test]
    fn test_yaml_sections_and_scalars() {
        let yaml = "problemParams:\n  cfl: 0.5\n  forcingModel: buoyancy\n  advectionParams:\n    fluxLimiter: superbee\ngeometryParams:\n  M: 8\n  N: 16\nmodes: [1, 2]\n";
        let tree = from_yaml_str(yaml).unwrap();
        let problem = tree.section("problemParams").unwrap();
        assert_eq!(problem.get::<f64>("cfl").unwrap(), 0.5);
        assert_eq!(problem.get::<String>("forcingModel").unwrap(), "buoyancy");
        assert_eq!(
            problem.section("advectionParams").unwrap().get::<String>("fluxLimiter").unwrap(),
            "superbee"
        );
        assert_eq!(tree.section("geometryParams").unwrap().get::<usize>("N").unwrap(), 16);
        assert_eq!(tree.lookup("modes"), Some("1 2"));
    }

    #[test]
    fn test_yaml_and_line_format_agree() {
        let yaml = "geometryParams:\n  M: 4\n  N: 6\nproblemParams:\n  cfl: 0.5\n  diffusivity: 1.0\n";
        let text = "enter geometryParams\nset M=4\nset N=6\nleave\nenter problemParams\nset cfl=0.5\nset diffusivity=1.0\nleave\n";
        let a = from_yaml_str(yaml).unwrap();
        let b = parse_params(text).unwrap();
        for section in ["geometryParams", "problemParams"] {
            let sa = a.section(section).unwrap();
            let sb = b.section(section).unwrap();
            for key in ["M", "N", "cfl", "diffusivity"] {
                assert_eq!(
                    sa.lookup(key).map(|v| v.parse::<f64>().unwrap()),
                    sb.lookup(key).map(|v| v.parse::<f64>().unwrap()),
                    "mismatch for {}.{}",
                    section,
                    key
                );
            }
        }
    }

    #[test]
    fn test_load_missing_file() {
        let err = load("definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }), "got {:?}", err);
    }
}
