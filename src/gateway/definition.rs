use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use super::RouteError;

/// Key prefix for positional arguments given in shortcut form (`Path=/a/**,/b/**`)
pub const GENERATED_KEY_PREFIX: &str = "_genkey_";

/// Upstream schemes a route may forward to. `lb` names a discovered service.
const SUPPORTED_SCHEMES: &[&str] = &["http", "https", "ws", "wss", "lb"];

/// One routing rule as administered through `/route`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDefinition {
    #[serde(alias = "id")]
    pub route_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_name: Option<String>,
    #[serde(default)]
    pub predicates: Vec<PredicateDefinition>,
    #[serde(default)]
    pub filters: Vec<FilterDefinition>,
    pub uri: String,
    #[serde(default)]
    pub order: i32,
}

/// Named match condition with string arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredicateDefinition {
    pub name: String,
    pub args: BTreeMap<String, String>,
}

/// Named request transformation with string arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterDefinition {
    pub name: String,
    pub args: BTreeMap<String, String>,
}

impl RouteDefinition {
    pub fn new(route_id: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            route_id: route_id.into(),
            route_name: None,
            predicates: Vec::new(),
            filters: Vec::new(),
            uri: uri.into(),
            order: 0,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.route_name = Some(name.into());
        self
    }

    pub fn with_predicate(mut self, predicate: PredicateDefinition) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn with_filter(mut self, filter: FilterDefinition) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Check a single definition in isolation
    pub fn validate(&self) -> Result<(), RouteError> {
        let invalid = |reason: String| RouteError::InvalidRouteDefinition {
            route_id: self.route_id.clone(),
            reason,
        };

        if self.route_id.trim().is_empty() {
            return Err(invalid("routeId must not be blank".to_string()));
        }
        if self.predicates.is_empty() {
            return Err(invalid("at least one predicate is required".to_string()));
        }
        if let Some(idx) = self.predicates.iter().position(|p| p.name.trim().is_empty()) {
            return Err(invalid(format!("predicate #{} has no name", idx)));
        }
        if let Some(idx) = self.filters.iter().position(|f| f.name.trim().is_empty()) {
            return Err(invalid(format!("filter #{} has no name", idx)));
        }

        let uri = Url::parse(&self.uri).map_err(|e| invalid(format!("malformed uri '{}': {}", self.uri, e)))?;
        if !SUPPORTED_SCHEMES.contains(&uri.scheme()) {
            return Err(invalid(format!("unsupported uri scheme '{}'", uri.scheme())));
        }
        match uri.host_str() {
            Some(host) if !host.is_empty() => Ok(()),
            _ => Err(invalid(format!("uri '{}' has no host", self.uri))),
        }
    }
}

/// Validate a full replacement set: every entry valid, `routeId` unique
pub fn validate_all(definitions: &[RouteDefinition]) -> Result<(), RouteError> {
    let mut seen = HashSet::with_capacity(definitions.len());
    for definition in definitions {
        if !seen.insert(definition.route_id.as_str()) {
            return Err(RouteError::DuplicateRouteId(definition.route_id.clone()));
        }
    }
    definitions.iter().try_for_each(RouteDefinition::validate)
}

macro_rules! named_args_definition {
    ($ty:ident) => {
        impl $ty {
            pub fn new(name: impl Into<String>) -> Self {
                Self {
                    name: name.into(),
                    args: BTreeMap::new(),
                }
            }

            pub fn arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
                self.args.insert(key.into(), value.into());
                self
            }

            /// Parse the shortcut form `Name=arg0,arg1`
            pub fn parse_shortcut(text: &str) -> Self {
                let (name, rest) = match text.split_once('=') {
                    Some((name, rest)) => (name.trim(), Some(rest)),
                    None => (text.trim(), None),
                };
                let mut definition = Self::new(name);
                if let Some(rest) = rest {
                    for (idx, value) in rest.split(',').enumerate() {
                        definition
                            .args
                            .insert(format!("{}{}", GENERATED_KEY_PREFIX, idx), value.trim().to_string());
                    }
                }
                definition
            }

            /// Arguments in declaration order: positional ones first, by index
            pub fn positional_args(&self) -> Vec<&str> {
                let mut positional: Vec<(usize, &str)> = self
                    .args
                    .iter()
                    .filter_map(|(key, value)| {
                        key.strip_prefix(GENERATED_KEY_PREFIX)
                            .and_then(|idx| idx.parse().ok())
                            .map(|idx| (idx, value.as_str()))
                    })
                    .collect();
                positional.sort_by_key(|(idx, _)| *idx);
                positional.into_iter().map(|(_, value)| value).collect()
            }

            /// Named argument, falling back to the positional slot `idx`
            pub fn arg_or_position(&self, key: &str, idx: usize) -> Option<&str> {
                self.args
                    .get(key)
                    .map(String::as_str)
                    .or_else(|| self.args.get(&format!("{}{}", GENERATED_KEY_PREFIX, idx)).map(String::as_str))
            }
        }
    };
}

named_args_definition!(PredicateDefinition);
named_args_definition!(FilterDefinition);

/// Accepts `{name, args}`, the shortcut string, or a bare path for predicates
#[derive(Deserialize)]
#[serde(untagged)]
enum NamedArgsInput {
    Shortcut(String),
    Full {
        name: String,
        #[serde(default)]
        args: BTreeMap<String, String>,
    },
}

impl<'de> Deserialize<'de> for PredicateDefinition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match NamedArgsInput::deserialize(deserializer)? {
            NamedArgsInput::Shortcut(text) if text.trim_start().starts_with('/') => {
                PredicateDefinition::parse_shortcut(&format!("Path={}", text.trim()))
            }
            NamedArgsInput::Shortcut(text) => PredicateDefinition::parse_shortcut(&text),
            NamedArgsInput::Full { name, args } => PredicateDefinition { name, args },
        })
    }
}

impl<'de> Deserialize<'de> for FilterDefinition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match NamedArgsInput::deserialize(deserializer)? {
            NamedArgsInput::Shortcut(text) => FilterDefinition::parse_shortcut(&text),
            NamedArgsInput::Full { name, args } => FilterDefinition { name, args },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn route(id: &str) -> RouteDefinition {
        RouteDefinition::new(id, "http://svc1")
            .with_predicate(PredicateDefinition::parse_shortcut("Path=/foo/**"))
    }

    #[test]
    fn deserializes_spring_style_json() {
        let value = json!({
            "id": "hix-upms",
            "routeName": "admin",
            "predicates": [{"name": "Path", "args": {"_genkey_0": "/admin/**"}}],
            "filters": ["StripPrefix=1"],
            "uri": "lb://hix-upms",
            "order": 2
        });
        let def: RouteDefinition = serde_json::from_value(value).unwrap();
        assert_eq!(def.route_id, "hix-upms");
        assert_eq!(def.route_name.as_deref(), Some("admin"));
        assert_eq!(def.predicates[0].positional_args(), vec!["/admin/**"]);
        assert_eq!(def.filters[0].name, "StripPrefix");
        assert_eq!(def.filters[0].arg_or_position("parts", 0), Some("1"));
        assert_eq!(def.order, 2);
        assert!(def.validate().is_ok());
    }

    #[test]
    fn bare_path_string_is_path_predicate() {
        let def: RouteDefinition = serde_json::from_value(json!({
            "routeId": "a",
            "uri": "http://svc1",
            "predicates": ["/foo/**"],
        }))
        .unwrap();
        assert_eq!(def.predicates, vec![PredicateDefinition::new("Path").arg("_genkey_0", "/foo/**")]);
        assert_eq!(def.order, 0);
    }

    #[test]
    fn serializes_in_object_form() {
        let value = serde_json::to_value(route("a")).unwrap();
        assert_eq!(value["routeId"], "a");
        assert_eq!(value["predicates"][0]["name"], "Path");
        assert_eq!(value["predicates"][0]["args"]["_genkey_0"], "/foo/**");
        assert!(value.get("routeName").is_none());
    }

    #[test]
    fn positional_args_follow_numeric_order() {
        let text = (0..12).map(|i| format!("/p{}", i)).collect::<Vec<_>>().join(",");
        let def = PredicateDefinition::parse_shortcut(&format!("Path={}", text));
        let args = def.positional_args();
        assert_eq!(args.len(), 12);
        assert_eq!(args[2], "/p2");
        assert_eq!(args[11], "/p11");
    }

    #[test]
    fn rejects_duplicate_route_ids() {
        let err = validate_all(&[route("a"), route("b"), route("a")]).unwrap_err();
        assert!(matches!(err, RouteError::DuplicateRouteId(id) if id == "a"));
    }

    #[test]
    fn rejects_invalid_definitions() {
        let no_predicates = RouteDefinition::new("a", "http://svc1");
        assert!(matches!(
            no_predicates.validate(),
            Err(RouteError::InvalidRouteDefinition { .. })
        ));

        for uri in ["not a uri", "ftp://svc1", "http://", "mailto:ops@example.com"] {
            let mut def = route("a");
            def.uri = uri.to_string();
            assert!(def.validate().is_err(), "uri {} should be rejected", uri);
        }

        let mut blank = route(" ");
        blank.uri = "lb://hix-auth".to_string();
        assert!(blank.validate().is_err());
    }
}
