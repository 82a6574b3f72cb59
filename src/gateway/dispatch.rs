use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::pattern::{PathPattern, PathVariables};
use super::{FilterDefinition, PredicateDefinition, RouteDefinition, RouteRegistry, RouteSnapshot};

/// The parts of an inbound proxied request that predicates look at
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    pub method: String,
    pub path: String,
    pub host: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
}

impl RequestInfo {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_query(mut self, param: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(param.into(), value.into());
        self
    }
}

/// Routing decision for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMatch {
    pub route_id: String,
    /// Snapshot version the decision was made against
    pub version: u64,
    pub uri: String,
    /// Path after filters have been applied
    pub path: String,
    pub add_headers: Vec<(String, String)>,
    pub variables: PathVariables,
    /// Filters left for the proxy layer to apply
    pub pass_through_filters: Vec<String>,
}

impl RouteMatch {
    /// Upstream URL for `http`/`https`/`ws`/`wss` targets; `lb://` needs discovery
    pub fn forward_url(&self) -> String {
        format!("{}{}", self.uri.trim_end_matches('/'), self.path)
    }
}

#[derive(Debug)]
enum CompiledPredicate {
    Path(Vec<PathPattern>),
    Method(Vec<String>),
    Host(Vec<PathPattern>),
    Header { name: String, value: Option<Regex> },
    Query { param: String, value: Option<Regex> },
    After(DateTime<Utc>),
    Before(DateTime<Utc>),
    Between(DateTime<Utc>, DateTime<Utc>),
    /// Never matches; keeps a route with an unknown condition out of traffic
    Unsupported(String),
}

#[derive(Debug)]
enum CompiledFilter {
    StripPrefix(usize),
    PrefixPath(String),
    SetPath(String),
    RewritePath { pattern: Regex, replacement: String },
    AddRequestHeader(String, String),
    PassThrough(String),
}

#[derive(Debug)]
struct CompiledRoute {
    route_id: String,
    uri: String,
    predicates: Vec<CompiledPredicate>,
    filters: Vec<CompiledFilter>,
}

/// Matching structure compiled from exactly one registry snapshot
#[derive(Debug)]
pub struct RouteTable {
    version: u64,
    routes: Vec<CompiledRoute>,
}

impl RouteTable {
    pub fn compile(snapshot: &RouteSnapshot) -> Self {
        let mut ordered: Vec<&RouteDefinition> = snapshot.definitions.iter().collect();
        // Stable: equal `order` keeps list position
        ordered.sort_by_key(|d| d.order);

        let routes = ordered
            .into_iter()
            .map(|d| CompiledRoute {
                route_id: d.route_id.clone(),
                uri: d.uri.clone(),
                predicates: d.predicates.iter().map(|p| compile_predicate(&d.route_id, p)).collect(),
                filters: d.filters.iter().map(|f| compile_filter(&d.route_id, f)).collect(),
            })
            .collect();

        Self {
            version: snapshot.version,
            routes,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// First route, by `order`, whose predicates all pass in stored order
    pub fn route(&self, request: &RequestInfo) -> Option<RouteMatch> {
        self.route_at(request, Utc::now())
    }

    fn route_at(&self, request: &RequestInfo, now: DateTime<Utc>) -> Option<RouteMatch> {
        self.routes.iter().find_map(|route| {
            let mut variables = PathVariables::new();
            for predicate in &route.predicates {
                if !predicate_matches(predicate, request, now, &mut variables) {
                    return None;
                }
            }
            Some(apply_filters(route, request, variables, self.version))
        })
    }
}

fn predicate_values(definition: &PredicateDefinition) -> Vec<String> {
    let positional = definition.positional_args();
    let values: Vec<&str> = if positional.is_empty() {
        definition.args.values().map(String::as_str).collect()
    } else {
        positional
    };
    values
        .into_iter()
        .flat_map(|v| v.split(','))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

fn optional_regex(route_id: &str, raw: Option<&str>) -> Result<Option<Regex>, String> {
    match raw.filter(|r| !r.is_empty()) {
        None => Ok(None),
        // Anchored: the whole value must match
        Some(raw) => Regex::new(&format!("^(?:{})$", raw))
            .map(Some)
            .map_err(|e| format!("route '{}': bad regex '{}': {}", route_id, raw, e)),
    }
}

fn parse_datetime(route_id: &str, raw: Option<&str>) -> Result<DateTime<Utc>, String> {
    let raw = raw.ok_or_else(|| format!("route '{}': missing datetime", route_id))?;
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("route '{}': bad datetime '{}': {}", route_id, raw, e))
}

fn compile_predicate(route_id: &str, definition: &PredicateDefinition) -> CompiledPredicate {
    let compiled = match definition.name.as_str() {
        "Path" => Ok(CompiledPredicate::Path(
            predicate_values(definition).iter().map(|p| PathPattern::path(p)).collect(),
        )),
        "Method" => Ok(CompiledPredicate::Method(
            predicate_values(definition).iter().map(|m| m.to_ascii_uppercase()).collect(),
        )),
        "Host" => Ok(CompiledPredicate::Host(
            predicate_values(definition).iter().map(|h| PathPattern::host(h)).collect(),
        )),
        "Header" => match definition.arg_or_position("header", 0) {
            Some(name) => optional_regex(route_id, definition.arg_or_position("regexp", 1)).map(|value| {
                CompiledPredicate::Header {
                    name: name.to_ascii_lowercase(),
                    value,
                }
            }),
            None => Err(format!("route '{}': Header predicate needs a header name", route_id)),
        },
        "Query" => match definition.arg_or_position("param", 0) {
            Some(param) => optional_regex(route_id, definition.arg_or_position("regexp", 1)).map(|value| {
                CompiledPredicate::Query {
                    param: param.to_string(),
                    value,
                }
            }),
            None => Err(format!("route '{}': Query predicate needs a param", route_id)),
        },
        "After" => parse_datetime(route_id, definition.arg_or_position("datetime", 0)).map(CompiledPredicate::After),
        "Before" => parse_datetime(route_id, definition.arg_or_position("datetime", 0)).map(CompiledPredicate::Before),
        "Between" => parse_datetime(route_id, definition.arg_or_position("datetime1", 0)).and_then(|start| {
            parse_datetime(route_id, definition.arg_or_position("datetime2", 1))
                .map(|end| CompiledPredicate::Between(start, end))
        }),
        other => Err(format!("route '{}': unsupported predicate '{}'", route_id, other)),
    };

    compiled.unwrap_or_else(|reason| {
        warn!("{}; route will not match any request", reason);
        CompiledPredicate::Unsupported(definition.name.clone())
    })
}

fn compile_filter(route_id: &str, definition: &FilterDefinition) -> CompiledFilter {
    let arg = |key: &str, idx: usize| definition.arg_or_position(key, idx).map(str::to_string);

    match definition.name.as_str() {
        "StripPrefix" => match arg("parts", 0).and_then(|p| p.parse().ok()) {
            Some(parts) => CompiledFilter::StripPrefix(parts),
            None => {
                warn!("route '{}': StripPrefix needs a numeric 'parts'", route_id);
                CompiledFilter::PassThrough(definition.name.clone())
            }
        },
        "PrefixPath" => match arg("prefix", 0) {
            Some(prefix) => CompiledFilter::PrefixPath(prefix),
            None => CompiledFilter::PassThrough(definition.name.clone()),
        },
        "SetPath" => match arg("template", 0) {
            Some(template) => CompiledFilter::SetPath(template),
            None => CompiledFilter::PassThrough(definition.name.clone()),
        },
        "RewritePath" => match (arg("regexp", 0), arg("replacement", 1)) {
            (Some(pattern), Some(replacement)) => match Regex::new(&pattern) {
                Ok(pattern) => CompiledFilter::RewritePath {
                    pattern,
                    // `$\{name}` is the escaped form used in YAML/properties files
                    replacement: replacement.replace("$\\", "$"),
                },
                Err(e) => {
                    warn!("route '{}': bad RewritePath regex: {}", route_id, e);
                    CompiledFilter::PassThrough(definition.name.clone())
                }
            },
            _ => CompiledFilter::PassThrough(definition.name.clone()),
        },
        "AddRequestHeader" => match (arg("name", 0), arg("value", 1)) {
            (Some(name), Some(value)) => CompiledFilter::AddRequestHeader(name, value),
            _ => CompiledFilter::PassThrough(definition.name.clone()),
        },
        _ => CompiledFilter::PassThrough(definition.name.clone()),
    }
}

fn predicate_matches(
    predicate: &CompiledPredicate,
    request: &RequestInfo,
    now: DateTime<Utc>,
    variables: &mut PathVariables,
) -> bool {
    match predicate {
        CompiledPredicate::Path(patterns) => match patterns.iter().find_map(|p| p.captures(&request.path)) {
            Some(captured) => {
                variables.extend(captured);
                true
            }
            None => false,
        },
        CompiledPredicate::Method(methods) => methods.iter().any(|m| m.eq_ignore_ascii_case(&request.method)),
        CompiledPredicate::Host(patterns) => {
            let host = request.host.as_deref().map(|h| h.split(':').next().unwrap_or(h));
            host.is_some_and(|h| patterns.iter().any(|p| p.is_match(h)))
        }
        CompiledPredicate::Header { name, value } => match request.headers.get(name) {
            Some(actual) => value.as_ref().map_or(true, |re| re.is_match(actual)),
            None => false,
        },
        CompiledPredicate::Query { param, value } => match request.query.get(param) {
            Some(actual) => value.as_ref().map_or(true, |re| re.is_match(actual)),
            None => false,
        },
        CompiledPredicate::After(at) => now > *at,
        CompiledPredicate::Before(at) => now < *at,
        CompiledPredicate::Between(start, end) => now > *start && now < *end,
        CompiledPredicate::Unsupported(_) => false,
    }
}

fn expand_template(template: &str, variables: &PathVariables) -> String {
    variables.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{}}}", name), value)
    })
}

fn apply_filters(route: &CompiledRoute, request: &RequestInfo, variables: PathVariables, version: u64) -> RouteMatch {
    let mut path = request.path.clone();
    let mut add_headers = Vec::new();
    let mut pass_through_filters = Vec::new();

    for filter in &route.filters {
        match filter {
            CompiledFilter::StripPrefix(parts) => {
                let rest: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).skip(*parts).collect();
                let trailing = path.ends_with('/') && !rest.is_empty();
                path = format!("/{}{}", rest.join("/"), if trailing { "/" } else { "" });
            }
            CompiledFilter::PrefixPath(prefix) => {
                path = format!("{}{}", prefix.trim_end_matches('/'), path);
            }
            CompiledFilter::SetPath(template) => {
                path = expand_template(template, &variables);
            }
            CompiledFilter::RewritePath { pattern, replacement } => {
                path = pattern.replace_all(&path, replacement.as_str()).into_owned();
            }
            CompiledFilter::AddRequestHeader(name, value) => {
                add_headers.push((name.clone(), expand_template(value, &variables)));
            }
            CompiledFilter::PassThrough(name) => pass_through_filters.push(name.clone()),
        }
    }

    if !path.starts_with('/') {
        path.insert(0, '/');
    }

    RouteMatch {
        route_id: route.route_id.clone(),
        version,
        uri: route.uri.clone(),
        path,
        add_headers,
        variables,
        pass_through_filters,
    }
}

/// Route table used by the dispatch path, swapped whole on rebuild
pub struct DispatchTable {
    table: ArcSwap<RouteTable>,
}

impl DispatchTable {
    pub fn new(snapshot: &RouteSnapshot) -> Self {
        Self {
            table: ArcSwap::from_pointee(RouteTable::compile(snapshot)),
        }
    }

    pub fn route(&self, request: &RequestInfo) -> Option<RouteMatch> {
        self.table.load().route(request)
    }

    pub fn version(&self) -> u64 {
        self.table.load().version()
    }

    pub fn table(&self) -> Arc<RouteTable> {
        self.table.load_full()
    }

    pub fn rebuild(&self, snapshot: &RouteSnapshot) {
        let table = RouteTable::compile(snapshot);
        debug!("Compiled dispatch table version {} ({} routes)", table.version(), table.len());
        self.table.store(Arc::new(table));
    }

    /// Rebuild from the registry's current snapshot when it moved ahead
    pub fn reconcile(&self, registry: &RouteRegistry) -> bool {
        let snapshot = registry.snapshot();
        if snapshot.version == self.version() {
            return false;
        }
        self.rebuild(&snapshot);
        true
    }
}

/// Keep `dispatch` in step with `registry`.
///
/// Rebuilds on every refresh notification. A lagged subscription, or the
/// optional `reconcile_every` tick, falls back to comparing versions.
pub fn spawn_refresh_listener(
    registry: Arc<RouteRegistry>,
    dispatch: Arc<DispatchTable>,
    reconcile_every: Option<Duration>,
) -> JoinHandle<()> {
    let mut rx = registry.subscribe();
    let mut ticker = reconcile_every.map(tokio::time::interval);

    tokio::spawn(async move {
        // Catch anything committed between table construction and subscribing
        dispatch.reconcile(&registry);

        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Ok(event) => {
                        if dispatch.reconcile(&registry) {
                            info!("Dispatch table rebuilt for route registry version {}", event.version);
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!("Missed {} route refresh notifications, reconciling", missed);
                        dispatch.reconcile(&registry);
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = async {
                    match ticker.as_mut() {
                        Some(ticker) => { ticker.tick().await; }
                        None => std::future::pending::<()>().await,
                    }
                } => {
                    if dispatch.reconcile(&registry) {
                        info!("Dispatch table reconciled to route registry version {}", registry.version());
                    }
                }
            }
        }
    })
}
