use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::http::error::HttpError;
use crate::http::mime::{MimeType, parse_accept};
use crate::http::request::{Method, Request, percent_decode};
use crate::http::response::Response;
use crate::routing::path::CompiledPath;

/// Application callback invoked for a matched route.
pub type Handler = Arc<dyn Fn(&mut Request<'_>) -> anyhow::Result<Response> + Send + Sync>;

/// Wraps a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&mut Request<'_>) -> anyhow::Result<Response> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// One registered route.
///
/// Equality compares name, path template, methods and content types; the
/// handler is not compared.
#[derive(Clone)]
pub struct RoutingEntry {
    pub name: String,
    pub path: CompiledPath,
    pub handler: Handler,
    pub methods: Vec<Method>,
    pub content_types: Vec<MimeType>,
}

impl RoutingEntry {
    /// `methods` must not be empty. An empty `content_types` list registers
    /// the route under `*/*`.
    pub fn new(
        name: impl Into<String>,
        path: CompiledPath,
        handler: Handler,
        methods: Vec<Method>,
        content_types: Vec<MimeType>,
    ) -> Result<Self, HttpError> {
        let name = name.into();
        if methods.is_empty() {
            return Err(HttpError::BadRoutePath {
                path: path.template().to_string(),
                reason: format!("route {:?} accepts no methods", name),
            });
        }
        let content_types = if content_types.is_empty() {
            vec![MimeType::any()]
        } else {
            content_types
        };

        Ok(Self {
            name,
            path,
            handler,
            methods,
            content_types,
        })
    }
}

impl PartialEq for RoutingEntry {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.path == other.path
            && self.methods == other.methods
            && self.content_types == other.content_types
    }
}

impl Eq for RoutingEntry {}

impl fmt::Debug for RoutingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingEntry")
            .field("name", &self.name)
            .field("path", &self.path.template())
            .field("methods", &self.methods)
            .field("content_types", &self.content_types)
            .finish_non_exhaustive()
    }
}

/// Routes bucketed by content type, buckets in registration order.
type TypeBuckets = Vec<(MimeType, Vec<Arc<RoutingEntry>>)>;

/// method → content type → entries.
#[derive(Debug, Default)]
pub struct RoutingTable {
    methods: HashMap<Method, TypeBuckets>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files `entry` under every method × content type pair it declares.
    pub fn insert(&mut self, entry: RoutingEntry) {
        let entry = Arc::new(entry);
        for method in &entry.methods {
            let buckets = self.methods.entry(*method).or_default();
            for mime in &entry.content_types {
                let index = match buckets.iter().position(|(key, _)| key == mime) {
                    Some(index) => index,
                    None => {
                        buckets.push((mime.clone(), Vec::new()));
                        buckets.len() - 1
                    }
                };
                let bucket = &mut buckets[index].1;
                if !bucket.iter().any(|existing| **existing == *entry) {
                    bucket.push(Arc::clone(&entry));
                }
            }
        }
    }

    /// Buckets for `method`, in registration order.
    pub fn buckets(&self, method: Method) -> Option<&[(MimeType, Vec<Arc<RoutingEntry>>)]> {
        self.methods.get(&method).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// First entry, in bucket then insertion order, whose type is compatible
    /// with `accepted` and whose path matches `target`.
    fn find(
        &self,
        method: Method,
        accepted: &MimeType,
        target: &str,
    ) -> Option<(&Arc<RoutingEntry>, &MimeType, Vec<(String, String)>)> {
        let buckets = self.buckets(method)?;
        for (mime, entries) in buckets {
            if !accepted.matches(mime) {
                continue;
            }
            for entry in entries {
                if let Some(found) = entry.path.matches(target) {
                    return Some((entry, mime, found.params));
                }
            }
        }
        None
    }
}

/// Dispatches requests to handlers by method, `Accept` header and path.
///
/// The table is built before serving starts and only read afterwards.
#[derive(Debug, Default)]
pub struct Router {
    table: RoutingTable,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entry(&mut self, entry: RoutingEntry) {
        tracing::debug!(
            name = %entry.name,
            path = %entry.path,
            methods = ?entry.methods,
            "Registered route"
        );
        self.table.insert(entry);
    }

    /// Registers a route from its parts.
    pub fn add_route(
        &mut self,
        name: impl Into<String>,
        path: CompiledPath,
        handler: Handler,
        methods: Vec<Method>,
        content_types: Vec<MimeType>,
    ) -> Result<(), HttpError> {
        let entry = RoutingEntry::new(name, path, handler, methods, content_types)?;
        self.add_entry(entry);
        Ok(())
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    /// Finds the route for `request`, attaches decoded path parameters and
    /// runs the handler.
    ///
    /// Acceptable types are tried in `Accept` header order. HEAD falls back to
    /// the GET routes when no HEAD route matches. Every miss, whatever the
    /// cause, is reported as `HttpError::NotFound`.
    pub fn handle(&self, request: &mut Request<'_>) -> anyhow::Result<Response> {
        let accepted = parse_accept(request.header("accept"));

        let mut methods = vec![request.method];
        if request.method == Method::HEAD {
            methods.push(Method::GET);
        }

        let found = methods.iter().find_map(|method| {
            accepted
                .iter()
                .find_map(|mime| self.table.find(*method, mime, &request.target))
        });

        let Some((entry, bucket, params)) = found else {
            tracing::debug!(method = %request.method, path = %request.path, "No route matched");
            return Err(HttpError::NotFound {
                method: request.method.to_string(),
                path: request.path.clone(),
            }
            .into());
        };

        tracing::debug!(
            route = %entry.name,
            method = %request.method,
            path = %request.path,
            "Route matched"
        );

        let params = params
            .into_iter()
            .map(|(name, value)| (name, percent_decode(&value)))
            .collect();
        request.set_path_params(params);

        let default_type = (!bucket.is_wildcard()).then(|| bucket.clone());
        let handler = Arc::clone(&entry.handler);
        let mut response = handler(request)?;

        if response.content_type.is_none() && !response.headers.contains("content-type") {
            response.content_type = default_type;
        }
        Ok(response)
    }
}
