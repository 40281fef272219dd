//! Route registration.
//!
//! # Data Flow
//! ```text
//! Arc<T: Routable>
//!     → method table (declaration order)
//!     → classify (skip helpers)
//!     → RouteSource lookup | default route
//!     → validate every verb of every RouteSpec
//!     → synthesize handler
//!     → route table keyed by (path, verb) + Registry record
//!
//! into_router(): route table → axum::Router
//! ```
//!
//! # Design Decisions
//! - Nothing is mounted for a method until all of its verbs are known good
//! - Collisions on `object.method` and on (path, verb) follow one
//!   `DuplicatePolicy`; neither case panics
//! - `ANY` owns its whole path; it conflicts with every other verb there
//! - The documentation path never fails registration

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::routing::MethodRouter;
use axum::Router;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::docs::{ApiDoc, DocRoute, StructInfo};
use crate::http::request::{ApiContext, Context};
use crate::routing::handler::{synthesize, RouteHandler};
use crate::routing::method::{table_of, Routable};
use crate::routing::namer::{default_route, join_paths, NamingCase};
use crate::routing::provider::CustomContext;
use crate::routing::registry::{DuplicatePolicy, RegistrationRecord, Registry};
use crate::routing::route::{RouteSource, RouteSpec, Verb};
use crate::routing::signature::{classify, CallConvention};
use crate::scrape::{ParamInfo, RouteTable, SourceScraper};

/// Default request body limit (2 MiB).
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Registration failures returned to the caller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegisterError {
    #[error("method:[{object}.{method}] verb {verb:?} in {verbs:?} not support")]
    UnsupportedVerb {
        object: String,
        method: String,
        verb: String,
        verbs: Vec<String>,
    },
}

/// Set-up options of a [`Registrar`].
#[derive(Debug, Clone)]
pub struct RegistrarOptions {
    /// Prefix joined in front of every route path.
    pub group: String,
    pub naming: NamingCase,
    pub duplicates: DuplicatePolicy,
    /// Largest request body read into a [`Context`].
    pub body_limit: usize,
}

impl Default for RegistrarOptions {
    fn default() -> Self {
        Self {
            group: "/".to_string(),
            naming: NamingCase::default(),
            duplicates: DuplicatePolicy::default(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl From<&AppConfig> for RegistrarOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            group: config.routing.group.clone(),
            naming: config.routing.naming,
            duplicates: config.routing.duplicate_policy,
            body_limit: config.server.body_limit_bytes,
        }
    }
}

struct MountedRoute {
    verb: Verb,
    key: String,
    handler: RouteHandler,
}

/// Binds the routable methods of objects to routes.
pub struct Registrar {
    options: RegistrarOptions,
    registry: Registry,
    source: Option<Arc<dyn RouteSource>>,
    custom: Option<CustomContext>,
    routes: BTreeMap<String, Vec<MountedRoute>>,
}

impl Registrar {
    pub fn new(options: RegistrarOptions, registry: Registry) -> Self {
        Self {
            options,
            registry,
            source: None,
            custom: None,
            routes: BTreeMap::new(),
        }
    }

    /// Explicit route metadata consulted before defaults.
    pub fn with_route_source(mut self, source: impl RouteSource + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Declare the application's single custom context and how to build it.
    pub fn with_custom_context<C, F>(mut self, wrap: F) -> Self
    where
        C: ApiContext,
        F: Fn(Context) -> C + Send + Sync + 'static,
    {
        self.custom = Some(CustomContext::new(wrap));
        self
    }

    pub fn options(&self) -> &RegistrarOptions {
        &self.options
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Mounted routes as `(path, verb, object.method)`, ordered by path.
    pub fn routes(&self) -> impl Iterator<Item = (&str, Verb, &str)> {
        self.routes.iter().flat_map(|(path, mounted)| {
            mounted
                .iter()
                .map(move |route| (path.as_str(), route.verb, route.key.as_str()))
        })
    }

    /// Register every routable method of `object`.
    ///
    /// Returns the number of `(path, verb)` routes mounted. Methods that are
    /// not routable are skipped. An unsupported verb stops registration and
    /// leaves the offending method without any route; methods registered
    /// before it stay registered.
    ///
    /// # Panics
    ///
    /// See [`synthesize`].
    pub fn register<T: Routable>(&mut self, object: Arc<T>) -> Result<usize, RegisterError> {
        let object_name = T::object_name();
        let table = table_of::<T>();
        let custom_id = self.custom.as_ref().map(CustomContext::type_id);
        let mut mounted = 0;

        for entry in table.entries() {
            let classification = classify(entry.signature(), custom_id);
            let Some(convention) = classification.convention() else {
                debug!(
                    object = object_name,
                    method = entry.name(),
                    arity = classification.arity,
                    "Skipping method that is not routable"
                );
                continue;
            };

            let key = format!("{object_name}.{}", entry.name());
            if self.registry.contains(&key) && self.options.duplicates == DuplicatePolicy::FirstWins {
                warn!(method = %key, "Method already registered, keeping the first registration");
                continue;
            }

            let specs = self.resolve(object_name, entry.name(), convention);
            let mut resolved = Vec::with_capacity(specs.len());
            for spec in &specs {
                let verbs = spec.verbs().map_err(|verb| RegisterError::UnsupportedVerb {
                    object: object_name.to_string(),
                    method: entry.name().to_string(),
                    verb,
                    verbs: spec.methods.clone(),
                })?;
                resolved.push((join_paths(&self.options.group, &spec.path), verbs));
            }

            let handler = synthesize(object_name, entry, Arc::clone(&object), self.custom.as_ref());

            if self.registry.contains(&key) {
                warn!(method = %key, "Method already registered, replacing the earlier registration");
                self.unmount(&key);
                self.registry.remove(&key);
            }

            let mut records = Vec::with_capacity(resolved.len());
            for (path, verbs) in resolved {
                let kept: Vec<Verb> = verbs
                    .into_iter()
                    .filter(|verb| self.mount(&path, *verb, &key, &handler))
                    .collect();
                mounted += kept.len();
                if !kept.is_empty() {
                    records.push(RegistrationRecord {
                        object: object_name.to_string(),
                        method: entry.name().to_string(),
                        path,
                        verbs: kept,
                    });
                }
            }

            if records.is_empty() {
                warn!(method = %key, "Every route of the method is taken, nothing registered for it");
                continue;
            }
            self.registry.insert(key, records);
        }

        Ok(mounted)
    }

    fn resolve(&self, object: &str, method: &str, convention: CallConvention) -> Vec<RouteSpec> {
        self.source
            .as_ref()
            .and_then(|source| source.lookup(object, method))
            .filter(|specs| !specs.is_empty())
            .unwrap_or_else(|| {
                vec![default_route(object, method, convention.param_count(), self.options.naming)]
            })
    }

    fn mount(&mut self, path: &str, verb: Verb, key: &str, handler: &RouteHandler) -> bool {
        let policy = self.options.duplicates;
        let slot = self.routes.entry(path.to_string()).or_default();

        if let Some(existing) = slot.iter().find(|route| route.verb.conflicts_with(verb)) {
            if existing.key == key {
                debug!(path, verb = %verb, method = key, "Route already held by the same method");
                return false;
            }
            match policy {
                DuplicatePolicy::FirstWins => {
                    warn!(
                        path,
                        verb = %verb,
                        method = key,
                        existing = %existing.key,
                        "Route already taken, keeping the first registration"
                    );
                    return false;
                }
                DuplicatePolicy::LastWins => {
                    warn!(
                        path,
                        verb = %verb,
                        method = key,
                        existing = %existing.key,
                        "Route already taken, replacing it"
                    );
                    let evicted: Vec<(String, Verb)> = slot
                        .iter()
                        .filter(|route| route.verb.conflicts_with(verb))
                        .map(|route| (route.key.clone(), route.verb))
                        .collect();
                    slot.retain(|route| !route.verb.conflicts_with(verb));
                    for (owner, taken) in evicted {
                        self.registry.remove_verb(&owner, path, taken);
                    }
                }
            }
        }

        slot.push(MountedRoute {
            verb,
            key: key.to_string(),
            handler: handler.clone(),
        });
        info!(path, verb = %verb, method = key, "Registered route");
        true
    }

    fn unmount(&mut self, key: &str) {
        for slot in self.routes.values_mut() {
            slot.retain(|route| route.key != key);
        }
        self.routes.retain(|_, slot| !slot.is_empty());
    }

    /// Build the router from everything registered so far.
    pub fn into_router(self) -> Router {
        self.finish().0
    }

    /// Build the router and hand back the registry.
    pub fn finish(self) -> (Router, Registry) {
        let body_limit = self.options.body_limit;
        let mut router = Router::new();

        for (path, mounted) in self.routes {
            let method_router = mounted
                .iter()
                .fold(MethodRouter::new(), |acc, route| {
                    route.handler.attach(acc, route.verb, body_limit)
                });
            router = router.route(&path, method_router);
        }

        (router, self.registry)
    }

    /// Collect documentation for the routable methods of `T`.
    ///
    /// Routes land in `doc`; resolved RouteSpecs of every documented method
    /// land in `table` for use as a route manifest. Methods without source
    /// are left out with a warning. Returns the number of methods documented.
    pub fn document<T: Routable>(
        &self,
        scraper: &SourceScraper,
        doc: &mut ApiDoc,
        table: &mut RouteTable,
    ) -> usize {
        let object = T::object_name();
        let custom_id = self.custom.as_ref().map(CustomContext::type_id);
        let mut documented = 0;

        for entry in table_of::<T>().entries() {
            let Some(convention) = classify(entry.signature(), custom_id).convention() else {
                continue;
            };
            let Some(source) = scraper.method(object, entry.name()) else {
                warn!(
                    object,
                    method = entry.name(),
                    "No source found for method, leaving it out of the documentation"
                );
                continue;
            };

            let specs = if source.routes.is_empty() {
                let spec = default_route(object, entry.name(), convention.param_count(), self.options.naming);
                match &source.note {
                    Some(note) => vec![spec.with_note(note.clone())],
                    None => vec![spec],
                }
            } else {
                source.routes.clone()
            };

            let request = source
                .request
                .as_ref()
                .and_then(|param| describe(scraper, param, object, entry.name()));
            let response = source
                .response
                .as_ref()
                .and_then(|param| describe(scraper, param, object, entry.name()));

            for spec in &specs {
                doc.add_route(DocRoute {
                    object: object.to_string(),
                    method: entry.name().to_string(),
                    path: join_paths(&self.options.group, &spec.path),
                    verbs: spec.methods.clone(),
                    note: spec.note.clone(),
                    request: request.clone(),
                    response: response.clone(),
                });
            }
            table.insert(object, entry.name(), specs);
            documented += 1;
        }

        documented
    }
}

fn describe(scraper: &SourceScraper, param: &ParamInfo, object: &str, method: &str) -> Option<StructInfo> {
    let found = scraper.structure(param).cloned();
    if found.is_none() {
        warn!(
            object,
            method,
            type_name = %param.type_name,
            "Struct definition not found, leaving its fields out of the documentation"
        );
    }
    found
}
