//! Integration tests for the registry

use scoped_di::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// Test services
#[derive(Clone, Debug, PartialEq)]
struct Config {
    name: String,
}

impl Config {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
struct Database {
    connection_string: String,
}

impl Autowire for Database {}

#[derive(Debug)]
struct Service {
    name: String,
}

impl Autowire for Service {}

trait Greeter: Send + Sync {
    fn greet(&self) -> String;
}

impl Greeter for Service {
    fn greet(&self) -> String {
        format!("hello from {}", self.name)
    }
}

injectable! {
    #[derive(Clone)]
    struct Repository {
        db: Arc<Database>,
    }
}

injectable! {
    #[derive(Clone)]
    struct ComplexService {
        service: Arc<Service>,
        repo: Repository,
    }
}

injectable! {
    #[derive(Clone)]
    struct NeedsCount {
        count: u64,
    }
}

#[test]
fn test_provided_value_is_identity_preserving() {
    let registry = Registry::new();
    let service = Arc::new(Service {
        name: "svc".to_string(),
    });
    registry.provide_value(service.clone()).unwrap();

    for _ in 0..3 {
        let resolved = registry.must_resolve::<Arc<Service>>().unwrap();
        assert!(Arc::ptr_eq(&resolved, &service));
    }
}

#[test]
fn test_resolve_miss_is_none() {
    let registry = Registry::new();
    assert!(registry.resolve::<Config>().unwrap().is_none());

    match registry.must_resolve::<Config>() {
        Err(DiError::ServiceNotFound { service_type }) => {
            assert!(service_type.ends_with("Config"))
        }
        other => panic!("Expected ServiceNotFound error, got {:?}", other),
    }
}

#[test]
fn test_singleton_factory_registration() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let registry = Registry::new();
    registry
        .provide_factory(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(Service {
                name: "singleton".to_string(),
            })
        })
        .unwrap();

    let first = registry.must_resolve::<Arc<Service>>().unwrap();
    let second = registry.must_resolve::<Arc<Service>>().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_prototype_factory_registration() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let registry = Registry::new();
    registry
        .provide_prototype(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(Service {
                name: format!("service-{}", n),
            })
        })
        .unwrap();

    let first = registry.must_resolve::<Arc<Service>>().unwrap();
    let second = registry.must_resolve::<Arc<Service>>().unwrap();

    assert_eq!(first.name, "service-0");
    assert_eq!(second.name, "service-1");
    assert!(!Arc::ptr_eq(&first, &second));
}

#[test]
fn test_register_with_handles() {
    let registry = Registry::new();

    let first = Handle::<Arc<Service>>::named("service1");
    let second = Handle::<Arc<Service>>::named("service2");
    let db = Handle::<Database>::named("db");

    registry
        .register::<[Binding; 3]>([
            Registration::bind(
                &first,
                Arc::new(Service {
                    name: "Service1".to_string(),
                }),
            )
            .into(),
            Registration::bind(
                &second,
                Arc::new(Service {
                    name: "Service2".to_string(),
                }),
            )
            .into(),
            Registration::bind(
                &db,
                Database {
                    connection_string: "localhost".to_string(),
                },
            )
            .into(),
        ])
        .unwrap();

    assert_eq!(registry.get(&first).unwrap().name, "Service1");
    assert_eq!(registry.get(&second).unwrap().name, "Service2");
    assert_eq!(registry.get(&db).unwrap().connection_string, "localhost");
}

#[test]
fn test_duplicate_types_are_ambiguous_but_handles_work() {
    let registry = Registry::new();
    let a = Handle::<Config>::named("a");
    let b = Handle::<Config>::named("b");

    registry
        .register([
            Registration::bind(&a, Config::new("a")),
            Registration::bind(&b, Config::new("b")),
        ])
        .unwrap();

    assert_eq!(
        registry.resolve::<Config>().unwrap_err(),
        DiError::AmbiguousRegistration {
            service_type: std::any::type_name::<Config>(),
            count: 2,
        }
    );
    assert_eq!(registry.get(&a).unwrap(), Config::new("a"));
    assert_eq!(registry.get(&b).unwrap(), Config::new("b"));
}

#[test]
fn test_handle_factories() {
    let registry = Registry::new();
    let singleton = Handle::<Arc<Service>>::named("singleton");
    let prototype = Handle::<Arc<Service>>::named("prototype");

    registry
        .register([
            Registration::bind_factory(&singleton, || {
                Arc::new(Service {
                    name: "one".to_string(),
                })
            }),
            Registration::bind_prototype(&prototype, || {
                Arc::new(Service {
                    name: "many".to_string(),
                })
            }),
        ])
        .unwrap();

    assert!(Arc::ptr_eq(
        &registry.get(&singleton).unwrap(),
        &registry.get(&singleton).unwrap()
    ));
    assert!(!Arc::ptr_eq(
        &registry.get(&prototype).unwrap(),
        &registry.get(&prototype).unwrap()
    ));
}

#[test]
fn test_get_missing_handle_fails_and_find_reports_none() {
    let registry = Registry::new();
    let handle = Handle::<Config>::named("missing");

    assert_eq!(
        registry.get(&handle).unwrap_err(),
        DiError::HandleNotFound("missing".to_string())
    );
    assert_eq!(registry.find(&handle).unwrap(), None);
}

#[test]
fn test_handle_lookup_falls_back_to_parent() {
    let root = Registry::new();
    let handle = Handle::<Config>::named("config");
    root.register([Registration::bind(&handle, Config::new("root"))])
        .unwrap();

    let scoped = Registry::new_scoped(&root);
    assert_eq!(scoped.get(&handle).unwrap(), Config::new("root"));
}

#[test]
fn test_scoped_falls_back_to_parent() {
    let root = Registry::new();
    root.provide_value(Config::new("x")).unwrap();
    let scoped = Registry::new_scoped(&root);

    assert_eq!(scoped.must_resolve::<Config>().unwrap(), Config::new("x"));
}

#[test]
fn test_scoped_overrides_parent() {
    let root = Registry::new();
    root.provide_value(Config::new("x")).unwrap();
    let scoped = Registry::new_scoped(&root);

    assert_eq!(scoped.must_resolve::<Config>().unwrap(), Config::new("x"));

    scoped.provide_value(Config::new("y")).unwrap();

    assert_eq!(scoped.must_resolve::<Config>().unwrap(), Config::new("y"));
    assert_eq!(root.must_resolve::<Config>().unwrap(), Config::new("x"));
}

#[test]
fn test_clear_does_not_affect_parent() {
    let root = Registry::new();
    root.provide_value(Config::new("parent")).unwrap();

    let scoped = Registry::new_scoped(&root);
    scoped.provide_value(Config::new("local")).unwrap();
    assert_eq!(scoped.must_resolve::<Config>().unwrap(), Config::new("local"));

    scoped.clear();

    assert!(scoped.is_empty());
    assert_eq!(scoped.must_resolve::<Config>().unwrap(), Config::new("parent"));
    assert_eq!(root.len(), 1);
}

#[test]
fn test_resolve_all_local() {
    let registry = Registry::new();
    registry
        .provide_value(Arc::new(Service {
            name: "Service1".to_string(),
        }))
        .unwrap();
    registry
        .provide_value(Arc::new(Service {
            name: "Service2".to_string(),
        }))
        .unwrap();

    let names: Vec<String> = registry
        .resolve_all::<Arc<Service>>()
        .unwrap()
        .iter()
        .map(|s| s.name.clone())
        .collect();
    assert_eq!(names, vec!["Service1", "Service2"]);
}

#[test]
fn test_resolve_all_walks_chain_without_duplicates() {
    let root = Registry::new();
    root.provide_value(Config::new("parent")).unwrap();

    let scoped = Registry::new_scoped(&root);
    scoped.provide_value(Config::new("scoped")).unwrap();

    let all = scoped.resolve_all::<Config>().unwrap();
    assert_eq!(all, vec![Config::new("scoped"), Config::new("parent")]);

    assert!(scoped.resolve_all::<Database>().unwrap().is_empty());
}

#[test]
fn test_resolve_all_includes_similar_matches() {
    let registry = Registry::new();
    registry.provide_value(Config::new("bare")).unwrap();

    let shared = registry.resolve_all::<Arc<Config>>().unwrap();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].name, "bare");
}

#[test]
fn test_capability_resolution() {
    let registry = Registry::new();
    registry
        .register([Registration::value(Arc::new(Service {
            name: "impl".to_string(),
        }))
        .exposing(|service: &Arc<Service>| service.clone() as Arc<dyn Greeter>)])
        .unwrap();

    let greeter = registry.must_resolve::<Arc<dyn Greeter>>().unwrap();
    assert_eq!(greeter.greet(), "hello from impl");

    // Still resolvable as the concrete type
    assert!(registry.resolve::<Arc<Service>>().unwrap().is_some());
}

#[test]
fn test_two_capability_providers_are_ambiguous() {
    let registry = Registry::new();
    for name in ["a", "b"] {
        registry
            .register([Registration::value(Arc::new(Service {
                name: name.to_string(),
            }))
            .exposing(|service: &Arc<Service>| service.clone() as Arc<dyn Greeter>)])
            .unwrap();
    }

    assert!(matches!(
        registry.resolve::<Arc<dyn Greeter>>(),
        Err(DiError::AmbiguousRegistration { count: 2, .. })
    ));
    assert_eq!(registry.resolve_all::<Arc<dyn Greeter>>().unwrap().len(), 2);
}

#[test]
fn test_parent_exact_match_preferred_over_local_similar() {
    let root = Registry::new();
    root.provide_value(Arc::new(Config::new("parent-shared")))
        .unwrap();

    let scoped = Registry::new_scoped(&root);
    scoped.provide_value(Config::new("local-bare")).unwrap();

    let resolved = scoped.must_resolve::<Arc<Config>>().unwrap();
    assert_eq!(resolved.name, "parent-shared");
}

#[test]
fn test_shared_value_satisfies_bare_request() {
    let registry = Registry::new();
    registry.provide_value(Arc::new(Config::new("shared"))).unwrap();

    assert_eq!(
        registry.must_resolve::<Config>().unwrap(),
        Config::new("shared")
    );
}

#[test]
fn test_inject_coerces_bare_value() {
    let registry = Registry::new();
    registry
        .provide_value(Database {
            connection_string: "localhost:5432".to_string(),
        })
        .unwrap();

    let repo: Repository = registry.construct().unwrap();
    assert_eq!(repo.db.connection_string, "localhost:5432");
}

#[test]
fn test_inject_overwrites_target() {
    let registry = Registry::new();
    registry
        .provide_value(Arc::new(Database {
            connection_string: "injected".to_string(),
        }))
        .unwrap();

    let mut repo = Repository {
        db: Arc::new(Database {
            connection_string: "placeholder".to_string(),
        }),
    };
    registry.inject(&mut repo).unwrap();
    assert_eq!(repo.db.connection_string, "injected");
}

#[test]
fn test_inject_nested_struct() {
    let registry = Registry::new();
    registry
        .provide_value(Arc::new(Database {
            connection_string: "localhost:5432".to_string(),
        }))
        .unwrap();
    registry
        .provide_value(Arc::new(Service {
            name: "InjectedService".to_string(),
        }))
        .unwrap();

    let complex: ComplexService = registry.construct().unwrap();
    assert_eq!(complex.service.name, "InjectedService");
    assert_eq!(complex.repo.db.connection_string, "localhost:5432");
}

#[test]
fn test_inject_prefers_registered_struct() {
    let registry = Registry::new();
    let db = Arc::new(Database {
        connection_string: "registered".to_string(),
    });
    registry
        .provide_value(Repository { db: db.clone() })
        .unwrap();
    registry
        .provide_value(Arc::new(Service {
            name: "svc".to_string(),
        }))
        .unwrap();

    let complex: ComplexService = registry.construct().unwrap();
    assert!(Arc::ptr_eq(&complex.repo.db, &db));
}

#[test]
fn test_inject_non_struct_target_fails() {
    let registry = Registry::new();
    let mut value = 5u32;

    assert_eq!(
        registry.inject(&mut value).unwrap_err(),
        DiError::InvalidTarget { target: "u32" }
    );
    assert_eq!(value, 5);
}

#[test]
fn test_inject_missing_dependency_fails() {
    let registry = Registry::new();

    match registry.construct::<Repository>() {
        Err(DiError::UnresolvedField { owner, field, .. }) => {
            assert_eq!(owner, "Repository");
            assert_eq!(field, "db");
        }
        other => panic!("Expected UnresolvedField, got {:?}", other.err()),
    }

    match registry.construct::<NeedsCount>() {
        Err(DiError::UnresolvedField { field, .. }) => assert_eq!(field, "count"),
        other => panic!("Expected UnresolvedField, got {:?}", other.err()),
    }
}

#[test]
fn test_inject_resolves_registered_primitive_fields() {
    let registry = Registry::new();
    registry.provide_value(42u64).unwrap();

    let needs: NeedsCount = registry.construct().unwrap();
    assert_eq!(needs.count, 42);
}

#[test]
fn test_failed_inject_leaves_target_untouched() {
    let registry = Registry::new();
    let mut repo = Repository {
        db: Arc::new(Database {
            connection_string: "original".to_string(),
        }),
    };

    assert!(registry.inject(&mut repo).is_err());
    assert_eq!(repo.db.connection_string, "original");
}

#[test]
fn test_try_factory_error_surfaces() {
    let registry = Registry::new();
    registry
        .register([Registration::<Arc<Database>>::try_factory(
            Lifecycle::Singleton,
            || Err::<Arc<Database>, _>("connection refused"),
        )])
        .unwrap();

    match registry.resolve::<Arc<Database>>() {
        Err(DiError::ServiceCreationFailed { reason, .. }) => {
            assert_eq!(reason, "connection refused")
        }
        other => panic!("Expected ServiceCreationFailed, got {:?}", other),
    }
}

#[test]
fn test_global_registry_is_shared() {
    let handle = Handle::<Config>::named("integration-tests::global");
    Registry::global()
        .register([Registration::bind(&handle, Config::new("global"))])
        .unwrap();

    assert!(Registry::global().ptr_eq(Registry::global()));
    assert_eq!(
        Registry::global().get(&handle).unwrap(),
        Config::new("global")
    );
}
