//! End-to-end flows through the public facade: start, bind, apply,
//! navigation gating, and data-provider filtering together.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use aperture::{
    ApertureError, Authorization, BindTarget, Component, ComponentRef, ConfigLoader, ContextStore,
    DataProvider,
    EngineConfig, EngineError, EvaluatorSet, InProcessContextStore, ListProvider, NavigationFacade,
    Permission, PermissionHandle, Query, TargetId, View, ViewRef, start,
};

// ============================================================================
// Fixtures
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RoleRequired(&'static str);

impl Permission for RoleRequired {}

fn role(name: &'static str) -> PermissionHandle {
    PermissionHandle::new(RoleRequired(name))
}

#[derive(Default)]
struct CurrentUser {
    roles: RwLock<HashSet<&'static str>>,
}

impl CurrentUser {
    fn grant_role(&self, name: &'static str) {
        self.roles.write().unwrap().insert(name);
    }

    fn revoke_role(&self, name: &'static str) {
        self.roles.write().unwrap().remove(name);
    }

    fn has_role(&self, name: &str) -> bool {
        self.roles.read().unwrap().contains(name)
    }
}

struct Button {
    id: TargetId,
    visible: AtomicBool,
}

impl Button {
    fn new(id: u64) -> Arc<Self> {
        Arc::new(Self {
            id: TargetId::new(id),
            visible: AtomicBool::new(true),
        })
    }
}

impl BindTarget for Button {
    fn target_id(&self) -> TargetId {
        self.id
    }
}

impl Component for Button {
    fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::SeqCst);
    }

    fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }
}

struct AdminView {
    id: TargetId,
}

impl BindTarget for AdminView {
    fn target_id(&self) -> TargetId {
        self.id
    }
}

impl View for AdminView {
    fn navigation_params(&self) -> String {
        "admin".to_string()
    }
}

struct RecordingNavigation {
    location: Mutex<Option<String>>,
    replays: AtomicUsize,
}

impl NavigationFacade for RecordingNavigation {
    fn current_location(&self) -> Option<String> {
        self.location.lock().unwrap().clone()
    }

    fn navigate_to(&self, location: &str) {
        *self.location.lock().unwrap() = Some(location.to_string());
        self.replays.fetch_add(1, Ordering::SeqCst);
    }
}

fn started(user: &Arc<CurrentUser>) -> (Authorization, InProcessContextStore) {
    let captured = Arc::clone(user);
    let evaluators = EvaluatorSet::new()
        .with::<RoleRequired, _>(move |required: &RoleRequired| captured.has_role(required.0))
        .unwrap();

    let store = InProcessContextStore::new();
    let config = EngineConfig {
        audit: aperture::Audit { enabled: false },
        ..EngineConfig::default()
    };
    let authorization = start(evaluators, &config, &store).unwrap();
    (authorization, store)
}

// ============================================================================
// Start
// ============================================================================

#[test]
fn test_starting_twice_in_one_session_fails() {
    let user = Arc::new(CurrentUser::default());
    let (_authorization, store) = started(&user);

    let evaluators = EvaluatorSet::new()
        .with::<RoleRequired, _>(|_: &RoleRequired| true)
        .unwrap();
    let result = start(evaluators, &EngineConfig::default(), &store);

    assert!(matches!(result, Err(ApertureError::AlreadyStarted)));
}

#[test]
fn test_reattach_after_start() {
    let user = Arc::new(CurrentUser::default());
    let (_authorization, store) = started(&user);

    assert!(Authorization::from_session(&store).is_some());
    store.clear();
    assert!(Authorization::from_session(&store).is_none());
}

#[test]
fn test_config_loader_defaults_apply() {
    let config = ConfigLoader::new()
        .with_project_dir("/nonexistent/aperture-flow-test")
        .load_or_default();
    assert_eq!(config, EngineConfig::default());
}

// ============================================================================
// Visibility scenario
// ============================================================================

#[test]
fn test_button_visibility_follows_roles() {
    let user = Arc::new(CurrentUser::default());
    user.grant_role("user");
    let (authorization, _store) = started(&user);

    let button = Button::new(1);
    authorization
        .bind_components(vec![button.clone() as ComponentRef])
        .unwrap()
        .to(vec![role("user"), role("admin")])
        .unwrap();

    authorization.apply_all().unwrap();
    assert!(!button.is_visible(), "user lacks the admin role");

    user.grant_role("admin");
    authorization.apply_all().unwrap();
    assert!(button.is_visible(), "both required roles now granted");

    user.revoke_role("admin");
    authorization.apply_all().unwrap();
    assert!(!button.is_visible(), "revocation hides again");
}

#[test]
fn test_external_mutation_is_rejected_then_recoverable() {
    let user = Arc::new(CurrentUser::default());
    user.grant_role("user");
    let (authorization, _store) = started(&user);

    let button = Button::new(1);
    authorization
        .bind_components(vec![button.clone() as ComponentRef])
        .unwrap()
        .to(vec![role("user")])
        .unwrap();
    authorization.apply_all().unwrap();

    // Host code flips visibility directly: contract violation.
    button.set_visible(false);
    let err = authorization.apply_all().unwrap_err();
    assert!(matches!(
        err,
        ApertureError::Engine(EngineError::ExternalVisibilityMutation {
            target,
            ..
        }) if target == TargetId::new(1)
    ));

    // Undo the mutation; the next apply converges.
    button.set_visible(true);
    authorization.apply_all().unwrap();
    assert!(button.is_visible());
}

#[test]
fn test_apply_twice_is_idempotent() {
    let user = Arc::new(CurrentUser::default());
    let (authorization, _store) = started(&user);

    let button = Button::new(1);
    authorization
        .bind_components(vec![button.clone() as ComponentRef])
        .unwrap()
        .to(vec![role("admin")])
        .unwrap();

    authorization.apply_all().unwrap();
    assert!(!button.is_visible());
    authorization.apply_all().unwrap();
    assert!(!button.is_visible());
}

// ============================================================================
// Binding lifecycle
// ============================================================================

#[test]
fn test_bind_unions_and_unbind_subtracts() {
    let user = Arc::new(CurrentUser::default());
    let (authorization, _store) = started(&user);

    let x = Button::new(1);
    let y = Button::new(2);

    authorization
        .bind_components(vec![x.clone() as ComponentRef])
        .unwrap()
        .to(vec![role("p1"), role("p2")])
        .unwrap();
    authorization
        .bind_components(vec![x.clone() as ComponentRef, y.clone() as ComponentRef])
        .unwrap()
        .to(vec![role("p3")])
        .unwrap();

    let context = authorization.context();
    let x_permissions = context.components().permissions_of(TargetId::new(1));
    assert_eq!(x_permissions.len(), 3);
    let y_permissions = context.components().permissions_of(TargetId::new(2));
    assert_eq!(y_permissions, vec![role("p3")]);

    authorization
        .unbind_components(vec![x.clone() as ComponentRef])
        .unwrap()
        .from(vec![role("p1")])
        .unwrap();
    let x_permissions = context.components().permissions_of(TargetId::new(1));
    assert_eq!(x_permissions.len(), 2);
    assert!(!x_permissions.contains(&role("p1")));
}

#[test]
fn test_from_all_resets_component_to_visible() {
    let user = Arc::new(CurrentUser::default());
    let (authorization, _store) = started(&user);

    let button = Button::new(1);
    authorization
        .bind_components(vec![button.clone() as ComponentRef])
        .unwrap()
        .to(vec![role("admin")])
        .unwrap();
    authorization.apply_all().unwrap();
    assert!(!button.is_visible());

    let removed = authorization
        .unbind_components(vec![button.clone() as ComponentRef])
        .unwrap()
        .from_all();

    assert_eq!(removed, vec![TargetId::new(1)]);
    assert!(button.is_visible(), "no permissions means unrestricted");

    // The tracker forgot the component, so its new host-managed state is
    // not flagged as an external mutation.
    button.set_visible(false);
    authorization.apply_all().unwrap();
}

#[test]
fn test_reverter_round_trips_and_is_single_use() {
    let user = Arc::new(CurrentUser::default());
    let (authorization, _store) = started(&user);

    let button = Button::new(1);
    authorization
        .bind_components(vec![button.clone() as ComponentRef])
        .unwrap()
        .to(vec![role("p1")])
        .unwrap();

    let before = authorization
        .context()
        .components()
        .permissions_of(TargetId::new(1));

    let mut reverter = authorization
        .bind_components(vec![button.clone() as ComponentRef])
        .unwrap()
        .to(vec![role("p2")])
        .unwrap();
    reverter.revert().unwrap();

    let after = authorization
        .context()
        .components()
        .permissions_of(TargetId::new(1));
    assert_eq!(before, after);

    assert!(reverter.revert().is_err());
}

#[test]
fn test_unfinished_bind_is_surfaced_on_next_call() {
    let user = Arc::new(CurrentUser::default());
    let (authorization, _store) = started(&user);

    let button = Button::new(1);
    let _unfinished = authorization
        .bind_components(vec![button.clone() as ComponentRef])
        .unwrap();

    assert!(matches!(
        authorization.bind_components(vec![button.clone() as ComponentRef]),
        Err(ApertureError::Binding(_))
    ));
}

// ============================================================================
// Navigation
// ============================================================================

#[test]
fn test_view_gate_follows_roles_and_apply_replays() {
    let user = Arc::new(CurrentUser::default());
    let (authorization, _store) = started(&user);

    let admin_view = Arc::new(AdminView {
        id: TargetId::new(10),
    });
    authorization
        .bind_views(vec![admin_view.clone() as ViewRef])
        .unwrap()
        .to(vec![role("admin")])
        .unwrap();

    assert!(!authorization.navigation_allowed(TargetId::new(10)).unwrap());
    user.grant_role("admin");
    assert!(authorization.navigation_allowed(TargetId::new(10)).unwrap());

    let navigation = Arc::new(RecordingNavigation {
        location: Mutex::new(Some("admin".to_string())),
        replays: AtomicUsize::new(0),
    });
    authorization.set_navigation_facade(navigation.clone());

    authorization.apply_all().unwrap();
    assert_eq!(navigation.replays.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Data providers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Report {
    name: &'static str,
    restricted: bool,
}

impl Permission for Report {}

#[test]
fn test_in_memory_provider_filters_and_refreshes() {
    let user = Arc::new(CurrentUser::default());
    let captured = Arc::clone(&user);
    let evaluators = EvaluatorSet::new()
        .with::<RoleRequired, _>({
            let captured = Arc::clone(&user);
            move |required: &RoleRequired| captured.has_role(required.0)
        })
        .unwrap()
        .with::<Report, _>(move |report: &Report| {
            !report.restricted || captured.has_role("admin")
        })
        .unwrap();

    let store = InProcessContextStore::new();
    let config = EngineConfig {
        audit: aperture::Audit { enabled: false },
        ..EngineConfig::default()
    };
    let authorization = start(evaluators, &config, &store).unwrap();

    let i1 = Report {
        name: "monthly",
        restricted: false,
    };
    let i2 = Report {
        name: "quarterly",
        restricted: false,
    };
    let i3 = Report {
        name: "payroll",
        restricted: true,
    };

    let provider = Arc::new(ListProvider::new(vec![i1.clone(), i2.clone(), i3.clone()]));
    authorization
        .bind_data_in_memory(TargetId::new(30), &provider)
        .unwrap();

    // Original relative order, restricted item removed.
    assert_eq!(provider.fetch(&Query::all()).unwrap(), vec![i1, i2]);
    assert_eq!(provider.size(&Query::all()).unwrap(), 2);

    // Applies refresh the provider so hosts re-render filtered data.
    let before = provider.refresh_count();
    authorization.apply_all().unwrap();
    assert!(provider.refresh_count() > before);

    authorization.unbind_data(TargetId::new(30));
    let after_unbind = provider.refresh_count();
    authorization.apply_all().unwrap();
    assert_eq!(provider.refresh_count(), after_unbind);
}

#[test]
fn test_dropped_provider_is_not_kept_alive() {
    let user = Arc::new(CurrentUser::default());
    let captured = Arc::clone(&user);
    let evaluators = EvaluatorSet::new()
        .with::<Report, _>(move |report: &Report| {
            !report.restricted || captured.has_role("admin")
        })
        .unwrap();

    let store = InProcessContextStore::new();
    let config = EngineConfig {
        audit: aperture::Audit { enabled: false },
        ..EngineConfig::default()
    };
    let authorization = start(evaluators, &config, &store).unwrap();

    let provider = Arc::new(ListProvider::new(vec![Report {
        name: "monthly",
        restricted: false,
    }]));
    authorization
        .bind_data_in_memory(TargetId::new(30), &provider)
        .unwrap();
    assert_eq!(authorization.context().provider_count(), 1);

    drop(provider);
    authorization.apply_all().unwrap();
    assert_eq!(authorization.context().provider_count(), 0);
}
