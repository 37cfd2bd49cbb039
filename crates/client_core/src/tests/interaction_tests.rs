use super::*;

use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use shared::{
    error::FetchError,
    http::{FetchRequest, HttpResponse},
    notification::NOTIFICATION_TAG,
};
use storage::CacheStorage;
use tokio::net::TcpListener;
use worker::{
    register, Fetcher, NotificationCenter, ReqwestNetwork, WorkerConfig, WorkerRegistration,
};

use crate::{browse::PaginationBar, loader::LoaderConfig};

#[derive(Default)]
struct RecordingNotifier {
    shown: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    fn titles(&self) -> Vec<String> {
        self.shown
            .lock()
            .expect("lock")
            .iter()
            .map(|n| n.title.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn show(&self, notification: &Notification) -> anyhow::Result<()> {
        self.shown.lock().expect("lock").push(notification.clone());
        Ok(())
    }
}

/// Live network that can be unplugged mid-test.
#[derive(Default)]
struct UnpluggableNetwork {
    live: ReqwestNetwork,
    unplugged: AtomicBool,
}

#[async_trait]
impl Fetcher for UnpluggableNetwork {
    async fn fetch(&self, request: FetchRequest) -> Result<HttpResponse, FetchError> {
        if self.unplugged.load(Ordering::SeqCst) {
            return Err(FetchError::network(request.url.as_str(), "cable unplugged"));
        }
        self.live.fetch(request).await
    }
}

struct AnswerPrompt {
    answer: NotificationPermission,
    prompts: AtomicUsize,
}

impl AnswerPrompt {
    fn new(answer: NotificationPermission) -> Self {
        Self {
            answer,
            prompts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PermissionHost for AnswerPrompt {
    async fn request_permission(&self) -> NotificationPermission {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}

fn listing(names: &[&str]) -> Value {
    let results: Vec<Value> = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            json!({ "name": name, "url": format!("https://pokeapi.co/api/v2/pokemon/{}/", i + 1) })
        })
        .collect();
    json!({ "results": results })
}

async fn spawn_api(body: Value) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let router = Router::new().route("/api/v2/pokemon", get(move || async move { Json(body) }));
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{addr}/api/v2")
}

struct Setup {
    pokedex: Pokedex,
    registration: WorkerRegistration,
    network: Arc<UnpluggableNetwork>,
    worker_notifier: Arc<RecordingNotifier>,
    page_notifier: Arc<RecordingNotifier>,
    permissions: NotificationPermissions,
}

async fn setup(body: Value, permission: NotificationPermission) -> Setup {
    let api_base_url = spawn_api(body).await;
    let storage = CacheStorage::new("sqlite::memory:").await.expect("db");
    let network = Arc::new(UnpluggableNetwork::default());
    let permissions = NotificationPermissions::new(permission);
    let worker_notifier = Arc::new(RecordingNotifier::default());
    let registration = register(
        WorkerConfig {
            api_host: "127.0.0.1".into(),
            ..WorkerConfig::default()
        },
        storage,
        network.clone(),
        NotificationCenter::new(worker_notifier.clone(), permissions.clone()),
    )
    .await
    .expect("register");

    let worker = registration.handle();
    let loader = SpeciesLoader::new(
        Arc::new(worker.clone()),
        LoaderConfig {
            api_base_url,
            ..LoaderConfig::default()
        },
    );
    let page_notifier = Arc::new(RecordingNotifier::default());
    let pokedex = Pokedex::new(loader, Some(worker), page_notifier.clone(), permissions.clone());
    Setup {
        pokedex,
        registration,
        network,
        worker_notifier,
        page_notifier,
        permissions,
    }
}

async fn wait_for(notifier: &RecordingNotifier, count: usize) {
    for _ in 0..50 {
        if notifier.shown.lock().expect("lock").len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn browse_view(pokedex: &Pokedex) -> crate::browse::BrowseView {
    match pokedex.screen() {
        Screen::Browse(view) => view,
        other => panic!("expected browse screen, got {other:?}"),
    }
}

#[tokio::test]
async fn loads_through_the_worker_and_browses() {
    let names: Vec<String> = (1..=45).map(|i| format!("mon{i}")).collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    let mut setup = setup(listing(&names), NotificationPermission::Granted).await;

    assert_eq!(setup.pokedex.screen(), Screen::Loading);
    setup.pokedex.load().await;
    let view = browse_view(&setup.pokedex);
    assert_eq!(view.cards.len(), 20);
    assert_eq!(view.pagination.map(|p| p.total_pages), Some(3));

    setup.pokedex.next_page();
    setup.pokedex.next_page();
    setup.pokedex.next_page();
    let view = browse_view(&setup.pokedex);
    assert_eq!(view.cards.len(), 5);
    assert_eq!(
        view.pagination,
        Some(PaginationBar {
            page: 3,
            total_pages: 3,
            can_go_back: true,
            can_go_forward: false,
        })
    );

    setup.pokedex.search("MON4");
    let view = browse_view(&setup.pokedex);
    let names: Vec<_> = view.cards.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Mon4", "Mon40", "Mon41", "Mon42", "Mon43", "Mon44", "Mon45"]);
    assert!(view.pagination.is_none());
}

#[tokio::test]
async fn reload_while_offline_is_served_from_the_api_cache() {
    let mut setup = setup(listing(&["bulbasaur", "ivysaur"]), NotificationPermission::Default).await;
    setup.pokedex.load().await;
    setup.network.unplugged.store(true, Ordering::SeqCst);

    setup.pokedex.load().await;
    let view = browse_view(&setup.pokedex);
    let names: Vec<_> = view.cards.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Bulbasaur", "Ivysaur"]);
}

#[tokio::test]
async fn load_failure_shows_error_screen() {
    let mut setup = setup(listing(&["bulbasaur"]), NotificationPermission::Default).await;
    setup.network.unplugged.store(true, Ordering::SeqCst);

    setup.pokedex.load().await;
    let Screen::Error(message) = setup.pokedex.screen() else {
        panic!("expected error screen");
    };
    assert!(message.contains("cable unplugged"), "unexpected message: {message}");
}

#[tokio::test]
async fn selecting_a_card_notifies_through_the_worker() {
    let mut setup = setup(listing(&["bulbasaur", "pikachu"]), NotificationPermission::Granted).await;
    setup.pokedex.load().await;

    let selected = setup.pokedex.select_card(2).await.expect("card in slot 2");
    assert_eq!(selected.name, "Pikachu");
    wait_for(&setup.worker_notifier, 1).await;

    let shown = setup.worker_notifier.shown.lock().expect("lock").clone();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].title, "Pikachu viewed!");
    assert_eq!(shown[0].body, "You viewed Pikachu. Browse more now!");
    assert_eq!(shown[0].tag.as_deref(), Some(NOTIFICATION_TAG));

    assert!(setup.pokedex.select_card(3).await.is_none());
    assert!(setup.pokedex.select_card(0).await.is_none());
}

#[tokio::test]
async fn no_worker_registration_means_no_message() {
    let api_base_url = spawn_api(listing(&["bulbasaur"])).await;
    let loader = SpeciesLoader::new(
        Arc::new(ReqwestNetwork::new()),
        LoaderConfig {
            api_base_url,
            ..LoaderConfig::default()
        },
    );
    let mut pokedex = Pokedex::new(
        loader,
        None,
        Arc::new(RecordingNotifier::default()),
        NotificationPermissions::default(),
    );
    pokedex.load().await;

    assert!(!pokedex.notify_species_viewed("Bulbasaur").await);
    let selected = pokedex.select_card(1).await.expect("browsing still works");
    assert_eq!(selected.name, "Bulbasaur");
}

#[tokio::test]
async fn stopped_worker_is_logged_not_surfaced() {
    let mut setup = setup(listing(&["bulbasaur"]), NotificationPermission::Granted).await;
    setup.pokedex.load().await;
    setup.registration.unregister();

    for _ in 0..50 {
        if !setup.pokedex.notify_species_viewed("Bulbasaur").await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!setup.pokedex.notify_species_viewed("Bulbasaur").await);
    assert!(setup.pokedex.select_card(1).await.is_some());
}

#[tokio::test]
async fn granting_permission_confirms_once_per_request() {
    let setup = setup(listing(&["bulbasaur"]), NotificationPermission::Default).await;
    let prompt = AnswerPrompt::new(NotificationPermission::Granted);

    let permission = setup.pokedex.request_notification_permission(&prompt).await;
    assert_eq!(permission, NotificationPermission::Granted);
    assert_eq!(setup.permissions.current(), NotificationPermission::Granted);
    assert_eq!(setup.page_notifier.titles(), vec![PERMISSION_CONFIRMATION_TITLE]);

    setup.pokedex.request_notification_permission(&prompt).await;
    assert_eq!(prompt.prompts.load(Ordering::SeqCst), 1, "decided permission is not re-prompted");
}

#[tokio::test]
async fn denied_permission_blocks_worker_notifications() {
    let mut setup = setup(listing(&["bulbasaur"]), NotificationPermission::Default).await;
    setup.pokedex.load().await;
    let prompt = AnswerPrompt::new(NotificationPermission::Denied);

    let permission = setup.pokedex.request_notification_permission(&prompt).await;
    assert_eq!(permission, NotificationPermission::Denied);
    assert!(setup.page_notifier.titles().is_empty());

    assert!(setup.pokedex.notify_species_viewed("Bulbasaur").await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(setup.worker_notifier.titles().is_empty());
}
