//! End-to-end update flow against a local release server.

use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use matcha_core::{
    Frontend, LauncherConfig, SettingsStore, UpdateController, UpdateError, UpdateOutcome,
};

/// Frontend double with a scripted confirmation answer.
struct ScriptedFrontend {
    accept: bool,
    progress: Mutex<Vec<bool>>,
    prompts: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
    infos: Mutex<Vec<String>>,
}

impl ScriptedFrontend {
    fn new(accept: bool) -> Self {
        Self {
            accept,
            progress: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
            infos: Mutex::new(Vec::new()),
        }
    }
}

impl Frontend for ScriptedFrontend {
    fn update_in_progress(&self, in_progress: bool) {
        self.progress.lock().unwrap().push(in_progress);
    }

    fn confirm(&self, message: &str) -> bool {
        self.prompts.lock().unwrap().push(message.to_string());
        self.accept
    }

    fn report_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }

    fn report_info(&self, message: &str) {
        self.infos.lock().unwrap().push(message.to_string());
    }
}

fn build_package() -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut cursor);
        let options = zip::write::SimpleFileOptions::default();
        writer.start_file("app", options).unwrap();
        writer.write_all(b"kernel-mode binary").unwrap();
        writer.start_file("usermode/app", options).unwrap();
        writer.write_all(b"user-mode binary").unwrap();
        writer.finish().unwrap();
    }
    cursor.into_inner()
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn config_for(dir: &Path, base: &str) -> LauncherConfig {
    LauncherConfig {
        install_root: dir.join("app"),
        user_exe: "usermode/app".into(),
        kernel_exe: "app".into(),
        manifest_url: format!("{base}/version.json"),
        package_url: format!("{base}/matcha.zip"),
        settings_path: dir.join("settings.json"),
    }
}

fn release_router() -> Router {
    let package = build_package();
    Router::new()
        .route(
            "/version.json",
            get(|| async { r#"{"version": "1.2", "changelog": "Shiny new things."}"# }),
        )
        .route("/matcha.zip", get(move || async move { package.clone() }))
}

#[tokio::test]
async fn fresh_machine_updates_then_reports_up_to_date() {
    let dir = tempfile::tempdir().unwrap();
    let base = serve(release_router()).await;
    let config = config_for(dir.path(), &base);

    // Nothing persisted yet: load yields the documented defaults.
    let store = SettingsStore::new(&config.settings_path);
    let loaded = store.load();
    assert!(!loaded.corrupted);
    assert_eq!(loaded.settings.version, "0.0");

    let frontend = Arc::new(ScriptedFrontend::new(true));
    let controller = UpdateController::new(&config, frontend.clone()).unwrap();

    let outcome = controller.check_and_offer_update().await.unwrap();
    assert_eq!(
        outcome,
        UpdateOutcome::Installed {
            version: "1.2".to_string()
        }
    );

    // The confirmation prompt carried the version and the changelog.
    let prompts = frontend.prompts.lock().unwrap().clone();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("1.2"));
    assert!(prompts[0].contains("Shiny new things."));

    // The install tree is fully present.
    assert_eq!(
        std::fs::read(config.user_exe_path()).unwrap(),
        b"user-mode binary"
    );
    assert_eq!(
        std::fs::read(config.kernel_exe_path()).unwrap(),
        b"kernel-mode binary"
    );

    // The new version was persisted only after the install committed.
    assert_eq!(store.load().settings.version, "1.2");

    // Progress fired exactly once, and no errors were reported.
    assert_eq!(*frontend.progress.lock().unwrap(), vec![true, false]);
    assert!(frontend.errors.lock().unwrap().is_empty());

    // A second check against the same manifest is a no-op.
    let outcome = controller.check_and_offer_update().await.unwrap();
    assert_eq!(outcome, UpdateOutcome::UpToDate);
    assert!(frontend
        .infos
        .lock()
        .unwrap()
        .iter()
        .any(|m| m.contains("up-to-date")));
}

#[tokio::test]
async fn declined_update_leaves_everything_alone() {
    let dir = tempfile::tempdir().unwrap();
    let base = serve(release_router()).await;
    let config = config_for(dir.path(), &base);

    let frontend = Arc::new(ScriptedFrontend::new(false));
    let controller = UpdateController::new(&config, frontend.clone()).unwrap();

    let outcome = controller.check_and_offer_update().await.unwrap();
    assert_eq!(
        outcome,
        UpdateOutcome::Declined {
            version: "1.2".to_string()
        }
    );

    assert!(!config.install_root.exists());
    assert!(!config.settings_path.exists());
    assert!(frontend.progress.lock().unwrap().is_empty());
}

#[tokio::test]
async fn reinstall_installs_without_a_version_comparison() {
    let dir = tempfile::tempdir().unwrap();
    let base = serve(release_router()).await;
    let config = config_for(dir.path(), &base);

    let store = SettingsStore::new(&config.settings_path);
    let mut settings = store.load().settings;
    // Pretend the manifest version is already installed.
    settings.version = "1.2".to_string();
    store.save(&settings).unwrap();

    let frontend = Arc::new(ScriptedFrontend::new(true));
    let controller = UpdateController::new(&config, frontend.clone()).unwrap();

    controller.reinstall().await.unwrap();

    // Installed despite the matching version, no confirmation prompt.
    assert!(config.user_exe_path().is_file());
    assert!(frontend.prompts.lock().unwrap().is_empty());

    // The settings record was reset, so the next check re-offers 1.2.
    assert_eq!(store.load().settings.version, "0.0");
    let outcome = controller.check_and_offer_update().await.unwrap();
    assert_eq!(
        outcome,
        UpdateOutcome::Installed {
            version: "1.2".to_string()
        }
    );
}

#[tokio::test]
async fn second_transaction_is_rejected_while_one_is_in_flight() {
    let dir = tempfile::tempdir().unwrap();

    // Slow manifest endpoint keeps the first transaction in flight.
    let router = Router::new().route(
        "/version.json",
        get(|| async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            r#"{"version": "1.2"}"#
        }),
    );
    let base = serve(router).await;
    let config = config_for(dir.path(), &base);

    let frontend = Arc::new(ScriptedFrontend::new(false));
    let controller = Arc::new(UpdateController::new(&config, frontend).unwrap());

    let first = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.check_and_offer_update().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    let err = controller.check_and_offer_update().await.unwrap_err();
    assert!(matches!(err, UpdateError::Busy), "got {err:?}");

    // The in-flight transaction completes normally (declined by script).
    let outcome = first.await.unwrap().unwrap();
    assert_eq!(
        outcome,
        UpdateOutcome::Declined {
            version: "1.2".to_string()
        }
    );
}

#[tokio::test]
async fn startup_check_runs_when_auto_update_is_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let base = serve(release_router()).await;
    let config = config_for(dir.path(), &base);

    let frontend = Arc::new(ScriptedFrontend::new(true));
    let controller = Arc::new(UpdateController::new(&config, frontend).unwrap());

    // auto_update defaults to true, so the startup check spawns.
    let handle = controller.spawn_startup_check().expect("check should spawn");
    let outcome = handle.await.unwrap().unwrap();
    assert_eq!(
        outcome,
        UpdateOutcome::Installed {
            version: "1.2".to_string()
        }
    );
    assert!(config.user_exe_path().is_file());
}
