//! Integration tests for the Sync Orchestrator against a scripted backend.

#[path = "support/mod.rs"]
mod support;

use std::sync::Arc;
use std::time::Duration;

use focusmode_core::{
    AppState, ReadyState, SkipReason, SyncAvailability, SyncOrchestrator, SyncOutcome,
};
use focusmode_domain::{
    AuthUser, ErrorSeverity, FocusError, RemoteUserState, SignInMethod, SyncSettings, View,
};
use support::{RecordingUi, ScriptedBackend};

fn orchestrator(backend: &Arc<ScriptedBackend>, ui: &Arc<RecordingUi>) -> Arc<SyncOrchestrator> {
    Arc::new(SyncOrchestrator::new(backend.clone(), ui.clone()))
}

fn u1() -> AuthUser {
    AuthUser::with_id("u1")
}

#[tokio::test]
async fn operations_before_ready_run_in_submission_order() {
    let backend = Arc::new(ScriptedBackend::new());
    let ui = Arc::new(RecordingUi::default());
    let sync = orchestrator(&backend, &ui);

    assert_eq!(sync.handle_auth_change(Some(u1())).await, SyncOutcome::Deferred);
    assert_eq!(sync.save().await, SyncOutcome::Deferred);
    assert_eq!(sync.sign_out().await, SyncOutcome::Deferred);
    assert_eq!(sync.status(), SyncAvailability::Pending);
    assert!(backend.calls().is_empty());

    assert_eq!(sync.bootstrap().await, SyncOutcome::Completed);

    assert_eq!(
        backend.calls(),
        vec![
            "initialize",
            "load:u1",
            "save:u1", // first-login migration
            "save:u1", // queued save
            "save:u1", // final save before sign-out
            "sign_out",
        ]
    );
    assert_eq!(ui.views(), vec![View::Dashboard, View::Welcome]);
    assert_eq!(sync.ready_state(), ReadyState::Ready);
    assert_eq!(sync.status(), SyncAvailability::Available);
}

#[tokio::test]
async fn bootstrap_runs_only_once() {
    let backend = Arc::new(ScriptedBackend::new());
    let ui = Arc::new(RecordingUi::default());
    let sync = orchestrator(&backend, &ui);

    assert!(sync.bootstrap().await.is_completed());
    assert_eq!(sync.bootstrap().await, SyncOutcome::Skipped(SkipReason::AlreadyBootstrapped));
    assert_eq!(backend.count("initialize"), 1);
}

#[tokio::test]
async fn first_login_without_remote_state_saves_defaults() {
    let backend = Arc::new(ScriptedBackend::new());
    let ui = Arc::new(RecordingUi::default());
    let sync = orchestrator(&backend, &ui);
    sync.bootstrap().await;

    assert_eq!(sync.handle_auth_change(Some(u1())).await, SyncOutcome::Completed);

    assert_eq!(sync.state().await, AppState::default());
    let stored = backend.document("u1").expect("migration wrote a document");
    let mut reloaded = AppState::default();
    reloaded.apply(Some(&stored));
    assert_eq!(reloaded, AppState::default());
    assert_eq!(ui.last_view(), Some(View::Dashboard));
    assert_eq!(ui.refreshes(), 1);
}

#[tokio::test]
async fn partial_remote_record_keeps_local_values() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_document("u1", RemoteUserState { points: Some(5), ..Default::default() }),
    );
    let ui = Arc::new(RecordingUi::default());
    let sync = orchestrator(&backend, &ui);
    sync.bootstrap().await;

    {
        let session = sync.session();
        let mut session = session.write().await;
        session.state.streak_days = 3;
        session.state.browser_notifications_enabled = true;
    }

    sync.handle_auth_change(Some(u1())).await;

    let state = sync.state().await;
    assert_eq!(state.points, 5);
    assert_eq!(state.streak_days, 3);
    assert!(state.browser_notifications_enabled);

    // the migration wrote the merged record back
    let stored = backend.document("u1").unwrap();
    assert_eq!(stored.points, Some(5));
    assert_eq!(stored.streak_days, Some(3));
}

#[tokio::test]
async fn failed_load_keeps_state_and_skips_migration() {
    let backend = Arc::new(ScriptedBackend::new());
    let ui = Arc::new(RecordingUi::default());
    let sync = orchestrator(&backend, &ui);
    sync.bootstrap().await;

    {
        let session = sync.session();
        session.write().await.state.points = 77;
    }
    backend.fail_next_load(FocusError::Network("connection reset".into()));

    assert_eq!(sync.handle_auth_change(Some(u1())).await, SyncOutcome::Completed);

    assert_eq!(sync.state().await.points, 77);
    assert_eq!(backend.count("save:u1"), 0);
    assert_eq!(ui.last_view(), Some(View::Dashboard));
    assert_eq!(sync.save().await, SyncOutcome::Skipped(SkipReason::NotHydrated));

    // a later auth change for the same user retries the load
    assert_eq!(sync.handle_auth_change(Some(u1())).await, SyncOutcome::Completed);
    assert_eq!(backend.count("load:u1"), 2);
    assert_eq!(sync.save().await, SyncOutcome::Completed);
}

#[tokio::test]
async fn repeated_auth_change_for_loaded_user_is_skipped() {
    let backend = Arc::new(ScriptedBackend::new());
    let ui = Arc::new(RecordingUi::default());
    let sync = orchestrator(&backend, &ui);
    sync.bootstrap().await;

    sync.handle_auth_change(Some(u1())).await;
    assert_eq!(
        sync.handle_auth_change(Some(u1())).await,
        SyncOutcome::Skipped(SkipReason::AlreadyHydrated)
    );
    assert_eq!(backend.count("load:u1"), 1);
}

#[tokio::test]
async fn sign_out_keeps_remote_state_and_routes_to_welcome() {
    let backend = Arc::new(ScriptedBackend::new());
    let ui = Arc::new(RecordingUi::default());
    let sync = orchestrator(&backend, &ui);
    sync.bootstrap().await;
    sync.handle_auth_change(Some(u1())).await;
    let stored = backend.document("u1");

    assert_eq!(sync.handle_auth_change(None).await, SyncOutcome::Completed);

    assert_eq!(ui.last_view(), Some(View::Welcome));
    assert_eq!(backend.document("u1"), stored);
    assert!(!sync.session().read().await.is_signed_in());
    assert_eq!(sync.save().await, SyncOutcome::Skipped(SkipReason::SignedOut));
}

#[tokio::test]
async fn bootstrap_failure_reports_unavailable_and_can_retry() {
    let backend = Arc::new(ScriptedBackend::new());
    let ui = Arc::new(RecordingUi::default());
    let sync = orchestrator(&backend, &ui);
    backend.fail_initialize(Some(FocusError::Network("sdk unreachable".into())));

    sync.handle_auth_change(Some(u1())).await;
    let outcome = sync.bootstrap().await;
    assert!(matches!(
        outcome,
        SyncOutcome::Failed { error: FocusError::Network(_), severity: ErrorSeverity::Recoverable }
    ));
    assert!(matches!(
        sync.status(),
        SyncAvailability::Unavailable(reason) if reason.contains("sdk unreachable")
    ));
    assert_eq!(ui.unavailable().len(), 1);
    assert_eq!(sync.save().await, SyncOutcome::Deferred);

    backend.fail_initialize(None);
    assert_eq!(sync.bootstrap().await, SyncOutcome::Completed);
    assert_eq!(backend.calls(), vec!["initialize", "initialize", "load:u1", "save:u1", "save:u1"]);
    assert_eq!(sync.status(), SyncAvailability::Available);
}

#[tokio::test]
async fn recoverable_save_failures_are_retried() {
    let backend = Arc::new(ScriptedBackend::new());
    let ui = Arc::new(RecordingUi::default());
    let sync = Arc::new(
        SyncOrchestrator::new(backend.clone(), ui.clone()).with_settings(SyncSettings {
            save_attempts: 3,
            migrate_on_sign_in: false,
            ..SyncSettings::default()
        }),
    );
    sync.bootstrap().await;
    sync.handle_auth_change(Some(u1())).await;
    assert_eq!(backend.count("save:u1"), 0, "migration disabled");

    backend.fail_next_save(FocusError::Network("503".into()));
    backend.fail_next_save(FocusError::Network("503".into()));
    assert_eq!(sync.save().await, SyncOutcome::Completed);
    assert_eq!(backend.count("save:u1"), 3);
}

#[tokio::test]
async fn fatal_save_failure_is_not_retried() {
    let backend = Arc::new(ScriptedBackend::new());
    let ui = Arc::new(RecordingUi::default());
    let sync = Arc::new(
        SyncOrchestrator::new(backend.clone(), ui.clone())
            .with_settings(SyncSettings { save_attempts: 3, ..SyncSettings::default() }),
    );
    sync.bootstrap().await;
    sync.handle_auth_change(Some(u1())).await;

    backend.fail_next_save(FocusError::Serialization("bad document".into()));
    let outcome = sync.save().await;
    assert!(matches!(outcome, SyncOutcome::Failed { severity: ErrorSeverity::Fatal, .. }));
    assert_eq!(backend.count("save:u1"), 2, "migration plus one attempt");
}

#[tokio::test]
async fn popup_sign_in_hydrates_immediately() {
    let backend = Arc::new(ScriptedBackend::new());
    let ui = Arc::new(RecordingUi::default());
    let sync = orchestrator(&backend, &ui);
    sync.bootstrap().await;

    let outcome = sync
        .sign_in(SignInMethod::EmailPassword { email: "a@b.c".into(), password: "pw".into() })
        .await;

    assert_eq!(outcome, SyncOutcome::Completed);
    assert_eq!(backend.calls(), vec!["initialize", "sign_in", "load:a@b.c", "save:a@b.c"]);
    assert_eq!(sync.session().read().await.user_id(), Some("a@b.c"));
}

#[tokio::test]
async fn redirect_sign_in_returns_url() {
    let backend =
        Arc::new(ScriptedBackend::new().with_redirect("https://auth.example/authorize"));
    let ui = Arc::new(RecordingUi::default());
    let sync = orchestrator(&backend, &ui);
    sync.bootstrap().await;

    let outcome = sync.sign_in(SignInMethod::Anonymous).await;
    assert_eq!(outcome, SyncOutcome::Redirect { url: "https://auth.example/authorize".into() });
    assert!(!sync.session().read().await.is_signed_in());
}

#[tokio::test]
async fn set_view_requires_sign_in_for_app_views() {
    let backend = Arc::new(ScriptedBackend::new());
    let ui = Arc::new(RecordingUi::default());
    let sync = orchestrator(&backend, &ui);
    sync.bootstrap().await;

    assert_eq!(sync.set_view(View::Stats).await, SyncOutcome::Skipped(SkipReason::SignedOut));
    assert_eq!(ui.last_view(), Some(View::Welcome));

    sync.handle_auth_change(Some(u1())).await;
    assert_eq!(sync.set_view(View::Stats).await, SyncOutcome::Completed);
    assert_eq!(ui.last_view(), Some(View::Stats));
    assert_eq!(backend.document("u1").unwrap().current_view.as_deref(), Some("stats"));
}

#[tokio::test]
async fn listener_handles_restored_session_once() {
    let backend = Arc::new(ScriptedBackend::new().with_restored_user(u1()));
    let ui = Arc::new(RecordingUi::default());
    let sync = orchestrator(&backend, &ui);

    let listener = sync.spawn_auth_listener();
    sync.bootstrap().await;

    tokio::time::timeout(Duration::from_secs(2), async {
        while !sync.session().read().await.hydrated {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("restored user was hydrated");

    backend.publish(None);
    tokio::time::timeout(Duration::from_secs(2), async {
        while ui.last_view() != Some(View::Welcome) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("sign-out was routed");

    assert_eq!(backend.count("load:u1"), 1);
    sync.shutdown().await;
    listener.await.unwrap();
}

#[tokio::test]
async fn shutdown_saves_and_stops_autosave() {
    let backend = Arc::new(ScriptedBackend::new());
    let ui = Arc::new(RecordingUi::default());
    let sync = orchestrator(&backend, &ui);
    sync.bootstrap().await;
    sync.handle_auth_change(Some(u1())).await;

    let autosave = sync.spawn_autosave(Duration::from_millis(20));
    tokio::time::sleep(Duration::from_millis(90)).await;
    assert!(backend.count("save:u1") >= 2, "autosave ticked at least once");

    assert_eq!(sync.shutdown().await, SyncOutcome::Completed);
    autosave.await.unwrap();

    let saves = backend.count("save:u1");
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(backend.count("save:u1"), saves);
}

#[tokio::test]
async fn user_without_id_is_rejected_before_loading() {
    let backend = Arc::new(ScriptedBackend::new());
    let ui = Arc::new(RecordingUi::default());
    let sync = orchestrator(&backend, &ui);
    sync.bootstrap().await;

    let outcome = sync.handle_auth_change(Some(AuthUser::with_id(""))).await;
    assert_eq!(outcome, SyncOutcome::failed(FocusError::missing_user_id()));
    assert!(matches!(outcome, SyncOutcome::Failed { severity: ErrorSeverity::Fatal, .. }));

    assert!(!sync.session().read().await.is_signed_in());
    assert!(backend.calls().iter().all(|call| !call.starts_with("load")));
    assert_ne!(ui.last_view(), Some(View::Dashboard));
}

#[tokio::test]
async fn autosave_reload_keeps_the_chosen_view() {
    let backend = Arc::new(ScriptedBackend::new().with_document(
        "u1",
        RemoteUserState { points: Some(40), ..RemoteUserState::default() },
    ));
    let ui = Arc::new(RecordingUi::default());
    let sync = orchestrator(&backend, &ui);
    sync.bootstrap().await;

    for _ in 0..3 {
        backend.fail_next_load(FocusError::Network("offline".into()));
    }
    sync.handle_auth_change(Some(u1())).await;
    assert_eq!(sync.set_view(View::Stats).await, SyncOutcome::Skipped(SkipReason::NotHydrated));
    let views_before = ui.views().len();

    let autosave = sync.spawn_autosave(Duration::from_millis(20));
    tokio::time::timeout(Duration::from_secs(2), async {
        while !sync.session().read().await.hydrated {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("a later tick loaded the remote state");

    assert!(backend.count("load:u1") >= 4);
    assert_eq!(ui.views().len(), views_before, "retries do not route");
    assert_eq!(ui.last_view(), Some(View::Stats));
    assert_eq!(sync.state().await.points, 40);

    sync.shutdown().await;
    autosave.await.unwrap();
}

#[tokio::test]
async fn sign_in_and_listener_load_the_user_once() {
    let backend =
        Arc::new(ScriptedBackend::new().with_load_delay(Duration::from_millis(50)));
    let ui = Arc::new(RecordingUi::default());
    let sync = orchestrator(&backend, &ui);
    let listener = sync.spawn_auth_listener();
    sync.bootstrap().await;

    assert_eq!(sync.sign_in(SignInMethod::Anonymous).await, SyncOutcome::Completed);
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(sync.session().read().await.hydrated);
    assert_eq!(backend.count("load:anonymous"), 1);
    assert_eq!(backend.count("save:anonymous"), 1);

    sync.shutdown().await;
    listener.await.unwrap();
}

#[tokio::test]
async fn redirect_callback_waits_for_bootstrap() {
    let backend = Arc::new(ScriptedBackend::new());
    let ui = Arc::new(RecordingUi::default());
    let sync = orchestrator(&backend, &ui);

    let outcome = sync.complete_redirect("http://localhost:5173/callback?code=abc").await;
    assert_eq!(outcome, SyncOutcome::Deferred);
    assert_eq!(backend.count("complete_redirect"), 0);

    sync.bootstrap().await;
    assert_eq!(backend.calls()[..2], ["initialize", "complete_redirect"]);
    assert!(sync.session().read().await.hydrated);
    assert_eq!(ui.last_view(), Some(View::Dashboard));

    let rejected = sync.complete_redirect("http://localhost:5173/callback").await;
    assert!(matches!(rejected, SyncOutcome::Failed { error: FocusError::Auth(_), .. }));
}
