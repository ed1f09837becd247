mod common;

use common::{make_script, make_script_at, make_session, make_session_with};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::HashMap;
use tokio::sync::{mpsc, watch};
use userjs_bridge::{
    CallbackMessage, CommandMessage, CoreMessage, HostMessage, InjectedMessage, LoadScriptsMessage,
    NotificationEventMessage, TabClosedMessage, ValueMap, WatchOnlineMessage,
};
use userjs_engine::collaborators::mock::RecordingCollaborator;
use userjs_engine::{Arg, EngineConfig, ReadyState};
use userjs_types::ScriptId;

fn load(scripts: Vec<userjs_types::ScriptDescriptor>) -> HostMessage {
    let mut message = LoadScriptsMessage::new("2.13.0");
    for script in scripts {
        let code = format!("console.log({})", script.id);
        message = message.with_script(script, code);
    }
    HostMessage::LoadScripts(message)
}

// ── Lifecycle ───────────────────────────────────────────────────

#[test]
fn start_sends_ready() {
    let h = make_session();
    h.session.start();
    assert_eq!(h.port.drain(), vec![CoreMessage::Ready]);
}

#[test]
fn load_injects_start_phase_immediately() {
    let h = make_session();
    h.session.on_message(load(vec![
        make_script_at(1, "Early", "document-start"),
        make_script_at(2, "Late", "document-end"),
    ]));

    let sent = h.port.drain();
    assert_eq!(sent.len(), 1);
    match &sent[0] {
        CoreMessage::Inject(inject) => {
            assert!(inject.notify_id.starts_with("userjs_"));
            assert_eq!(inject.arg_names, vec!["window", "unsafeWindow", "GM_info"]);
            assert!(inject.code.contains("console.log(1)"));
        }
        other => panic!("Expected Inject, got {other:?}"),
    }
    assert_eq!(h.session.pending_injections(), 1);
    assert!(h.interpreter.ran().is_empty());

    h.ack_injections();
    assert_eq!(h.interpreter.ran(), vec!["Early"]);
    assert_eq!(h.session.pending_injections(), 0);
}

#[test]
fn phases_run_in_order_with_idle_on_a_later_turn() {
    let h = make_session();
    h.session.on_message(load(vec![
        make_script_at(1, "A", "document-start"),
        make_script_at(2, "B", "document-end"),
        make_script_at(3, "C", "document-idle"),
        make_script_at(4, "D", "document-end"),
    ]));
    h.ack_injections();
    assert_eq!(h.interpreter.ran(), vec!["A"]);

    let (tx, rx) = watch::channel(ReadyState::Loading);
    let mut deferred = tokio_test::task::spawn(h.session.run_deferred(rx));
    assert!(deferred.poll().is_pending());
    h.ack_injections();
    assert_eq!(h.interpreter.ran(), vec!["A"]);

    tx.send(ReadyState::Interactive).unwrap();
    assert!(deferred.is_woken());
    assert!(deferred.poll().is_pending());
    h.ack_injections();
    assert_eq!(h.interpreter.ran(), vec!["A", "B", "D"]);

    assert!(deferred.poll().is_ready());
    h.ack_injections();
    assert_eq!(h.interpreter.ran(), vec!["A", "B", "D", "C"]);
}

#[test]
fn run_deferred_without_load_is_a_no_op() {
    let h = make_session();
    let (_tx, rx) = watch::channel(ReadyState::Complete);
    let mut deferred = tokio_test::task::spawn(h.session.run_deferred(rx));
    assert!(deferred.poll().is_ready());
    assert!(h.port.is_empty());
}

#[test]
fn throwing_script_is_reported_and_next_still_runs() {
    let h = make_session();
    h.interpreter.fail("Broken");
    h.session.on_message(load(vec![
        make_script_at(1, "Broken", "document-start"),
        make_script_at(2, "Fine", "document-start"),
    ]));
    h.ack_injections();

    assert_eq!(h.interpreter.ran(), vec!["Broken", "Fine"]);
    let failures = h.session.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].script_id, ScriptId::new(1));
    assert_eq!(failures[0].script_name, "Broken");
    assert_eq!(failures[0].message, "boom in Broken");
}

#[test]
fn script_without_source_is_skipped() {
    let h = make_session();
    let mut message = LoadScriptsMessage::new("1.0");
    message.scripts.push(make_script_at(1, "Sourceless", "document-start"));
    h.session.on_message(HostMessage::LoadScripts(message));
    assert!(h.port.is_empty());
    assert!(h.session.failures().is_empty());
}

#[test]
fn unknown_injection_is_ignored() {
    let h = make_session();
    h.session.on_message(HostMessage::Injected(InjectedMessage {
        notify_id: "userjs_nothing".into(),
    }));
    assert!(h.interpreter.ran().is_empty());
}

#[test]
fn requires_are_inlined_through_path_map() {
    let h = make_session();
    let mut script = make_script_at(1, "Deps", "document-start");
    script.meta.require = vec![
        "https://cdn.example.org/lib.js".into(),
        "https://cdn.example.org/absent.js".into(),
    ];
    script.custom.path_map = [(
        "https://cdn.example.org/lib.js".to_string(),
        "https://mirror.example.org/lib.js".to_string(),
    )]
    .into();
    let mut message = LoadScriptsMessage::new("1.0").with_script(script, "main()");
    message
        .require
        .insert("https://mirror.example.org/lib.js".into(), "function lib() {}".into());
    h.session.on_message(HostMessage::LoadScripts(message));

    match h.port.take() {
        Some(CoreMessage::Inject(inject)) => {
            let lib = inject.code.find("function lib() {}").unwrap();
            let main = inject.code.find("main()").unwrap();
            assert!(lib < main);
            assert!(!inject.code.contains("absent"));
        }
        other => panic!("Expected Inject, got {other:?}"),
    }
}

// ── Values ──────────────────────────────────────────────────────

#[test]
fn loaded_values_are_visible_to_scripts() {
    let h = make_session();
    let mut script = make_script(1, "Counter", &["GM_getValue", "GM_setValue"]);
    script.meta.run_at = Some("document-start".into());
    let message = LoadScriptsMessage::new("1.0")
        .with_script(script, "count()")
        .with_values(ScriptId::new(1), ValueMap::from([("count".to_string(), "n3".to_string())]));

    h.interpreter.on_run("Counter", |prepared| {
        let sandbox = &prepared.sandbox;
        let count = sandbox.call("GM_getValue", vec![Arg::from("count")]).unwrap();
        let next = count.as_value().and_then(|v| v.as_i64()).unwrap() + 1;
        sandbox.call("GM_setValue", vec![Arg::from("count"), Arg::value(next)]).unwrap();
        Ok(())
    });
    h.session.on_message(HostMessage::LoadScripts(message));
    let sent = h.ack_injections();

    match sent.as_slice() {
        [CoreMessage::UpdateValue(update)] => {
            assert_eq!(update.key, "count");
            assert_eq!(update.value.as_deref(), Some("o4"));
        }
        other => panic!("Expected one UpdateValue, got {other:?}"),
    }
}

#[test]
fn updated_values_replace_known_scripts_only() {
    let h = make_session();
    h.session.on_message(load(vec![make_script_at(1, "Known", "document-end")]));
    h.session.on_message(HostMessage::UpdatedValues(HashMap::from([
        (ScriptId::new(1), ValueMap::from([("k".to_string(), "o\"v\"".to_string())])),
        (ScriptId::new(2), ValueMap::from([("k".to_string(), "o1".to_string())])),
    ])));
    let values = h.session.context().values();
    assert_eq!(values.get(ScriptId::new(1), "k"), Some(json!("v")));
    assert!(!values.contains_script(ScriptId::new(2)));
}

// ── Host events ─────────────────────────────────────────────────

#[test]
fn command_triggers_menu_handler() {
    let h = make_session();
    let script = make_script(7, "Menu", &["GM_registerMenuCommand"]);
    let (tx, rx) = std::sync::mpsc::channel();
    h.interpreter.on_run("Menu", move |prepared| {
        let tx = tx.clone();
        prepared
            .sandbox
            .call(
                "GM_registerMenuCommand",
                vec![Arg::from("Run"), Arg::callback(move |_| tx.send("clicked").unwrap())],
            )
            .unwrap();
        Ok(())
    });
    h.session.on_message(load(vec![script]));
    let (_ready_tx, ready) = watch::channel(ReadyState::Complete);
    let mut deferred = tokio_test::task::spawn(h.session.run_deferred(ready));
    assert!(deferred.poll().is_pending());
    let sent = h.ack_injections();
    assert!(matches!(&sent[..], [CoreMessage::RegisterMenu(menu)] if menu.key == "7:Run"));

    h.session.on_message(HostMessage::Command(CommandMessage { key: "7:Run".into() }));
    assert_eq!(rx.try_recv(), Ok("clicked"));
    h.session.on_message(HostMessage::Command(CommandMessage { key: "8:Run".into() }));
    assert!(rx.try_recv().is_err());
}

#[test]
fn callback_reply_is_delivered_once() {
    let h = make_session();
    let (tx, rx) = std::sync::mpsc::channel();
    let id = h.session.context().callbacks().register(move |payload| tx.send(payload).unwrap());

    let reply = HostMessage::Callback(CallbackMessage {
        callback_id: id,
        payload: json!({"ok": true}),
    });
    h.session.on_message(reply.clone());
    h.session.on_message(reply);
    assert_eq!(rx.try_recv(), Ok(json!({"ok": true})));
    assert!(rx.try_recv().is_err());
}

#[test]
fn collaborator_events_are_forwarded() {
    let recorder = RecordingCollaborator::new();
    let h = make_session_with(EngineConfig::default(), RecordingCollaborator::collaborators(&recorder));

    h.session.on_message(HostMessage::GotRequestId(json!({"id": 1})));
    h.session.on_message(HostMessage::HttpRequested(json!({"id": 1, "type": "load"})));
    h.session.on_message(HostMessage::TabClosed(TabClosedMessage { id: "tab-1".into() }));
    h.session.on_message(HostMessage::NotificationClicked(NotificationEventMessage { id: "n-1".into() }));
    h.session.on_message(HostMessage::NotificationClosed(NotificationEventMessage { id: "n-1".into() }));
    h.session.on_message(HostMessage::WatchOnlineMenuClicked(WatchOnlineMessage {
        url: "https://scripts.example.org/".into(),
    }));

    assert_eq!(recorder.host_events.lock().unwrap().len(), 2);
    assert_eq!(*recorder.tab_events.lock().unwrap(), vec!["tab-1".to_string()]);
    assert_eq!(
        *recorder.notification_events.lock().unwrap(),
        vec![("n-1".to_string(), "clicked"), ("n-1".to_string(), "closed")]
    );
    let tabs = recorder.tabs.lock().unwrap();
    assert_eq!(tabs.len(), 1);
    assert_eq!(tabs[0].url, "https://scripts.example.org/");
    assert!(tabs[0].active);
    assert_eq!(tabs[0].script_id, None);
}

#[test]
fn on_text_decodes_and_dispatches() {
    let h = make_session();
    h.session
        .on_text(r#"{"cmd":"LoadScripts","data":{"scripts":[{"id":1,"meta":{"runAt":"document-start"}}],"code":{"1":"x()"}}}"#)
        .unwrap();
    assert_eq!(h.port.len(), 1);
    h.session.on_text(r#"{"cmd":"FutureThing","data":{}}"#).unwrap();
    assert!(h.session.on_text("not json").is_err());
}

// ── Serve loop ──────────────────────────────────────────────────

#[tokio::test]
async fn serve_runs_deferred_phases_after_load() {
    let h = make_session();
    let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
    let (ready_tx, ready_rx) = watch::channel(ReadyState::Loading);
    let session = h.session.clone();
    let served = tokio::spawn(session.serve(inbox_rx, ready_rx));

    inbox_tx.send(load(vec![make_script_at(1, "Later", "document-end")])).unwrap();
    tokio::task::yield_now().await;
    ready_tx.send(ReadyState::Complete).unwrap();

    let mut injected = None;
    for _ in 0..50 {
        tokio::task::yield_now().await;
        if let Some(id) = h.session.pending_notify_ids().pop() {
            injected = Some(id);
            break;
        }
    }
    let notify_id = injected.expect("end-phase script should be injected");
    inbox_tx.send(HostMessage::Injected(InjectedMessage { notify_id })).unwrap();
    drop(inbox_tx);
    served.await.unwrap();

    assert_eq!(h.interpreter.ran(), vec!["Later"]);
    assert_eq!(h.port.sent().first(), Some(&CoreMessage::Ready));
}
