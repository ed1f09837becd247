mod common;

use common::{make_ctx, make_ctx_with, make_sandbox, make_script};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use userjs_bridge::CoreMessage;
use userjs_engine::window::mock::MockWindow;
use userjs_engine::{
    Arg, Binding, CapabilityError, Collaborators, EngineConfig, HostValue, HostWindow, ThisBinding, WindowBinding,
};

fn make_window() -> (Arc<MockWindow>, Arc<dyn HostWindow>) {
    let window = Arc::new(MockWindow::with_defaults());
    let dynamic: Arc<dyn HostWindow> = window.clone();
    (window, dynamic)
}

// ── Window identity ─────────────────────────────────────────────

#[test]
fn no_grants_binds_real_window() {
    let (ctx, _) = make_ctx();
    let (window, real) = make_window();
    let sandbox = make_sandbox(&ctx, make_script(1, "Plain", &[]), &window);
    assert!(sandbox.window().is_real(&real));
    assert!(sandbox.grants().is_unwrapped());
    assert_eq!(sandbox.this_binding(), ThisBinding::RealWindow);
}

#[test]
fn grant_none_binds_real_window() {
    let (ctx, _) = make_ctx();
    let (window, real) = make_window();
    let sandbox = make_sandbox(&ctx, make_script(1, "None", &["none"]), &window);
    assert!(sandbox.window().is_real(&real));
    assert_eq!(sandbox.this_binding(), ThisBinding::RealWindow);
}

#[test]
fn any_grant_binds_protected_view() {
    let (ctx, _) = make_ctx();
    let (window, real) = make_window();
    for grants in [&["GM_getValue"][..], &["GM_bogus"][..], &["none", "GM_log"][..]] {
        let sandbox = make_sandbox(&ctx, make_script(1, "Wrapped", grants), &window);
        assert!(!sandbox.window().is_real(&real), "grants {grants:?}");
        assert!(sandbox.window().as_view().is_some());
        assert_eq!(sandbox.this_binding(), ThisBinding::GmObject);
    }
}

#[test]
fn unsafe_window_is_always_the_real_window() {
    let (ctx, _) = make_ctx();
    let (window, real) = make_window();
    let sandbox = make_sandbox(&ctx, make_script(1, "Wrapped", &["GM_getValue"]), &window);
    match sandbox.gm().get("unsafeWindow") {
        Some(Binding::Window(binding)) => assert!(binding.is_real(&real)),
        other => panic!("Expected window binding, got {other:?}"),
    }
}

// ── GM object ───────────────────────────────────────────────────

#[test]
fn bindings_are_implicit_then_declared_order() {
    let (ctx, _) = make_ctx();
    let (window, _) = make_window();
    let sandbox = make_sandbox(
        &ctx,
        make_script(1, "Ordered", &["GM_setValue", "GM_xmlhttpRequest", "GM_getValue"]),
        &window,
    );
    assert_eq!(
        sandbox.binding_names(),
        vec!["window", "unsafeWindow", "GM_info", "GM_setValue", "GM_xmlhttpRequest", "GM_getValue"]
    );
    assert_eq!(sandbox.binding_values().len(), sandbox.binding_names().len());
}

#[test]
fn ungranted_capabilities_are_absent() {
    let (ctx, _) = make_ctx();
    let (window, _) = make_window();
    let sandbox = make_sandbox(&ctx, make_script(1, "Limited", &["GM_getValue", "GM_nonsense"]), &window);
    assert!(sandbox.gm().contains("GM_getValue"));
    for name in ["GM_setValue", "GM_xmlhttpRequest", "GM_nonsense", "GM_addStyle"] {
        assert!(!sandbox.gm().contains(name), "{name} should be absent");
    }
    assert_eq!(
        sandbox.call("GM_setValue", vec![Arg::from("k"), Arg::value(1)]).unwrap_err(),
        CapabilityError::Unavailable("GM_setValue".into())
    );
}

#[test]
fn unwrapped_script_still_has_info_and_unsafe_window() {
    let (ctx, _) = make_ctx();
    let (window, _) = make_window();
    let sandbox = make_sandbox(&ctx, make_script(1, "Plain", &["none"]), &window);
    assert_eq!(sandbox.binding_names(), vec!["window", "unsafeWindow", "GM_info"]);
    assert!(!sandbox.gm().contains("GM_getValue"));
}

#[test]
fn info_is_a_value_not_a_function() {
    let (ctx, _) = make_ctx();
    let (window, _) = make_window();
    let mut script = make_script(9, "Informed", &["GM_log"]);
    script.uuid = "u-9".into();
    let sandbox = make_sandbox(&ctx, script, &window);
    match sandbox.gm().get("GM_info") {
        Some(Binding::Info(info)) => {
            assert_eq!(info["uuid"], "u-9");
            assert_eq!(info["script"]["name"], "Informed");
            assert_eq!(info["script"]["unwrap"], false);
            assert_eq!(info["script"]["runAt"], "document-end");
        }
        other => panic!("Expected info binding, got {other:?}"),
    }
    assert_eq!(
        sandbox.call("GM_info", vec![]).unwrap_err(),
        CapabilityError::NotCallable("GM_info".into())
    );
}

#[test]
fn handler_name_comes_from_config() {
    let config = EngineConfig {
        handler_name: "Custom".into(),
        ..Default::default()
    };
    let (ctx, _) = make_ctx_with(config, Collaborators::detached());
    let (window, _) = make_window();
    let sandbox = make_sandbox(&ctx, make_script(1, "S", &["GM_log"]), &window);
    match sandbox.gm().get("GM_info") {
        Some(Binding::Info(info)) => assert_eq!(info["scriptHandler"], json!("Custom")),
        other => panic!("Expected info binding, got {other:?}"),
    }
}

// ── Protected view ──────────────────────────────────────────────

#[test]
fn view_hides_blocked_and_configured_globals() {
    let config = EngineConfig {
        blocked_globals: vec!["location".into()],
        ..Default::default()
    };
    let (ctx, _) = make_ctx_with(config, Collaborators::detached());
    let (window, _) = make_window();
    let sandbox = make_sandbox(&ctx, make_script(1, "S", &["GM_log"]), &window);
    assert_eq!(sandbox.window().get("chrome"), HostValue::Undefined);
    assert_eq!(sandbox.window().get("location"), HostValue::Undefined);
    assert_eq!(sandbox.window().get("window"), HostValue::View);
}

#[test]
fn view_freezes_plain_names_and_keeps_handlers_live() {
    let (ctx, _) = make_ctx();
    let (window, _) = make_window();
    let sandbox = make_sandbox(&ctx, make_script(1, "S", &["GM_log"]), &window);
    let view = sandbox.window();

    assert_eq!(view.get("innerWidth"), HostValue::json(1280));
    window.define("innerWidth", HostValue::json(1));
    assert_eq!(view.get("innerWidth"), HostValue::json(1280));

    window.define("onload", HostValue::function("later"));
    assert_eq!(view.get("onload"), HostValue::function("later"));
}

#[test]
fn unwrapped_window_sees_live_changes() {
    let (ctx, _) = make_ctx();
    let (window, _) = make_window();
    let sandbox = make_sandbox(&ctx, make_script(1, "S", &[]), &window);
    assert_eq!(sandbox.window().get("innerWidth"), HostValue::json(1280));
    window.define("innerWidth", HostValue::json(1));
    assert_eq!(sandbox.window().get("innerWidth"), HostValue::json(1));
    assert_eq!(sandbox.window().get("chrome"), window.get("chrome"));
}

#[test]
fn each_build_gets_a_fresh_view() {
    let (ctx, _) = make_ctx();
    let (window, _) = make_window();
    let first = make_sandbox(&ctx, make_script(1, "S", &["GM_log"]), &window);
    first.window().set("shared", HostValue::json(1));
    let second = make_sandbox(&ctx, make_script(1, "S", &["GM_log"]), &window);
    assert_eq!(second.window().get("shared"), HostValue::Undefined);
}

#[test]
fn window_close_only_when_granted() {
    let (ctx, port) = make_ctx();
    let (window, _) = make_window();

    let granted = make_sandbox(&ctx, make_script(1, "Closer", &["window.close"]), &window);
    assert!(!granted.gm().contains("window.close"));
    granted.window().call("close", vec![]).unwrap();
    assert_eq!(port.drain(), vec![CoreMessage::TabClose]);

    let plain = make_sandbox(&ctx, make_script(2, "Other", &["GM_log"]), &window);
    plain.window().call("close", vec![]).unwrap();
    assert!(port.is_empty());
    assert_eq!(window.calls().last().map(|(id, _)| id.as_str()), Some("native:close"));
}

#[test]
fn view_calls_stay_on_functions_captured_for_the_script() {
    let (ctx, _) = make_ctx();
    let (window, _) = make_window();
    window.define("helper", HostValue::function("page:helper_v1"));
    let sandbox = make_sandbox(&ctx, make_script(1, "S", &["GM_log"]), &window);
    let view = sandbox.window();

    assert_eq!(view.get("helper"), HostValue::function("page:helper_v1"));
    window.define("setTimeout", HostValue::function("page:hijacked_setTimeout"));
    window.define("helper", HostValue::function("page:helper_v2"));

    view.call("setTimeout", vec![HostValue::json(5)]).unwrap();
    view.call("helper", vec![]).unwrap();
    assert_eq!(
        window.calls(),
        vec![
            ("native:setTimeout".to_string(), vec![HostValue::json(5)]),
            ("page:helper_v1".to_string(), vec![]),
        ]
    );
}

#[test]
fn unwrapped_window_calls_whatever_the_page_holds() {
    let (ctx, _) = make_ctx();
    let (window, _) = make_window();
    let sandbox = make_sandbox(&ctx, make_script(1, "S", &[]), &window);
    window.define("setTimeout", HostValue::function("page:setTimeout"));
    sandbox.window().call("setTimeout", vec![]).unwrap();
    assert_eq!(window.calls()[0].0, "page:setTimeout");
}

#[test]
fn building_a_sandbox_registers_its_values() {
    let (ctx, port) = make_ctx();
    let (window, _) = make_window();
    let sandbox = make_sandbox(&ctx, make_script(5, "Fresh", &["GM_setValue"]), &window);
    assert!(ctx.values().contains_script(sandbox.script().id));
    sandbox.call("GM_setValue", vec![Arg::from("k"), Arg::Value(json!(1))]).unwrap();
    assert_eq!(port.drain().len(), 1);
}

#[test]
fn window_binding_debug_does_not_leak_internals() {
    let (ctx, _) = make_ctx();
    let (window, real) = make_window();
    let sandbox = make_sandbox(&ctx, make_script(1, "S", &[]), &window);
    assert_eq!(format!("{:?}", WindowBinding::Real(real)), "WindowBinding::Real");
    assert!(format!("{sandbox:?}").contains("script_id"));
}
