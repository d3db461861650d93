use glowtrail::api::{Api, Outbound};
use glowtrail::present::{Frame, PresentDone, Presenter};
use glowtrail::renderer::{FpsReport, Lifecycle};
use glowtrail::{Error, Renderer, Settings};
use serde_json::{Value, json};
use std::sync::Arc;

struct NullPresenter;

impl Presenter for NullPresenter {
    fn size(&self) -> (u32, u32) {
        (4, 4)
    }

    fn present(&mut self, _frame: Frame, done: PresentDone) -> Result<(), Error> {
        done.complete();
        Ok(())
    }
}

fn api() -> (Api, Arc<Renderer>) {
    let renderer = Arc::new(Renderer::new(Arc::new(Settings::new()), NullPresenter, |_: FpsReport| {}));
    (Api::new(renderer.clone()), renderer)
}

fn json_of(message: Option<Outbound>) -> Value {
    serde_json::from_str(&message.expect("expected a response").to_json().unwrap()).unwrap()
}

#[test]
fn request_settings_reports_defaults() {
    let (api, _renderer) = api();
    let reply = json_of(api.handle(&json!({ "subject": "requestSettings" })));
    assert_eq!(
        reply,
        json!({
            "subject": "settingsBroadcast",
            "bleed": 0.95,
            "decayExp": 10.0,
            "decayLin": 1,
            "radius": 3,
            "fps": 20
        })
    );
}

#[test]
fn change_settings_updates_only_the_given_fields() {
    let (api, renderer) = api();
    let reply = json_of(api.handle(&json!({ "subject": "changeSettings", "radius": 9, "fps": 300 })));
    assert_eq!(reply["subject"], "settingsBroadcast");
    assert_eq!(reply["radius"], 9);
    assert_eq!(reply["fps"], 255);
    assert_eq!(reply["decayLin"], 1);

    let settings = renderer.settings();
    assert_eq!(settings.radius(), 9);
    assert_eq!(settings.fps(), 255);
}

#[test]
fn rejected_messages_echo_the_original_and_change_nothing() {
    let (api, renderer) = api();
    let bad = json!({ "subject": "changeSettings", "radius": 12, "bleed": "lots" });
    let reply = json_of(api.handle(&bad));
    assert_eq!(reply["subject"], "error");
    assert_eq!(reply["originalMessage"], bad);
    assert!(reply["message"].as_str().unwrap().contains("bleed"));
    assert_eq!(renderer.settings().radius(), 3);

    let reply = json_of(api.handle_text("{not json"));
    assert_eq!(reply["subject"], "error");
    assert_eq!(reply["originalMessage"], "{not json");
}

#[test]
fn start_and_stop_drive_the_renderer() {
    let (api, renderer) = api();
    assert!(api.handle(&json!({ "subject": "start" })).is_none());
    assert!(renderer.is_running());
    assert!(api.handle(&json!({ "subject": "start" })).is_none());

    assert!(api.handle(&json!({ "subject": "stop" })).is_none());
    assert_eq!(renderer.lifecycle(), Lifecycle::Idle);
    assert!(api.handle(&json!({ "subject": "stop" })).is_none());
}
