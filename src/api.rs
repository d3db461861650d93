// Control channel: JSON request/response messages keyed by `subject`.
//
// Inbound:  requestSettings | changeSettings {radius?, bleed?, decayExp?, decayLin?, fps?}
//           | start | stop
// Outbound: settingsBroadcast | fpsBroadcast | error {message, originalMessage}

use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::MessageError;
use crate::renderer::{FpsReport, Renderer};
use crate::settings::{Settings, SettingsSnapshot};

#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    RequestSettings,
    ChangeSettings(SettingsPatch),
    Start,
    Stop,
}

/// A partial settings change. Every present field was type-checked before
/// anything is applied, so a bad message changes nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPatch {
    pub radius: Option<i64>,
    pub bleed: Option<f64>,
    pub decay_exp: Option<f64>,
    pub decay_lin: Option<i64>,
    pub fps: Option<i64>,
}

impl SettingsPatch {
    /// Write the present fields; each setter clamps to its own domain.
    pub fn apply(&self, settings: &Settings) {
        if let Some(radius) = self.radius {
            settings.set_radius(radius);
        }
        if let Some(bleed) = self.bleed {
            settings.set_bleed(bleed as f32);
        }
        if let Some(decay_exp) = self.decay_exp {
            settings.set_decay_exp(decay_exp as f32);
        }
        if let Some(decay_lin) = self.decay_lin {
            settings.set_decay_lin(decay_lin);
        }
        if let Some(fps) = self.fps {
            settings.set_fps(fps);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "subject", rename_all = "camelCase")]
pub enum Outbound {
    SettingsBroadcast(SettingsSnapshot),
    FpsBroadcast(FpsReport),
    #[serde(rename_all = "camelCase")]
    Error {
        message: String,
        original_message: Value,
    },
}

impl Outbound {
    pub fn error(err: &MessageError, original: Value) -> Self {
        Self::Error { message: format!("invalid message: {err}"), original_message: original }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Decode one inbound message.
pub fn parse_message(message: &Value) -> Result<Inbound, MessageError> {
    let fields = message.as_object().ok_or(MessageError::NotAnObject)?;
    let subject = fields
        .get("subject")
        .and_then(Value::as_str)
        .ok_or(MessageError::MissingSubject)?;

    match subject {
        "requestSettings" => Ok(Inbound::RequestSettings),
        "changeSettings" => parse_patch(fields).map(Inbound::ChangeSettings),
        "start" => Ok(Inbound::Start),
        "stop" => Ok(Inbound::Stop),
        other => Err(MessageError::UnknownSubject(other.to_string())),
    }
}

fn parse_patch(fields: &Map<String, Value>) -> Result<SettingsPatch, MessageError> {
    let mut patch = SettingsPatch::default();
    for (name, value) in fields {
        match name.as_str() {
            "subject" => {}
            "radius" => patch.radius = Some(int_field(name, value)?),
            "bleed" => patch.bleed = Some(number_field(name, value)?),
            "decayExp" => patch.decay_exp = Some(number_field(name, value)?),
            "decayLin" => patch.decay_lin = Some(int_field(name, value)?),
            "fps" => patch.fps = Some(int_field(name, value)?),
            _ => return Err(MessageError::UnknownField(name.clone())),
        }
    }
    Ok(patch)
}

fn int_field(name: &str, value: &Value) -> Result<i64, MessageError> {
    // u64 beyond i64 still clamps, so saturate instead of rejecting
    value
        .as_i64()
        .or_else(|| value.as_u64().map(|_| i64::MAX))
        .ok_or_else(|| MessageError::WrongType { field: name.to_string(), expected: "an integer" })
}

fn number_field(name: &str, value: &Value) -> Result<f64, MessageError> {
    value
        .as_f64()
        .ok_or_else(|| MessageError::WrongType { field: name.to_string(), expected: "a number" })
}

/// Routes control messages to the shared settings and the renderer.
pub struct Api {
    renderer: Arc<Renderer>,
}

impl Api {
    pub fn new(renderer: Arc<Renderer>) -> Self {
        Self { renderer }
    }

    pub fn settings_broadcast(&self) -> Outbound {
        Outbound::SettingsBroadcast(self.renderer.settings().snapshot())
    }

    /// Handle one message; returns the response to send back, if any.
    /// Malformed messages are bounced with an error carrying the original.
    pub fn handle(&self, message: &Value) -> Option<Outbound> {
        let inbound = match parse_message(message) {
            Ok(inbound) => inbound,
            Err(err) => {
                debug!(%err, "rejecting control message");
                return Some(Outbound::error(&err, message.clone()));
            }
        };

        match inbound {
            Inbound::RequestSettings => Some(self.settings_broadcast()),
            Inbound::ChangeSettings(patch) => {
                patch.apply(self.renderer.settings());
                Some(self.settings_broadcast())
            }
            Inbound::Start => match self.renderer.start() {
                Ok(_) => None,
                Err(err) => Some(self.session_error(&err, message)),
            },
            Inbound::Stop => match self.renderer.stop() {
                Ok(_) => None,
                Err(err) => Some(self.session_error(&err, message)),
            },
        }
    }

    /// Like `handle`, for raw text; non-JSON is echoed back as a string.
    pub fn handle_text(&self, text: &str) -> Option<Outbound> {
        match serde_json::from_str::<Value>(text) {
            Ok(message) => self.handle(&message),
            Err(_) => Some(Outbound::error(&MessageError::NotJson, Value::String(text.to_string()))),
        }
    }

    fn session_error(&self, err: &crate::error::Error, message: &Value) -> Outbound {
        warn!(%err, "render session request failed");
        Outbound::Error { message: err.to_string(), original_message: message.clone() }
    }
}
