use crate::tools::measure::MeasurementSnapshot;
use crate::tools::ruler::{
    MeasureSet, MeasurementChange, MeasurementChanged, PickMissed, RulerAction, RulerManipulator,
};
use crate::tools::tool_manager::{
    ClearToolEvent, ToolRequest, ToolSelectionSource, ToolState, ToolStateChanged,
    ToolToggleEvent,
};
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::JsValue;

#[cfg(target_arch = "wasm32")]
use web_sys::{MessageEvent, window};

/// JSON-RPC 2.0 request structure.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub result: Option<serde_json::Value>,
    pub error: Option<RpcError>,
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 notification structure for one-way communication.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcNotification {
    pub jsonrpc: String,
    pub method: String,
    pub params: serde_json::Value,
}

/// JSON-RPC 2.0 error object.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

/// Resource managing bidirectional RPC communication with the host page.
#[derive(Resource, Default)]
pub struct WebRpcInterface {
    outgoing_notifications: Vec<RpcNotification>,
    outgoing_responses: Vec<RpcResponse>,
}

impl WebRpcInterface {
    /// Send notification to the frontend without expecting a response.
    pub fn send_notification(&mut self, method: &str, params: serde_json::Value) {
        self.outgoing_notifications.push(RpcNotification {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
        });
    }

    fn queue_response(&mut self, response: RpcResponse) {
        self.outgoing_responses.push(response);
    }

    /// Messages not yet flushed to the host, notifications first.
    pub fn pending_notifications(&self) -> &[RpcNotification] {
        &self.outgoing_notifications
    }

    pub fn pending_responses(&self) -> &[RpcResponse] {
        &self.outgoing_responses
    }
}

/// Event representing an incoming RPC message from the frontend.
#[derive(Event, Debug, Clone)]
pub struct IncomingRpcMessage {
    pub content: String,
}

/// Plugin bridging the measurement tool to a hosting web page.
///
/// Requests enter before tool resolution; notifications leave after the
/// measurement has been updated for the frame.
pub struct WebRpcPlugin;

impl Plugin for WebRpcPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<WebRpcInterface>()
            .add_event::<IncomingRpcMessage>()
            .add_systems(
                Update,
                (process_incoming_messages, handle_rpc_messages)
                    .chain()
                    .in_set(MeasureSet::Input),
            )
            .add_systems(
                Update,
                (forward_measurement_notifications, send_outgoing_messages)
                    .chain()
                    .after(MeasureSet::Present),
            );

        #[cfg(target_arch = "wasm32")]
        app.add_systems(Startup, setup_message_listener);
    }
}

#[cfg(target_arch = "wasm32")]
fn setup_message_listener(mut commands: Commands) {
    use std::sync::Arc;
    use std::sync::Mutex;

    let message_queue: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let queue_clone = message_queue.clone();

    let closure = Closure::wrap(Box::new(move |event: MessageEvent| {
        if let Ok(data) = event.data().dyn_into::<js_sys::JsString>() {
            let message_str: String = data.into();

            if message_str.contains("jsonrpc") {
                if let Ok(mut queue) = queue_clone.lock() {
                    queue.push(message_str);
                }
            }
        }
    }) as Box<dyn FnMut(MessageEvent)>);

    if let Some(window) = window() {
        if let Err(e) =
            window.add_event_listener_with_callback("message", closure.as_ref().unchecked_ref())
        {
            error!("[RPC] failed to register message listener: {:?}", e);
            return;
        }
    }

    // Ownership moves to JS; the listener lives as long as the page.
    closure.forget();
    commands.insert_resource(MessageQueue(message_queue));
}

/// Thread-safe queue filled by the page's message listener.
#[derive(Resource)]
struct MessageQueue(std::sync::Arc<std::sync::Mutex<Vec<String>>>);

fn process_incoming_messages(
    message_queue: Option<Res<MessageQueue>>,
    mut message_events: EventWriter<IncomingRpcMessage>,
) {
    let Some(queue_res) = message_queue else {
        return;
    };

    let messages = if let Ok(mut queue) = queue_res.0.lock() {
        std::mem::take(&mut *queue)
    } else {
        Vec::new()
    };

    for message_str in messages {
        message_events.write(IncomingRpcMessage {
            content: message_str,
        });
    }
}

/// Tool and measurement state of one ruler as seen by a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RulerStatus {
    pub manipulator: u64,
    pub tool: ToolState,
    pub measurement: MeasurementSnapshot,
}

/// Events a request asks the engine to raise.
#[derive(Debug, Default)]
pub struct RpcEffects {
    pub toggles: Vec<ToolToggleEvent>,
    pub clears: Vec<ClearToolEvent>,
    pub actions: Vec<RulerAction>,
}

fn handle_rpc_messages(
    mut events: EventReader<IncomingRpcMessage>,
    manipulators: Query<(Entity, &RulerManipulator)>,
    mut rpc_interface: ResMut<WebRpcInterface>,
    mut toggles: EventWriter<ToolToggleEvent>,
    mut clears: EventWriter<ClearToolEvent>,
    mut actions: EventWriter<RulerAction>,
) {
    if events.is_empty() {
        return;
    }

    let rulers: Vec<RulerStatus> = manipulators
        .iter()
        .map(|(entity, manipulator)| RulerStatus {
            manipulator: entity.to_bits(),
            tool: manipulator.tool.state(),
            measurement: manipulator.model().snapshot(),
        })
        .collect();

    let mut effects = RpcEffects::default();

    for event in events.read() {
        match serde_json::from_str::<RpcRequest>(&event.content) {
            Ok(request) => {
                debug!("[RPC] processing method: {}", request.method);
                if let Some(response) = handle_rpc_request(&request, &rulers, &mut effects) {
                    rpc_interface.queue_response(response);
                }
            }
            Err(parse_error) => {
                warn!("[RPC] parse error: {parse_error}");
                rpc_interface.send_notification(
                    "debug_message",
                    serde_json::json!({
                        "message": format!("Parse error: {}", parse_error)
                    }),
                );
            }
        }
    }

    toggles.write_batch(effects.toggles);
    clears.write_batch(effects.clears);
    actions.write_batch(effects.actions);
}

/// Handle one request. Effects are applied for notifications too, but only
/// requests with an ID get a response.
pub fn handle_rpc_request(
    request: &RpcRequest,
    rulers: &[RulerStatus],
    effects: &mut RpcEffects,
) -> Option<RpcResponse> {
    if request.jsonrpc != "2.0" {
        warn!("[RPC] unsupported jsonrpc version: {}", request.jsonrpc);
        let id = request.id.clone()?;
        return Some(create_error_response(id, -32600, "Invalid Request", None));
    }

    let result = match request.method.as_str() {
        "tool_selection" => handle_tool_selection(&request.params, effects),
        "clear_tool" => handle_clear_tool(effects),
        "clear_measurement" => handle_clear_measurement(&request.params, rulers, effects),
        "get_measurement" => handle_get_measurement(rulers),
        _ => {
            warn!("[RPC] unknown method: {}", request.method);
            let id = request.id.clone()?;
            return Some(create_error_response(
                id,
                -32601,
                "Method not found",
                Some(serde_json::json!({"method": request.method})),
            ));
        }
    };

    let id = request.id.clone()?;
    match result {
        Ok(result_value) => Some(RpcResponse {
            jsonrpc: "2.0".to_string(),
            result: Some(result_value),
            error: None,
            id: Some(id),
        }),
        Err(error) => Some(RpcResponse {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(error),
            id: Some(id),
        }),
    }
}

/// Toolbar button press: `{"tool": "ruler" | "angle"}`.
fn handle_tool_selection(
    params: &serde_json::Value,
    effects: &mut RpcEffects,
) -> Result<serde_json::Value, RpcError> {
    #[derive(Deserialize)]
    struct ToolSelectionParams {
        tool: String,
    }

    let tool_params = serde_json::from_value::<ToolSelectionParams>(params.clone())
        .map_err(|_| RpcError::invalid_params("Expected 'tool' parameter"))?;

    let requested = ToolRequest::from_string(&tool_params.tool)
        .ok_or_else(|| RpcError::invalid_params(&format!("Unknown tool: {}", tool_params.tool)))?;

    effects.toggles.push(ToolToggleEvent {
        requested,
        source: ToolSelectionSource::Rpc,
    });
    info!("[RPC] tool toggle queued: {}", requested.as_str());

    Ok(serde_json::json!({
        "success": true,
        "requested": requested.as_str()
    }))
}

fn handle_clear_tool(effects: &mut RpcEffects) -> Result<serde_json::Value, RpcError> {
    effects.clears.push(ClearToolEvent {
        source: ToolSelectionSource::Rpc,
    });
    Ok(serde_json::json!({ "success": true }))
}

/// Clear one ruler (`{"manipulator": id}`) or every ruler (no params).
fn handle_clear_measurement(
    params: &serde_json::Value,
    rulers: &[RulerStatus],
    effects: &mut RpcEffects,
) -> Result<serde_json::Value, RpcError> {
    #[derive(Deserialize, Default)]
    struct ClearParams {
        manipulator: Option<u64>,
    }

    let clear_params = if params.is_null() {
        ClearParams::default()
    } else {
        serde_json::from_value::<ClearParams>(params.clone())
            .map_err(|_| RpcError::invalid_params("Expected optional 'manipulator' id"))?
    };

    let targets: Vec<&RulerStatus> = match clear_params.manipulator {
        Some(bits) => {
            let ruler = rulers
                .iter()
                .find(|r| r.manipulator == bits)
                .ok_or_else(|| RpcError::invalid_params(&format!("Unknown manipulator: {bits}")))?;
            vec![ruler]
        }
        None => rulers.iter().collect(),
    };

    let mut cleared = 0;
    for ruler in targets {
        // Clearing only applies to a ruler in ruler mode, same as a double click.
        if ruler.tool != ToolState::Ruler {
            continue;
        }
        let manipulator = Entity::try_from_bits(ruler.manipulator)
            .map_err(|_| RpcError::internal_error("Invalid manipulator id"))?;
        effects.actions.push(RulerAction::Clear { manipulator });
        cleared += 1;
    }

    Ok(serde_json::json!({
        "success": true,
        "cleared": cleared
    }))
}

fn handle_get_measurement(rulers: &[RulerStatus]) -> Result<serde_json::Value, RpcError> {
    serde_json::to_value(rulers)
        .map(|rulers| serde_json::json!({ "rulers": rulers }))
        .map_err(|e| RpcError::internal_error(&format!("Serialization failed: {e}")))
}

/// Push tool and measurement changes to the frontend.
pub fn forward_measurement_notifications(
    mut tool_changes: EventReader<ToolStateChanged>,
    mut measurement_changes: EventReader<MeasurementChanged>,
    mut misses: EventReader<PickMissed>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    for change in tool_changes.read() {
        rpc_interface.send_notification(
            "tool_state_changed",
            serde_json::json!({
                "manipulator": change.manipulator.to_bits(),
                "from": change.from.as_str(),
                "to": change.to.as_str(),
            }),
        );
    }

    for change in measurement_changes.read() {
        let manipulator = change.manipulator.to_bits();
        match change.change {
            MeasurementChange::PointAdded { index, point } => rpc_interface.send_notification(
                "measure_point_added",
                serde_json::json!({
                    "manipulator": manipulator,
                    "index": index,
                    "point": point.to_array(),
                    "revision": change.revision,
                }),
            ),
            MeasurementChange::Cleared => rpc_interface.send_notification(
                "measure_cleared",
                serde_json::json!({
                    "manipulator": manipulator,
                    "revision": change.revision,
                }),
            ),
        }
    }

    for miss in misses.read() {
        rpc_interface.send_notification(
            "measure_pick_missed",
            serde_json::json!({
                "manipulator": miss.manipulator.to_bits(),
                "reason": miss.error.to_string(),
            }),
        );
    }
}

fn create_error_response(
    id: serde_json::Value,
    code: i32,
    message: &str,
    data: Option<serde_json::Value>,
) -> RpcResponse {
    RpcResponse {
        jsonrpc: "2.0".to_string(),
        result: None,
        error: Some(RpcError {
            code,
            message: message.to_string(),
            data,
        }),
        id: Some(id),
    }
}

/// Flush queued notifications and responses to the host page.
fn send_outgoing_messages(mut rpc_interface: ResMut<WebRpcInterface>) {
    for notification in rpc_interface.outgoing_notifications.drain(..) {
        send_message_to_parent(&notification);
    }

    for response in rpc_interface.outgoing_responses.drain(..) {
        send_message_to_parent(&response);
    }
}

/// Send serialized message to the parent window.
fn send_message_to_parent<T: Serialize>(message: &T) {
    #[cfg(target_arch = "wasm32")]
    {
        match serde_json::to_string(message) {
            Ok(json) => {
                if let Some(window) = window() {
                    if let Some(parent) = window.parent().ok().flatten() {
                        if let Err(e) = parent.post_message(&JsValue::from_str(&json), "*") {
                            error!("[RPC] failed to send message to parent: {:?}", e);
                        }
                    } else {
                        warn!("[RPC] no parent window available");
                    }
                } else {
                    error!("[RPC] window object not available");
                }
            }
            Err(e) => {
                error!("[RPC] failed to serialize message: {}", e);
            }
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        match serde_json::to_string(message) {
            Ok(json) => trace!("[RPC] outgoing {json}"),
            Err(e) => error!("[RPC] failed to serialize message: {}", e),
        }
    }
}

/// Standard RPC error codes and constructors.
impl RpcError {
    pub fn invalid_params(message: &str) -> Self {
        Self {
            code: -32602,
            message: message.to_string(),
            data: None,
        }
    }

    pub fn internal_error(message: &str) -> Self {
        Self {
            code: -32603,
            message: message.to_string(),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(method: &str, params: serde_json::Value) -> RpcRequest {
        RpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id: Some(json!(1)),
        }
    }

    fn ruler(bits_from: u32, tool: ToolState) -> RulerStatus {
        RulerStatus {
            manipulator: Entity::from_raw(bits_from).to_bits(),
            tool,
            measurement: crate::tools::measure::MeasurementModel::new().snapshot(),
        }
    }

    #[test]
    fn tool_selection_queues_a_toggle() {
        let mut effects = RpcEffects::default();
        let response =
            handle_rpc_request(&request("tool_selection", json!({"tool": "RULER"})), &[], &mut effects)
                .unwrap();

        assert!(response.error.is_none());
        assert_eq!(effects.toggles.len(), 1);
        assert_eq!(effects.toggles[0].requested, ToolRequest::Ruler);
        assert_eq!(effects.toggles[0].source, ToolSelectionSource::Rpc);
    }

    #[test]
    fn unknown_tool_is_invalid_params() {
        let mut effects = RpcEffects::default();
        let response =
            handle_rpc_request(&request("tool_selection", json!({"tool": "lasso"})), &[], &mut effects)
                .unwrap();

        assert_eq!(response.error.unwrap().code, -32602);
        assert!(effects.toggles.is_empty());
    }

    #[test]
    fn unknown_method_is_not_found() {
        let mut effects = RpcEffects::default();
        let response = handle_rpc_request(&request("get_fps", json!(null)), &[], &mut effects).unwrap();
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[test]
    fn wrong_version_is_invalid_request() {
        let mut effects = RpcEffects::default();
        let mut old = request("clear_tool", json!(null));
        old.jsonrpc = "1.0".to_string();

        let response = handle_rpc_request(&old, &[], &mut effects).unwrap();
        assert_eq!(response.error.unwrap().code, -32600);
        assert!(effects.clears.is_empty());
    }

    #[test]
    fn notifications_get_no_response_but_still_apply() {
        let mut effects = RpcEffects::default();
        let mut notification = request("clear_tool", json!(null));
        notification.id = None;

        assert!(handle_rpc_request(&notification, &[], &mut effects).is_none());
        assert_eq!(effects.clears.len(), 1);
    }

    #[test]
    fn clear_measurement_targets_rulers_in_ruler_mode() {
        let rulers = [ruler(1, ToolState::Ruler), ruler(2, ToolState::Disabled)];
        let mut effects = RpcEffects::default();
        let response =
            handle_rpc_request(&request("clear_measurement", json!(null)), &rulers, &mut effects)
                .unwrap();

        assert_eq!(response.result.unwrap()["cleared"], json!(1));
        assert_eq!(
            effects.actions,
            vec![RulerAction::Clear {
                manipulator: Entity::from_raw(1)
            }]
        );
    }

    #[test]
    fn clear_measurement_rejects_unknown_manipulator() {
        let rulers = [ruler(1, ToolState::Ruler)];
        let mut effects = RpcEffects::default();
        let response = handle_rpc_request(
            &request("clear_measurement", json!({"manipulator": 999})),
            &rulers,
            &mut effects,
        )
        .unwrap();

        assert_eq!(response.error.unwrap().code, -32602);
        assert!(effects.actions.is_empty());
    }

    #[test]
    fn get_measurement_reports_every_ruler() {
        let rulers = [ruler(3, ToolState::Ruler)];
        let mut effects = RpcEffects::default();
        let response =
            handle_rpc_request(&request("get_measurement", json!({})), &rulers, &mut effects).unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["rulers"][0]["tool"], json!("ruler"));
        assert_eq!(result["rulers"][0]["measurement"]["total_length"], json!(0.0));
    }
}
