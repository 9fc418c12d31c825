//! JSON-RPC 2.0 bridge between the measurement tool and a hosting web page.
//!
//! The viewer runs inside an iframe; toolbar buttons live in the parent page
//! and talk to the engine through `postMessage`.
//!
//! ```text
//! Parent page  <──postMessage──>  Bevy (iframe)
//!     │                               │
//!     ├─ Request (with ID) ─────────> ├─ handle_rpc_request()
//!     │ <──────── Response (with ID) ─┤
//!     │ <───── Notification (no ID) ──┤  tool / measurement changes
//! ```
//!
//! Requests without an ID are notifications: their effects still apply but
//! nothing is sent back. On native builds outgoing messages are only traced.
//!
//! ## Error Handling
//!
//! Standard JSON-RPC 2.0 error codes:
//! - `-32600`: Invalid Request (wrong `jsonrpc` version)
//! - `-32601`: Method not found
//! - `-32602`: Invalid params
//! - `-32603`: Internal error
//!
//! ## Methods
//!
//! ### Tool Management
//! - `tool_selection`: Toolbar toggle, `{"tool": "ruler" | "angle"}`
//! - `clear_tool`: Switch every ruler off
//!
//! ### Measurement
//! - `clear_measurement`: Clear one ruler (`{"manipulator": id}`) or all of them
//! - `get_measurement`: Points, segments and total length per ruler
//!
//! ## Notifications
//!
//! - `tool_state_changed`: `{manipulator, from, to}`
//! - `measure_point_added`: `{manipulator, index, point, revision}`
//! - `measure_cleared`: `{manipulator, revision}`
//! - `measure_pick_missed`: `{manipulator, reason}`

/// Request handling, notification forwarding and the WASM message listener.
pub mod web_rpc;
